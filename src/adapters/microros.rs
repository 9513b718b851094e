//! micro-ROS middleware adapters.
//!
//! Two implementations of [`AgentPort`](crate::app::ports::AgentPort) +
//! [`MiddlewarePort`](crate::app::ports::MiddlewarePort), selected by target:
//!
//! - **[`EspMicroRos`]** (`target_os = "espidf"`) drives the real rcl/rclc
//!   client libraries through the component-generated bindings, with the
//!   XRCE-DDS UDP transport pointed at the configured agent.
//! - **[`SimMicroRos`]** (everything else) is an in-memory middleware with
//!   scriptable failures, used by host tests and the property suite.
//!
//! Both uphold the same contract: creates either fully succeed or leave
//! nothing behind at that step, destroys always make progress, and a
//! dispatch pass delivers at most one latest-wins sample.

#[cfg(target_os = "espidf")]
mod device {
    use std::ffi::CString;

    use esp_idf_sys::uros as sys;
    use log::{info, warn};

    use crate::app::ports::{AgentPort, MiddlewarePort};
    use crate::config::{NetConfig, format_ip};
    use crate::error::{LinkError, MiddlewareError};
    use crate::msg::{AXES_CAPACITY, AxisArray};

    /// Pre-allocated receive capacity for the button sequence.
    const BUTTONS_CAPACITY: usize = 12;
    /// Pre-allocated receive capacity for the header frame-id string.
    const FRAME_ID_CAPACITY: usize = 32;
    /// Short probe used to classify a failed client call as agent-side.
    const CLASSIFY_PING_TIMEOUT_MS: i32 = 100;

    // Return codes from rcl/types.h and rmw/ret_types.h.
    const RET_OK: sys::rcl_ret_t = 0;
    const RET_TIMEOUT: sys::rcl_ret_t = 2;
    const RET_INVALID_ARGUMENT: sys::rcl_ret_t = 11;
    const RMW_OK: sys::rmw_ret_t = 0;

    /// Latest sample captured by the subscription callback.  Written only
    /// from `joy_callback`, which the executor runs on the calling task
    /// inside `spin_some`, and drained right after the pass; the `Mutex`
    /// keeps it sound if a future build ever spins from a second task.
    static LATEST: std::sync::Mutex<Option<heapless::Vec<f32, AXES_CAPACITY>>> =
        std::sync::Mutex::new(None);

    fn store_latest(sample: heapless::Vec<f32, AXES_CAPACITY>) {
        match LATEST.lock() {
            Ok(mut slot) => *slot = Some(sample),
            Err(poisoned) => *poisoned.into_inner() = Some(sample),
        }
    }

    fn take_latest() -> Option<heapless::Vec<f32, AXES_CAPACITY>> {
        match LATEST.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    /// Executor-invoked subscription callback.  Copies the axes out of the
    /// borrowed message; anything past the receive capacity is dropped.
    unsafe extern "C" fn joy_callback(msg: *const core::ffi::c_void) {
        if msg.is_null() {
            return;
        }
        let joy = unsafe { &*msg.cast::<sys::sensor_msgs__msg__Joy>() };
        let len = joy.axes.size.min(joy.axes.capacity).min(AXES_CAPACITY);
        let mut sample: heapless::Vec<f32, AXES_CAPACITY> = heapless::Vec::new();
        if !joy.axes.data.is_null() {
            for i in 0..len {
                let _ = sample.push(unsafe { *joy.axes.data.add(i) });
            }
        }
        store_latest(sample);
    }

    /// Map an `rcl_ret_t` onto the severity split.
    fn check(ret: sys::rcl_ret_t) -> Result<(), MiddlewareError> {
        if ret == RET_OK {
            Ok(())
        } else if ret == RET_TIMEOUT {
            Err(MiddlewareError::Unavailable)
        } else {
            Err(MiddlewareError::Internal(ret))
        }
    }

    // ── Entity handles ────────────────────────────────────────

    /// rclc support context.  Heap-pinned: the executor holds a pointer to
    /// `raw.context` for its whole lifetime, so the struct must not move.
    pub struct UrosSupport {
        raw: Box<sys::rclc_support_t>,
    }

    pub struct UrosNode {
        raw: Box<sys::rcl_node_t>,
    }

    pub struct UrosExecutor {
        raw: Box<sys::rclc_executor_t>,
    }

    /// Message storage the executor dereferences during spin passes.
    /// Boxed so the registered pointers stay valid while the handle moves
    /// between the session struct and the destroy calls.
    struct JoyStorage {
        msg: sys::sensor_msgs__msg__Joy,
        axes: [f32; AXES_CAPACITY],
        buttons: [i32; BUTTONS_CAPACITY],
        frame_id: [core::ffi::c_char; FRAME_ID_CAPACITY],
    }

    impl JoyStorage {
        fn zeroed() -> Self {
            Self {
                msg: unsafe { core::mem::zeroed() },
                axes: [0.0; AXES_CAPACITY],
                buttons: [0; BUTTONS_CAPACITY],
                frame_id: [0; FRAME_ID_CAPACITY],
            }
        }
    }

    pub struct UrosSubscription {
        raw: Box<sys::rcl_subscription_t>,
        storage: Box<JoyStorage>,
    }

    // ── Adapter ───────────────────────────────────────────────

    /// micro-ROS client adapter for the ESP32 target.
    ///
    /// Owns the allocator (boxed — the support context records its
    /// address) and the agent endpoint strings handed to every
    /// support-context init.
    pub struct EspMicroRos {
        allocator: Box<sys::rcl_allocator_t>,
        agent_ip: CString,
        agent_port: CString,
    }

    impl EspMicroRos {
        pub fn new(net: &NetConfig) -> Result<Self, LinkError> {
            let ip = format_ip(net.agent_ip);
            let agent_ip = CString::new(ip.as_str())
                .map_err(|_| LinkError::Config("agent address contains an interior NUL"))?;
            let agent_port = CString::new(net.agent_port.to_string())
                .map_err(|_| LinkError::Config("agent port contains an interior NUL"))?;
            info!("micro-ROS client targeting agent {}:{}", ip, net.agent_port);
            Ok(Self {
                allocator: Box::new(unsafe { sys::rcutils_get_default_allocator() }),
                agent_ip,
                agent_port,
            })
        }

        /// A non-OK create does not say whether the agent vanished or the
        /// client state is corrupt; one short probe decides.
        fn classify(&self, ret: sys::rcl_ret_t) -> MiddlewareError {
            if ret == RET_TIMEOUT {
                return MiddlewareError::Unavailable;
            }
            let probe = unsafe { sys::rmw_uros_ping_agent(CLASSIFY_PING_TIMEOUT_MS, 1) };
            if probe == RMW_OK {
                MiddlewareError::Internal(ret)
            } else {
                MiddlewareError::Unavailable
            }
        }
    }

    impl AgentPort for EspMicroRos {
        fn ping(&mut self, timeout_ms: u32, attempts: u8) -> bool {
            let timeout = i32::try_from(timeout_ms).unwrap_or(i32::MAX);
            let ret = unsafe { sys::rmw_uros_ping_agent(timeout, attempts) };
            ret == RMW_OK
        }
    }

    impl MiddlewarePort for EspMicroRos {
        type Support = UrosSupport;
        type Node = UrosNode;
        type Executor = UrosExecutor;
        type Subscription = UrosSubscription;

        fn create_support(&mut self) -> Result<UrosSupport, MiddlewareError> {
            let mut init_options = unsafe { sys::rcl_get_zero_initialized_init_options() };
            let ret = unsafe { sys::rcl_init_options_init(&mut init_options, *self.allocator) };
            if ret != RET_OK {
                return Err(self.classify(ret));
            }

            let rmw_options =
                unsafe { sys::rcl_init_options_get_rmw_init_options(&mut init_options) };
            if rmw_options.is_null() {
                let _ = unsafe { sys::rcl_init_options_fini(&mut init_options) };
                return Err(MiddlewareError::Internal(RET_INVALID_ARGUMENT));
            }
            let ret = unsafe {
                sys::rmw_uros_options_set_udp_address(
                    self.agent_ip.as_ptr(),
                    self.agent_port.as_ptr(),
                    rmw_options,
                )
            };
            if ret != RMW_OK {
                let _ = unsafe { sys::rcl_init_options_fini(&mut init_options) };
                return Err(self.classify(ret));
            }

            let mut support = UrosSupport {
                raw: Box::new(unsafe { core::mem::zeroed() }),
            };
            let ret = unsafe {
                sys::rclc_support_init_with_options(
                    support.raw.as_mut(),
                    0,
                    core::ptr::null(),
                    &mut init_options,
                    self.allocator.as_mut(),
                )
            };
            let _ = unsafe { sys::rcl_init_options_fini(&mut init_options) };
            if ret != RET_OK {
                return Err(self.classify(ret));
            }
            Ok(support)
        }

        fn create_node(
            &mut self,
            support: &mut UrosSupport,
            name: &str,
        ) -> Result<UrosNode, MiddlewareError> {
            let name_c = CString::new(name)
                .map_err(|_| MiddlewareError::Internal(RET_INVALID_ARGUMENT))?;
            let mut node = UrosNode {
                raw: Box::new(unsafe { sys::rcl_get_zero_initialized_node() }),
            };
            let ret = unsafe {
                sys::rclc_node_init_default(
                    node.raw.as_mut(),
                    name_c.as_ptr(),
                    c"".as_ptr(),
                    support.raw.as_mut(),
                )
            };
            if ret != RET_OK {
                return Err(self.classify(ret));
            }
            Ok(node)
        }

        fn create_executor(
            &mut self,
            support: &mut UrosSupport,
            max_handles: usize,
        ) -> Result<UrosExecutor, MiddlewareError> {
            let mut executor = UrosExecutor {
                raw: Box::new(unsafe { sys::rclc_executor_get_zero_initialized_executor() }),
            };
            let ret = unsafe {
                sys::rclc_executor_init(
                    executor.raw.as_mut(),
                    &raw mut support.raw.context,
                    max_handles,
                    &raw const *self.allocator,
                )
            };
            if ret != RET_OK {
                return Err(self.classify(ret));
            }
            Ok(executor)
        }

        fn create_subscription(
            &mut self,
            node: &mut UrosNode,
            topic: &str,
        ) -> Result<UrosSubscription, MiddlewareError> {
            let topic_c = CString::new(topic)
                .map_err(|_| MiddlewareError::Internal(RET_INVALID_ARGUMENT))?;
            let type_support = unsafe {
                sys::rosidl_typesupport_c__get_message_type_support_handle__sensor_msgs__msg__Joy()
            };
            let mut sub = UrosSubscription {
                raw: Box::new(unsafe { sys::rcl_get_zero_initialized_subscription() }),
                storage: Box::new(JoyStorage::zeroed()),
            };
            let ret = unsafe {
                sys::rclc_subscription_init_default(
                    sub.raw.as_mut(),
                    node.raw.as_mut(),
                    type_support,
                    topic_c.as_ptr(),
                )
            };
            if ret != RET_OK {
                return Err(self.classify(ret));
            }
            Ok(sub)
        }

        fn register_subscription(
            &mut self,
            executor: &mut UrosExecutor,
            sub: &mut UrosSubscription,
        ) -> Result<(), MiddlewareError> {
            // Wire the receive buffers the deserializer writes into.
            let storage = sub.storage.as_mut();
            storage.msg.axes.data = storage.axes.as_mut_ptr();
            storage.msg.axes.capacity = AXES_CAPACITY;
            storage.msg.axes.size = 0;
            storage.msg.buttons.data = storage.buttons.as_mut_ptr();
            storage.msg.buttons.capacity = BUTTONS_CAPACITY;
            storage.msg.buttons.size = 0;
            storage.msg.header.frame_id.data = storage.frame_id.as_mut_ptr();
            storage.msg.header.frame_id.capacity = FRAME_ID_CAPACITY;
            storage.msg.header.frame_id.size = 0;

            let ret = unsafe {
                sys::rclc_executor_add_subscription(
                    executor.raw.as_mut(),
                    sub.raw.as_mut(),
                    (&raw mut storage.msg).cast::<core::ffi::c_void>(),
                    Some(joy_callback),
                    sys::rclc_executor_handle_invocation_t_ON_NEW_DATA,
                )
            };
            if ret != RET_OK {
                return Err(self.classify(ret));
            }
            // A sample left over from a previous session must not leak
            // into this one.
            let _ = take_latest();
            Ok(())
        }

        fn set_session_teardown_timeout(&mut self, support: &mut UrosSupport, timeout_ms: u32) {
            let timeout = i32::try_from(timeout_ms).unwrap_or(i32::MAX);
            let rmw_context =
                unsafe { sys::rcl_context_get_rmw_context(&raw mut support.raw.context) };
            if rmw_context.is_null() {
                return;
            }
            // Failure here must not block the teardown that follows.
            let _ = unsafe {
                sys::rmw_uros_set_context_entity_destroy_session_timeout(rmw_context, timeout)
            };
        }

        fn destroy_subscription(
            &mut self,
            mut sub: UrosSubscription,
            node: &mut UrosNode,
        ) -> Result<(), MiddlewareError> {
            let ret = unsafe { sys::rcl_subscription_fini(sub.raw.as_mut(), node.raw.as_mut()) };
            check(ret)
        }

        fn destroy_executor(&mut self, mut executor: UrosExecutor) -> Result<(), MiddlewareError> {
            let ret = unsafe { sys::rclc_executor_fini(executor.raw.as_mut()) };
            check(ret)
        }

        fn destroy_node(&mut self, mut node: UrosNode) -> Result<(), MiddlewareError> {
            let ret = unsafe { sys::rcl_node_fini(node.raw.as_mut()) };
            check(ret)
        }

        fn destroy_support(&mut self, mut support: UrosSupport) -> Result<(), MiddlewareError> {
            let ret = unsafe { sys::rclc_support_fini(support.raw.as_mut()) };
            check(ret)
        }

        fn spin_some(
            &mut self,
            executor: &mut UrosExecutor,
            budget_ms: u32,
            rx: &mut AxisArray,
        ) -> Result<bool, MiddlewareError> {
            let budget_ns = u64::from(budget_ms) * 1_000_000;
            let ret = unsafe { sys::rclc_executor_spin_some(executor.raw.as_mut(), budget_ns) };
            // TIMEOUT is the normal "nothing arrived" outcome.
            if ret != RET_OK && ret != RET_TIMEOUT {
                return Err(MiddlewareError::Internal(ret));
            }
            match take_latest() {
                Some(sample) => match rx.fill_from(&sample) {
                    Ok(()) => Ok(true),
                    Err(overflow) => {
                        warn!("dropping sample: {overflow}");
                        Ok(false)
                    }
                },
                None => Ok(false),
            }
        }
    }
}

#[cfg(target_os = "espidf")]
pub use device::{EspMicroRos, UrosExecutor, UrosNode, UrosSubscription, UrosSupport};

#[cfg(not(target_os = "espidf"))]
mod sim {
    use log::warn;

    use crate::app::ports::{AgentPort, MiddlewarePort};
    use crate::error::{MiddlewareError, ProvisionStep};
    use crate::msg::AxisArray;

    /// Default XRCE entity-destroy session timeout, mirroring the device.
    const DEFAULT_TEARDOWN_TIMEOUT_MS: u32 = 1000;

    // ── Entity handles ────────────────────────────────────────

    #[derive(Debug)]
    pub struct SimSupport {
        teardown_timeout_ms: u32,
    }

    impl SimSupport {
        pub fn teardown_timeout_ms(&self) -> u32 {
            self.teardown_timeout_ms
        }
    }

    pub struct SimNode {
        name: String,
    }

    impl SimNode {
        pub fn name(&self) -> &str {
            &self.name
        }
    }

    pub struct SimExecutor {
        max_handles: usize,
        registered: usize,
    }

    impl SimExecutor {
        pub fn registered(&self) -> usize {
            self.registered
        }
    }

    pub struct SimSubscription {
        topic: String,
    }

    impl SimSubscription {
        pub fn topic(&self) -> &str {
            &self.topic
        }
    }

    // ── Adapter ───────────────────────────────────────────────

    /// In-memory middleware with scriptable failures.
    ///
    /// Models exactly the agent-visible behaviour the lifecycle cares
    /// about: entity counts, agent reachability, one-deep latest-wins
    /// sample delivery, and one-shot per-step create failures.
    pub struct SimMicroRos {
        agent_up: bool,
        armed_failure: Option<(ProvisionStep, MiddlewareError)>,
        pending: Option<Vec<f32>>,
        live_entities: u32,
    }

    impl Default for SimMicroRos {
        fn default() -> Self {
            Self::new()
        }
    }

    impl SimMicroRos {
        pub fn new() -> Self {
            Self {
                agent_up: true,
                armed_failure: None,
                pending: None,
                live_entities: 0,
            }
        }

        /// Toggle agent reachability (affects pings and agent-side creates).
        pub fn set_agent_up(&mut self, up: bool) {
            self.agent_up = up;
        }

        /// Arm a one-shot failure for the next create call at `step`.
        pub fn fail_next_create(&mut self, step: ProvisionStep, error: MiddlewareError) {
            self.armed_failure = Some((step, error));
        }

        /// Queue a sample for the next dispatch pass.  Latest wins: pushing
        /// again before a pass replaces the previous sample.
        pub fn push_sample(&mut self, sample: &[f32]) {
            self.pending = Some(sample.to_vec());
        }

        /// Live middleware entities (support + node + executor + subscription).
        pub fn live_entities(&self) -> u32 {
            self.live_entities
        }

        fn take_armed_failure(&mut self, step: ProvisionStep) -> Result<(), MiddlewareError> {
            if let Some((armed, err)) = self.armed_failure {
                if armed == step {
                    self.armed_failure = None;
                    return Err(err);
                }
            }
            Ok(())
        }

        fn agent_side_create(&self, step: ProvisionStep) -> Result<(), MiddlewareError> {
            if self.agent_up {
                Ok(())
            } else {
                warn!("sim: {step} create with agent down");
                Err(MiddlewareError::Unavailable)
            }
        }
    }

    impl AgentPort for SimMicroRos {
        fn ping(&mut self, _timeout_ms: u32, _attempts: u8) -> bool {
            self.agent_up
        }
    }

    impl MiddlewarePort for SimMicroRos {
        type Support = SimSupport;
        type Node = SimNode;
        type Executor = SimExecutor;
        type Subscription = SimSubscription;

        fn create_support(&mut self) -> Result<SimSupport, MiddlewareError> {
            self.take_armed_failure(ProvisionStep::Support)?;
            self.agent_side_create(ProvisionStep::Support)?;
            self.live_entities += 1;
            Ok(SimSupport {
                teardown_timeout_ms: DEFAULT_TEARDOWN_TIMEOUT_MS,
            })
        }

        fn create_node(
            &mut self,
            _support: &mut SimSupport,
            name: &str,
        ) -> Result<SimNode, MiddlewareError> {
            self.take_armed_failure(ProvisionStep::Node)?;
            self.agent_side_create(ProvisionStep::Node)?;
            self.live_entities += 1;
            Ok(SimNode {
                name: name.to_owned(),
            })
        }

        fn create_executor(
            &mut self,
            _support: &mut SimSupport,
            max_handles: usize,
        ) -> Result<SimExecutor, MiddlewareError> {
            self.take_armed_failure(ProvisionStep::Executor)?;
            // Executor init is client-local: no agent round-trip.
            self.live_entities += 1;
            Ok(SimExecutor {
                max_handles,
                registered: 0,
            })
        }

        fn create_subscription(
            &mut self,
            _node: &mut SimNode,
            topic: &str,
        ) -> Result<SimSubscription, MiddlewareError> {
            self.take_armed_failure(ProvisionStep::Subscription)?;
            self.agent_side_create(ProvisionStep::Subscription)?;
            self.live_entities += 1;
            Ok(SimSubscription {
                topic: topic.to_owned(),
            })
        }

        fn register_subscription(
            &mut self,
            executor: &mut SimExecutor,
            _sub: &mut SimSubscription,
        ) -> Result<(), MiddlewareError> {
            self.take_armed_failure(ProvisionStep::Registration)?;
            if executor.registered >= executor.max_handles {
                return Err(MiddlewareError::Internal(1));
            }
            executor.registered += 1;
            // Mirror the device: no sample survives into a new session.
            self.pending = None;
            Ok(())
        }

        fn set_session_teardown_timeout(&mut self, support: &mut SimSupport, timeout_ms: u32) {
            support.teardown_timeout_ms = timeout_ms;
        }

        fn destroy_subscription(
            &mut self,
            _sub: SimSubscription,
            _node: &mut SimNode,
        ) -> Result<(), MiddlewareError> {
            self.live_entities = self.live_entities.saturating_sub(1);
            Ok(())
        }

        fn destroy_executor(&mut self, _executor: SimExecutor) -> Result<(), MiddlewareError> {
            self.live_entities = self.live_entities.saturating_sub(1);
            Ok(())
        }

        fn destroy_node(&mut self, _node: SimNode) -> Result<(), MiddlewareError> {
            self.live_entities = self.live_entities.saturating_sub(1);
            Ok(())
        }

        fn destroy_support(&mut self, _support: SimSupport) -> Result<(), MiddlewareError> {
            self.live_entities = self.live_entities.saturating_sub(1);
            Ok(())
        }

        fn spin_some(
            &mut self,
            executor: &mut SimExecutor,
            _budget_ms: u32,
            rx: &mut AxisArray,
        ) -> Result<bool, MiddlewareError> {
            if executor.registered == 0 {
                return Ok(false);
            }
            match self.pending.take() {
                Some(sample) => match rx.fill_from(&sample) {
                    Ok(()) => Ok(true),
                    Err(overflow) => {
                        warn!("sim: dropping sample: {overflow}");
                        Ok(false)
                    }
                },
                None => Ok(false),
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub use sim::{SimExecutor, SimMicroRos, SimNode, SimSubscription, SimSupport};
