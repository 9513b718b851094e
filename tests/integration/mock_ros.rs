//! Scripted middleware mock for integration tests.
//!
//! Records every port call so tests can assert on the full create /
//! destroy / dispatch history without an agent on the wire.  Failures
//! are armed per provisioning step and fire exactly once, mirroring a
//! transient fault that clears by the next attempt.

use std::collections::VecDeque;

use uroslink::app::events::LinkEvent;
use uroslink::app::ports::{AgentPort, EventSink, MessageHandler, MiddlewarePort};
use uroslink::error::{MiddlewareError, ProvisionStep};
use uroslink::msg::AxisArray;

// ── Port call record ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum MwCall {
    Ping { timeout_ms: u32, attempts: u8 },
    CreateSupport,
    CreateNode(String),
    CreateExecutor(usize),
    CreateSubscription(String),
    Register,
    SetTeardownTimeout(u32),
    DestroySubscription,
    DestroyExecutor,
    DestroyNode,
    DestroySupport,
    SpinSome(u32),
}

// ── Opaque handles ────────────────────────────────────────────

#[derive(Debug)]
pub struct MockSupport;
#[derive(Debug)]
pub struct MockNode;
#[derive(Debug)]
pub struct MockExecutor;
#[derive(Debug)]
pub struct MockSubscription;

// ── MockRos ───────────────────────────────────────────────────

#[derive(Debug)]
pub struct MockRos {
    pub calls: Vec<MwCall>,
    /// Ping answer when `ping_script` is exhausted.
    pub agent_up: bool,
    /// Scripted ping answers, consumed front to back.
    pub ping_script: VecDeque<bool>,
    /// One-shot failure armed for a specific provisioning step.
    pub fail_step: Option<(ProvisionStep, MiddlewareError)>,
    /// When set, every destroy call reports an error (but is recorded).
    pub destroy_errors: bool,
    /// One-shot error for the next dispatch pass.
    pub spin_error: Option<MiddlewareError>,
    /// Samples delivered by successive dispatch passes, front to back.
    pub samples: VecDeque<Vec<f32>>,
}

#[allow(dead_code)]
impl MockRos {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            agent_up: true,
            ping_script: VecDeque::new(),
            fail_step: None,
            destroy_errors: false,
            spin_error: None,
            samples: VecDeque::new(),
        }
    }

    pub fn arm_failure(&mut self, step: ProvisionStep, err: MiddlewareError) {
        self.fail_step = Some((step, err));
    }

    pub fn push_sample(&mut self, axes: &[f32]) {
        self.samples.push_back(axes.to_vec());
    }

    /// Entities created so far (registration is wiring, not an entity).
    pub fn created(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    MwCall::CreateSupport
                        | MwCall::CreateNode(_)
                        | MwCall::CreateExecutor(_)
                        | MwCall::CreateSubscription(_)
                )
            })
            .count()
    }

    /// Entities destroyed so far.
    pub fn destroyed(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    MwCall::DestroySubscription
                        | MwCall::DestroyExecutor
                        | MwCall::DestroyNode
                        | MwCall::DestroySupport
                )
            })
            .count()
    }

    /// The teardown-relevant calls in the order they were made.
    pub fn teardown_sequence(&self) -> Vec<MwCall> {
        self.calls
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    MwCall::SetTeardownTimeout(_)
                        | MwCall::DestroySubscription
                        | MwCall::DestroyExecutor
                        | MwCall::DestroyNode
                        | MwCall::DestroySupport
                )
            })
            .cloned()
            .collect()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn take_failure(&mut self, step: ProvisionStep) -> Result<(), MiddlewareError> {
        match self.fail_step {
            Some((armed, err)) if armed == step => {
                self.fail_step = None;
                Err(err)
            }
            _ => Ok(()),
        }
    }

    fn destroy_result(&self) -> Result<(), MiddlewareError> {
        if self.destroy_errors {
            Err(MiddlewareError::Internal(-5))
        } else {
            Ok(())
        }
    }
}

impl Default for MockRos {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentPort for MockRos {
    fn ping(&mut self, timeout_ms: u32, attempts: u8) -> bool {
        self.calls.push(MwCall::Ping {
            timeout_ms,
            attempts,
        });
        self.ping_script.pop_front().unwrap_or(self.agent_up)
    }
}

impl MiddlewarePort for MockRos {
    type Support = MockSupport;
    type Node = MockNode;
    type Executor = MockExecutor;
    type Subscription = MockSubscription;

    fn create_support(&mut self) -> Result<MockSupport, MiddlewareError> {
        self.calls.push(MwCall::CreateSupport);
        self.take_failure(ProvisionStep::Support)?;
        Ok(MockSupport)
    }

    fn create_node(
        &mut self,
        _support: &mut MockSupport,
        name: &str,
    ) -> Result<MockNode, MiddlewareError> {
        self.calls.push(MwCall::CreateNode(name.to_string()));
        self.take_failure(ProvisionStep::Node)?;
        Ok(MockNode)
    }

    fn create_executor(
        &mut self,
        _support: &mut MockSupport,
        max_handles: usize,
    ) -> Result<MockExecutor, MiddlewareError> {
        self.calls.push(MwCall::CreateExecutor(max_handles));
        self.take_failure(ProvisionStep::Executor)?;
        Ok(MockExecutor)
    }

    fn create_subscription(
        &mut self,
        _node: &mut MockNode,
        topic: &str,
    ) -> Result<MockSubscription, MiddlewareError> {
        self.calls.push(MwCall::CreateSubscription(topic.to_string()));
        self.take_failure(ProvisionStep::Subscription)?;
        Ok(MockSubscription)
    }

    fn register_subscription(
        &mut self,
        _executor: &mut MockExecutor,
        _sub: &mut MockSubscription,
    ) -> Result<(), MiddlewareError> {
        self.calls.push(MwCall::Register);
        self.take_failure(ProvisionStep::Registration)
    }

    fn set_session_teardown_timeout(&mut self, _support: &mut MockSupport, timeout_ms: u32) {
        self.calls.push(MwCall::SetTeardownTimeout(timeout_ms));
    }

    fn destroy_subscription(
        &mut self,
        _sub: MockSubscription,
        _node: &mut MockNode,
    ) -> Result<(), MiddlewareError> {
        self.calls.push(MwCall::DestroySubscription);
        self.destroy_result()
    }

    fn destroy_executor(&mut self, _executor: MockExecutor) -> Result<(), MiddlewareError> {
        self.calls.push(MwCall::DestroyExecutor);
        self.destroy_result()
    }

    fn destroy_node(&mut self, _node: MockNode) -> Result<(), MiddlewareError> {
        self.calls.push(MwCall::DestroyNode);
        self.destroy_result()
    }

    fn destroy_support(&mut self, _support: MockSupport) -> Result<(), MiddlewareError> {
        self.calls.push(MwCall::DestroySupport);
        self.destroy_result()
    }

    fn spin_some(
        &mut self,
        _executor: &mut MockExecutor,
        budget_ms: u32,
        rx: &mut AxisArray,
    ) -> Result<bool, MiddlewareError> {
        self.calls.push(MwCall::SpinSome(budget_ms));
        if let Some(err) = self.spin_error.take() {
            return Err(err);
        }
        match self.samples.pop_front() {
            // An oversized sample is dropped, same as the device adapter.
            Some(axes) => Ok(rx.fill_from(&axes).is_ok()),
            None => Ok(false),
        }
    }
}

// ── Recording handler + sink ──────────────────────────────────

#[derive(Default)]
pub struct RecordingHandler {
    pub received: Vec<Vec<f32>>,
}

impl MessageHandler for RecordingHandler {
    fn on_message(&mut self, axes: &AxisArray) {
        self.received.push(axes.as_slice().to_vec());
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<LinkEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &LinkEvent) {
        self.events.push(event.clone());
    }
}
