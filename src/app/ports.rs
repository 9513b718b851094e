//! Port traits — the hexagonal boundary between domain logic and the middleware.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ LinkService (domain)
//! ```
//!
//! Driven adapters (the RCL bindings on device, the simulator on the host,
//! mocks in tests) implement these traits.  The
//! [`LinkService`](super::service::LinkService) consumes them via generics,
//! so the connection lifecycle never touches FFI directly.
//!
//! ## Contract notes
//!
//! - **MiddlewarePort** create operations either fully succeed or leave
//!   nothing behind for the caller to clean up at that step — partial-failure
//!   rollback is the session layer's job, and these primitives keep it
//!   possible by never half-constructing an entity.
//! - **Destroy operations are best-effort.**  They report errors but the
//!   session layer continues tearing down regardless; with the agent gone
//!   there is nobody left to acknowledge a clean close.
//! - `spin_some` delivers **at most one** fresh sample per call, even if the
//!   transport buffered several — latest wins, older samples are dropped.

use crate::error::MiddlewareError;
use crate::msg::AxisArray;

// ───────────────────────────────────────────────────────────────
// Agent port (driven adapter: domain → agent liveness probe)
// ───────────────────────────────────────────────────────────────

/// Reachability probe for the remote agent.
pub trait AgentPort {
    /// Probe the agent: up to `attempts` tries, each waiting `timeout_ms`.
    /// Returns `true` as soon as any attempt is answered.
    fn ping(&mut self, timeout_ms: u32, attempts: u8) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Middleware port (driven adapter: domain → RCL entity lifecycle)
// ───────────────────────────────────────────────────────────────

/// Entity lifecycle and dispatch operations against the middleware.
///
/// The associated types let the device adapter hand out raw RCL handles
/// while the simulator and test mocks use plain newtypes — the domain
/// only ever moves them between calls, never inspects them.
pub trait MiddlewarePort {
    type Support;
    type Node;
    type Executor;
    type Subscription;

    /// Allocate the support context (init options, transport session).
    fn create_support(&mut self) -> Result<Self::Support, MiddlewareError>;

    /// Create a node with the given name in the default namespace.
    fn create_node(
        &mut self,
        support: &mut Self::Support,
        name: &str,
    ) -> Result<Self::Node, MiddlewareError>;

    /// Create an executor sized for `max_handles` registrations.
    fn create_executor(
        &mut self,
        support: &mut Self::Support,
        max_handles: usize,
    ) -> Result<Self::Executor, MiddlewareError>;

    /// Create a subscription on `topic` owned by `node`.
    fn create_subscription(
        &mut self,
        node: &mut Self::Node,
        topic: &str,
    ) -> Result<Self::Subscription, MiddlewareError>;

    /// Wire the subscription into the executor's dispatch set.
    fn register_subscription(
        &mut self,
        executor: &mut Self::Executor,
        sub: &mut Self::Subscription,
    ) -> Result<(), MiddlewareError>;

    /// Set how long entity destruction waits for the agent to confirm.
    /// Zero means fire-and-forget.
    fn set_session_teardown_timeout(&mut self, support: &mut Self::Support, timeout_ms: u32);

    /// Destroy the subscription.  `node` is the owner it was created under.
    fn destroy_subscription(
        &mut self,
        sub: Self::Subscription,
        node: &mut Self::Node,
    ) -> Result<(), MiddlewareError>;

    /// Destroy the executor and its dispatch set.
    fn destroy_executor(&mut self, executor: Self::Executor) -> Result<(), MiddlewareError>;

    /// Destroy the node.
    fn destroy_node(&mut self, node: Self::Node) -> Result<(), MiddlewareError>;

    /// Destroy the support context, closing the transport session.
    fn destroy_support(&mut self, support: Self::Support) -> Result<(), MiddlewareError>;

    /// Run one bounded dispatch pass: poll for work, run ready callbacks,
    /// return within `budget_ms` whether or not anything arrived.
    ///
    /// Returns `Ok(true)` if a fresh sample was written into `rx`
    /// (at most one per pass — latest wins), `Ok(false)` if the pass
    /// completed without new data.
    fn spin_some(
        &mut self,
        executor: &mut Self::Executor,
        budget_ms: u32,
        rx: &mut AxisArray,
    ) -> Result<bool, MiddlewareError>;
}

// ───────────────────────────────────────────────────────────────
// Message handler port (driven adapter: domain → application callback)
// ───────────────────────────────────────────────────────────────

/// Receives each delivered axis sample.
///
/// Called from [`LinkService::tick`](super::service::LinkService::tick) on
/// the main task, never from an interrupt or executor-internal context.
pub trait MessageHandler {
    fn on_message(&mut self, axes: &AxisArray);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`LinkEvent`](super::events::LinkEvent)s
/// through this port.  Adapters decide where they go (serial log, a
/// diagnostics topic, a test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::LinkEvent);
}
