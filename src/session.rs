//! Session provisioning and teardown.
//!
//! A *session* is the full set of middleware entities the link needs while
//! connected:
//!
//! ```text
//!   support ──▶ node ──▶ subscription ──▶ rx buffer
//!      │
//!      └─────▶ executor ◀── registration ──┘
//! ```
//!
//! [`Provisioner::create`] builds them in dependency order.  If any step
//! fails, everything created so far is destroyed in reverse order before the
//! error is returned — a failed create never leaks entities into the next
//! attempt.  [`Provisioner::destroy`] tears a full session down; destruction
//! is best-effort because the agent that would acknowledge a clean close is
//! usually the thing that just died.

use log::{info, warn};

use crate::app::ports::MiddlewarePort;
use crate::config::{LinkConfig, NAME_MAX};
use crate::error::{MiddlewareError, ProvisionError, ProvisionStep};
use crate::msg::AxisArray;

// ───────────────────────────────────────────────────────────────
// Session entities
// ───────────────────────────────────────────────────────────────

/// A subscription paired with its receive-side staging buffer.
///
/// The buffer starts empty and is cleared again on registration, so a
/// stale sample from a previous session can never be mistaken for a
/// fresh delivery.
#[derive(Debug)]
pub struct SubEndpoint<S> {
    pub sub: S,
    pub rx: AxisArray,
}

impl<S> SubEndpoint<S> {
    fn new(sub: S) -> Self {
        Self {
            sub,
            rx: AxisArray::new(),
        }
    }
}

/// Everything a live session owns.  Moved out of the service and handed
/// to [`Provisioner::destroy`] wholesale when the link drops.
#[derive(Debug)]
pub struct Session<M: MiddlewarePort + ?Sized> {
    pub support: M::Support,
    pub node: M::Node,
    pub executor: M::Executor,
    pub endpoint: SubEndpoint<M::Subscription>,
}

// ───────────────────────────────────────────────────────────────
// Provisioner
// ───────────────────────────────────────────────────────────────

/// Creates and destroys sessions against any [`MiddlewarePort`].
pub struct Provisioner {
    node_name: heapless::String<NAME_MAX>,
    topic: heapless::String<NAME_MAX>,
    max_handles: usize,
}

impl Provisioner {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            node_name: config.node_name.clone(),
            topic: config.topic.clone(),
            max_handles: config.executor_max_handles,
        }
    }

    /// Create a full session: support → node → executor → subscription →
    /// buffer reset → registration.
    ///
    /// On failure at any step the partial set is rolled back in reverse
    /// creation order and the returned [`ProvisionError`] names the step
    /// that failed.
    pub fn create<M: MiddlewarePort>(&self, mw: &mut M) -> Result<Session<M>, ProvisionError> {
        let mut support = match mw.create_support() {
            Ok(v) => v,
            Err(source) => return Err(report(ProvisionStep::Support, source)),
        };

        let mut node = match mw.create_node(&mut support, &self.node_name) {
            Ok(v) => v,
            Err(source) => {
                let err = report(ProvisionStep::Node, source);
                self.teardown(mw, support, None, None, None);
                return Err(err);
            }
        };

        let mut executor = match mw.create_executor(&mut support, self.max_handles) {
            Ok(v) => v,
            Err(source) => {
                let err = report(ProvisionStep::Executor, source);
                self.teardown(mw, support, Some(node), None, None);
                return Err(err);
            }
        };

        let sub = match mw.create_subscription(&mut node, &self.topic) {
            Ok(v) => v,
            Err(source) => {
                let err = report(ProvisionStep::Subscription, source);
                self.teardown(mw, support, Some(node), Some(executor), None);
                return Err(err);
            }
        };

        // Buffer starts empty — no sample from a previous session survives.
        let mut endpoint = SubEndpoint::new(sub);
        endpoint.rx.clear();

        if let Err(source) = mw.register_subscription(&mut executor, &mut endpoint.sub) {
            let err = report(ProvisionStep::Registration, source);
            self.teardown(mw, support, Some(node), Some(executor), Some(endpoint.sub));
            return Err(err);
        }

        info!(
            "session provisioned: node '{}' subscribed to '{}' ({} executor handles)",
            self.node_name, self.topic, self.max_handles
        );
        Ok(Session {
            support,
            node,
            executor,
            endpoint,
        })
    }

    /// Destroy a complete session.
    pub fn destroy<M: MiddlewarePort>(&self, mw: &mut M, session: Session<M>) {
        info!("destroying session entities for node '{}'", self.node_name);
        self.teardown(
            mw,
            session.support,
            Some(session.node),
            Some(session.executor),
            Some(session.endpoint.sub),
        );
    }

    /// Best-effort reverse-order teardown of whatever subset exists.
    ///
    /// The teardown timeout is zeroed first so destruction never blocks
    /// waiting for an agent that may be gone.  Individual destroy errors
    /// are logged and skipped; the remaining entities are still destroyed.
    fn teardown<M: MiddlewarePort>(
        &self,
        mw: &mut M,
        mut support: M::Support,
        mut node: Option<M::Node>,
        executor: Option<M::Executor>,
        sub: Option<M::Subscription>,
    ) {
        mw.set_session_teardown_timeout(&mut support, 0);

        if let (Some(sub), Some(node)) = (sub, node.as_mut()) {
            log_destroy_error("subscription", mw.destroy_subscription(sub, node));
        }
        if let Some(executor) = executor {
            log_destroy_error("executor", mw.destroy_executor(executor));
        }
        if let Some(node) = node {
            log_destroy_error("node", mw.destroy_node(node));
        }
        log_destroy_error("support", mw.destroy_support(support));
    }
}

fn report(step: ProvisionStep, source: MiddlewareError) -> ProvisionError {
    warn!("session create failed at {step}: {source}");
    ProvisionError { step, source }
}

fn log_destroy_error(entity: &str, result: Result<(), MiddlewareError>) {
    if let Err(e) = result {
        warn!("teardown: destroying {entity} failed: {e} (continuing)");
    }
}
