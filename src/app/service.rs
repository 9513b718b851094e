//! Link service — the hexagonal core.
//!
//! [`LinkService`] owns the FSM, the session provisioner, and the shared
//! context.  It exposes a clean, middleware-agnostic API.  All I/O flows
//! through port traits injected at call sites, making the entire service
//! testable with mock adapters.
//!
//! ```text
//!  AgentPort ──────▶ ┌─────────────────────────┐ ──▶ EventSink
//!                    │       LinkService       │
//!  MiddlewarePort ◀──│  FSM · Provisioner      │ ──▶ MessageHandler
//!                    └─────────────────────────┘
//! ```
//!
//! Division of labour with the FSM: the service performs the middleware
//! work for the *current* state (probe, provision, dispatch, teardown),
//! records what happened in [`TickOutcomes`](crate::fsm::context::TickOutcomes),
//! and then lets the state handlers decide where to go.  Handlers never
//! call the middleware; the service never chooses transitions.

use log::{info, warn};

use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::fsm::context::{LinkContext, LinkStats, ProvisionOutcome};
use crate::fsm::states::build_state_table;
use crate::fsm::{ConnState, Fsm};
use crate::session::{Provisioner, Session};

use super::events::{LinkEvent, LinkTelemetry};
use super::ports::{AgentPort, EventSink, MessageHandler, MiddlewarePort};

// ───────────────────────────────────────────────────────────────
// LinkService
// ───────────────────────────────────────────────────────────────

/// Orchestrates the connection lifecycle against a [`MiddlewarePort`].
pub struct LinkService<M: MiddlewarePort> {
    fsm: Fsm,
    ctx: LinkContext,
    provisioner: Provisioner,
    /// Live session entities, held from successful provisioning until
    /// the teardown tick after a loss.
    session: Option<Session<M>>,
    heartbeat_counter: u32,
}

impl<M: MiddlewarePort> LinkService<M> {
    /// Construct the service from configuration.
    ///
    /// Does **not** start the FSM — call [`start`](Self::start) once the
    /// transport is up.
    pub fn new(config: LinkConfig) -> Self {
        let provisioner = Provisioner::new(&config);
        let ctx = LinkContext::new(config);
        let fsm = Fsm::new(build_state_table(), ConnState::Initializing);
        Self {
            fsm,
            ctx,
            provisioner,
            session: None,
            heartbeat_counter: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Mark the transport up and run the initial state's entry action.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.ctx.transport_ready = true;
        self.fsm.start(&mut self.ctx);
        sink.emit(&LinkEvent::Started(self.fsm.current_state()));
        info!("LinkService started in {:?}", self.fsm.current_state());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full link cycle: middleware work for the current state →
    /// FSM tick → events.
    ///
    /// Returns `Err` only for fatal middleware failures (internal RCL
    /// errors); the caller is expected to restart the device.  Everything
    /// recoverable (agent away, failed probe, failed dispatch pass) is
    /// absorbed into the lifecycle.
    pub fn tick(
        &mut self,
        mw: &mut M,
        handler: &mut impl MessageHandler,
        sink: &mut impl EventSink,
    ) -> crate::error::Result<()>
    where
        M: AgentPort,
    {
        let prev_state = self.fsm.current_state();
        self.ctx.begin_tick();

        // 1. Middleware work for the current state, recorded as outcomes.
        match prev_state {
            ConnState::Initializing => {}
            ConnState::WaitingForAgent => self.probe(mw),
            ConnState::Connecting => self.provision(mw, sink)?,
            ConnState::Connected => self.dispatch(mw, handler, sink),
            ConnState::Disconnected => self.teardown(mw),
        }

        // 2. FSM tick (pure transition logic)
        self.fsm.tick(&mut self.ctx);

        // 3. Emit state change if the FSM moved
        let new_state = self.fsm.current_state();
        if new_state != prev_state {
            sink.emit(&LinkEvent::StateChanged {
                from: prev_state,
                to: new_state,
            });
        }

        // 4. Periodic heartbeat
        self.heartbeat_counter += 1;
        if self.heartbeat_counter >= self.ctx.config.heartbeat_interval_ticks {
            self.heartbeat_counter = 0;
            sink.emit(&LinkEvent::Heartbeat(self.build_telemetry()));
        }

        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current lifecycle state.
    pub fn state(&self) -> ConnState {
        self.fsm.current_state()
    }

    /// Whether a session is currently provisioned.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Running counters since startup.
    pub fn stats(&self) -> &LinkStats {
        &self.ctx.stats
    }

    /// The live configuration.
    pub fn config(&self) -> &LinkConfig {
        &self.ctx.config
    }

    /// Build a telemetry snapshot from the current context.
    pub fn build_telemetry(&self) -> LinkTelemetry {
        LinkTelemetry {
            state: self.fsm.current_state(),
            total_ticks: self.ctx.total_ticks,
            ticks_in_state: self.fsm.ticks_in_current_state(),
            sessions_established: self.ctx.stats.sessions_established,
            probe_failures: self.ctx.stats.probe_failures,
            messages_delivered: self.ctx.stats.messages_delivered,
            dispatch_errors: self.ctx.stats.dispatch_errors,
            last_sample_len: self.ctx.stats.last_sample_len,
        }
    }

    // ── Internal per-state work ───────────────────────────────

    /// WaitingForAgent: one liveness probe per tick.
    fn probe(&mut self, mw: &mut M)
    where
        M: AgentPort,
    {
        let up = mw.ping(self.ctx.config.ping_timeout_ms, self.ctx.config.ping_attempts);
        if !up {
            self.ctx.stats.probe_failures += 1;
        }
        self.ctx.outcomes.agent_reachable = Some(up);
    }

    /// Connecting: one full provisioning attempt per tick.
    fn provision(&mut self, mw: &mut M, sink: &mut impl EventSink) -> crate::error::Result<()> {
        debug_assert!(self.session.is_none(), "provisioning over a live session");

        match self.provisioner.create(mw) {
            Ok(session) => {
                self.session = Some(session);
                self.ctx.outcomes.provision = Some(ProvisionOutcome::Established);
                Ok(())
            }
            Err(err) => {
                sink.emit(&LinkEvent::ProvisionFailed(err));
                if err.is_fatal() {
                    return Err(LinkError::Provision(err));
                }
                self.ctx.outcomes.provision = Some(ProvisionOutcome::Unavailable);
                Ok(())
            }
        }
    }

    /// Connected: liveness probe, then one bounded dispatch pass.
    fn dispatch(&mut self, mw: &mut M, handler: &mut impl MessageHandler, sink: &mut impl EventSink)
    where
        M: AgentPort,
    {
        let up = mw.ping(self.ctx.config.ping_timeout_ms, self.ctx.config.ping_attempts);
        self.ctx.outcomes.agent_reachable = Some(up);
        if !up {
            self.ctx.stats.probe_failures += 1;
            sink.emit(&LinkEvent::AgentLost {
                connected_ticks: self.fsm.ticks_in_current_state(),
            });
            return;
        }

        let Some(session) = self.session.as_mut() else {
            // Connected is only reachable through a successful provision.
            warn!("connected with no session, skipping dispatch");
            return;
        };

        match mw.spin_some(
            &mut session.executor,
            self.ctx.config.spin_budget_ms,
            &mut session.endpoint.rx,
        ) {
            Ok(true) => {
                self.ctx.stats.messages_delivered += 1;
                self.ctx.stats.last_sample_len = Some(session.endpoint.rx.len());
                handler.on_message(&session.endpoint.rx);
            }
            Ok(false) => {}
            Err(e) => {
                // A failed pass is not a lost link; the next probe decides that.
                self.ctx.stats.dispatch_errors += 1;
                warn!("dispatch pass failed: {e}");
            }
        }
    }

    /// Disconnected: tear the dead session down, once.
    fn teardown(&mut self, mw: &mut M) {
        if let Some(session) = self.session.take() {
            self.provisioner.destroy(mw, session);
        }
        self.ctx.outcomes.teardown_done = true;
    }
}
