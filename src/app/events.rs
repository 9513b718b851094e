//! Outbound application events.
//!
//! The [`LinkService`](super::service::LinkService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other side
//! decide what to do with them — log to serial, feed a dashboard, record
//! them in a test.

use crate::error::ProvisionError;
use crate::fsm::ConnState;

/// Structured events emitted by the connection lifecycle core.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// The link service has started (carries initial state).
    Started(ConnState),

    /// The FSM transitioned between states.
    StateChanged { from: ConnState, to: ConnState },

    /// The agent stopped answering liveness probes while connected.
    AgentLost { connected_ticks: u64 },

    /// Session provisioning failed and was rolled back.
    ProvisionFailed(ProvisionError),

    /// Periodic health snapshot.
    Heartbeat(LinkTelemetry),
}

/// A point-in-time link health snapshot suitable for logging or transmission.
#[derive(Debug, Clone)]
pub struct LinkTelemetry {
    pub state: ConnState,
    pub total_ticks: u64,
    pub ticks_in_state: u64,
    pub sessions_established: u32,
    pub probe_failures: u32,
    pub messages_delivered: u32,
    pub dispatch_errors: u32,
    pub last_sample_len: Option<usize>,
}
