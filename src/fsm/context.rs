//! Shared mutable context threaded through every FSM handler.
//!
//! `LinkContext` is the single struct that state handlers read from and
//! write to.  The service performs all port I/O for the current tick
//! *before* the FSM runs and records what happened in [`TickOutcomes`];
//! the handlers are pure functions over that record.  Think of it as the
//! "blackboard" in a blackboard architecture.

use crate::config::LinkConfig;

// ---------------------------------------------------------------------------
// Per-tick outcomes (written by the service; read-only to state handlers)
// ---------------------------------------------------------------------------

/// Result of this tick's provisioning attempt, when one ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// All entities created; the service now owns a session.
    Established,
    /// The agent raced away mid-create; partial entities were rolled back.
    Unavailable,
}

/// What the service observed at its ports during the current tick.
/// Reset at the start of every tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickOutcomes {
    /// Result of this tick's agent reachability probe, if one ran.
    pub agent_reachable: Option<bool>,
    /// Result of this tick's provisioning attempt, if one ran.
    pub provision: Option<ProvisionOutcome>,
    /// Session teardown ran this tick (always completes, best-effort).
    pub teardown_done: bool,
}

// ---------------------------------------------------------------------------
// Running counters
// ---------------------------------------------------------------------------

/// Monotonic counters since boot; snapshotted into heartbeat telemetry.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkStats {
    /// Sessions fully provisioned (increments on every entry to Connected).
    pub sessions_established: u32,
    /// Failed reachability probes.
    pub probe_failures: u32,
    /// Samples handed to the message callback.
    pub messages_delivered: u32,
    /// Executor dispatch passes that returned an error (soft failures).
    pub dispatch_errors: u32,
    /// Axis count of the most recent delivered sample.
    pub last_sample_len: Option<usize>,
}

// ---------------------------------------------------------------------------
// LinkContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct LinkContext {
    // -- Timing --
    /// Ticks elapsed since the current state was entered.
    pub ticks_in_state: u64,
    /// Monotonic total tick count.
    pub total_ticks: u64,

    // -- Boot --
    /// Transport bring-up finished (sticky; set once at service start).
    pub transport_ready: bool,

    // -- Per-tick I/O record --
    /// Port outcomes for the current tick.  Updated before each FSM tick.
    pub outcomes: TickOutcomes,

    // -- Counters --
    pub stats: LinkStats,

    // -- Configuration --
    pub config: LinkConfig,
}

impl LinkContext {
    /// Create a new context with the given configuration.
    pub fn new(config: LinkConfig) -> Self {
        Self {
            ticks_in_state: 0,
            total_ticks: 0,
            transport_ready: false,
            outcomes: TickOutcomes::default(),
            stats: LinkStats::default(),
            config,
        }
    }

    /// Clear the per-tick outcome record.  Called by the service at the
    /// top of every tick, before any port I/O.
    pub fn begin_tick(&mut self) {
        self.outcomes = TickOutcomes::default();
    }
}
