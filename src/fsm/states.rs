//! Concrete state handler functions and table builder.
//!
//! Each state is defined by three plain `fn` pointers — no closures, no
//! dynamic dispatch, no heap.  This is the classic embedded C FSM pattern
//! expressed in safe Rust.
//!
//! ```text
//!  INITIALIZING ──[transport up]──▶ WAITING ──[agent answers ping]──▶ CONNECTING
//!                                     ▲  ▲                                │
//!                                     │  └───────[create failed]──────────┤
//!                                     │                                   │
//!                              [teardown done]                      [established]
//!                                     │                                   │
//!                                     │                                   ▼
//!                                DISCONNECTED ◀────[ping lost]────── CONNECTED
//! ```
//!
//! Handlers read the per-tick [`TickOutcomes`](super::context::TickOutcomes)
//! the service recorded before the tick and only decide *where to go next*.
//! They never touch the middleware themselves — all RCL calls happen in the
//! service layer, keyed off the state the engine lands in.

use super::context::{LinkContext, ProvisionOutcome};
use super::{ConnState, StateDescriptor};
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; ConnState::COUNT] {
    [
        // Index 0 — Initializing
        StateDescriptor {
            id: ConnState::Initializing,
            name: "Initializing",
            on_enter: None,
            on_exit: None,
            on_update: initializing_update,
        },
        // Index 1 — WaitingForAgent
        StateDescriptor {
            id: ConnState::WaitingForAgent,
            name: "WaitingForAgent",
            on_enter: Some(waiting_enter),
            on_exit: None,
            on_update: waiting_update,
        },
        // Index 2 — Connecting
        StateDescriptor {
            id: ConnState::Connecting,
            name: "Connecting",
            on_enter: Some(connecting_enter),
            on_exit: None,
            on_update: connecting_update,
        },
        // Index 3 — Connected
        StateDescriptor {
            id: ConnState::Connected,
            name: "Connected",
            on_enter: Some(connected_enter),
            on_exit: None,
            on_update: connected_update,
        },
        // Index 4 — Disconnected
        StateDescriptor {
            id: ConnState::Disconnected,
            name: "Disconnected",
            on_enter: Some(disconnected_enter),
            on_exit: None,
            on_update: disconnected_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  INITIALIZING state — transport bring-up in progress
// ═══════════════════════════════════════════════════════════════════════════

fn initializing_update(ctx: &mut LinkContext) -> Option<ConnState> {
    if ctx.transport_ready {
        return Some(ConnState::WaitingForAgent);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  WAITING_FOR_AGENT state — probing until the agent answers
// ═══════════════════════════════════════════════════════════════════════════

fn waiting_enter(ctx: &mut LinkContext) {
    info!(
        "WAITING: probing for agent ({}ms x{} per tick)",
        ctx.config.ping_timeout_ms, ctx.config.ping_attempts
    );
}

fn waiting_update(ctx: &mut LinkContext) -> Option<ConnState> {
    match ctx.outcomes.agent_reachable {
        Some(true) => {
            info!("WAITING: agent answered, provisioning session");
            Some(ConnState::Connecting)
        }
        Some(false) => {
            // Keep quiet on most misses; the agent can be down for hours.
            if ctx.ticks_in_state % 10 == 1 {
                info!(
                    "WAITING: agent unreachable ({} failed probes so far)",
                    ctx.stats.probe_failures
                );
            }
            None
        }
        None => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONNECTING state — session entities being created
// ═══════════════════════════════════════════════════════════════════════════

fn connecting_enter(_ctx: &mut LinkContext) {
    info!("CONNECTING: creating middleware session entities");
}

fn connecting_update(ctx: &mut LinkContext) -> Option<ConnState> {
    match ctx.outcomes.provision {
        Some(ProvisionOutcome::Established) => Some(ConnState::Connected),
        Some(ProvisionOutcome::Unavailable) => {
            warn!("CONNECTING: session create failed, agent unavailable — will re-probe");
            Some(ConnState::WaitingForAgent)
        }
        None => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONNECTED state — session live, executor dispatching
// ═══════════════════════════════════════════════════════════════════════════

fn connected_enter(ctx: &mut LinkContext) {
    ctx.stats.sessions_established += 1;
    info!(
        "CONNECTED: session #{} up, subscribed to '{}'",
        ctx.stats.sessions_established, ctx.config.topic
    );
}

fn connected_update(ctx: &mut LinkContext) -> Option<ConnState> {
    if ctx.outcomes.agent_reachable == Some(false) {
        warn!("CONNECTED: agent stopped answering pings");
        return Some(ConnState::Disconnected);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  DISCONNECTED state — tearing down the dead session
// ═══════════════════════════════════════════════════════════════════════════

fn disconnected_enter(_ctx: &mut LinkContext) {
    warn!("DISCONNECTED: tearing down session entities");
}

fn disconnected_update(ctx: &mut LinkContext) -> Option<ConnState> {
    if ctx.outcomes.teardown_done {
        return Some(ConnState::WaitingForAgent);
    }
    None
}
