//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern ported to Rust:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  StateTable                                                   │
//! │  ┌─────────────────┬───────────┬──────────┬──────────────────┐│
//! │  │ ConnState       │ on_enter  │ on_exit  │ on_update        ││
//! │  ├─────────────────┼───────────┼──────────┼──────────────────┤│
//! │  │ Initializing    │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<>││
//! │  │ WaitingForAgent │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<>││
//! │  │ Connecting      │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<>││
//! │  │ Connected       │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<>││
//! │  │ Disconnected    │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<>││
//! │  └─────────────────┴───────────┴──────────┴──────────────────┘│
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.  If
//! it returns `Some(next_id)`, the engine checks the transition against
//! the legality table, runs `on_exit` for the current state, then
//! `on_enter` for the next, and updates the current pointer.  A requested
//! transition that is not in the table is refused and logged — handlers
//! cannot invent edges the lifecycle does not have.

pub mod context;
pub mod states;

use context::LinkContext;
use log::{error, info};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all connection lifecycle states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnState {
    Initializing = 0,
    WaitingForAgent = 1,
    Connecting = 2,
    Connected = 3,
    Disconnected = 4,
}

impl ConnState {
    /// Total number of states — used to size the table array.
    pub const COUNT: usize = 5;

    /// Convert a `u8` index back to `ConnState`.  Panics on out-of-range
    /// in debug builds; returns `Disconnected` in release (the teardown
    /// path is the safe fallback).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Initializing,
            1 => Self::WaitingForAgent,
            2 => Self::Connecting,
            3 => Self::Connected,
            4 => Self::Disconnected,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Disconnected
            }
        }
    }
}

/// The lifecycle edge table.  Self-transitions are implicit (a handler
/// stays by returning `None`); everything else must be listed here.
pub fn is_legal_transition(from: ConnState, to: ConnState) -> bool {
    use ConnState::{Connected, Connecting, Disconnected, Initializing, WaitingForAgent};
    from == to
        || matches!(
            (from, to),
            (Initializing, WaitingForAgent)
                | (WaitingForAgent, Connecting)
                | (Connecting, Connected)
                | (Connecting, WaitingForAgent)
                | (Connected, Disconnected)
                | (Disconnected, WaitingForAgent)
        )
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition.
pub type StateActionFn = fn(&mut LinkContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to request a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut LinkContext) -> Option<ConnState>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
/// Stored in a fixed-size array — no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: ConnState,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
///
/// Owns the state table (array of [`StateDescriptor`]) and advances a
/// [`LinkContext`] that is threaded through every handler call.
pub struct Fsm {
    /// Fixed-size table indexed by `ConnState as usize`.
    table: [StateDescriptor; ConnState::COUNT],
    /// Index of the currently active state.
    current: usize,
    /// Monotonically increasing tick counter (wraps at u64::MAX).
    tick_count: u64,
    /// Tick at which the current state was entered.
    state_entry_tick: u64,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; ConnState::COUNT], initial: ConnState) -> Self {
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut LinkContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick.
    ///
    /// 1. Call `on_update` for the current state.
    /// 2. If it returns `Some(next)`, execute the transition:
    ///    legality check → `on_exit(current)` → update pointer →
    ///    `on_enter(next)`.
    /// 3. At most one transition happens per tick.
    pub fn tick(&mut self, ctx: &mut LinkContext) {
        self.tick_count += 1;
        ctx.ticks_in_state = self.tick_count - self.state_entry_tick;
        ctx.total_ticks = self.tick_count;

        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// The current state's identity.
    pub fn current_state(&self) -> ConnState {
        ConnState::from_index(self.current)
    }

    /// How many ticks the FSM has been in the current state.
    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: ConnState, ctx: &mut LinkContext) {
        let from = ConnState::from_index(self.current);
        if next_id == from {
            return;
        }
        if !is_legal_transition(from, next_id) {
            error!(
                "FSM refused illegal transition: {} -> {}",
                self.table[self.current].name, self.table[next_id as usize].name
            );
            return;
        }

        let next_idx = next_id as usize;
        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        // Exit current state
        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        // Update pointer and timing
        self.current = next_idx;
        self.state_entry_tick = self.tick_count;
        ctx.ticks_in_state = 0;

        // Enter new state
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
