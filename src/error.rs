//! Unified error types for the agent link firmware.
//!
//! A single [`LinkError`] that every subsystem converts into keeps the
//! top-level loop's fatal/recoverable decision in one place.  All variants
//! are `Copy` so they pass through the state machine and event sink
//! without allocation.
//!
//! Severity lives on [`MiddlewareError`]: `Internal` return codes mean the
//! client runtime is in an undefined state and only a reboot recovers it;
//! `Unavailable` means the agent raced away mid-operation and a retry from
//! `WaitingForAgent` is enough.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level link error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// Session provisioning failed (carries the failing step).
    Provision(ProvisionError),
    /// Ethernet / micro-ROS transport bring-up failed.
    Transport(TransportError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl LinkError {
    /// Fatal errors require a device restart; recoverable ones are
    /// absorbed into a state transition.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Provision(e) => e.is_fatal(),
            Self::Transport(_) | Self::Config(_) => true,
        }
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provision(e) => write!(f, "provision: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Middleware errors
// ---------------------------------------------------------------------------

/// Outcome classification for micro-ROS client calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiddlewareError {
    /// The client library returned a non-OK code: its internal state can
    /// no longer be trusted.  Carries the raw `rcl_ret_t`.
    Internal(i32),
    /// The agent stopped answering mid-operation (timeout class).
    Unavailable,
}

impl MiddlewareError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

impl fmt::Display for MiddlewareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(rc) => write!(f, "internal client error (rc={rc})"),
            Self::Unavailable => write!(f, "agent unavailable"),
        }
    }
}

// ---------------------------------------------------------------------------
// Provisioning errors
// ---------------------------------------------------------------------------

/// The entity-creation step that failed, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    Support,
    Node,
    Executor,
    Subscription,
    Registration,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Support => write!(f, "support context"),
            Self::Node => write!(f, "node"),
            Self::Executor => write!(f, "executor"),
            Self::Subscription => write!(f, "subscription"),
            Self::Registration => write!(f, "executor registration"),
        }
    }
}

/// A failed [`Provisioner::create`](crate::session::Provisioner::create).
/// Partial entities have already been rolled back when this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionError {
    pub step: ProvisionStep,
    pub source: MiddlewareError,
}

impl ProvisionError {
    pub fn is_fatal(&self) -> bool {
        self.source.is_fatal()
    }
}

impl fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} init failed: {}", self.step, self.source)
    }
}

impl From<ProvisionError> for LinkError {
    fn from(e: ProvisionError) -> Self {
        Self::Provision(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Failures from the one-shot W5500 / netif bring-up at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The Ethernet driver or lwIP netif refused to come up (`esp_err_t`).
    Ethernet(i32),
    /// Static addressing could not be applied (`esp_err_t`).
    Addressing(i32),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ethernet(rc) => write!(f, "ethernet bring-up failed (rc={rc})"),
            Self::Addressing(rc) => write!(f, "static addressing failed (rc={rc})"),
        }
    }
}

impl From<TransportError> for LinkError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, LinkError>;
