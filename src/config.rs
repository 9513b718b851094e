//! Link configuration parameters
//!
//! All tunable parameters for the agent link: node identity, probe and
//! dispatch timing, and the wired-network addressing handed to the
//! transport at boot.  Values are fixed at compile time via [`Default`];
//! the serde derives keep them readable/overridable in bench setups.

use serde::{Deserialize, Serialize};

use crate::error::LinkError;

/// Upper bound for node and topic names (micro-ROS keeps these short).
pub const NAME_MAX: usize = 32;

/// Core link configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    // --- Identity ---
    /// Node name registered with the agent.
    pub node_name: heapless::String<NAME_MAX>,
    /// Topic the subscription endpoint listens on.
    pub topic: heapless::String<NAME_MAX>,

    // --- Entities ---
    /// Executor handle budget (subscriptions + timers it can service).
    pub executor_max_handles: usize,

    // --- Timing ---
    /// Control tick interval (milliseconds); also the retry interval.
    pub tick_interval_ms: u32,
    /// Per-attempt agent probe timeout (milliseconds).
    pub ping_timeout_ms: u32,
    /// Probe attempts per reachability check.
    pub ping_attempts: u8,
    /// Upper bound for one executor dispatch pass (milliseconds).
    pub spin_budget_ms: u32,
    /// Ticks between telemetry heartbeats.
    pub heartbeat_interval_ticks: u32,

    // --- Recovery ---
    /// Settle delay after transport bring-up before the first probe
    /// (milliseconds) — the W5500 PHY needs link-up time.
    pub boot_settle_ms: u32,
    /// Cooldown before restarting on a fatal error (milliseconds).
    pub restart_cooldown_ms: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            // Identity
            node_name: fixed_name("ControllerESP"),
            topic: fixed_name("Joy"),

            // Entities
            executor_max_handles: 10,

            // Timing
            tick_interval_ms: 1000,     // 1 Hz
            ping_timeout_ms: 200,
            ping_attempts: 3,
            spin_budget_ms: 100,
            heartbeat_interval_ticks: 10,

            // Recovery
            boot_settle_ms: 2000,
            restart_cooldown_ms: 2000,
        }
    }
}

impl LinkConfig {
    /// Range-check every field.  Called once at boot; a failure here is a
    /// build/configuration defect, not a runtime condition.
    pub fn validate(&self) -> Result<(), LinkError> {
        if self.node_name.is_empty() {
            return Err(LinkError::Config("node_name must not be empty"));
        }
        if self.topic.is_empty() {
            return Err(LinkError::Config("topic must not be empty"));
        }
        if self.executor_max_handles == 0 {
            return Err(LinkError::Config("executor_max_handles must be >= 1"));
        }
        if self.tick_interval_ms == 0 {
            return Err(LinkError::Config("tick_interval_ms must be > 0"));
        }
        if self.ping_timeout_ms == 0 || self.ping_attempts == 0 {
            return Err(LinkError::Config("probe timeout and attempts must be > 0"));
        }
        if self.spin_budget_ms == 0 || self.spin_budget_ms > self.tick_interval_ms {
            return Err(LinkError::Config(
                "spin_budget_ms must fit inside one tick interval",
            ));
        }
        if self.heartbeat_interval_ticks == 0 {
            return Err(LinkError::Config("heartbeat_interval_ticks must be >= 1"));
        }
        Ok(())
    }
}

/// Wired-network addressing for the W5500 transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetConfig {
    /// MAC address programmed into the W5500 (must be unique per board).
    pub mac: [u8; 6],
    /// Static IP of this device.
    pub ip: [u8; 4],
    /// Subnet mask.
    pub netmask: [u8; 4],
    /// Default gateway.
    pub gateway: [u8; 4],
    /// DNS server.
    pub dns: [u8; 4],
    /// IP of the micro-ROS agent.
    pub agent_ip: [u8; 4],
    /// UDP port the agent listens on.
    pub agent_port: u16,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            mac: [0xDE, 0xAD, 0xAF, 0x91, 0x3E, 0x69],
            ip: [192, 168, 0, 12],
            netmask: [255, 255, 255, 0],
            gateway: [192, 168, 0, 1],
            dns: [192, 168, 0, 1],
            agent_ip: [192, 168, 0, 80],
            agent_port: 8888,
        }
    }
}

/// Dotted-quad rendering for logs and the rmw address options.
pub fn format_ip(ip: [u8; 4]) -> heapless::String<16> {
    let mut out = heapless::String::new();
    // 16 bytes always fit "255.255.255.255".
    let _ = core::fmt::write(
        &mut out,
        format_args!("{}.{}.{}.{}", ip[0], ip[1], ip[2], ip[3]),
    );
    out
}

/// Build a bounded name from a compile-time constant.
fn fixed_name(s: &str) -> heapless::String<NAME_MAX> {
    debug_assert!(s.len() <= NAME_MAX);
    let mut out = heapless::String::new();
    let _ = out.push_str(s);
    out
}
