//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements       | Connects to                      |
//! |------------|------------------|----------------------------------|
//! | `log_sink` | EventSink        | Serial log output                |
//! |            | MessageHandler   | Axis sample report logging       |
//! | `microros` | AgentPort        | rmw agent liveness ping          |
//! |            | MiddlewarePort   | rclc entity lifecycle + executor |
//! | `time`     | —                | ESP32 high-resolution timer      |
//!
//! `microros` is split by target: on `espidf` it drives the real RCL
//! bindings, everywhere else it is an in-memory simulator with scriptable
//! failures so the whole lifecycle runs on the host.

pub mod log_sink;
pub mod microros;
pub mod time;
