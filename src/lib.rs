//! Uroslink firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod fsm;
pub mod msg;
pub mod session;

pub mod pins;

// The ESP-IDF-facing modules build on the host as well; the device
// implementations are guarded by cfg attributes inside.
pub mod adapters;
pub mod reset;
pub mod transport;
pub mod watchdog;
