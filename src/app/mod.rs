//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the business rules for the link: lifecycle FSM
//! orchestration, session provisioning, and bounded message dispatch.
//! All interaction with the middleware happens through **port traits**
//! defined in [`ports`], keeping this layer fully testable without an
//! agent, a network, or the RCL libraries.

pub mod events;
pub mod ports;
pub mod service;
