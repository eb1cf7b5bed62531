//! Subweave - media tool provisioning and probing
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod probe;
pub mod state;
