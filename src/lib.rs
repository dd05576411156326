//! Filament dryer firmware library.
//!
//! Exposes the pure-logic modules for integration testing and host-side
//! simulation.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod control;
pub mod fsm;
pub mod safety;

pub mod error;
pub mod pins;

// Hardware-facing modules carry host simulation stubs so the crate
// compiles and tests off-target.
pub mod adapters;
pub mod drivers;
pub mod sensors;
