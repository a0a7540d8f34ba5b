#![cfg_attr(not(test), no_std)]

//! pico_flashparam - Typed configuration parameters persisted to flash
//!
//! This library lays out typed parameters in a reserved window at the end of
//! the flash device, restores them at boot and persists them with a single
//! erase + program commit. Targets Raspberry Pi Pico 2 W (RP2350); host
//! builds use an in-memory flash device.

#[cfg(all(not(test), feature = "mock"))]
extern crate std;

// Logging macros (defmt on target, println in tests)
pub mod logging;

// Build-time defaults and store configuration
pub mod config;

// Platform abstraction layer (flash device, lockout)
pub mod platform;

// Parameter registry, flash store and orchestrator
pub mod parameters;

pub use config::{CounterPolicy, StoreConfig};
pub use parameters::{
    ConfigState, FlashParam, LayoutBuilder, Param, ParameterError, TextValue, CFG_ID_BASE,
};
