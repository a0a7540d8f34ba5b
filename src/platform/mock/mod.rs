//! Mock platform implementation for testing
//!
//! This module provides a mock flash device that can be used for unit
//! testing and host demos without requiring actual hardware.
//!
//! # Feature Gate
//!
//! This module is available in two contexts:
//! - During test builds (`#[cfg(test)]`)
//! - When the `mock` feature is enabled

#![cfg(any(test, feature = "mock"))]

mod flash;

pub use flash::{MockFlash, FLASH_CAPACITY, PAGE_SIZE, SECTOR_SIZE};
