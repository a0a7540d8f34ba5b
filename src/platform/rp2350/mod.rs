//! RP2350 platform implementation for Raspberry Pi Pico 2 W
//!
//! Provides the flash device backing the parameter region, using ROM
//! routines from `rp235x-hal` and a multicore lockout for commits.
//!
//! # Feature Gate
//!
//! This module is only available when the `pico2_w` feature is enabled:
//!
//! ```toml
//! [dependencies]
//! pico_flashparam = { version = "0.1", features = ["pico2_w"] }
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pico_flashparam::platform::rp2350::Rp2350Flash;
//! use pico_flashparam::{FlashParam, LayoutBuilder, StoreConfig, CFG_ID_BASE};
//!
//! let mut layout = LayoutBuilder::new();
//! let rate = layout.declare(CFG_ID_BASE, "CFG_RATE", 7u32);
//!
//! let mut config = FlashParam::new(Rp2350Flash::new(), StoreConfig::default(), &layout).unwrap();
//! config.initialize();
//! ```

mod flash;
pub mod lockout;

pub use flash::Rp2350Flash;
pub use lockout::{park_if_requested, register_victim};
