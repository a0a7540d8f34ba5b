//! Flash-backed parameter system
//!
//! Typed parameters are declared once, laid out back to back in a reserved
//! flash window, and restored at boot when the persisted layout matches.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │        FlashParam (manager)             │
//! │  - initialize / finalize state machine  │
//! │  - built-in fingerprint + store counter │
//! └──────────────┬─────────────────────────┘
//!                │
//!        ┌───────┴────────┐
//!        ▼                ▼
//! ┌──────────────┐ ┌──────────────────────┐
//! │  Registry    │ │  FlashStore          │
//! │  - offsets   │ │  - read view         │
//! │  - typed get │ │  - staging buffer    │
//! │  - fingerpr. │ │  - erase + program   │
//! └──────────────┘ └──────────┬───────────┘
//!                             ▼
//!                ┌────────────────────────┐
//!                │    Flash Interface      │
//!                └────────────────────────┘
//! ```
//!
//! # Parameter Types
//!
//! `bool`, `u8`..`u64`, `i8`..`i64`, `f32`, `f64` at their natural width,
//! and [`TextValue`] in a slot of 1 to [`MAX_TEXT_LEN`] bytes.

pub mod error;
pub mod manager;
pub mod registry;
pub mod store;
pub mod value;

pub use error::ParameterError;
pub use manager::{ConfigState, FlashParam, CFG_ID_BASE, CFG_MAP_HASH, CFG_STORE_COUNT};
pub use registry::{Descriptor, LayoutBuilder, Param, ParamInfo, ParameterRegistry, MAX_PARAMS};
pub use store::{FlashStore, RegionGeometry, MAX_REGION_SIZE};
pub use value::{FlashValue, ParamKind, ParamValue, ScalarValue, TextValue, MAX_TEXT_LEN};
