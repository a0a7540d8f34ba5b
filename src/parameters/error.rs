//! Parameter error types
//!
//! Every variant is a programming error: a layout or access that can only be
//! wrong because the firmware was built wrong. Callers normally treat them as
//! fatal at declaration time.

/// Errors from parameter registry and orchestrator operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "pico2_w", derive(defmt::Format))]
pub enum ParameterError {
    /// Parameter id registered twice
    DuplicateId,
    /// No parameter with this id
    UnknownId,
    /// Accessed with a type other than the registered kind
    TypeMismatch,
    /// Parameter range does not fit in the flash region
    OutOfBounds,
    /// Slot size not valid for the kind
    InvalidSize,
    /// Registry capacity exhausted
    RegistryFull,
    /// Operation requires `initialize()` first
    NotInitialized,
}

impl core::fmt::Display for ParameterError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParameterError::DuplicateId => write!(f, "duplicate parameter id"),
            ParameterError::UnknownId => write!(f, "unknown parameter id"),
            ParameterError::TypeMismatch => write!(f, "parameter type mismatch"),
            ParameterError::OutOfBounds => write!(f, "parameter exceeds flash region"),
            ParameterError::InvalidSize => write!(f, "invalid parameter size"),
            ParameterError::RegistryFull => write!(f, "parameter registry full"),
            ParameterError::NotInitialized => write!(f, "parameters not initialized"),
        }
    }
}
