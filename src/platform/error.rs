//! Platform error types
//!
//! This module defines error types for platform operations.

use crate::parameters::ParameterError;
use core::fmt;

/// Result type for platform operations
pub type Result<T> = core::result::Result<T, PlatformError>;

/// Platform-level errors
///
/// All platform implementations map their HAL-specific errors to these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "pico2_w", derive(defmt::Format))]
pub enum PlatformError {
    /// Flash operation failed
    Flash(FlashError),
    /// Parameter layout or access error surfaced through a platform call
    Parameter(ParameterError),
    /// Invalid configuration provided
    InvalidConfig,
}

/// Flash-specific errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "pico2_w", derive(defmt::Format))]
pub enum FlashError {
    /// Read operation failed
    ReadFailed,
    /// Invalid address (out of bounds)
    InvalidAddress,
    /// Exclusive access to the flash bus could not be obtained in time
    Busy,
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::Flash(e) => write!(f, "Flash error: {}", e),
            PlatformError::Parameter(e) => write!(f, "Parameter error: {}", e),
            PlatformError::InvalidConfig => write!(f, "Invalid configuration"),
        }
    }
}

impl fmt::Display for FlashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlashError::ReadFailed => write!(f, "read failed"),
            FlashError::InvalidAddress => write!(f, "address out of range"),
            FlashError::Busy => write!(f, "flash bus busy (lockout timed out)"),
        }
    }
}

// From implementations for error conversion
impl From<FlashError> for PlatformError {
    fn from(error: FlashError) -> Self {
        PlatformError::Flash(error)
    }
}

impl From<ParameterError> for PlatformError {
    fn from(error: ParameterError) -> Self {
        PlatformError::Parameter(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_error_conversion() {
        let err: PlatformError = FlashError::Busy.into();
        assert_eq!(err, PlatformError::Flash(FlashError::Busy));
    }

    #[test]
    fn test_parameter_error_conversion() {
        let err: PlatformError = ParameterError::UnknownId.into();
        assert_eq!(err, PlatformError::Parameter(ParameterError::UnknownId));
    }

    #[test]
    fn test_display() {
        let err = PlatformError::Flash(FlashError::Busy);
        assert_eq!(
            format!("{}", err),
            "Flash error: flash bus busy (lockout timed out)"
        );
    }

    #[test]
    fn test_flash_error_display() {
        assert_eq!(FlashError::ReadFailed.to_string(), "read failed");
        assert_eq!(FlashError::InvalidAddress.to_string(), "address out of range");
    }
}
