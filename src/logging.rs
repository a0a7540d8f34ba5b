//! Logging abstraction
//!
//! Provides unified logging macros that work across different targets:
//! - Embedded (pico2_w): Uses defmt
//! - Host tests and `mock` builds: Uses println!
//! - Other host builds: No-op (arguments are still type-checked)
//!
//! Format strings must stay compatible with both `defmt` and `core::fmt`,
//! so stick to plain `{}` placeholders.

/// Log informational message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "pico2_w")]
        ::defmt::info!($($arg)*);

        #[cfg(all(not(feature = "pico2_w"), any(test, feature = "mock")))]
        ::std::println!("[INFO] {}", ::std::format!($($arg)*));

        #[cfg(all(not(feature = "pico2_w"), not(test), not(feature = "mock")))]
        let _ = ::core::format_args!($($arg)*);
    }};
}

/// Log warning message
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "pico2_w")]
        ::defmt::warn!($($arg)*);

        #[cfg(all(not(feature = "pico2_w"), any(test, feature = "mock")))]
        ::std::println!("[WARN] {}", ::std::format!($($arg)*));

        #[cfg(all(not(feature = "pico2_w"), not(test), not(feature = "mock")))]
        let _ = ::core::format_args!($($arg)*);
    }};
}

/// Log error message
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "pico2_w")]
        ::defmt::error!($($arg)*);

        #[cfg(all(not(feature = "pico2_w"), any(test, feature = "mock")))]
        ::std::eprintln!("[ERROR] {}", ::std::format!($($arg)*));

        #[cfg(all(not(feature = "pico2_w"), not(test), not(feature = "mock")))]
        let _ = ::core::format_args!($($arg)*);
    }};
}

/// Log debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "pico2_w")]
        ::defmt::debug!($($arg)*);

        #[cfg(all(not(feature = "pico2_w"), any(test, feature = "mock")))]
        ::std::println!("[DEBUG] {}", ::std::format!($($arg)*));

        #[cfg(all(not(feature = "pico2_w"), not(test), not(feature = "mock")))]
        let _ = ::core::format_args!($($arg)*);
    }};
}

/// Log trace message
#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "pico2_w")]
        ::defmt::trace!($($arg)*);

        #[cfg(all(not(feature = "pico2_w"), any(test, feature = "mock")))]
        ::std::println!("[TRACE] {}", ::std::format!($($arg)*));

        #[cfg(all(not(feature = "pico2_w"), not(test), not(feature = "mock")))]
        let _ = ::core::format_args!($($arg)*);
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_macros_accept_borrowed_arguments() {
        let name = "CFG_RATE";
        let offset = 0x10u32;
        let err = crate::platform::FlashError::Busy;
        crate::log_info!("{} at {:#x}", name, offset);
        crate::log_warn!("skipped {}", name);
        crate::log_error!("failed: {}", err);
        crate::log_debug!("offset {}", offset);
        crate::log_trace!("done");
    }
}
