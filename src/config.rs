//! Store configuration
//!
//! Compile-time defaults come from `build.rs`, which exports the
//! `FLASHPARAM_REQ_SIZE` and `FLASHPARAM_COMMIT_TIMEOUT_MS` environment
//! variables (defaults 1024 bytes and 100 ms).

/// Requested parameter region size in bytes (from build-time environment variable)
pub const DEFAULT_REQUESTED_SIZE: u32 = {
    const S: &str = env!("FLASHPARAM_REQ_SIZE");
    const_parse_u32(S, 1024)
};

/// Bounded wait for exclusive flash access in milliseconds
pub const DEFAULT_COMMIT_TIMEOUT_MS: u32 = {
    const S: &str = env!("FLASHPARAM_COMMIT_TIMEOUT_MS");
    const_parse_u32(S, 100)
};

/// Parse a decimal u32 at compile time
///
/// Returns `fallback` on an empty string, a non-digit, or overflow.
const fn const_parse_u32(s: &str, fallback: u32) -> u32 {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return fallback;
    }

    let mut value: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] < b'0' || bytes[i] > b'9' {
            return fallback;
        }
        value = match value.checked_mul(10) {
            Some(v) => match v.checked_add((bytes[i] - b'0') as u32) {
                Some(v) => v,
                None => return fallback,
            },
            None => return fallback,
        };
        i += 1;
    }
    value
}

/// What happens to the store counter when the persisted layout is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "pico2_w", derive(defmt::Format))]
pub enum CounterPolicy {
    /// Restart counting from zero
    #[default]
    Discard,
    /// Keep the count found in flash
    Preserve,
}

/// Flash parameter store configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "pico2_w", derive(defmt::Format))]
pub struct StoreConfig {
    /// Requested region size in bytes, before page/sector rounding
    pub requested_size: u32,
    /// Bounded wait for exclusive flash access during commit
    pub commit_timeout_ms: u32,
    /// Counter handling on layout mismatch
    pub counter_policy: CounterPolicy,
}

impl StoreConfig {
    /// Set the requested region size
    pub const fn with_requested_size(mut self, requested_size: u32) -> Self {
        self.requested_size = requested_size;
        self
    }

    /// Set the commit timeout
    pub const fn with_commit_timeout_ms(mut self, commit_timeout_ms: u32) -> Self {
        self.commit_timeout_ms = commit_timeout_ms;
        self
    }

    /// Set the counter policy used on layout mismatch
    pub const fn with_counter_policy(mut self, counter_policy: CounterPolicy) -> Self {
        self.counter_policy = counter_policy;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            requested_size: DEFAULT_REQUESTED_SIZE,
            commit_timeout_ms: DEFAULT_COMMIT_TIMEOUT_MS,
            counter_policy: CounterPolicy::Discard,
        }
    }
}
