//! Config orchestrator
//!
//! Sequences startup restore and shutdown persist around two built-in
//! parameters that every layout starts with:
//!
//! ```text
//! offset 0  CFG_MAP_HASH     u32  layout fingerprint of the writer
//! offset 4  CFG_STORE_COUNT  u32  number of successful persists
//! offset 8  application parameters in declaration order
//! ```
//!
//! # State Machine
//!
//! ```text
//! Uninitialized -> DefaultsLoaded -> BlankMedia     -> Persisted
//!                                 -> LayoutMismatch -> Persisted
//!                                 -> Restored       -> Persisted
//! ```

use super::error::ParameterError;
use super::registry::{LayoutBuilder, Param, ParameterRegistry};
use super::store::FlashStore;
use super::value::{FlashValue, ParamValue};
use crate::config::{CounterPolicy, StoreConfig};
use crate::platform::{FlashError, FlashInterface, Result};
use core::fmt;
use core::fmt::Write;

/// Built-in: layout fingerprint of the persisted image
pub const CFG_MAP_HASH: Param<u32> = Param::new(0);

/// Built-in: number of successful persists
pub const CFG_STORE_COUNT: Param<u32> = Param::new(1);

/// First id available to application parameters
pub const CFG_ID_BASE: u32 = 2;

/// Flash offset of the fingerprint word
const MAP_HASH_OFFSET: u32 = 0;

/// Flash offset of the store counter word
const STORE_COUNT_OFFSET: u32 = 4;

/// Raw counter value of never-programmed flash
pub const BLANK_WORD: u32 = 0xFFFF_FFFF;

/// Orchestrator lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "pico2_w", derive(defmt::Format))]
pub enum ConfigState {
    /// `initialize()` not called yet
    Uninitialized,
    /// Defaults applied, flash not inspected yet
    DefaultsLoaded,
    /// Flash never programmed; running on defaults
    BlankMedia,
    /// Flash written by a different layout; running on defaults
    LayoutMismatch,
    /// Values adopted from flash
    Restored,
    /// Values committed by `finalize()`
    Persisted,
}

impl ConfigState {
    /// Check if parameters may be used and persisted
    pub fn is_ready(self) -> bool {
        matches!(
            self,
            ConfigState::BlankMedia | ConfigState::LayoutMismatch | ConfigState::Restored
        )
    }
}

impl fmt::Display for ConfigState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigState::Uninitialized => "uninitialized",
            ConfigState::DefaultsLoaded => "defaults loaded",
            ConfigState::BlankMedia => "blank media",
            ConfigState::LayoutMismatch => "layout mismatch",
            ConfigState::Restored => "restored",
            ConfigState::Persisted => "persisted",
        };
        f.write_str(name)
    }
}

/// Next store counter value, skipping the blank sentinel
fn next_store_count(count: u32) -> u32 {
    match count.wrapping_add(1) {
        BLANK_WORD => 0,
        next => next,
    }
}

/// Flash-backed typed configuration
///
/// Owns the parameter registry and the flash store. Build the application
/// layout with a [`LayoutBuilder`], then call [`initialize`](Self::initialize)
/// at boot and [`finalize`](Self::finalize) to persist.
///
/// ```ignore
/// let mut layout = LayoutBuilder::new();
/// let rate = layout.declare(CFG_ID_BASE, "CFG_RATE", 7u32);
///
/// let mut config = FlashParam::new(flash, StoreConfig::default(), &layout)?;
/// config.initialize();
/// config.set(rate, 42)?;
/// config.finalize()?;
/// ```
pub struct FlashParam<F: FlashInterface> {
    registry: ParameterRegistry,
    store: FlashStore<F>,
    state: ConfigState,
    counter_policy: CounterPolicy,
}

impl<F: FlashInterface> FlashParam<F> {
    /// Create the orchestrator
    ///
    /// Registers the built-ins first, then every declaration of `layout` in
    /// order.
    ///
    /// # Errors
    ///
    /// - `PlatformError::InvalidConfig` if the region geometry is invalid
    /// - `PlatformError::Parameter` if the layout does not fit or repeats an id
    pub fn new(flash: F, config: StoreConfig, layout: &LayoutBuilder) -> Result<Self> {
        let store = FlashStore::new(flash, config.requested_size, config.commit_timeout_ms)?;

        let mut registry = ParameterRegistry::new(store.geometry().program_size);
        registry.register(CFG_MAP_HASH.id(), "CFG_MAP_HASH", 4, ParamValue::U32(0))?;
        registry.register(CFG_STORE_COUNT.id(), "CFG_STORE_COUNT", 4, ParamValue::U32(0))?;
        layout.build_into(&mut registry)?;

        crate::log_debug!(
            "layout: {} parameters, {} bytes, fingerprint {:#x}",
            registry.len(),
            registry.next_offset(),
            registry.fingerprint()
        );

        Ok(Self {
            registry,
            store,
            state: ConfigState::Uninitialized,
            counter_policy: config.counter_policy,
        })
    }

    /// Restore parameters from flash
    ///
    /// Defaults are applied first. Persisted values are adopted only if the
    /// flash has been programmed and its fingerprint matches this layout.
    pub fn initialize(&mut self) -> ConfigState {
        self.registry.load_defaults();
        self.state = ConfigState::DefaultsLoaded;

        let state = match self.store.read_u32(STORE_COUNT_OFFSET) {
            None => {
                crate::log_warn!("store counter unreadable, treating flash as blank");
                ConfigState::BlankMedia
            }
            Some(BLANK_WORD) => ConfigState::BlankMedia,
            Some(count) => {
                let persisted = self.store.read_u32(MAP_HASH_OFFSET);
                if persisted == Some(self.registry.fingerprint()) {
                    self.registry.load_from_store(&mut self.store);
                    ConfigState::Restored
                } else {
                    if self.counter_policy == CounterPolicy::Preserve {
                        self.set_store_count(count);
                    }
                    ConfigState::LayoutMismatch
                }
            }
        };

        self.state = state;
        crate::log_info!("config {} (store count {})", state, self.store_count());
        state
    }

    /// Persist every current value
    ///
    /// Stamps the layout fingerprint, bumps the store counter, stages every
    /// parameter and commits once. On failure the counter and the state are
    /// left as they were, so the call can be retried.
    ///
    /// # Errors
    ///
    /// - `ParameterError::NotInitialized` before `initialize()`
    /// - `FlashError::Busy` if exclusive flash access timed out
    /// - any error reported by the flash device
    pub fn finalize(&mut self) -> Result<()> {
        if !self.state.is_ready() && self.state != ConfigState::Persisted {
            return Err(ParameterError::NotInitialized.into());
        }

        let fingerprint = self.registry.fingerprint();
        let previous_count = self.store_count();
        self.registry.write(CFG_MAP_HASH, fingerprint)?;
        self.registry.write(CFG_STORE_COUNT, next_store_count(previous_count))?;
        self.registry.stage_to_store(&mut self.store);

        match self.store.commit() {
            Ok(()) => {
                self.state = ConfigState::Persisted;
                crate::log_info!("config persisted (store count {})", self.store_count());
                Ok(())
            }
            Err(e) => {
                self.set_store_count(previous_count);
                Err(e)
            }
        }
    }

    /// Reload every default at runtime
    ///
    /// With `CounterPolicy::Preserve` the store counter keeps its value.
    /// The lifecycle state is unchanged.
    pub fn load_defaults(&mut self, policy: CounterPolicy) {
        let count = self.store_count();
        self.registry.load_defaults();
        if policy == CounterPolicy::Preserve {
            self.set_store_count(count);
        }
    }

    /// Factory reset: erase the persisted image and reload defaults
    pub fn clear(&mut self) -> Result<()> {
        self.store.clear()?;
        self.registry.load_defaults();
        self.state = ConfigState::BlankMedia;
        crate::log_info!("config cleared");
        Ok(())
    }

    /// Log the store geometry and every parameter
    pub fn print_info(&self) {
        self.store.print_info();
        crate::log_info!("=== Params ===");
        for info in self.registry.iter_info() {
            let mut line: heapless::String<128> = heapless::String::new();
            let _ = write!(line, "{}", info);
            crate::log_info!("{}", line.as_str());
        }
    }

    /// Value of `param` as last committed to flash, without adopting it
    ///
    /// Reads the parameter's slot straight from the device; the current
    /// value is left alone. A never-programmed slot reads as the erased
    /// pattern.
    ///
    /// # Errors
    ///
    /// - `ParameterError::UnknownId` / `TypeMismatch` for a bad handle
    /// - `FlashError::ReadFailed` if the slot could not be read
    pub fn persisted<T: FlashValue>(&mut self, param: Param<T>) -> Result<T> {
        let descriptor = self
            .registry
            .descriptor(param.id())
            .ok_or(ParameterError::UnknownId)?;
        if descriptor.kind() != T::KIND {
            return Err(ParameterError::TypeMismatch.into());
        }

        let (offset, size) = (descriptor.offset(), descriptor.size());
        let mut value = descriptor.default_value().clone();
        if !self.store.read_into(offset, size, &mut value) {
            return Err(FlashError::ReadFailed.into());
        }
        T::from_value(&value).ok_or_else(|| ParameterError::TypeMismatch.into())
    }

    /// Current value through a typed handle
    pub fn get<T: FlashValue>(&self, param: Param<T>) -> core::result::Result<T, ParameterError> {
        self.registry.read(param)
    }

    /// Set a value through a typed handle
    pub fn set<T: FlashValue>(
        &mut self,
        param: Param<T>,
        value: T,
    ) -> core::result::Result<(), ParameterError> {
        self.registry.write(param, value)
    }

    /// Current value of `id` as `T`
    pub fn get_by_id<T: FlashValue>(&self, id: u32) -> core::result::Result<T, ParameterError> {
        self.registry.get(id)
    }

    /// Set `id` to `value`
    pub fn set_by_id<T: FlashValue>(
        &mut self,
        id: u32,
        value: T,
    ) -> core::result::Result<(), ParameterError> {
        self.registry.set(id, value)
    }

    /// Lifecycle state
    pub fn state(&self) -> ConfigState {
        self.state
    }

    /// Store counter currently in memory
    pub fn store_count(&self) -> u32 {
        self.registry.read(CFG_STORE_COUNT).unwrap_or(0)
    }

    /// Fingerprint of this layout
    pub fn fingerprint(&self) -> u32 {
        self.registry.fingerprint()
    }

    /// Parameter registry
    pub fn registry(&self) -> &ParameterRegistry {
        &self.registry
    }

    /// Mutable parameter registry
    pub fn registry_mut(&mut self) -> &mut ParameterRegistry {
        &mut self.registry
    }

    /// Flash store
    pub fn store(&self) -> &FlashStore<F> {
        &self.store
    }

    /// Mutable flash store (for testing)
    pub fn store_mut(&mut self) -> &mut FlashStore<F> {
        &mut self.store
    }

    /// Give the flash device back
    pub fn release(self) -> F {
        self.store.release()
    }

    fn set_store_count(&mut self, count: u32) {
        if let Err(e) = self.registry.write(CFG_STORE_COUNT, count) {
            crate::log_error!("store counter update failed: {}", e);
        }
    }
}
