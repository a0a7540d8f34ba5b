//! Parameter registry
//!
//! Type-erased directory of every parameter in the flash region. Owns the
//! bump allocator that hands out flash offsets and the layout fingerprint
//! that lets the orchestrator recognise data written by a different layout.
//!
//! Parameters are declared through a [`LayoutBuilder`] first and allocated in
//! one pass, so offsets depend only on declaration order:
//!
//! ```ignore
//! let mut layout = LayoutBuilder::new();
//! let rate = layout.declare(CFG_ID_BASE, "CFG_RATE", 7u32);
//! let name = layout.declare_text(CFG_ID_BASE + 1, "CFG_NAME", "abc", 16);
//! let mut registry = layout.build(1024)?;
//!
//! registry.write(rate, 42)?;
//! assert_eq!(registry.read(name)?.as_str(), "abc");
//! ```

use super::error::ParameterError;
use super::store::FlashStore;
use super::value::{FlashValue, ParamKind, ParamValue, ScalarValue, TextValue, MAX_TEXT_LEN};
use crate::platform::traits::FlashInterface;
use core::fmt;
use core::marker::PhantomData;
use heapless::index_map::FnvIndexMap;
use heapless::Vec;

/// Maximum number of parameters (including built-ins)
pub const MAX_PARAMS: usize = 64;

/// Fingerprint multiplier for the flash offset
pub const FINGERPRINT_K0: u32 = 0x61e7_7795;
/// Fingerprint multiplier for the slot size
pub const FINGERPRINT_K1: u32 = 0x8089_f3a3;
/// Fingerprint multiplier for the kind tag
pub const FINGERPRINT_K2: u32 = 0xcdae_6891;

/// Fingerprint contribution of a single parameter
pub const fn fingerprint_term(offset: u32, size: u32, kind: ParamKind) -> u32 {
    offset
        .wrapping_mul(FINGERPRINT_K0)
        .wrapping_add(size.wrapping_mul(FINGERPRINT_K1))
        .wrapping_add(kind.tag().wrapping_mul(FINGERPRINT_K2))
}

/// Typed handle to a parameter
///
/// Carries only the id; the type parameter makes accesses through the handle
/// agree with the declared kind.
pub struct Param<T> {
    id: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Param<T> {
    /// Handle for parameter `id`
    pub const fn new(id: u32) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// Parameter id
    pub const fn id(&self) -> u32 {
        self.id
    }
}

impl<T> Clone for Param<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Param<T> {}

impl<T> fmt::Debug for Param<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Param").field("id", &self.id).finish()
    }
}

impl<T> PartialEq for Param<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Param<T> {}

/// Registered parameter
#[derive(Debug, Clone)]
pub struct Descriptor {
    id: u32,
    name: &'static str,
    offset: u32,
    size: u32,
    default: ParamValue,
    value: ParamValue,
}

impl Descriptor {
    /// Parameter id
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Diagnostic name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Byte offset within the flash region
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Serialized width in bytes
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Value kind
    pub fn kind(&self) -> ParamKind {
        self.default.kind()
    }

    /// Default value
    pub fn default_value(&self) -> &ParamValue {
        &self.default
    }

    /// Current value
    pub fn value(&self) -> &ParamValue {
        &self.value
    }
}

/// Diagnostic view of one parameter
///
/// Formats as `0x{offset:04x} {name}: {decimal} (0x{hex})`; floats show
/// fixed and scientific notation, bool and text are printed as-is.
#[derive(Debug, Clone, Copy)]
pub struct ParamInfo<'a> {
    descriptor: &'a Descriptor,
}

impl<'a> ParamInfo<'a> {
    /// Byte offset within the flash region
    pub fn offset(&self) -> u32 {
        self.descriptor.offset
    }

    /// Diagnostic name
    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    /// Current value
    pub fn value(&self) -> &'a ParamValue {
        &self.descriptor.value
    }
}

impl fmt::Display for ParamInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x} {}: ", self.offset(), self.name())?;
        match self.value() {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::U8(v) => write!(f, "{} (0x{:x})", v, v),
            ParamValue::U16(v) => write!(f, "{} (0x{:x})", v, v),
            ParamValue::U32(v) => write!(f, "{} (0x{:x})", v, v),
            ParamValue::U64(v) => write!(f, "{} (0x{:x})", v, v),
            ParamValue::I8(v) => write!(f, "{} (0x{:x})", v, v),
            ParamValue::I16(v) => write!(f, "{} (0x{:x})", v, v),
            ParamValue::I32(v) => write!(f, "{} (0x{:x})", v, v),
            ParamValue::I64(v) => write!(f, "{} (0x{:x})", v, v),
            ParamValue::F32(v) => write!(f, "{:.4} ({:.4e})", v, v),
            ParamValue::F64(v) => write!(f, "{:.4} ({:.4e})", v, v),
            ParamValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Parameter registry
///
/// Keyed by id, iterated in registration order (which is also flash order).
pub struct ParameterRegistry {
    params: FnvIndexMap<u32, Descriptor, MAX_PARAMS>,
    next_offset: u32,
    region_size: u32,
    fingerprint: u32,
}

impl ParameterRegistry {
    /// Create an empty registry for a region of `region_size` bytes
    pub fn new(region_size: u32) -> Self {
        Self {
            params: FnvIndexMap::new(),
            next_offset: 0,
            region_size,
            fingerprint: 0,
        }
    }

    /// Register a parameter at the next free offset
    ///
    /// Returns the assigned offset and folds the parameter into the layout
    /// fingerprint.
    ///
    /// # Errors
    ///
    /// - `DuplicateId` if `id` is already registered
    /// - `InvalidSize` if `size` does not suit the kind of `default`
    /// - `OutOfBounds` if the parameter would end past the region
    /// - `RegistryFull` if `MAX_PARAMS` parameters are registered
    pub fn register(
        &mut self,
        id: u32,
        name: &'static str,
        size: u32,
        default: ParamValue,
    ) -> Result<u32, ParameterError> {
        if self.params.contains_key(&id) {
            return Err(ParameterError::DuplicateId);
        }

        let kind = default.kind();
        if !kind.accepts_size(size) {
            return Err(ParameterError::InvalidSize);
        }

        let offset = self.next_offset;
        let end = offset
            .checked_add(size)
            .ok_or(ParameterError::OutOfBounds)?;
        if end > self.region_size {
            return Err(ParameterError::OutOfBounds);
        }

        let descriptor = Descriptor {
            id,
            name,
            offset,
            size,
            value: default.clone(),
            default,
        };
        self.params
            .insert(id, descriptor)
            .map_err(|_| ParameterError::RegistryFull)?;

        self.next_offset = end;
        self.fingerprint = self
            .fingerprint
            .wrapping_add(fingerprint_term(offset, size, kind));

        crate::log_trace!("registered {} at {:#x} ({} bytes)", name, offset, size);
        Ok(offset)
    }

    /// Layout fingerprint of everything registered so far
    pub fn fingerprint(&self) -> u32 {
        self.fingerprint
    }

    /// First unallocated offset
    pub fn next_offset(&self) -> u32 {
        self.next_offset
    }

    /// Region size the registry allocates within
    pub fn region_size(&self) -> u32 {
        self.region_size
    }

    /// Number of registered parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Look up a descriptor
    pub fn descriptor(&self, id: u32) -> Option<&Descriptor> {
        self.params.get(&id)
    }

    /// Iterate descriptors in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.params.values()
    }

    /// Diagnostic enumeration in registration order
    pub fn iter_info(&self) -> impl Iterator<Item = ParamInfo<'_>> {
        self.params
            .values()
            .map(|descriptor| ParamInfo { descriptor })
    }

    /// Set every parameter to its default
    pub fn load_defaults(&mut self) {
        for descriptor in self.params.values_mut() {
            descriptor.value = descriptor.default.clone();
        }
    }

    /// Restore one parameter to its default
    pub fn reset(&mut self, id: u32) -> Result<(), ParameterError> {
        let descriptor = self.params.get_mut(&id).ok_or(ParameterError::UnknownId)?;
        descriptor.value = descriptor.default.clone();
        Ok(())
    }

    /// Read every parameter from the store's committed bytes
    pub fn load_from_store<F: FlashInterface>(&mut self, store: &mut FlashStore<F>) {
        for descriptor in self.params.values_mut() {
            store.read_into(descriptor.offset, descriptor.size, &mut descriptor.value);
        }
    }

    /// Write every current value into the store's staging buffer
    pub fn stage_to_store<F: FlashInterface>(&self, store: &mut FlashStore<F>) {
        for descriptor in self.params.values() {
            store.write_staged(descriptor.offset, descriptor.size, &descriptor.value);
        }
    }

    /// Current value, type-erased
    pub fn get_value(&self, id: u32) -> Result<&ParamValue, ParameterError> {
        self.params
            .get(&id)
            .map(|descriptor| &descriptor.value)
            .ok_or(ParameterError::UnknownId)
    }

    /// Replace the current value, type-erased
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if `value` is not of the registered kind.
    pub fn set_value(&mut self, id: u32, value: ParamValue) -> Result<(), ParameterError> {
        let descriptor = self.params.get_mut(&id).ok_or(ParameterError::UnknownId)?;
        if value.kind() != descriptor.kind() {
            return Err(ParameterError::TypeMismatch);
        }
        descriptor.value = value;
        Ok(())
    }

    /// Current value of `id` as `T`
    pub fn get<T: FlashValue>(&self, id: u32) -> Result<T, ParameterError> {
        T::from_value(self.get_value(id)?).ok_or(ParameterError::TypeMismatch)
    }

    /// Set `id` to `value`
    pub fn set<T: FlashValue>(&mut self, id: u32, value: T) -> Result<(), ParameterError> {
        self.set_value(id, value.into_value())
    }

    /// Default value of `id` as `T`
    pub fn default_of<T: FlashValue>(&self, id: u32) -> Result<T, ParameterError> {
        let descriptor = self.params.get(&id).ok_or(ParameterError::UnknownId)?;
        T::from_value(&descriptor.default).ok_or(ParameterError::TypeMismatch)
    }

    /// Current value through a typed handle
    pub fn read<T: FlashValue>(&self, param: Param<T>) -> Result<T, ParameterError> {
        self.get(param.id())
    }

    /// Set a value through a typed handle
    pub fn write<T: FlashValue>(&mut self, param: Param<T>, value: T) -> Result<(), ParameterError> {
        self.set(param.id(), value)
    }
}

/// Pending parameter declaration
#[derive(Debug, Clone)]
struct Declaration {
    id: u32,
    name: &'static str,
    size: u32,
    default: ParamValue,
}

/// Ordered list of parameter declarations
///
/// Collects `(id, name, size, default)` and allocates offsets in a single
/// pass when built. Errors found while declaring are reported by `build`.
#[derive(Debug, Clone, Default)]
pub struct LayoutBuilder {
    declarations: Vec<Declaration, MAX_PARAMS>,
    error: Option<ParameterError>,
}

impl LayoutBuilder {
    /// Create an empty layout
    pub fn new() -> Self {
        Self {
            declarations: Vec::new(),
            error: None,
        }
    }

    /// Declare a fixed-width parameter
    pub fn declare<T: ScalarValue>(&mut self, id: u32, name: &'static str, default: T) -> Param<T> {
        let size = match T::KIND.natural_size() {
            Some(size) => size,
            None => {
                self.fail(ParameterError::InvalidSize);
                0
            }
        };
        self.push(id, name, size, default.into_value());
        Param::new(id)
    }

    /// Declare a text parameter occupying `size` bytes of flash
    ///
    /// Text longer than `size` is accepted in memory and cut when persisted.
    pub fn declare_text(
        &mut self,
        id: u32,
        name: &'static str,
        default: &str,
        size: u32,
    ) -> Param<TextValue> {
        if default.len() > MAX_TEXT_LEN {
            self.fail(ParameterError::InvalidSize);
        }
        self.push(id, name, size, ParamValue::Text(TextValue::from(default)));
        Param::new(id)
    }

    /// Number of declarations
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Check if nothing is declared
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Allocate every declaration into `registry`, in declaration order
    pub fn build_into(&self, registry: &mut ParameterRegistry) -> Result<(), ParameterError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        for decl in &self.declarations {
            registry.register(decl.id, decl.name, decl.size, decl.default.clone())?;
        }
        Ok(())
    }

    /// Build a registry for a region of `region_size` bytes
    pub fn build(&self, region_size: u32) -> Result<ParameterRegistry, ParameterError> {
        let mut registry = ParameterRegistry::new(region_size);
        self.build_into(&mut registry)?;
        Ok(registry)
    }

    fn push(&mut self, id: u32, name: &'static str, size: u32, default: ParamValue) {
        let decl = Declaration {
            id,
            name,
            size,
            default,
        };
        if self.declarations.push(decl).is_err() {
            self.fail(ParameterError::RegistryFull);
        }
    }

    fn fail(&mut self, error: ParameterError) {
        self.error.get_or_insert(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_layout() -> (LayoutBuilder, Param<u32>, Param<TextValue>, Param<i16>) {
        let mut layout = LayoutBuilder::new();
        let a = layout.declare(10, "A", 7u32);
        let b = layout.declare_text(11, "B", "abc", 16);
        let c = layout.declare(12, "C", -2047i16);
        (layout, a, b, c)
    }

    #[test]
    fn test_offsets_are_prefix_sums() {
        let mut layout = LayoutBuilder::new();
        layout.declare(1, "FLAG", false);
        layout.declare(2, "BYTE", 23u8);
        layout.declare(3, "WORD", 4096u16);
        layout.declare_text(4, "TEXT", "abcdefg", 16);
        layout.declare(5, "BIG", 1u64 << 40);
        layout.declare(6, "REAL", 3.326f32);
        let registry = layout.build(1024).unwrap();

        let mut expected = 0;
        for descriptor in registry.iter() {
            assert_eq!(descriptor.offset(), expected);
            expected += descriptor.size();
        }
        assert_eq!(registry.next_offset(), 1 + 1 + 2 + 16 + 8 + 4);
    }

    #[test]
    fn test_ranges_do_not_overlap() {
        let (layout, ..) = sample_layout();
        let registry = layout.build(1024).unwrap();

        let ranges: std::vec::Vec<(u32, u32)> = registry
            .iter()
            .map(|d| (d.offset(), d.offset() + d.size()))
            .collect();
        for (i, a) in ranges.iter().enumerate() {
            for b in ranges.iter().skip(i + 1) {
                assert!(a.1 <= b.0 || b.1 <= a.0);
            }
        }
    }

    #[test]
    fn test_register_returns_offset() {
        let mut registry = ParameterRegistry::new(64);
        assert_eq!(registry.register(0, "X", 4, ParamValue::U32(0)), Ok(0));
        assert_eq!(registry.register(1, "Y", 8, ParamValue::F64(0.0)), Ok(4));
        assert_eq!(registry.register(2, "Z", 1, ParamValue::Bool(true)), Ok(12));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut layout = LayoutBuilder::new();
        layout.declare(5, "FIRST", 1u8);
        layout.declare(5, "SECOND", 2u8);
        assert_eq!(layout.build(1024).err(), Some(ParameterError::DuplicateId));
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mut registry = ParameterRegistry::new(8);
        registry.register(0, "A", 4, ParamValue::U32(0)).unwrap();
        assert_eq!(
            registry.register(1, "B", 8, ParamValue::U64(0)),
            Err(ParameterError::OutOfBounds)
        );
        // Failed registration leaves allocator and fingerprint untouched
        assert_eq!(registry.next_offset(), 4);
        assert_eq!(registry.fingerprint(), fingerprint_term(0, 4, ParamKind::U32));
    }

    #[test]
    fn test_invalid_sizes_rejected() {
        let mut registry = ParameterRegistry::new(1024);
        assert_eq!(
            registry.register(0, "A", 2, ParamValue::U32(0)),
            Err(ParameterError::InvalidSize)
        );
        assert_eq!(
            registry.register(1, "B", 0, ParamValue::Text(TextValue::new())),
            Err(ParameterError::InvalidSize)
        );
        assert_eq!(
            registry.register(2, "C", 65, ParamValue::Text(TextValue::new())),
            Err(ParameterError::InvalidSize)
        );
    }

    #[test]
    fn test_registry_full() {
        let mut layout = LayoutBuilder::new();
        for id in 0..=MAX_PARAMS as u32 {
            layout.declare(id, "P", 0u8);
        }
        assert_eq!(layout.build(1024).err(), Some(ParameterError::RegistryFull));
    }

    #[test]
    fn test_oversized_text_default_rejected() {
        let long = "y".repeat(MAX_TEXT_LEN + 1);
        let mut layout = LayoutBuilder::new();
        layout.declare_text(0, "T", &long, 8);
        assert_eq!(layout.build(1024).err(), Some(ParameterError::InvalidSize));
    }

    #[test]
    fn test_fingerprint_accumulates_terms() {
        let (layout, ..) = sample_layout();
        let registry = layout.build(1024).unwrap();

        let expected = fingerprint_term(0, 4, ParamKind::U32)
            .wrapping_add(fingerprint_term(4, 16, ParamKind::Text))
            .wrapping_add(fingerprint_term(20, 2, ParamKind::I16));
        assert_eq!(registry.fingerprint(), expected);
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let (first, ..) = sample_layout();
        let (second, ..) = sample_layout();
        assert_eq!(
            first.build(1024).unwrap().fingerprint(),
            second.build(1024).unwrap().fingerprint()
        );
    }

    #[test]
    fn test_fingerprint_detects_size_change() {
        let (base, ..) = sample_layout();

        let mut resized = LayoutBuilder::new();
        resized.declare(10, "A", 7u32);
        resized.declare_text(11, "B", "abc", 8);
        resized.declare(12, "C", -2047i16);

        assert_ne!(
            base.build(1024).unwrap().fingerprint(),
            resized.build(1024).unwrap().fingerprint()
        );
    }

    #[test]
    fn test_fingerprint_detects_kind_change() {
        let (base, ..) = sample_layout();

        let mut retyped = LayoutBuilder::new();
        retyped.declare(10, "A", 7i32);
        retyped.declare_text(11, "B", "abc", 16);
        retyped.declare(12, "C", -2047i16);

        assert_ne!(
            base.build(1024).unwrap().fingerprint(),
            retyped.build(1024).unwrap().fingerprint()
        );
    }

    #[test]
    fn test_fingerprint_detects_order_change() {
        let (base, ..) = sample_layout();

        let mut reordered = LayoutBuilder::new();
        reordered.declare_text(11, "B", "abc", 16);
        reordered.declare(10, "A", 7u32);
        reordered.declare(12, "C", -2047i16);

        assert_ne!(
            base.build(1024).unwrap().fingerprint(),
            reordered.build(1024).unwrap().fingerprint()
        );
    }

    #[test]
    fn test_typed_access() {
        let (layout, a, b, c) = sample_layout();
        let mut registry = layout.build(1024).unwrap();

        assert_eq!(registry.read(a), Ok(7));
        assert_eq!(registry.read(b).unwrap().as_str(), "abc");
        assert_eq!(registry.read(c), Ok(-2047));

        registry.write(a, 42).unwrap();
        registry.write(b, TextValue::from("xyz")).unwrap();
        assert_eq!(registry.get::<u32>(10), Ok(42));
        assert_eq!(registry.get::<TextValue>(11), Ok(TextValue::from("xyz")));
    }

    #[test]
    fn test_type_mismatch() {
        let (layout, ..) = sample_layout();
        let mut registry = layout.build(1024).unwrap();

        assert_eq!(registry.get::<i32>(10), Err(ParameterError::TypeMismatch));
        assert_eq!(registry.set(10, 1.5f32), Err(ParameterError::TypeMismatch));
        assert_eq!(registry.get::<u32>(10), Ok(7));
    }

    #[test]
    fn test_unknown_id() {
        let (layout, ..) = sample_layout();
        let mut registry = layout.build(1024).unwrap();

        assert_eq!(registry.get::<u32>(99), Err(ParameterError::UnknownId));
        assert_eq!(registry.set(99, 1u32), Err(ParameterError::UnknownId));
        assert_eq!(registry.reset(99), Err(ParameterError::UnknownId));
    }

    #[test]
    fn test_defaults_and_reset() {
        let (layout, a, b, _) = sample_layout();
        let mut registry = layout.build(1024).unwrap();

        registry.write(a, 1).unwrap();
        registry.write(b, TextValue::from("changed")).unwrap();

        registry.reset(a.id()).unwrap();
        assert_eq!(registry.read(a), Ok(7));
        assert_eq!(registry.read(b).unwrap().as_str(), "changed");

        registry.load_defaults();
        assert_eq!(registry.read(b).unwrap().as_str(), "abc");
        assert_eq!(registry.default_of::<u32>(a.id()), Ok(7));
    }

    #[test]
    fn test_iteration_follows_registration_order() {
        let (layout, ..) = sample_layout();
        let registry = layout.build(1024).unwrap();
        let names: std::vec::Vec<&str> = registry.iter().map(|d| d.name()).collect();
        assert_eq!(names, ["A", "B", "C"]);
    }

    #[test]
    fn test_param_info_format() {
        let mut layout = LayoutBuilder::new();
        layout.declare(0, "CFG_UINT32", 262_140u32);
        layout.declare(1, "CFG_INT8", -16i8);
        layout.declare(2, "CFG_BOOL", false);
        layout.declare(3, "CFG_FLOAT", 3.326f32);
        layout.declare_text(4, "CFG_STRING", "abcdefg", 16);
        let registry = layout.build(1024).unwrap();

        let lines: std::vec::Vec<std::string::String> =
            registry.iter_info().map(|info| info.to_string()).collect();
        assert_eq!(lines[0], "0x0000 CFG_UINT32: 262140 (0x3fffc)");
        assert_eq!(lines[1], "0x0004 CFG_INT8: -16 (0xf0)");
        assert_eq!(lines[2], "0x0005 CFG_BOOL: false");
        assert_eq!(lines[3], "0x0006 CFG_FLOAT: 3.3260 (3.3260e0)");
        assert_eq!(lines[4], "0x000a CFG_STRING: abcdefg");
    }
}
