//! Parameter value kinds
//!
//! The closed set of value kinds a parameter can hold, their flash encoding,
//! and the `FlashValue` trait that maps Rust types onto them.
//!
//! # Encoding
//!
//! ```text
//! bool           1 byte, 0 = false, anything else = true
//! u8..u64        little-endian, natural width
//! i8..i64        little-endian two's complement, natural width
//! f32, f64       little-endian IEEE 754 bits
//! text           slot-sized bytes, zero padded when shorter than the slot
//! ```

use core::fmt;
use heapless::String;

/// Maximum text slot size in bytes
pub const MAX_TEXT_LEN: usize = 64;

/// Value kind tag
///
/// The discriminant is the kind tag mixed into the layout fingerprint, so
/// the order of variants is part of the persisted format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "pico2_w", derive(defmt::Format))]
#[repr(u8)]
pub enum ParamKind {
    Bool = 0,
    U8 = 1,
    U16 = 2,
    U32 = 3,
    U64 = 4,
    I8 = 5,
    I16 = 6,
    I32 = 7,
    I64 = 8,
    F32 = 9,
    F64 = 10,
    Text = 11,
}

impl ParamKind {
    /// Kind tag used by the layout fingerprint
    pub const fn tag(self) -> u32 {
        self as u32
    }

    /// Serialized width for fixed-size kinds, `None` for text
    pub const fn natural_size(self) -> Option<u32> {
        match self {
            ParamKind::Bool | ParamKind::U8 | ParamKind::I8 => Some(1),
            ParamKind::U16 | ParamKind::I16 => Some(2),
            ParamKind::U32 | ParamKind::I32 | ParamKind::F32 => Some(4),
            ParamKind::U64 | ParamKind::I64 | ParamKind::F64 => Some(8),
            ParamKind::Text => None,
        }
    }

    /// Whether `size` is an acceptable slot size for this kind
    pub const fn accepts_size(self, size: u32) -> bool {
        match self.natural_size() {
            Some(width) => size == width,
            None => size > 0 && size as usize <= MAX_TEXT_LEN,
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamKind::Bool => "bool",
            ParamKind::U8 => "u8",
            ParamKind::U16 => "u16",
            ParamKind::U32 => "u32",
            ParamKind::U64 => "u64",
            ParamKind::I8 => "i8",
            ParamKind::I16 => "i16",
            ParamKind::I32 => "i32",
            ParamKind::I64 => "i64",
            ParamKind::F32 => "f32",
            ParamKind::F64 => "f64",
            ParamKind::Text => "text",
        };
        f.write_str(name)
    }
}

/// Bounded text value
///
/// Holds up to `MAX_TEXT_LEN` bytes in memory. The slot size declared for a
/// parameter may be smaller; the value is cut to the slot when staged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextValue(String<MAX_TEXT_LEN>);

impl TextValue {
    /// Empty text
    pub const fn new() -> Self {
        Self(String::new())
    }

    /// Text content
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the text is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Replace the content with `bytes` read from flash
    ///
    /// Trailing zero padding is dropped; zero bytes inside the text are kept
    /// and a full slot needs no terminator. Invalid UTF-8 is cut at the last
    /// valid character.
    fn replace_from_bytes(&mut self, bytes: &[u8]) {
        self.0.clear();
        let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |last| last + 1);
        let text = match core::str::from_utf8(&bytes[..end]) {
            Ok(text) => text,
            Err(e) => {
                // Safe: valid_up_to marks a UTF-8 boundary
                core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or("")
            }
        };
        push_truncated(&mut self.0, text);
    }
}

impl From<&str> for TextValue {
    /// Build a text value, keeping at most `MAX_TEXT_LEN` bytes
    fn from(text: &str) -> Self {
        let mut value = Self::new();
        push_truncated(&mut value.0, text);
        value
    }
}

impl fmt::Display for TextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn push_truncated(dest: &mut String<MAX_TEXT_LEN>, text: &str) {
    for ch in text.chars() {
        if dest.push(ch).is_err() {
            break;
        }
    }
}

/// Parameter value (tagged union over the supported kinds)
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Text(TextValue),
}

/// Copy up to N bytes into a zeroed array
fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    let len = bytes.len().min(N);
    out[..len].copy_from_slice(&bytes[..len]);
    out
}

impl ParamValue {
    /// Get the kind of this value
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Bool(_) => ParamKind::Bool,
            ParamValue::U8(_) => ParamKind::U8,
            ParamValue::U16(_) => ParamKind::U16,
            ParamValue::U32(_) => ParamKind::U32,
            ParamValue::U64(_) => ParamKind::U64,
            ParamValue::I8(_) => ParamKind::I8,
            ParamValue::I16(_) => ParamKind::I16,
            ParamValue::I32(_) => ParamKind::I32,
            ParamValue::I64(_) => ParamKind::I64,
            ParamValue::F32(_) => ParamKind::F32,
            ParamValue::F64(_) => ParamKind::F64,
            ParamValue::Text(_) => ParamKind::Text,
        }
    }

    /// Serialize into `out`, filling exactly `out.len()` bytes
    ///
    /// Text longer than `out` is cut; shorter text is zero padded.
    pub fn encode(&self, out: &mut [u8]) {
        fn put(out: &mut [u8], bytes: &[u8]) {
            let len = bytes.len().min(out.len());
            out[..len].copy_from_slice(&bytes[..len]);
            out[len..].fill(0);
        }

        match self {
            ParamValue::Bool(v) => put(out, &[u8::from(*v)]),
            ParamValue::U8(v) => put(out, &v.to_le_bytes()),
            ParamValue::U16(v) => put(out, &v.to_le_bytes()),
            ParamValue::U32(v) => put(out, &v.to_le_bytes()),
            ParamValue::U64(v) => put(out, &v.to_le_bytes()),
            ParamValue::I8(v) => put(out, &v.to_le_bytes()),
            ParamValue::I16(v) => put(out, &v.to_le_bytes()),
            ParamValue::I32(v) => put(out, &v.to_le_bytes()),
            ParamValue::I64(v) => put(out, &v.to_le_bytes()),
            ParamValue::F32(v) => put(out, &v.to_le_bytes()),
            ParamValue::F64(v) => put(out, &v.to_le_bytes()),
            ParamValue::Text(v) => put(out, v.as_str().as_bytes()),
        }
    }

    /// Overwrite this value with `bytes`, keeping its kind
    pub fn decode_from(&mut self, bytes: &[u8]) {
        match self {
            ParamValue::Bool(v) => *v = bytes.first().is_some_and(|&b| b != 0),
            ParamValue::U8(v) => *v = u8::from_le_bytes(le_array(bytes)),
            ParamValue::U16(v) => *v = u16::from_le_bytes(le_array(bytes)),
            ParamValue::U32(v) => *v = u32::from_le_bytes(le_array(bytes)),
            ParamValue::U64(v) => *v = u64::from_le_bytes(le_array(bytes)),
            ParamValue::I8(v) => *v = i8::from_le_bytes(le_array(bytes)),
            ParamValue::I16(v) => *v = i16::from_le_bytes(le_array(bytes)),
            ParamValue::I32(v) => *v = i32::from_le_bytes(le_array(bytes)),
            ParamValue::I64(v) => *v = i64::from_le_bytes(le_array(bytes)),
            ParamValue::F32(v) => *v = f32::from_le_bytes(le_array(bytes)),
            ParamValue::F64(v) => *v = f64::from_le_bytes(le_array(bytes)),
            ParamValue::Text(v) => v.replace_from_bytes(bytes),
        }
    }
}

/// Rust types that map onto a parameter kind
pub trait FlashValue: Sized {
    /// Kind this type is stored as
    const KIND: ParamKind;

    /// Wrap into the type-erased value
    fn into_value(self) -> ParamValue;

    /// Extract from the type-erased value, `None` on kind mismatch
    fn from_value(value: &ParamValue) -> Option<Self>;
}

/// Fixed-width kinds (everything except text)
pub trait ScalarValue: FlashValue + Copy {}

macro_rules! scalar_flash_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FlashValue for $ty {
                const KIND: ParamKind = ParamKind::$variant;

                fn into_value(self) -> ParamValue {
                    ParamValue::$variant(self)
                }

                fn from_value(value: &ParamValue) -> Option<Self> {
                    match value {
                        ParamValue::$variant(v) => Some(*v),
                        _ => None,
                    }
                }
            }

            impl ScalarValue for $ty {}
        )*
    };
}

scalar_flash_value!(
    bool => Bool,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
);

impl FlashValue for TextValue {
    const KIND: ParamKind = ParamKind::Text;

    fn into_value(self) -> ParamValue {
        ParamValue::Text(self)
    }

    fn from_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Text(v) => Some(v.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(value: &ParamValue, size: usize) -> std::vec::Vec<u8> {
        let mut buf = std::vec![0xEEu8; size];
        value.encode(&mut buf);
        buf
    }

    #[test]
    fn test_kind_tags_are_stable() {
        assert_eq!(ParamKind::Bool.tag(), 0);
        assert_eq!(ParamKind::U32.tag(), 3);
        assert_eq!(ParamKind::I64.tag(), 8);
        assert_eq!(ParamKind::Text.tag(), 11);
    }

    #[test]
    fn test_natural_sizes() {
        assert_eq!(ParamKind::Bool.natural_size(), Some(1));
        assert_eq!(ParamKind::I16.natural_size(), Some(2));
        assert_eq!(ParamKind::F32.natural_size(), Some(4));
        assert_eq!(ParamKind::U64.natural_size(), Some(8));
        assert_eq!(ParamKind::Text.natural_size(), None);
    }

    #[test]
    fn test_accepts_size() {
        assert!(ParamKind::U32.accepts_size(4));
        assert!(!ParamKind::U32.accepts_size(2));
        assert!(ParamKind::Text.accepts_size(1));
        assert!(ParamKind::Text.accepts_size(MAX_TEXT_LEN as u32));
        assert!(!ParamKind::Text.accepts_size(0));
        assert!(!ParamKind::Text.accepts_size(MAX_TEXT_LEN as u32 + 1));
    }

    #[test]
    fn test_scalar_encoding_is_little_endian() {
        assert_eq!(encoded(&ParamValue::U32(0x1234_5678), 4), [0x78, 0x56, 0x34, 0x12]);
        assert_eq!(encoded(&ParamValue::I16(-2), 2), [0xFE, 0xFF]);
        assert_eq!(encoded(&ParamValue::Bool(true), 1), [1]);
        assert_eq!(encoded(&ParamValue::F32(1.0), 4), 1.0f32.to_le_bytes());
    }

    #[test]
    fn test_text_encoding_pads_and_truncates() {
        let short = ParamValue::Text(TextValue::from("abc"));
        assert_eq!(encoded(&short, 6), b"abc\0\0\0");

        let long = ParamValue::Text(TextValue::from("0123456789"));
        assert_eq!(encoded(&long, 8), b"01234567");
    }

    #[test]
    fn test_decode_keeps_kind() {
        let mut value = ParamValue::I32(0);
        value.decode_from(&(-327_680i32).to_le_bytes());
        assert_eq!(value, ParamValue::I32(-327_680));

        let mut value = ParamValue::F64(0.0);
        value.decode_from(&(-1.056e-8f64).to_le_bytes());
        assert_eq!(value, ParamValue::F64(-1.056e-8));
    }

    #[test]
    fn test_decode_blank_bytes() {
        let mut value = ParamValue::U32(7);
        value.decode_from(&[0xFF; 4]);
        assert_eq!(value, ParamValue::U32(u32::MAX));

        let mut value = ParamValue::Bool(false);
        value.decode_from(&[0xFF]);
        assert_eq!(value, ParamValue::Bool(true));
    }

    #[test]
    fn test_decode_text_stops_at_padding() {
        let mut value = ParamValue::Text(TextValue::from("previous content"));
        value.decode_from(b"abc\0\0\0\0\0");
        assert_eq!(value, ParamValue::Text(TextValue::from("abc")));
    }

    #[test]
    fn test_decode_text_keeps_inner_zero_bytes() {
        let mut value = ParamValue::Text(TextValue::new());
        value.decode_from(b"ab\0cd\0\0\0");
        assert_eq!(value, ParamValue::Text(TextValue::from("ab\0cd")));

        value.decode_from(&[0u8; 8]);
        assert_eq!(value, ParamValue::Text(TextValue::new()));
    }

    #[test]
    fn test_decode_text_full_slot_without_terminator() {
        let mut value = ParamValue::Text(TextValue::new());
        value.decode_from(b"0123456789ABCDEF");
        assert_eq!(value, ParamValue::Text(TextValue::from("0123456789ABCDEF")));
    }

    #[test]
    fn test_decode_text_cuts_invalid_utf8() {
        let mut value = ParamValue::Text(TextValue::new());
        value.decode_from(&[b'o', b'k', 0xFF, 0xFF]);
        assert_eq!(value, ParamValue::Text(TextValue::from("ok")));
    }

    #[test]
    fn test_text_value_capacity() {
        let long = "x".repeat(MAX_TEXT_LEN + 10);
        let value = TextValue::from(long.as_str());
        assert_eq!(value.len(), MAX_TEXT_LEN);
    }

    #[test]
    fn test_flash_value_round_trip() {
        assert_eq!(u16::from_value(&4096u16.into_value()), Some(4096));
        assert_eq!(i8::from_value(&(-16i8).into_value()), Some(-16));
        assert_eq!(u16::from_value(&ParamValue::U32(1)), None);
        assert_eq!(
            TextValue::from_value(&TextValue::from("abcdefg").into_value()),
            Some(TextValue::from("abcdefg"))
        );
    }
}
