//! Value types for vessel containers
//!
//! This module defines:
//! - ValueKind: the closed set of 16 kinds, numbered by their wire tag
//! - Value: tagged payload carrying exactly one kind
//! - FromValue: typed extraction used by `get::<T>`
//!
//! ## Kind Rules
//!
//! - The kind of a value is always derived from the active variant; it is
//!   never stored next to the payload.
//! - Primitive kinds (tags 0..=11) are stored inline. String, bytes,
//!   container and array kinds own heap data.
//! - Equality is structural. `Int(1) != Long(1)`: different kinds are never
//!   equal, and floats follow IEEE-754 (`NaN != NaN`, `-0.0 == 0.0`).

use crate::types::Document;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a stored value
///
/// The discriminant is the decimal type tag written by the text wire format,
/// so the ordering here is part of the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ValueKind {
    /// No payload
    Null = 0,
    /// Boolean
    Bool = 1,
    /// 16-bit signed integer
    Short = 2,
    /// 16-bit unsigned integer
    UShort = 3,
    /// 32-bit signed integer
    Int = 4,
    /// 32-bit unsigned integer
    UInt = 5,
    /// 64-bit signed integer
    Long = 6,
    /// 64-bit unsigned integer
    ULong = 7,
    /// 64-bit signed integer (wide alias kept distinct on the wire)
    LLong = 8,
    /// 64-bit unsigned integer (wide alias kept distinct on the wire)
    ULLong = 9,
    /// 32-bit IEEE-754 float
    Float = 10,
    /// 64-bit IEEE-754 float
    Double = 11,
    /// UTF-8 string
    String = 12,
    /// Raw bytes
    Bytes = 13,
    /// Nested container
    Container = 14,
    /// Ordered list of values
    Array = 15,
}

impl ValueKind {
    /// All kinds in tag order
    pub const ALL: [ValueKind; 16] = [
        ValueKind::Null,
        ValueKind::Bool,
        ValueKind::Short,
        ValueKind::UShort,
        ValueKind::Int,
        ValueKind::UInt,
        ValueKind::Long,
        ValueKind::ULong,
        ValueKind::LLong,
        ValueKind::ULLong,
        ValueKind::Float,
        ValueKind::Double,
        ValueKind::String,
        ValueKind::Bytes,
        ValueKind::Container,
        ValueKind::Array,
    ];

    /// Wire tag
    pub fn tag(&self) -> u8 {
        *self as u8
    }

    /// Kind for a wire tag, if the tag is known
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    /// Lowercase kind name
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Short => "short",
            ValueKind::UShort => "ushort",
            ValueKind::Int => "int",
            ValueKind::UInt => "uint",
            ValueKind::Long => "long",
            ValueKind::ULong => "ulong",
            ValueKind::LLong => "llong",
            ValueKind::ULLong => "ullong",
            ValueKind::Float => "float",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::Bytes => "bytes",
            ValueKind::Container => "container",
            ValueKind::Array => "array",
        }
    }

    /// True when the payload lives inline without a heap allocation
    pub fn is_inline(&self) -> bool {
        self.tag() <= ValueKind::Double.tag()
    }

    /// True for the eight integer widths
    pub fn is_integer(&self) -> bool {
        (ValueKind::Short.tag()..=ValueKind::ULLong.tag()).contains(&self.tag())
    }

    /// True for float and double
    pub fn is_floating(&self) -> bool {
        matches!(self, ValueKind::Float | ValueKind::Double)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tagged payload of a named value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No payload
    Null,
    /// Boolean
    Bool(bool),
    /// 16-bit signed integer
    Short(i16),
    /// 16-bit unsigned integer
    UShort(u16),
    /// 32-bit signed integer
    Int(i32),
    /// 32-bit unsigned integer
    UInt(u32),
    /// 64-bit signed integer
    Long(i64),
    /// 64-bit unsigned integer
    ULong(u64),
    /// 64-bit signed integer, wide alias
    LLong(i64),
    /// 64-bit unsigned integer, wide alias
    ULLong(u64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Owned nested container snapshot
    Container(Box<Document>),
    /// Ordered list of values
    Array(Vec<Value>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    /// Kind of the active variant
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Short(_) => ValueKind::Short,
            Value::UShort(_) => ValueKind::UShort,
            Value::Int(_) => ValueKind::Int,
            Value::UInt(_) => ValueKind::UInt,
            Value::Long(_) => ValueKind::Long,
            Value::ULong(_) => ValueKind::ULong,
            Value::LLong(_) => ValueKind::LLong,
            Value::ULLong(_) => ValueKind::ULLong,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::String(_) => ValueKind::String,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Container(_) => ValueKind::Container,
            Value::Array(_) => ValueKind::Array,
        }
    }

    /// True when the payload needs no heap allocation
    pub fn is_inline(&self) -> bool {
        self.kind().is_inline()
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Widen any integer kind to i128
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Value::Short(v) => Some(i128::from(*v)),
            Value::UShort(v) => Some(i128::from(*v)),
            Value::Int(v) => Some(i128::from(*v)),
            Value::UInt(v) => Some(i128::from(*v)),
            Value::Long(v) | Value::LLong(v) => Some(i128::from(*v)),
            Value::ULong(v) | Value::ULLong(v) => Some(i128::from(*v)),
            _ => None,
        }
    }

    /// Get as i64 if this is an integer kind whose value fits
    pub fn as_i64(&self) -> Option<i64> {
        self.as_integer().and_then(|v| i64::try_from(v).ok())
    }

    /// Get as f64 if this is a float or double value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as &[u8] if this is a Bytes value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get the nested container if this is a Container value
    pub fn as_container(&self) -> Option<&Document> {
        match self {
            Value::Container(d) => Some(d),
            _ => None,
        }
    }

    /// Get as &[Value] if this is an Array value
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Bytes owned on the heap by this payload
    pub fn heap_size(&self) -> usize {
        match self {
            Value::String(s) => s.capacity(),
            Value::Bytes(b) => b.capacity(),
            Value::Container(d) => std::mem::size_of::<Document>() + d.memory_footprint(),
            Value::Array(items) => {
                items.capacity() * std::mem::size_of::<Value>()
                    + items.iter().map(Value::heap_size).sum::<usize>()
            }
            _ => 0,
        }
    }
}

/// Human-readable rendering; bytes are shown as lowercase hex
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
            Value::UShort(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            Value::Long(v) | Value::LLong(v) => write!(f, "{}", v),
            Value::ULong(v) | Value::ULLong(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(s) => f.write_str(s),
            Value::Bytes(b) => f.write_str(&hex::encode(b)),
            Value::Container(d) => write!(f, "container({} values)", d.len()),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

macro_rules! impl_from_payload {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_payload! {
    bool => Bool,
    i16 => Short,
    u16 => UShort,
    i32 => Int,
    u32 => UInt,
    i64 => Long,
    u64 => ULong,
    f32 => Float,
    f64 => Double,
    String => String,
    Vec<u8> => Bytes,
    Vec<Value> => Array,
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<Document> for Value {
    fn from(d: Document) -> Self {
        Value::Container(Box::new(d))
    }
}

// ============================================================================
// Typed extraction
// ============================================================================

/// Conversion from a stored value into a concrete Rust type
///
/// Integer targets accept any integer kind whose value fits exactly, so a
/// value stored as `int` can be read back as `i64`. Floating targets accept
/// float or double. Every other target requires the matching kind.
pub trait FromValue: Sized {
    /// Name used in type mismatch errors
    const TYPE_NAME: &'static str;

    /// Convert, or `None` when the stored kind is incompatible
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! impl_from_value_integer {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromValue for $ty {
                const TYPE_NAME: &'static str = stringify!($ty);

                fn from_value(value: &Value) -> Option<Self> {
                    value.as_integer().and_then(|v| <$ty>::try_from(v).ok())
                }
            }
        )*
    };
}

impl_from_value_integer!(i16, u16, i32, u32, i64, u64, usize);

impl FromValue for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FromValue for f32 {
    const TYPE_NAME: &'static str = "f32";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for String {
    const TYPE_NAME: &'static str = "String";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromValue for Vec<u8> {
    const TYPE_NAME: &'static str = "Vec<u8>";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bytes().map(<[u8]>::to_vec)
    }
}

impl FromValue for Document {
    const TYPE_NAME: &'static str = "Document";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_container().cloned()
    }
}

impl FromValue for Vec<Value> {
    const TYPE_NAME: &'static str = "Vec<Value>";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_array().map(<[Value]>::to_vec)
    }
}

impl FromValue for Value {
    const TYPE_NAME: &'static str = "Value";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}
