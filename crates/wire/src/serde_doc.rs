//! Serde glue shared by the JSON and MessagePack codecs
//!
//! Both formats use the same shape, a two-entry map:
//!
//! ```text
//! { "header": { field-name: string, ... }, "values": { name: literal, ... } }
//! ```
//!
//! Values are written and read through hand-written `Serialize` and
//! `Visitor` impls so insertion order survives without an ordered map type.
//! The flavors differ only in how non-JSON kinds are carried.

use crate::MAX_NESTING_DEPTH;
use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::ser::{self, SerializeMap};
use serde::{Deserializer, Serialize};
use std::fmt;
use vessel_core::{Document, Header, NamedValue, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flavor {
    /// Bytes as hex strings, nested containers as objects, floats widened
    Json,
    /// Bytes as bin, nested containers as bin blobs of their own encoding,
    /// and every bin read back as bytes
    MsgPack,
}

// ============================================================================
// Serialization
// ============================================================================

pub(crate) struct DocumentRef<'a> {
    pub doc: &'a Document,
    pub flavor: Flavor,
}

impl Serialize for DocumentRef<'_> {
    fn serialize<S: ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("header", &HeaderRef(&self.doc.header))?;
        map.serialize_entry(
            "values",
            &ValuesRef {
                values: &self.doc.values,
                flavor: self.flavor,
            },
        )?;
        map.end()
    }
}

struct HeaderRef<'a>(&'a Header);

impl Serialize for HeaderRef<'_> {
    fn serialize<S: ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let count = self.0.wire_fields().count();
        let mut map = serializer.serialize_map(Some(count))?;
        for (field, value) in self.0.wire_fields() {
            map.serialize_entry(field.name(), value)?;
        }
        map.end()
    }
}

struct ValuesRef<'a> {
    values: &'a [NamedValue],
    flavor: Flavor,
}

impl Serialize for ValuesRef<'_> {
    fn serialize<S: ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for nv in self.values {
            map.serialize_entry(
                &nv.name,
                &ValueRef {
                    value: &nv.value,
                    flavor: self.flavor,
                },
            )?;
        }
        map.end()
    }
}

struct ValueRef<'a> {
    value: &'a Value,
    flavor: Flavor,
}

impl Serialize for ValueRef<'_> {
    fn serialize<S: ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.value {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Short(v) => serializer.serialize_i16(*v),
            Value::UShort(v) => serializer.serialize_u16(*v),
            Value::Int(v) => serializer.serialize_i32(*v),
            Value::UInt(v) => serializer.serialize_u32(*v),
            Value::Long(v) | Value::LLong(v) => serializer.serialize_i64(*v),
            Value::ULong(v) | Value::ULLong(v) => serializer.serialize_u64(*v),
            Value::Float(v) => match self.flavor {
                // widen through the shortest decimal so 0.1f32 stays 0.1
                Flavor::Json => {
                    let widened = v.to_string().parse::<f64>().unwrap_or(f64::from(*v));
                    serializer.serialize_f64(widened)
                }
                Flavor::MsgPack => serializer.serialize_f32(*v),
            },
            Value::Double(v) => serializer.serialize_f64(*v),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(b) => match self.flavor {
                Flavor::Json => serializer.serialize_str(&hex::encode(b)),
                Flavor::MsgPack => serializer.serialize_bytes(b),
            },
            Value::Container(doc) => {
                let nested = DocumentRef {
                    doc,
                    flavor: self.flavor,
                };
                match self.flavor {
                    Flavor::Json => nested.serialize(serializer),
                    Flavor::MsgPack => {
                        let blob = rmp_serde::to_vec(&nested).map_err(ser::Error::custom)?;
                        serializer.serialize_bytes(&blob)
                    }
                }
            }
            Value::Array(items) => serializer.collect_seq(items.iter().map(|value| ValueRef {
                value,
                flavor: self.flavor,
            })),
        }
    }
}

// ============================================================================
// Deserialization
// ============================================================================

/// Seed producing a [`Document`] from a two-entry map
#[derive(Clone, Copy)]
pub(crate) struct DocumentSeed {
    pub flavor: Flavor,
    pub depth: usize,
}

impl<'de> DeserializeSeed<'de> for DocumentSeed {
    type Value = Document;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Document, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for DocumentSeed {
    type Value = Document;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map with 'header' and 'values' entries")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Document, A::Error> {
        if self.depth > MAX_NESTING_DEPTH {
            return Err(de::Error::custom(format!(
                "containers nested deeper than {}",
                MAX_NESTING_DEPTH
            )));
        }

        let mut doc = Document::new();
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "header" => doc.header = map.next_value::<Header>()?,
                "values" => doc.values = map.next_value_seed(ValuesSeed(self))?,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(doc)
    }
}

struct ValuesSeed(DocumentSeed);

impl<'de> DeserializeSeed<'de> for ValuesSeed {
    type Value = Vec<NamedValue>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for ValuesSeed {
    type Value = Vec<NamedValue>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of value names to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut values = Vec::with_capacity(map.size_hint().unwrap_or(0).min(4096));
        while let Some(name) = map.next_key::<String>()? {
            let value = map.next_value_seed(ValueSeed(self.0))?;
            values.push(NamedValue { name, value });
        }
        Ok(values)
    }
}

struct ValueSeed(DocumentSeed);

impl<'de> DeserializeSeed<'de> for ValueSeed {
    type Value = Value;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(self)
    }
}

/// Narrowest of int, long and ulong that holds the integer
fn canonical_integer(v: i128) -> Value {
    if let Ok(v) = i32::try_from(v) {
        Value::Int(v)
    } else if let Ok(v) = i64::try_from(v) {
        Value::Long(v)
    } else {
        // callers only pass values that came from i64 or u64
        Value::ULong(v as u64)
    }
}

impl<'de> Visitor<'de> for ValueSeed {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar, binary, array or nested container")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(canonical_integer(i128::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(canonical_integer(i128::from(v)))
    }

    fn visit_f32<E: de::Error>(self, v: f32) -> Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Double(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Value, E> {
        Ok(Value::Bytes(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Value, E> {
        self.visit_bytes(&v)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(4096));
        while let Some(item) = seq.next_element_seed(ValueSeed(self.0))? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Value, A::Error> {
        let seed = DocumentSeed {
            flavor: self.0.flavor,
            depth: self.0.depth + 1,
        };
        seed.visit_map(map).map(|doc| Value::Container(Box::new(doc)))
    }
}
