//! JSON codec
//!
//! Header fields map to string members and values map to JSON literals.
//! Numbers are unquoted, strings are escaped per RFC 8259, bytes are written
//! as lowercase hex strings, nested containers as nested objects and arrays
//! as arrays.
//!
//! The encoding is lossy on read-back: integers return as `int` when they
//! fit in 32 bits and `long` (or `ulong`) otherwise, every float returns as
//! `double`, and bytes return as strings. Non-finite floats become `null`.

use crate::serde_doc::{DocumentRef, DocumentSeed, Flavor};
use crate::{Format, Serializer};
use serde::de::DeserializeSeed;
use vessel_core::{Document, Error, Result};

/// Codec for JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Encode as a JSON string
    pub fn to_string(&self, doc: &Document) -> Result<String> {
        serde_json::to_string(&DocumentRef {
            doc,
            flavor: Flavor::Json,
        })
        .map_err(|e| Error::SerializationFailed(format!("JSON: {}", e)))
    }
}

impl Serializer for JsonCodec {
    fn format(&self) -> Format {
        Format::Json
    }

    fn name(&self) -> &'static str {
        "JSON"
    }

    fn serialize_into(&self, doc: &Document, out: &mut Vec<u8>) -> Result<()> {
        let doc = DocumentRef {
            doc,
            flavor: Flavor::Json,
        };
        serde_json::to_writer(out, &doc)
            .map_err(|e| Error::SerializationFailed(format!("JSON: {}", e)))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Document> {
        let fail = |e: serde_json::Error| Error::DeserializationFailed(format!("JSON: {}", e));
        let mut de = serde_json::Deserializer::from_slice(bytes);
        let seed = DocumentSeed {
            flavor: Flavor::Json,
            depth: 0,
        };
        let doc = seed.deserialize(&mut de).map_err(fail)?;
        de.end().map_err(fail)?;
        Ok(doc)
    }
}
