//! MessagePack codec
//!
//! The document is a two-entry map (`header`, `values`). Integers use the
//! smallest encoding that holds them, floats keep their width (`0xca` or
//! `0xcb`), bytes are `bin`, null is `nil`, arrays are MessagePack arrays,
//! and a nested container is stored as a `bin` blob holding its own
//! MessagePack encoding.
//!
//! Two things do not survive a round trip:
//! - integers are written compactly, so their declared width is lost and an
//!   integer reads back as the narrowest of `int`, `long` or `ulong`;
//! - every `bin` reads back as bytes, so a nested container comes back as
//!   bytes holding its MessagePack encoding. Decode those bytes with
//!   [`MsgPackCodec`] to recover it. Bytes are never reinterpreted, even
//!   when their content happens to be a container document.

use crate::serde_doc::{DocumentRef, DocumentSeed, Flavor};
use crate::{Format, Serializer};
use serde::de::DeserializeSeed;
use vessel_core::{Document, Error, Result};

/// Codec for MessagePack
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

impl Serializer for MsgPackCodec {
    fn format(&self) -> Format {
        Format::MsgPack
    }

    fn name(&self) -> &'static str {
        "MessagePack"
    }

    fn serialize_into(&self, doc: &Document, out: &mut Vec<u8>) -> Result<()> {
        let doc = DocumentRef {
            doc,
            flavor: Flavor::MsgPack,
        };
        rmp_serde::encode::write(out, &doc)
            .map_err(|e| Error::SerializationFailed(format!("MessagePack: {}", e)))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Document> {
        let mut de = rmp_serde::Deserializer::new(bytes);
        let seed = DocumentSeed {
            flavor: Flavor::MsgPack,
            depth: 0,
        };
        seed.deserialize(&mut de)
            .map_err(|e| Error::DeserializationFailed(format!("MessagePack: {}", e)))
    }
}
