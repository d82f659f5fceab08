//! Wire codecs for vessel containers
//!
//! This crate converts [`Document`] snapshots to and from bytes:
//! - [`TextCodec`]: the delimited `@header={{..}};@data={{..}};` format
//! - [`JsonCodec`]: human-facing JSON, lossy on integer width
//! - [`XmlCodec`]: human-facing XML, values read back as strings
//! - [`MsgPackCodec`]: compact MessagePack
//! - [`detect_format`]: sniff the format of an incoming buffer
//!
//! # Lossless Formats
//!
//! The text format reproduces all 16 kinds exactly. MessagePack keeps
//! every scalar kind except integer width: integers come back as the
//! narrowest of `int`, `long` or `ulong` that holds them, and nested
//! containers come back as bytes holding their own MessagePack encoding.
//! JSON and XML are best-effort.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod detect;
pub mod json;
pub mod msgpack;
mod serde_doc;
pub mod text;
pub mod xml;

pub use detect::detect_format;
pub use json::JsonCodec;
pub use msgpack::MsgPackCodec;
pub use text::{RawEntry, TextCodec};
pub use xml::XmlCodec;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use vessel_core::{Document, Error, Result};

/// Maximum depth of nested containers accepted by any decoder
pub const MAX_NESTING_DEPTH: usize = 64;

/// Supported wire formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Delimited text format
    Text,
    /// JSON
    Json,
    /// XML
    Xml,
    /// MessagePack
    MsgPack,
}

impl Format {
    /// All formats
    pub const ALL: [Format; 4] = [Format::Text, Format::Json, Format::Xml, Format::MsgPack];

    /// Lowercase format name
    pub fn name(&self) -> &'static str {
        match self {
            Format::Text => "text",
            Format::Json => "json",
            Format::Xml => "xml",
            Format::MsgPack => "msgpack",
        }
    }

    /// True when the encoding is valid UTF-8 text
    pub fn is_textual(&self) -> bool {
        !matches!(self, Format::MsgPack)
    }

    /// True when every kind survives a round trip unchanged
    pub fn is_lossless(&self) -> bool {
        matches!(self, Format::Text)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "binary" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            "xml" => Ok(Format::Xml),
            "msgpack" | "messagepack" => Ok(Format::MsgPack),
            other => Err(Error::InvalidFormat(format!("unknown format '{}'", other))),
        }
    }
}

/// Converts documents to and from one wire format
///
/// # Value Names
///
/// Containers accept any non-empty name, but each format restricts what it
/// can write and rejects other names with `EncodingError` at encode time:
///
/// | Format | Accepted names |
/// |---|---|
/// | Text | no `,`, `[` or `]`; spaces are kept verbatim |
/// | JSON | any |
/// | XML | a letter or `_`, then letters, digits, `_`, `-` or `.` |
/// | MessagePack | any |
///
/// # Thread Safety
///
/// Codecs are stateless and `Send + Sync`, so one instance can serve
/// concurrent callers.
pub trait Serializer: Send + Sync {
    /// Format handled by this codec
    fn format(&self) -> Format;

    /// Human-readable codec name
    fn name(&self) -> &'static str;

    /// Append the encoding of `doc` to `out`
    ///
    /// # Errors
    /// Returns `SerializationFailed` or `EncodingError` when the document
    /// cannot be represented in this format. `out` may hold a partial
    /// encoding on error.
    fn serialize_into(&self, doc: &Document, out: &mut Vec<u8>) -> Result<()>;

    /// Decode a full document
    ///
    /// # Errors
    /// Returns `DeserializationFailed` with a human-readable cause.
    fn deserialize(&self, bytes: &[u8]) -> Result<Document>;

    /// Encode into a fresh buffer
    fn serialize(&self, doc: &Document) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.serialize_into(doc, &mut out)?;
        Ok(out)
    }
}

/// Codec for a format
pub fn codec_for(format: Format) -> Box<dyn Serializer> {
    match format {
        Format::Text => Box::new(TextCodec),
        Format::Json => Box::new(JsonCodec),
        Format::Xml => Box::new(XmlCodec),
        Format::MsgPack => Box::new(MsgPackCodec),
    }
}

/// Sniff the format of `bytes` and decode it
///
/// # Errors
/// Returns `InvalidFormat` when no format matches, otherwise whatever the
/// matching codec reports.
pub fn decode_auto(bytes: &[u8]) -> Result<(Format, Document)> {
    let format = detect_format(bytes)
        .ok_or_else(|| Error::InvalidFormat("unrecognized input".to_string()))?;
    let doc = codec_for(format).deserialize(bytes)?;
    Ok((format, doc))
}
