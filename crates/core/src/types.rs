//! Container building blocks
//!
//! This module defines the foundational types shared by storage, codecs and
//! the container itself:
//! - NamedValue: a (name, value) pair, the atomic unit of container storage
//! - Header: routing and versioning fields carried by every container
//! - HeaderField: fixed numeric identifiers for header fields on the wire
//! - Document: an owned, lock-free snapshot of a header and ordered values

use crate::value::{Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::mem;

/// Message type marking an untyped container
///
/// When a container carries this message type, the routing identifiers are
/// omitted from every wire encoding.
pub const DEFAULT_MESSAGE_TYPE: &str = "data_container";

/// Default message version
pub const DEFAULT_VERSION: &str = "1.0";

/// A named value
///
/// The kind is never stored; it is read from the payload so the two can
/// never disagree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NamedValue {
    /// Value name, unique within a container under `set`
    pub name: String,
    /// Payload
    pub value: Value,
}

impl NamedValue {
    /// Create a named value from any convertible payload
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Kind of the payload
    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }

    /// True when the payload avoids a heap allocation
    pub fn is_inline(&self) -> bool {
        self.value.is_inline()
    }

    /// Approximate bytes used: struct size plus owned buffers
    pub fn memory_footprint(&self) -> usize {
        mem::size_of::<NamedValue>() + self.name.capacity() + self.value.heap_size()
    }
}

/// Numeric identifiers of header fields on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HeaderField {
    /// Target identifier
    TargetId = 1,
    /// Target sub-identifier
    TargetSubId = 2,
    /// Source identifier
    SourceId = 3,
    /// Source sub-identifier
    SourceSubId = 4,
    /// Message type
    MessageType = 5,
    /// Message version
    Version = 6,
}

impl HeaderField {
    /// All fields in wire order
    pub const ALL: [HeaderField; 6] = [
        HeaderField::TargetId,
        HeaderField::TargetSubId,
        HeaderField::SourceId,
        HeaderField::SourceSubId,
        HeaderField::MessageType,
        HeaderField::Version,
    ];

    /// Wire identifier
    pub fn id(&self) -> u8 {
        *self as u8
    }

    /// Field for a wire identifier
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1..=6 => Some(Self::ALL[(id - 1) as usize]),
            _ => None,
        }
    }

    /// Field name used by the JSON, XML and MessagePack encodings
    pub fn name(&self) -> &'static str {
        match self {
            HeaderField::TargetId => "target_id",
            HeaderField::TargetSubId => "target_sub_id",
            HeaderField::SourceId => "source_id",
            HeaderField::SourceSubId => "source_sub_id",
            HeaderField::MessageType => "message_type",
            HeaderField::Version => "version",
        }
    }

    /// Field for a name used by the named encodings
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }

    /// True for the four routing identifiers
    pub fn is_routing(&self) -> bool {
        self.id() <= HeaderField::SourceSubId.id()
    }
}

/// Container header
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Header {
    /// Sender identifier
    #[serde(default)]
    pub source_id: String,
    /// Sender sub-identifier
    #[serde(default)]
    pub source_sub_id: String,
    /// Receiver identifier
    #[serde(default)]
    pub target_id: String,
    /// Receiver sub-identifier
    #[serde(default)]
    pub target_sub_id: String,
    /// Message type; `data_container` marks an untyped container
    #[serde(default = "default_message_type")]
    pub message_type: String,
    /// Message version
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_message_type() -> String {
    DEFAULT_MESSAGE_TYPE.to_string()
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

impl Default for Header {
    fn default() -> Self {
        Self {
            source_id: String::new(),
            source_sub_id: String::new(),
            target_id: String::new(),
            target_sub_id: String::new(),
            message_type: default_message_type(),
            version: default_version(),
        }
    }
}

impl Header {
    /// True when the routing identifiers are omitted on the wire
    pub fn is_untyped(&self) -> bool {
        self.message_type == DEFAULT_MESSAGE_TYPE
    }

    /// Exchange source and target identifiers
    pub fn swap(&mut self) {
        mem::swap(&mut self.source_id, &mut self.target_id);
        mem::swap(&mut self.source_sub_id, &mut self.target_sub_id);
    }

    /// Read a field by identifier
    pub fn field(&self, field: HeaderField) -> &str {
        match field {
            HeaderField::TargetId => &self.target_id,
            HeaderField::TargetSubId => &self.target_sub_id,
            HeaderField::SourceId => &self.source_id,
            HeaderField::SourceSubId => &self.source_sub_id,
            HeaderField::MessageType => &self.message_type,
            HeaderField::Version => &self.version,
        }
    }

    /// Overwrite a field by identifier
    pub fn set_field(&mut self, field: HeaderField, value: impl Into<String>) {
        let slot = match field {
            HeaderField::TargetId => &mut self.target_id,
            HeaderField::TargetSubId => &mut self.target_sub_id,
            HeaderField::SourceId => &mut self.source_id,
            HeaderField::SourceSubId => &mut self.source_sub_id,
            HeaderField::MessageType => &mut self.message_type,
            HeaderField::Version => &mut self.version,
        };
        *slot = value.into();
    }

    /// Fields that appear on the wire, in identifier order
    ///
    /// Routing identifiers are skipped for untyped containers.
    pub fn wire_fields(&self) -> impl Iterator<Item = (HeaderField, &str)> + '_ {
        let untyped = self.is_untyped();
        HeaderField::ALL
            .iter()
            .copied()
            .filter(move |f| !(untyped && f.is_routing()))
            .map(move |f| (f, self.field(f)))
    }

    /// Bytes held by the header strings
    pub fn heap_size(&self) -> usize {
        self.source_id.capacity()
            + self.source_sub_id.capacity()
            + self.target_id.capacity()
            + self.target_sub_id.capacity()
            + self.message_type.capacity()
            + self.version.capacity()
    }
}

/// Owned snapshot of a container: header plus ordered values
///
/// Documents are plain data with no lock. Codecs convert documents to and
/// from bytes; nested containers are stored as boxed documents, which makes
/// a container holding itself unrepresentable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// Header fields
    pub header: Header,
    /// Values in insertion order
    pub values: Vec<NamedValue>,
}

impl Document {
    /// Empty document with a default header
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty document with the given header
    pub fn with_header(header: Header) -> Self {
        Self {
            header,
            values: Vec::new(),
        }
    }

    /// Append a value; builder form
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push(NamedValue::new(name, value));
        self
    }

    /// Append a value without checking for an existing name
    pub fn push(&mut self, value: NamedValue) {
        self.values.push(value);
    }

    /// First value with the given name
    pub fn get(&self, name: &str) -> Option<&NamedValue> {
        self.values.iter().find(|v| v.name == name)
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when there are no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Approximate bytes used by header strings and values
    pub fn memory_footprint(&self) -> usize {
        self.header.heap_size()
            + self
                .values
                .iter()
                .map(NamedValue::memory_footprint)
                .sum::<usize>()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} v{} ({} values)",
            self.header.message_type,
            self.header.version,
            self.values.len()
        )
    }
}
