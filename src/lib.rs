//! Vessel - type-safe, multi-format key/value container for data exchange
//!
//! A container holds a routing header and an ordered set of named values of
//! 16 kinds, and converts to and from four wire formats: a compact delimited
//! text format, JSON, XML and MessagePack.
//!
//! # Quick Start
//!
//! ```ignore
//! use vessel::{Format, ValueContainer};
//!
//! let c = ValueContainer::new();
//! c.set("name", "Alice")?.set("age", 30)?;
//!
//! let bytes = c.serialize(Format::Text)?;
//! let restored = ValueContainer::new();
//! restored.deserialize(&bytes)?;
//! assert_eq!(restored.get::<i64>("age")?, 30);
//! ```
//!
//! # Architecture
//!
//! - `vessel-core`: value model, header, document, errors
//! - `vessel-storage`: linear and hash-indexed storage policies
//! - `vessel-wire`: codecs and format detection
//! - `vessel-container`: the locked container, zero-copy views, pool,
//!   metrics, configuration and file I/O
//! - `vessel-schema`: declarative validation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use vessel_container::{
    load, metrics, save, BlockPool, ConfigError, ContainerConfig, DirectAllocator, MemoryPool,
    PoolStats, UpdateSpec, ValueContainer, ValueView, CONFIG_FILE_NAME,
};
pub use vessel_core::{
    Document, Error, ErrorCategory, FromValue, Header, HeaderField, NamedValue, Result, Value,
    ValueKind, DEFAULT_MESSAGE_TYPE, DEFAULT_VERSION,
};
pub use vessel_schema::{ContainerSchema, DecodeError, ValidationCode, ValidationError};
pub use vessel_storage::{IndexedStorage, LinearStorage, StoragePolicy};
pub use vessel_wire::{codec_for, detect_format, Format, Serializer, MAX_NESTING_DEPTH};
