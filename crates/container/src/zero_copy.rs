//! Zero-copy access to a retained text buffer
//!
//! After a text deserialize (or `parse_lazy`) the container keeps the input
//! bytes as a shared `Arc<[u8]>`. The first view request scans the data
//! block once and caches one [`RawEntry`] per pair. Views clone the `Arc`
//! and carry byte ranges, so they stay valid after the container mutates;
//! the container itself drops the buffer on its first value mutation and
//! stops serving views from then on.

use once_cell::sync::OnceCell;
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;
use vessel_core::{NamedValue, Result, Value, ValueKind};
use vessel_wire::text::{self, RawEntry};

/// Retained input plus its lazily built index
#[derive(Debug)]
pub(crate) struct RawBuffer {
    bytes: Arc<[u8]>,
    index: OnceCell<Vec<RawEntry>>,
}

impl RawBuffer {
    pub(crate) fn new(bytes: &[u8]) -> Self {
        Self {
            bytes: Arc::from(bytes),
            index: OnceCell::new(),
        }
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn is_indexed(&self) -> bool {
        self.index.get().is_some()
    }

    /// Build the index on first call, then serve the cached one
    pub(crate) fn index(&self) -> Result<&[RawEntry]> {
        self.index
            .get_or_try_init(|| {
                let entries = text::index_entries(&self.bytes)?;
                debug!(
                    target: "vessel::container",
                    entries = entries.len(),
                    bytes = self.bytes.len(),
                    "built zero-copy index"
                );
                Ok(entries)
            })
            .map(Vec::as_slice)
    }

    /// Decode every indexed pair
    pub(crate) fn materialize(&self) -> Result<Vec<NamedValue>> {
        let index = self.index()?;
        let mut values = Vec::with_capacity(index.len());
        for entry in index {
            values.push(text::materialize(&self.bytes, entry, 0)?);
        }
        Ok(values)
    }

    /// View of the first pair named `key`
    pub(crate) fn view(&self, key: &str) -> Result<Option<ValueView>> {
        let index = self.index()?;
        Ok(index
            .iter()
            .find(|e| &self.bytes[e.name.clone()] == key.as_bytes())
            .map(|e| ValueView::new(Arc::clone(&self.bytes), e)))
    }

    /// Views of every pair, in buffer order
    pub(crate) fn views(&self) -> Result<Vec<ValueView>> {
        let index = self.index()?;
        Ok(index
            .iter()
            .map(|e| ValueView::new(Arc::clone(&self.bytes), e))
            .collect())
    }

    pub(crate) fn contains(&self, key: &str) -> Result<bool> {
        let index = self.index()?;
        Ok(index
            .iter()
            .any(|e| &self.bytes[e.name.clone()] == key.as_bytes()))
    }

    pub(crate) fn heap_size(&self) -> usize {
        self.bytes.len()
            + self
                .index
                .get()
                .map_or(0, |i| i.capacity() * std::mem::size_of::<RawEntry>())
    }
}

/// Unparsed value inside a retained buffer
///
/// `raw()` returns exactly the bytes written for the value, which equal the
/// text encoding of the materialized value.
#[derive(Debug, Clone)]
pub struct ValueView {
    buffer: Arc<[u8]>,
    name: Range<usize>,
    kind: ValueKind,
    value: Range<usize>,
}

impl ValueView {
    fn new(buffer: Arc<[u8]>, entry: &RawEntry) -> Self {
        Self {
            buffer,
            name: entry.name.clone(),
            kind: entry.kind,
            value: entry.value.clone(),
        }
    }

    /// Value name
    ///
    /// Names that are not valid UTF-8 read as an empty string.
    pub fn name(&self) -> &str {
        std::str::from_utf8(&self.buffer[self.name.clone()]).unwrap_or_default()
    }

    /// Kind named by the type tag
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Value bytes exactly as written
    pub fn raw(&self) -> &[u8] {
        &self.buffer[self.value.clone()]
    }

    /// Value bytes as text, when they are valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.raw()).ok()
    }

    /// Byte offset of the value inside the buffer
    pub fn offset(&self) -> usize {
        self.value.start
    }

    /// Byte length of the value
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// True for zero-length values such as null
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Parse the value
    ///
    /// # Errors
    /// Returns `DeserializationFailed` when the raw text is not a valid
    /// literal for its kind.
    pub fn to_value(&self) -> Result<Value> {
        text::decode_value(self.kind, self.raw(), 0)
    }
}
