//! The value container
//!
//! `ValueContainer` owns a header and an ordered set of named values behind
//! one reader/writer lock. Reads take the shared lock, mutations the
//! exclusive one, and locking is unconditional on every call.
//!
//! # State
//!
//! A container is either materialized (values live in the storage policy)
//! or lazy (only the header is parsed and the raw text buffer is held). The
//! first value read or mutation on a lazy container decodes the buffer; the
//! transition is one-way. A materialized container may still hold the raw
//! buffer of its last text deserialize to serve zero-copy views until the
//! first value mutation drops it.
//!
//! # Compare-and-swap
//!
//! `update_if` compares and writes under one exclusive acquisition, so two
//! racing callers with the same expected value cannot both succeed.

use crate::config::ContainerConfig;
use crate::metrics::{Operation, OpTimer};
use crate::pool::{DirectAllocator, MemoryPool, PoolStats};
use crate::zero_copy::{RawBuffer, ValueView};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use vessel_core::{Document, Error, FromValue, Header, NamedValue, Result, Value};
use vessel_storage::{LinearStorage, StoragePolicy};
use vessel_wire::{codec_for, detect_format, text, Format};

/// One conditional update for [`ValueContainer::update_batch_if`]
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSpec {
    /// Key to update
    pub key: String,
    /// Value the key must currently hold
    pub expected: Value,
    /// Replacement value
    pub new_value: Value,
}

impl UpdateSpec {
    /// Create an update spec
    pub fn new(key: impl Into<String>, expected: impl Into<Value>, new_value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            expected: expected.into(),
            new_value: new_value.into(),
        }
    }
}

#[derive(Debug)]
struct Inner<P> {
    header: Header,
    store: P,
    raw: Option<RawBuffer>,
    materialized: bool,
}

impl<P: StoragePolicy> Inner<P> {
    fn new(header: Header, store: P) -> Self {
        Self {
            header,
            store,
            raw: None,
            materialized: true,
        }
    }

    /// Decode the retained buffer into the store, once
    fn materialize(&mut self) -> Result<()> {
        if self.materialized {
            return Ok(());
        }
        if let Some(raw) = &self.raw {
            let values = raw.materialize()?;
            debug!(
                target: "vessel::container",
                values = values.len(),
                bytes = raw.len(),
                policy = P::NAME,
                "materialized lazy container"
            );
            self.store = P::from_values(values);
        }
        self.materialized = true;
        Ok(())
    }

    /// Views of the old buffer would disagree with the store after this point
    fn invalidate_raw(&mut self) {
        self.raw = None;
    }

    fn document(&self, with_values: bool) -> Document {
        Document {
            header: self.header.clone(),
            values: if with_values {
                self.store.as_slice().to_vec()
            } else {
                Vec::new()
            },
        }
    }
}

/// Thread-safe, ordered key/value container
///
/// The storage policy `P` is chosen at construction: [`LinearStorage`] by
/// default, or `IndexedStorage` for large containers.
///
/// # Example
///
/// ```ignore
/// let c = ValueContainer::new();
/// c.set("name", "Alice")?.set("age", 30)?;
/// let bytes = c.serialize(Format::Text)?;
///
/// let copy = ValueContainer::new();
/// copy.deserialize(&bytes)?;
/// assert_eq!(copy.get::<i64>("age")?, 30);
/// ```
pub struct ValueContainer<P: StoragePolicy = LinearStorage> {
    inner: RwLock<Inner<P>>,
    pool: Arc<dyn MemoryPool>,
    config: ContainerConfig,
}

impl ValueContainer<LinearStorage> {
    /// Empty container with linear storage and default configuration
    pub fn new() -> Self {
        Self::with_policy()
    }
}

impl<P: StoragePolicy> Default for ValueContainer<P> {
    fn default() -> Self {
        Self::with_policy()
    }
}

impl<P: StoragePolicy> fmt::Debug for ValueContainer<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("ValueContainer")
            .field("policy", &P::NAME)
            .field("header", &inner.header)
            .field("values", &inner.store.len())
            .field("materialized", &inner.materialized)
            .field("raw_bytes", &inner.raw.as_ref().map(RawBuffer::len))
            .finish()
    }
}

impl<P: StoragePolicy> ValueContainer<P> {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Empty container using policy `P`
    pub fn with_policy() -> Self {
        Self::from_parts(Header::default(), P::default(), ContainerConfig::default())
    }

    /// Container holding the contents of a document
    pub fn from_document(doc: Document) -> Self {
        Self::from_parts(doc.header, P::from_values(doc.values), ContainerConfig::default())
    }

    fn from_parts(header: Header, store: P, config: ContainerConfig) -> Self {
        Self {
            inner: RwLock::new(Inner::new(header, store)),
            pool: Arc::new(DirectAllocator::new()),
            config,
        }
    }

    /// Apply a configuration (builder pattern)
    ///
    /// Resets the message type and version to the configured defaults.
    pub fn with_config(mut self, config: ContainerConfig) -> Self {
        {
            let inner = self.inner.get_mut();
            inner.header.message_type = config.default_message_type.clone();
            inner.header.version = config.default_version.clone();
        }
        self.config = config;
        self
    }

    /// Use a memory pool for serialization buffers (builder pattern)
    pub fn with_pool(mut self, pool: Arc<dyn MemoryPool>) -> Self {
        self.pool = pool;
        self
    }

    /// Configuration in effect
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Injected memory pool
    pub fn pool(&self) -> &Arc<dyn MemoryPool> {
        &self.pool
    }

    /// Statistics of the injected pool
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    // ========================================================================
    // Locking
    // ========================================================================

    /// Shared access with values materialized
    fn read(&self) -> Result<RwLockReadGuard<'_, Inner<P>>> {
        {
            let guard = self.inner.read();
            if guard.materialized {
                return Ok(guard);
            }
        }
        let mut guard = self.inner.write();
        guard.materialize()?;
        Ok(RwLockWriteGuard::downgrade(guard))
    }

    /// Shared access for APIs that cannot report errors
    ///
    /// A buffer that fails to materialize reads as empty.
    fn read_or_log(&self) -> Option<RwLockReadGuard<'_, Inner<P>>> {
        match self.read() {
            Ok(guard) => Some(guard),
            Err(e) => {
                warn!(target: "vessel::container", error = %e, "retained buffer failed to materialize");
                None
            }
        }
    }

    /// Exclusive access with values materialized
    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner<P>>> {
        let mut guard = self.inner.write();
        guard.materialize()?;
        Ok(guard)
    }

    fn write_or_log(&self) -> Option<RwLockWriteGuard<'_, Inner<P>>> {
        match self.write() {
            Ok(guard) => Some(guard),
            Err(e) => {
                warn!(target: "vessel::container", error = %e, "retained buffer failed to materialize");
                None
            }
        }
    }

    // ========================================================================
    // Single-value operations
    // ========================================================================

    /// Insert or replace a value; returns `self` for chaining
    ///
    /// Any non-empty key is stored, but not every key can be serialized in
    /// every format: text rejects `,`, `[` and `]`, and XML needs a valid
    /// element name such as `order_id`. See
    /// [`Serializer`](vessel_wire::Serializer) for the full table.
    ///
    /// # Errors
    /// `EmptyKey` for an empty key, `DeserializationFailed` when a lazy
    /// buffer cannot be materialized.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<&Self> {
        self.set_value(NamedValue::new(key, value))
    }

    /// Insert or replace a named value; returns `self` for chaining
    pub fn set_value(&self, value: NamedValue) -> Result<&Self> {
        if value.name.is_empty() {
            return Err(Error::EmptyKey);
        }
        let _timer = OpTimer::start(Operation::Write);
        let mut inner = self.write()?;
        inner.store.set(value);
        inner.invalidate_raw();
        Ok(self)
    }

    /// Upsert several values under one lock acquisition
    ///
    /// Keys are checked before anything is written, so an empty key leaves
    /// the container unchanged.
    pub fn set_all(&self, values: &[NamedValue]) -> Result<&Self> {
        if values.iter().any(|v| v.name.is_empty()) {
            return Err(Error::EmptyKey);
        }
        let _timer = OpTimer::start(Operation::Write);
        let mut inner = self.write()?;
        for value in values {
            inner.store.set(value.clone());
        }
        if !values.is_empty() {
            inner.invalidate_raw();
        }
        Ok(self)
    }

    /// Typed read
    ///
    /// # Errors
    /// `KeyNotFound` when absent, `TypeMismatch` when the stored kind does
    /// not convert to `T`.
    pub fn get<T: FromValue>(&self, key: &str) -> Result<T> {
        let _timer = OpTimer::start(Operation::Read);
        let inner = self.read()?;
        let stored = inner
            .store
            .get(key)
            .ok_or_else(|| Error::KeyNotFound(key.to_string()))?;
        T::from_value(&stored.value).ok_or_else(|| Error::TypeMismatch {
            key: key.to_string(),
            expected: T::TYPE_NAME,
            actual: stored.kind(),
        })
    }

    /// Copy of the named value, first match for duplicate names
    pub fn get_value(&self, key: &str) -> Option<NamedValue> {
        let _timer = OpTimer::start(Operation::Read);
        self.read_or_log()?.store.get(key).cloned()
    }

    /// Check whether a key exists
    pub fn contains(&self, key: &str) -> bool {
        self.read_or_log()
            .map_or(false, |inner| inner.store.contains(key))
    }

    /// Remove every value with the key
    ///
    /// # Errors
    /// `KeyNotFound` when no value has the key.
    pub fn remove(&self, key: &str) -> Result<()> {
        let _timer = OpTimer::start(Operation::Write);
        let mut inner = self.write()?;
        if !inner.store.remove(key) {
            return Err(Error::KeyNotFound(key.to_string()));
        }
        inner.invalidate_raw();
        Ok(())
    }

    /// Remove all values, keeping the header
    ///
    /// Works on a lazy container without decoding its buffer.
    pub fn clear(&self) {
        let _timer = OpTimer::start(Operation::Write);
        let mut inner = self.inner.write();
        inner.store.clear();
        inner.raw = None;
        inner.materialized = true;
    }

    /// Number of values, duplicates included
    pub fn len(&self) -> usize {
        self.read_or_log().map_or(0, |inner| inner.store.len())
    }

    /// True when there are no values
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value names in order
    pub fn keys(&self) -> Vec<String> {
        self.read_or_log().map_or_else(Vec::new, |inner| {
            inner.store.iter().map(|v| v.name.clone()).collect()
        })
    }

    /// Ordered copy of every value
    pub fn values(&self) -> Vec<NamedValue> {
        self.read_or_log()
            .map_or_else(Vec::new, |inner| inner.store.as_slice().to_vec())
    }

    /// Owned copy of header and values
    pub fn snapshot(&self) -> Result<Document> {
        Ok(self.read()?.document(true))
    }

    // ========================================================================
    // Batch operations
    // ========================================================================

    /// Append values under one lock without deduplicating
    ///
    /// Names that already exist, or repeat within `values`, produce
    /// duplicate entries. Lookups then resolve to the first entry in order
    /// and `remove` deletes all of them.
    ///
    /// # Errors
    /// `EmptyKey` if any name is empty (nothing is written), or
    /// `MemoryAllocationFailed` if room cannot be reserved.
    pub fn bulk_insert(&self, values: Vec<NamedValue>) -> Result<()> {
        if values.iter().any(|v| v.name.is_empty()) {
            return Err(Error::EmptyKey);
        }
        if values.is_empty() {
            return Ok(());
        }
        let _timer = OpTimer::start(Operation::Write);
        let mut inner = self.write()?;
        inner.store.try_reserve(values.len())?;

        let duplicates = {
            let mut seen: HashSet<&str> = inner.store.iter().map(|v| v.name.as_str()).collect();
            values.iter().filter(|v| !seen.insert(v.name.as_str())).count()
        };
        if duplicates > 0 {
            warn!(
                target: "vessel::container",
                duplicates,
                "bulk_insert appended values whose names already exist"
            );
        }

        for value in values {
            inner.store.push(value);
        }
        inner.invalidate_raw();
        Ok(())
    }

    /// Look up several keys; results follow the input order
    pub fn get_batch<K: AsRef<str>>(&self, keys: &[K]) -> Vec<Option<NamedValue>> {
        let _timer = OpTimer::start(Operation::Read);
        match self.read_or_log() {
            Some(inner) => keys
                .iter()
                .map(|k| inner.store.get(k.as_ref()).cloned())
                .collect(),
            None => vec![None; keys.len()],
        }
    }

    /// Look up several keys, omitting misses
    pub fn get_batch_map<K: AsRef<str>>(&self, keys: &[K]) -> HashMap<String, Value> {
        let _timer = OpTimer::start(Operation::Read);
        let mut found = HashMap::with_capacity(keys.len());
        if let Some(inner) = self.read_or_log() {
            for key in keys {
                if let Some(v) = inner.store.get(key.as_ref()) {
                    found
                        .entry(v.name.clone())
                        .or_insert_with(|| v.value.clone());
                }
            }
        }
        found
    }

    /// Check several keys; results follow the input order
    pub fn contains_batch<K: AsRef<str>>(&self, keys: &[K]) -> Vec<bool> {
        match self.read_or_log() {
            Some(inner) => keys.iter().map(|k| inner.store.contains(k.as_ref())).collect(),
            None => vec![false; keys.len()],
        }
    }

    /// Remove several keys under one lock; returns how many keys were present
    pub fn remove_batch<K: AsRef<str>>(&self, keys: &[K]) -> usize {
        let _timer = OpTimer::start(Operation::Write);
        let Some(mut inner) = self.write_or_log() else {
            return 0;
        };
        let removed = keys
            .iter()
            .filter(|k| inner.store.remove(k.as_ref()))
            .count();
        if removed > 0 {
            inner.invalidate_raw();
        }
        removed
    }

    // ========================================================================
    // Compare-and-swap
    // ========================================================================

    /// Replace the value only if it currently equals `expected`
    ///
    /// Returns false when the key is missing or holds a different value.
    pub fn update_if(&self, key: &str, expected: &Value, new_value: impl Into<Value>) -> bool {
        let _timer = OpTimer::start(Operation::Write);
        let Some(mut inner) = self.write_or_log() else {
            return false;
        };
        let swapped = compare_and_swap(&mut inner.store, key, expected, new_value.into());
        if swapped {
            inner.invalidate_raw();
        }
        swapped
    }

    /// Apply [`update_if`](Self::update_if) per spec under one lock
    pub fn update_batch_if(&self, specs: &[UpdateSpec]) -> Vec<bool> {
        let _timer = OpTimer::start(Operation::Write);
        let Some(mut inner) = self.write_or_log() else {
            return vec![false; specs.len()];
        };
        let results: Vec<bool> = specs
            .iter()
            .map(|s| compare_and_swap(&mut inner.store, &s.key, &s.expected, s.new_value.clone()))
            .collect();
        if results.iter().any(|&r| r) {
            inner.invalidate_raw();
        }
        results
    }

    // ========================================================================
    // Header
    // ========================================================================

    /// Copy of the header
    pub fn header(&self) -> Header {
        self.inner.read().header.clone()
    }

    /// Sender identifier
    pub fn source_id(&self) -> String {
        self.inner.read().header.source_id.clone()
    }

    /// Sender sub-identifier
    pub fn source_sub_id(&self) -> String {
        self.inner.read().header.source_sub_id.clone()
    }

    /// Receiver identifier
    pub fn target_id(&self) -> String {
        self.inner.read().header.target_id.clone()
    }

    /// Receiver sub-identifier
    pub fn target_sub_id(&self) -> String {
        self.inner.read().header.target_sub_id.clone()
    }

    /// Message type
    pub fn message_type(&self) -> String {
        self.inner.read().header.message_type.clone()
    }

    /// Message version
    pub fn version(&self) -> String {
        self.inner.read().header.version.clone()
    }

    /// Set sender identifiers
    pub fn set_source(&self, id: impl Into<String>, sub_id: impl Into<String>) {
        let mut inner = self.inner.write();
        inner.header.source_id = id.into();
        inner.header.source_sub_id = sub_id.into();
    }

    /// Set receiver identifiers
    pub fn set_target(&self, id: impl Into<String>, sub_id: impl Into<String>) {
        let mut inner = self.inner.write();
        inner.header.target_id = id.into();
        inner.header.target_sub_id = sub_id.into();
    }

    /// Set message type
    pub fn set_message_type(&self, message_type: impl Into<String>) {
        self.inner.write().header.message_type = message_type.into();
    }

    /// Set message version
    pub fn set_version(&self, version: impl Into<String>) {
        self.inner.write().header.version = version.into();
    }

    /// Replace the whole header
    pub fn set_header(&self, header: Header) {
        self.inner.write().header = header;
    }

    /// Exchange source and target identifiers
    pub fn swap_header(&self) {
        self.inner.write().header.swap();
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    /// Encode in the given format
    ///
    /// # Errors
    /// `EncodingError` when a value cannot be represented in the format,
    /// `MemoryAllocationFailed` when the pool cannot supply a buffer.
    pub fn serialize(&self, format: Format) -> Result<Vec<u8>> {
        let _timer = OpTimer::start(Operation::Serialize);
        let doc = self.read()?.document(true);
        let mut out = self.pool.acquire(estimate_encoded_len(&doc))?;
        if let Err(e) = codec_for(format).serialize_into(&doc, &mut out) {
            self.pool.release(out);
            return Err(e);
        }
        Ok(out)
    }

    /// Encode in a textual format
    ///
    /// # Errors
    /// `InvalidFormat` for MessagePack, `EncodingError` when the text
    /// encoding carries bytes that are not UTF-8.
    pub fn serialize_string(&self, format: Format) -> Result<String> {
        if !format.is_textual() {
            return Err(Error::InvalidFormat(format!(
                "{} output is binary, not a string",
                format
            )));
        }
        let bytes = self.serialize(format)?;
        String::from_utf8(bytes).map_err(|e| {
            Error::EncodingError(format!("{} output is not valid UTF-8: {}", format, e))
        })
    }

    /// Replace contents with the decoded input, detecting its format
    ///
    /// On error the container is left exactly as it was.
    ///
    /// # Errors
    /// `InvalidFormat` when no format matches, `DeserializationFailed` when
    /// the input is malformed or exceeds `max_document_bytes`.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<()> {
        let format = detect_format(bytes).ok_or_else(|| {
            debug!(target: "vessel::container", bytes = bytes.len(), "unrecognized input format");
            Error::InvalidFormat("input matches no supported format".to_string())
        })?;
        self.deserialize_as(bytes, format)
    }

    /// Replace contents with input decoded as `format`
    pub fn deserialize_as(&self, bytes: &[u8], format: Format) -> Result<()> {
        let _timer = OpTimer::start(Operation::Deserialize);
        self.check_input_size(bytes)?;

        let doc = codec_for(format).deserialize(bytes).map_err(|e| {
            debug!(target: "vessel::container", format = %format, error = %e, "deserialize failed");
            e
        })?;
        let raw = (format == Format::Text && self.config.retain_raw_buffer)
            .then(|| RawBuffer::new(bytes));

        let mut inner = self.inner.write();
        inner.header = doc.header;
        inner.store = P::from_values(doc.values);
        inner.raw = raw;
        inner.materialized = true;
        Ok(())
    }

    /// Parse only the header of a text document and keep the buffer
    ///
    /// Values are decoded on first access. Malformed values surface then:
    /// as errors from `Result` APIs, and as absent values elsewhere.
    ///
    /// # Errors
    /// `InvalidFormat` for non-text input, `DeserializationFailed` when the
    /// header is malformed.
    pub fn parse_lazy(&self, bytes: &[u8]) -> Result<()> {
        let _timer = OpTimer::start(Operation::Deserialize);
        self.check_input_size(bytes)?;
        if detect_format(bytes) != Some(Format::Text) {
            return Err(Error::InvalidFormat(
                "lazy parsing needs the text format".to_string(),
            ));
        }
        let header = text::parse_header(bytes)?;

        let mut inner = self.inner.write();
        inner.header = header;
        inner.store = P::default();
        inner.raw = Some(RawBuffer::new(bytes));
        inner.materialized = false;
        Ok(())
    }

    fn check_input_size(&self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.config.max_document_bytes {
            return Err(Error::DeserializationFailed(format!(
                "input of {} bytes exceeds the {} byte limit",
                bytes.len(),
                self.config.max_document_bytes
            )));
        }
        Ok(())
    }

    /// Deep copy through the text format
    ///
    /// With `with_values == false` the copy carries only the header. The
    /// copy shares this container's pool and configuration.
    pub fn copy(&self, with_values: bool) -> Result<Self> {
        let _timer = OpTimer::start(Operation::Copy);
        let doc = self.read()?.document(with_values);

        let mut buffer = self.pool.acquire(estimate_encoded_len(&doc))?;
        let decoded = text::encode(&doc, &mut buffer).and_then(|_| text::decode(&buffer));
        self.pool.release(buffer);
        let decoded = decoded?;

        Ok(Self {
            inner: RwLock::new(Inner::new(decoded.header, P::from_values(decoded.values))),
            pool: Arc::clone(&self.pool),
            config: self.config.clone(),
        })
    }

    // ========================================================================
    // Zero-copy
    // ========================================================================

    /// Build the zero-copy index if a raw buffer is held
    ///
    /// Returns false when there is no buffer to index.
    pub fn ensure_index_built(&self) -> Result<bool> {
        let inner = self.inner.read();
        match &inner.raw {
            Some(raw) => raw.index().map(|_| true),
            None => Ok(false),
        }
    }

    /// Unparsed view of a value in the retained buffer
    ///
    /// None when the key is absent, when no buffer is held, or when the
    /// buffer cannot be indexed.
    pub fn get_view(&self, key: &str) -> Option<ValueView> {
        let inner = self.inner.read();
        match inner.raw.as_ref()?.view(key) {
            Ok(view) => view,
            Err(e) => {
                warn!(target: "vessel::container", error = %e, "zero-copy index failed");
                None
            }
        }
    }

    /// Views of every value in the retained buffer
    pub fn views(&self) -> Vec<ValueView> {
        let inner = self.inner.read();
        let Some(raw) = inner.raw.as_ref() else {
            return Vec::new();
        };
        raw.views().unwrap_or_else(|e| {
            warn!(target: "vessel::container", error = %e, "zero-copy index failed");
            Vec::new()
        })
    }

    /// True while the raw buffer of the last text deserialize is held
    pub fn has_raw_buffer(&self) -> bool {
        self.inner.read().raw.is_some()
    }

    /// True once values have been decoded
    pub fn is_materialized(&self) -> bool {
        self.inner.read().materialized
    }

    /// True when the retained buffer has a cached index
    pub fn is_index_built(&self) -> bool {
        self.inner
            .read()
            .raw
            .as_ref()
            .map_or(false, RawBuffer::is_indexed)
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Approximate bytes held by header, values, raw buffer and bookkeeping
    pub fn memory_footprint(&self) -> usize {
        let inner = self.inner.read();
        std::mem::size_of::<Self>()
            + inner.header.heap_size()
            + inner
                .store
                .iter()
                .map(NamedValue::memory_footprint)
                .sum::<usize>()
            + inner.store.overhead()
            + inner.raw.as_ref().map_or(0, RawBuffer::heap_size)
    }
}

fn compare_and_swap<P: StoragePolicy>(
    store: &mut P,
    key: &str,
    expected: &Value,
    new_value: Value,
) -> bool {
    match store.get_mut(key) {
        Some(current) if current.value == *expected => {
            current.value = new_value;
            true
        }
        _ => false,
    }
}

/// Rough encoded size used to size pool buffers
fn estimate_encoded_len(doc: &Document) -> usize {
    64 + doc
        .values
        .iter()
        .map(|v| v.name.len() + 8 + v.value.heap_size().max(8))
        .sum::<usize>()
}
