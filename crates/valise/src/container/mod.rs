// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev

//! The container: an insertion-ordered, hash-indexed, thread-safe collection
//! of named values with an addressing header.
//!
//! # Design
//!
//! - **Locked path**: a `parking_lot::RwLock` guards the ordered entries and
//!   the name index (shared readers, exclusive writers).
//! - **Lock-free path**: every mutation publishes an immutable [`Snapshot`]
//!   through a crossbeam-epoch atomic pointer; [`SnapshotReader`] serves
//!   wait-free reads (see [`snapshot`]).
//! - **Accelerators**: a `DashSet` key-existence cache answers `contains`
//!   without touching the lock, and a small LRU serves repeated `get`s.
//!
//! Duplicate names are permitted and kept in arrival order: `get` returns
//! the first match, `remove` purges all matches.

mod batch;
mod cache;
mod snapshot;

pub use batch::CasSpec;
pub use snapshot::SnapshotReader;

use crate::error::{ErrorCode, ErrorInfo, Result, VoidResult};
use crate::telemetry;
use crate::value::{Storage, Value, ValueData};
use cache::ValueCache;
use crossbeam::epoch::{self, Atomic, Owned, Shared};
use dashmap::DashSet;
use parking_lot::RwLock;
use snapshot::Snapshot;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const MODULE: &str = "container";

/// Addressing header: source/target endpoints, message type, version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub source_id: String,
    pub source_sub_id: String,
    pub target_id: String,
    pub target_sub_id: String,
    pub message_type: String,
    pub version: String,
}

impl Header {
    /// Swap source and target endpoints (reply routing).
    pub fn swap_endpoints(&mut self) {
        std::mem::swap(&mut self.source_id, &mut self.target_id);
        std::mem::swap(&mut self.source_sub_id, &mut self.target_sub_id);
    }
}

/// Lock-protected core: ordered entries plus the duplicate-aware name index.
pub(crate) struct CoreState {
    pub(crate) header: Header,
    pub(crate) entries: Vec<Arc<Value>>,
    /// name -> ascending entry positions (first match = smallest).
    pub(crate) index: HashMap<Arc<str>, Vec<usize>>,
}

impl CoreState {
    fn new(header: Header) -> Self {
        Self {
            header,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub(crate) fn first_position(&self, name: &str) -> Option<usize> {
        self.index.get(name).and_then(|positions| positions.first().copied())
    }

    pub(crate) fn push(&mut self, value: Arc<Value>) {
        let position = self.entries.len();
        self.index
            .entry(value.name_arc().clone())
            .or_default()
            .push(position);
        self.entries.push(value);
    }

    /// Rebuild the index after positional removals.
    pub(crate) fn reindex(&mut self) {
        self.index.clear();
        for (position, value) in self.entries.iter().enumerate() {
            self.index
                .entry(value.name_arc().clone())
                .or_default()
                .push(position);
        }
    }
}

/// Per-container allocation and cache counters.
#[derive(Debug, Default)]
pub struct ContainerStats {
    stack_allocations: AtomicU64,
    pooled_allocations: AtomicU64,
    heap_allocations: AtomicU64,
    pool_misses: AtomicU64,
}

impl ContainerStats {
    fn record_insert(&self, value: &Value) {
        match value.storage() {
            Storage::Inline => {
                self.stack_allocations.fetch_add(1, Ordering::Relaxed);
            }
            Storage::Pooled => {
                self.pooled_allocations.fetch_add(1, Ordering::Relaxed);
            }
            Storage::Heap => {
                self.heap_allocations.fetch_add(1, Ordering::Relaxed);
                // A small payload on the heap means the pool turned us away.
                if value.size_bytes() <= crate::pool::SMALL_BLOCK_SIZE {
                    self.pool_misses.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }
}

/// Point-in-time copy of [`ContainerStats`] plus cache hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub stack_allocations: u64,
    pub pooled_allocations: u64,
    pub heap_allocations: u64,
    pub pool_misses: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

/// Thread-safe heterogeneous container (see module docs).
pub struct Container {
    pub(crate) state: RwLock<CoreState>,
    pub(crate) published: Atomic<Snapshot>,
    key_cache: DashSet<Arc<str>>,
    value_cache: ValueCache,
    stats: ContainerStats,
}

impl Container {
    /// Empty container with a default header.
    pub fn new() -> Self {
        Self::with_header(Header::default())
    }

    /// Empty container with the given header.
    pub fn with_header(header: Header) -> Self {
        let state = CoreState::new(header);
        let published = Atomic::new(Snapshot::capture(&state));
        Self {
            state: RwLock::new(state),
            published,
            key_cache: DashSet::new(),
            value_cache: ValueCache::new(),
            stats: ContainerStats::default(),
        }
    }

    /// Fluent construction helper.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// Build from parsed parts, rejecting empty names.
    pub fn from_values(header: Header, values: Vec<Value>) -> Result<Self> {
        if values.iter().any(|v| v.name().is_empty()) {
            return Err(ErrorInfo::new(ErrorCode::EmptyKey, MODULE));
        }
        Ok(Self::from_parts(
            header,
            values.into_iter().map(Arc::new).collect(),
        ))
    }

    /// Unchecked assembly from entries that came out of a valid container.
    pub(crate) fn from_parts(header: Header, entries: Vec<Arc<Value>>) -> Self {
        let container = Self::with_header(header);
        {
            let mut state = container.state.write();
            for entry in entries {
                container.stats.record_insert(&entry);
                container.key_cache.insert(entry.name_arc().clone());
                state.push(entry);
            }
            container.publish_locked(&state);
        }
        container
    }

    // ========================================================================
    // Header
    // ========================================================================

    /// Clone of the addressing header.
    pub fn header(&self) -> Header {
        self.state.read().header.clone()
    }

    /// Replace the addressing header.
    pub fn set_header(&self, header: Header) {
        let mut state = self.state.write();
        state.header = header;
        self.publish_locked(&state);
        telemetry::record_write();
    }

    /// Swap source and target endpoints for reply routing.
    pub fn swap_header(&self) {
        let mut state = self.state.write();
        state.header.swap_endpoints();
        self.publish_locked(&state);
        telemetry::record_write();
    }

    // ========================================================================
    // Single-value operations
    // ========================================================================

    /// Insert or replace: appends when `name` is absent, otherwise replaces
    /// the first match in place (position preserved).
    pub fn set(&self, name: &str, data: impl Into<ValueData>) -> VoidResult {
        if name.is_empty() {
            return Err(ErrorInfo::new(ErrorCode::EmptyKey, MODULE));
        }
        let value = Arc::new(Value::new(name, data));
        let mut state = self.state.write();
        self.stats.record_insert(&value);
        match state.first_position(name) {
            Some(position) => {
                state.entries[position] = value;
                self.value_cache.invalidate(name);
            }
            None => {
                self.key_cache.insert(value.name_arc().clone());
                state.push(value);
            }
        }
        self.publish_locked(&state);
        telemetry::record_write();
        Ok(())
    }

    /// Replace every occurrence of `name` with the same new payload.
    pub fn set_all(&self, name: &str, data: impl Into<ValueData>) -> VoidResult {
        if name.is_empty() {
            return Err(ErrorInfo::new(ErrorCode::EmptyKey, MODULE));
        }
        let data = data.into();
        let mut state = self.state.write();
        let Some(positions) = state.index.get(name).cloned() else {
            return Err(ErrorInfo::with_details(ErrorCode::KeyNotFound, MODULE, name));
        };
        for position in positions {
            let value = Arc::new(Value::new(name, data.clone()));
            self.stats.record_insert(&value);
            state.entries[position] = value;
            telemetry::record_copy();
        }
        self.value_cache.invalidate(name);
        self.publish_locked(&state);
        telemetry::record_write();
        Ok(())
    }

    /// First match as a shared handle.
    pub fn get_value(&self, name: &str) -> Result<Arc<Value>> {
        telemetry::record_read();
        if let Some(value) = self.value_cache.get(name) {
            return Ok(value);
        }
        let state = self.state.read();
        let position = state
            .first_position(name)
            .ok_or_else(|| ErrorInfo::with_details(ErrorCode::KeyNotFound, MODULE, name))?;
        let value = state.entries[position].clone();
        // Populate the cache before releasing the shared lock: a writer's
        // invalidation always orders after this put, so the cache can never
        // resurrect a replaced value.
        self.value_cache.put(value.name_arc().clone(), value.clone());
        Ok(value)
    }

    /// Typed read of the first match.
    pub fn get<T: crate::value::FromValue>(&self, name: &str) -> Result<T> {
        self.get_value(name)?.get()
    }

    /// Key-existence test (served by the lock-free key cache).
    pub fn contains(&self, name: &str) -> bool {
        telemetry::record_read();
        self.key_cache.contains(name)
    }

    /// Remove all matches. `KeyNotFound` when none exist.
    pub fn remove(&self, name: &str) -> VoidResult {
        let mut state = self.state.write();
        if state.index.remove(name).is_none() {
            return Err(ErrorInfo::with_details(ErrorCode::KeyNotFound, MODULE, name));
        }
        state.entries.retain(|value| value.name() != name);
        state.reindex();
        self.key_cache.remove(name);
        self.value_cache.invalidate(name);
        self.publish_locked(&state);
        telemetry::record_write();
        Ok(())
    }

    /// Drop every value (header is kept).
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.entries.clear();
        state.index.clear();
        self.key_cache.clear();
        self.value_cache.clear();
        self.publish_locked(&state);
        telemetry::record_write();
    }

    // ========================================================================
    // Iteration and introspection
    // ========================================================================

    /// Visit every value in insertion order under the shared lock.
    pub fn iterate<F: FnMut(&Value)>(&self, mut f: F) {
        telemetry::record_read();
        let state = self.state.read();
        for entry in &state.entries {
            f(entry.as_ref());
        }
    }

    /// Shared handles to every value, in insertion order.
    pub fn values(&self) -> Vec<Arc<Value>> {
        self.state.read().entries.clone()
    }

    /// Number of values (duplicates counted).
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// True when the container holds no values.
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Sum of payload footprints in bytes.
    pub fn payload_bytes(&self) -> usize {
        self.state
            .read()
            .entries
            .iter()
            .map(|value| value.size_bytes())
            .sum()
    }

    /// Allocation and cache counters.
    pub fn stats(&self) -> StatsSnapshot {
        let (cache_hits, cache_misses) = self.value_cache.stats();
        StatsSnapshot {
            stack_allocations: self.stats.stack_allocations.load(Ordering::Relaxed),
            pooled_allocations: self.stats.pooled_allocations.load(Ordering::Relaxed),
            heap_allocations: self.stats.heap_allocations.load(Ordering::Relaxed),
            pool_misses: self.stats.pool_misses.load(Ordering::Relaxed),
            cache_hits,
            cache_misses,
        }
    }

    // ========================================================================
    // Snapshot publication (RCU)
    // ========================================================================

    /// Publish the current state as a fresh snapshot and retire the old one.
    ///
    /// Callers hold the exclusive lock, so there is exactly one publisher at
    /// a time; the release ordering on the swap is what hands the snapshot's
    /// contents to acquire-loading readers.
    pub(crate) fn publish_locked(&self, state: &CoreState) {
        let fresh = Owned::new(Snapshot::capture(state));
        let guard = epoch::pin();
        let old = self.published.swap(fresh, Ordering::AcqRel, &guard);
        if !old.is_null() {
            // SAFETY: `old` was just unlinked; readers that still hold it are
            // pinned in an earlier epoch, and the collector frees it only
            // after every such reader unpins (two-epoch grace period).
            unsafe { guard.defer_destroy(old) };
        }
    }

    /// Wait-free reader over the last published snapshot.
    pub fn snapshot_reader(&self) -> SnapshotReader<'_> {
        SnapshotReader::enter(self)
    }

    pub(crate) fn record_insert_stats(&self, value: &Value) {
        self.stats.record_insert(value);
    }

    pub(crate) fn key_cache_insert(&self, name: Arc<str>) {
        self.key_cache.insert(name);
    }

    pub(crate) fn key_cache_remove(&self, name: &str) {
        self.key_cache.remove(name);
    }

    pub(crate) fn value_cache_invalidate(&self, name: &str) {
        self.value_cache.invalidate(name);
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        let guard = epoch::pin();
        let old = self.published.swap(Shared::null(), Ordering::AcqRel, &guard);
        if !old.is_null() {
            // SAFETY: the container is being dropped, so no new reader can
            // load this snapshot; in-flight readers keep it alive through
            // their epoch pins until the collector's grace period elapses.
            unsafe { guard.defer_destroy(old) };
        }
    }
}

/// Structural equality: header plus ordered values, recursive through nested
/// containers. Floats compare bit-exact.
impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        let (header_a, entries_a) = self.export_state();
        let (header_b, entries_b) = other.export_state();
        header_a == header_b
            && entries_a.len() == entries_b.len()
            && entries_a
                .iter()
                .zip(&entries_b)
                .all(|(a, b)| a.as_ref() == b.as_ref())
    }
}

impl Container {
    /// Header and entry handles under one shared lock (codec support).
    pub(crate) fn export_state(&self) -> (Header, Vec<Arc<Value>>) {
        let state = self.state.read();
        (state.header.clone(), state.entries.clone())
    }
}

impl Clone for Container {
    fn clone(&self) -> Self {
        let (header, entries) = self.export_state();
        telemetry::record_copy();
        Self::from_parts(header, entries)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Container")
            .field("header", &state.header)
            .field("len", &state.entries.len())
            .finish()
    }
}

/// Fluent builder for containers.
///
/// ```
/// use valise::Container;
///
/// let container = Container::builder()
///     .source("gateway-7", "ingest")
///     .target("store-1", "wal")
///     .message_type("sensor_report")
///     .version("1.2")
///     .value("temperature", 23.5f64)
///     .value("unit", "celsius")
///     .build()
///     .expect("builder should assemble");
/// assert_eq!(container.len(), 2);
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    header: Header,
    values: Vec<Value>,
}

impl ContainerBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, id: impl Into<String>, sub_id: impl Into<String>) -> Self {
        self.header.source_id = id.into();
        self.header.source_sub_id = sub_id.into();
        self
    }

    pub fn target(mut self, id: impl Into<String>, sub_id: impl Into<String>) -> Self {
        self.header.target_id = id.into();
        self.header.target_sub_id = sub_id.into();
        self
    }

    pub fn message_type(mut self, message_type: impl Into<String>) -> Self {
        self.header.message_type = message_type.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.header.version = version.into();
        self
    }

    pub fn value(mut self, name: &str, data: impl Into<ValueData>) -> Self {
        self.values.push(Value::new(name, data));
        self
    }

    /// Assemble the container; `EmptyKey` if any staged name is empty.
    pub fn build(self) -> Result<Container> {
        Container::from_values(self.header, self.values)
    }
}
