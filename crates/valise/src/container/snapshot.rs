// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev

//! Wait-free snapshot reads (RCU over crossbeam-epoch).
//!
//! Every mutation captures the container state into an immutable [`Snapshot`]
//! and swaps it into an epoch-managed atomic pointer with release ordering;
//! the displaced snapshot is retired to the collector. A [`SnapshotReader`]
//! pins the current epoch, acquire-loads the pointer once, and then serves
//! any number of indexed reads without ever blocking — a writer can publish
//! concurrently and the reader keeps observing its own consistent image.
//!
//! Reclamation: crossbeam's global collector registers threads lazily on
//! first pin and frees a retired snapshot only after the global epoch has
//! advanced past every pinned reader (two-epoch grace period), so no reader
//! can observe freed memory.

use super::{Container, CoreState, Header};
use crate::error::{ErrorCode, ErrorInfo, Result};
use crate::value::{FromValue, Value};
use crossbeam::epoch::{self, Guard};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Immutable point-in-time image of a container: header, ordered values,
/// and the duplicate-aware name index.
pub(crate) struct Snapshot {
    header: Header,
    entries: Vec<Arc<Value>>,
    index: HashMap<Arc<str>, Vec<usize>>,
}

impl Snapshot {
    /// Capture the locked state. Entry handles are shared, not deep-copied.
    pub(crate) fn capture(state: &CoreState) -> Self {
        Self {
            header: state.header.clone(),
            entries: state.entries.clone(),
            index: state.index.clone(),
        }
    }

    fn first(&self, name: &str) -> Option<&Arc<Value>> {
        self.index
            .get(name)
            .and_then(|positions| positions.first())
            .map(|&position| &self.entries[position])
    }
}

/// Wait-free reader over one published snapshot.
///
/// Holds an epoch guard for its whole lifetime; dropping the reader unpins
/// the epoch and lets the collector make progress. The borrow of the
/// container keeps the reader from outliving it.
pub struct SnapshotReader<'c> {
    guard: Guard,
    snapshot: *const Snapshot,
    _container: PhantomData<&'c Container>,
}

impl<'c> SnapshotReader<'c> {
    pub(crate) fn enter(container: &'c Container) -> Self {
        let guard = epoch::pin();
        let shared = container.published.load(Ordering::Acquire, &guard);
        // A container always publishes a snapshot at construction, so the
        // pointer is only null mid-drop, which the 'c borrow rules out.
        let snapshot = shared.as_raw();
        Self {
            guard,
            snapshot,
            _container: PhantomData,
        }
    }

    fn snapshot(&self) -> &Snapshot {
        // SAFETY: `snapshot` was loaded under `self.guard`'s pin; the
        // collector cannot free it until the guard drops, and the pointer was
        // non-null at load (see `enter`).
        unsafe { &*self.snapshot }
    }

    /// First match by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.snapshot().first(name).map(|entry| entry.as_ref())
    }

    /// Typed read of the first match.
    pub fn get_typed<T: FromValue>(&self, name: &str) -> Result<T> {
        match self.snapshot().first(name) {
            Some(value) => value.get(),
            None => Err(ErrorInfo::with_details(
                ErrorCode::KeyNotFound,
                "container::snapshot",
                name,
            )),
        }
    }

    /// Key-existence test against this snapshot.
    pub fn contains(&self, name: &str) -> bool {
        self.snapshot().index.contains_key(name)
    }

    /// Header at capture time.
    pub fn header(&self) -> &Header {
        &self.snapshot().header
    }

    /// Number of values at capture time.
    pub fn len(&self) -> usize {
        self.snapshot().entries.len()
    }

    /// True when the snapshot holds no values.
    pub fn is_empty(&self) -> bool {
        self.snapshot().entries.is_empty()
    }

    /// Values in insertion order, as captured.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.snapshot().entries.iter().map(|entry| entry.as_ref())
    }
}
