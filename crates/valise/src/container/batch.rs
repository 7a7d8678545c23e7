// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev

//! Bulk and conditional operations.
//!
//! Every batch API acquires the lock exactly once per call, not per element,
//! which is where the 3-5x gain over per-element loops comes from.
//! `update_batch_if` is all-or-nothing: the whole batch applies in one
//! publication or no spec applies at all.

use super::{Container, MODULE};
use crate::error::{ErrorCode, ErrorInfo, VoidResult};
use crate::telemetry;
use crate::value::{Value, ValueData};
use parking_lot::RwLockUpgradableReadGuard;
use std::collections::HashMap;
use std::sync::Arc;

/// One compare-and-swap spec for [`Container::update_batch_if`].
#[derive(Debug, Clone)]
pub struct CasSpec {
    /// Target name; with duplicates the earliest-inserted entry is compared.
    pub name: String,
    /// Value the current entry must equal (see `ValueData::cas_eq`).
    pub expected: ValueData,
    /// Replacement payload installed on success.
    pub new: ValueData,
}

impl CasSpec {
    pub fn new(name: impl Into<String>, expected: impl Into<ValueData>, new: impl Into<ValueData>) -> Self {
        Self {
            name: name.into(),
            expected: expected.into(),
            new: new.into(),
        }
    }
}

impl Container {
    // ========================================================================
    // Bulk insertion
    // ========================================================================

    /// Append a batch of values under a single exclusive lock. Values are
    /// moved, never copied. `EmptyKey` if any name is empty (nothing is
    /// applied).
    pub fn bulk_insert(&self, values: Vec<Value>) -> VoidResult {
        let reserve = values.len();
        self.bulk_insert_reserved(values, reserve)
    }

    /// [`bulk_insert`](Self::bulk_insert) with an explicit reserve hint,
    /// for callers that append several batches into one container.
    pub fn bulk_insert_reserved(&self, values: Vec<Value>, reserve_hint: usize) -> VoidResult {
        if values.iter().any(|value| value.name().is_empty()) {
            return Err(ErrorInfo::new(ErrorCode::EmptyKey, MODULE));
        }
        let mut state = self.state.write();
        state.entries.reserve(reserve_hint);
        for value in values {
            self.record_insert_stats(&value);
            let value = Arc::new(value);
            self.key_cache_insert(value.name_arc().clone());
            state.push(value);
            telemetry::record_move();
        }
        self.publish_locked(&state);
        telemetry::record_write();
        Ok(())
    }

    // ========================================================================
    // Bulk reads
    // ========================================================================

    /// First match per name, all under one shared lock.
    pub fn get_batch(&self, names: &[&str]) -> Vec<Option<Arc<Value>>> {
        telemetry::record_read();
        let state = self.state.read();
        names
            .iter()
            .map(|name| {
                state
                    .first_position(name)
                    .map(|position| state.entries[position].clone())
            })
            .collect()
    }

    /// Like [`get_batch`](Self::get_batch) but keyed; missing names are
    /// absent from the map.
    pub fn get_batch_map(&self, names: &[&str]) -> HashMap<String, Arc<Value>> {
        telemetry::record_read();
        let state = self.state.read();
        let mut found = HashMap::with_capacity(names.len());
        for name in names {
            if let Some(position) = state.first_position(name) {
                found.insert((*name).to_string(), state.entries[position].clone());
            }
        }
        found
    }

    /// Existence per name under one shared lock (one consistent view).
    pub fn contains_batch(&self, names: &[&str]) -> Vec<bool> {
        telemetry::record_read();
        let state = self.state.read();
        names
            .iter()
            .map(|name| state.index.contains_key(*name))
            .collect()
    }

    /// Remove all matches for every name; returns the number of entries
    /// removed. Names with no match are skipped (no error).
    pub fn remove_batch(&self, names: &[&str]) -> usize {
        let mut state = self.state.write();
        let before = state.entries.len();
        let mut touched = false;
        for name in names {
            if state.index.remove(*name).is_some() {
                touched = true;
                self.key_cache_remove(name);
                self.value_cache_invalidate(name);
            }
        }
        if !touched {
            return 0;
        }
        let core = &mut *state;
        let index = &core.index;
        core.entries.retain(|value| index.contains_key(value.name()));
        state.reindex();
        self.publish_locked(&state);
        telemetry::record_write();
        before - state.entries.len()
    }

    // ========================================================================
    // Conditional updates
    // ========================================================================

    /// Compare-and-swap on the first match of `name`.
    ///
    /// Succeeds iff the current value equals `expected` under CAS equality
    /// (numeric with kind compatibility for scalars, byte-wise for
    /// bytes/string, canonical serialization for containers; NaN never
    /// succeeds). Returns `false` when the key is missing or the comparison
    /// fails.
    pub fn update_if(&self, name: &str, expected: &ValueData, new: impl Into<ValueData>) -> bool {
        let mut state = self.state.write();
        let Some(positions) = state.index.get(name) else {
            return false;
        };
        if positions.len() > 1 {
            log::warn!(
                "[valise] update_if on duplicated key {name:?}: comparing earliest of {} entries",
                positions.len()
            );
        }
        let position = positions[0];
        if !state.entries[position].data().cas_eq(expected) {
            return false;
        }
        let value = Arc::new(Value::new(name, new));
        self.record_insert_stats(&value);
        state.entries[position] = value;
        self.value_cache_invalidate(name);
        self.publish_locked(&state);
        telemetry::record_write();
        true
    }

    /// Atomic batch compare-and-swap: either every spec matches and every
    /// replacement is installed in one publication, or nothing changes.
    ///
    /// Specs are pre-validated under an upgradable shared lock, the lock is
    /// upgraded, and the batch is re-verified before applying — the contract
    /// is verify-then-apply under exclusivity regardless of how the lock
    /// implementation sequences the upgrade.
    pub fn update_batch_if(&self, specs: &[CasSpec]) -> bool {
        if specs.is_empty() {
            return true;
        }

        let state = self.state.upgradable_read();
        let verify = |state: &super::CoreState| {
            specs.iter().all(|spec| {
                state
                    .first_position(&spec.name)
                    .is_some_and(|position| state.entries[position].data().cas_eq(&spec.expected))
            })
        };
        if !verify(&*state) {
            return false;
        }

        let mut state = RwLockUpgradableReadGuard::upgrade(state);
        if !verify(&*state) {
            return false;
        }

        for spec in specs {
            if let Some(positions) = state.index.get(spec.name.as_str()) {
                if positions.len() > 1 {
                    log::warn!(
                        "[valise] update_batch_if on duplicated key {:?}: comparing earliest of {} entries",
                        spec.name,
                        positions.len()
                    );
                }
            }
            // Re-verified above; first_position is present for every spec.
            if let Some(position) = state.first_position(&spec.name) {
                let value = Arc::new(Value::new(spec.name.as_str(), spec.new.clone()));
                self.record_insert_stats(&value);
                state.entries[position] = value;
                self.value_cache_invalidate(&spec.name);
            }
        }
        self.publish_locked(&state);
        telemetry::record_write();
        true
    }
}
