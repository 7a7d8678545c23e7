// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev

//! Process-wide operation metrics.
//!
//! Counters (`reads`, `writes`, `serializations`, `deserializations`,
//! `copies`, `moves`) and nanosecond latency reservoirs for the codec hot
//! paths. A single atomic flag gates everything: when disabled, every record
//! call is one relaxed load and a return.
//!
//! Runtime tuning (reservoir capacity) hot-swaps through an `ArcSwap` so
//! readers never take a lock to see the current config.

pub mod export;
pub mod metrics;

pub use export::{to_json, to_prometheus};
pub use metrics::{Collector, LatencyStats, MetricsSnapshot, Reservoir, RESERVOIR_CAPACITY};

use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

static ENABLED: AtomicBool = AtomicBool::new(true);
static COLLECTOR: OnceLock<Collector> = OnceLock::new();
static CONFIG: OnceLock<ArcSwap<TelemetryConfig>> = OnceLock::new();

/// Runtime-tunable telemetry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Samples retained per latency reservoir.
    pub sample_capacity: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            sample_capacity: RESERVOIR_CAPACITY,
        }
    }
}

fn collector() -> &'static Collector {
    COLLECTOR.get_or_init(Collector::new)
}

fn config_cell() -> &'static ArcSwap<TelemetryConfig> {
    CONFIG.get_or_init(|| ArcSwap::from_pointee(TelemetryConfig::default()))
}

/// Enable or disable all metric recording.
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

/// Current state of the global gate.
pub fn enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Swap in a new runtime config (lock-free for readers).
pub fn set_config(config: TelemetryConfig) {
    config_cell().store(Arc::new(config));
}

/// Current runtime config.
pub fn config() -> TelemetryConfig {
    **config_cell().load()
}

/// Point-in-time metrics for export.
pub fn snapshot() -> MetricsSnapshot {
    collector().snapshot()
}

/// Zero all counters and reservoirs (test support and long-lived processes).
pub fn reset() {
    collector().reset();
}

pub(crate) fn record_read() {
    if !enabled() {
        return;
    }
    collector().counters.reads.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_write() {
    if !enabled() {
        return;
    }
    collector().counters.writes.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_copy() {
    if !enabled() {
        return;
    }
    collector().counters.copies.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_move() {
    if !enabled() {
        return;
    }
    collector().counters.moves.fetch_add(1, Ordering::Relaxed);
}

/// Start a latency measurement; `None` when telemetry is off so the
/// disabled path never reads the clock.
pub(crate) fn clock_start() -> Option<Instant> {
    enabled().then(Instant::now)
}

pub(crate) fn record_serialization(started: Option<Instant>) {
    let Some(started) = started else { return };
    let collector = collector();
    collector.counters.serializations.fetch_add(1, Ordering::Relaxed);
    let ns = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
    collector.offer_serialize_ns(ns, config().sample_capacity);
}

pub(crate) fn record_deserialization(started: Option<Instant>) {
    let Some(started) = started else { return };
    let collector = collector();
    collector.counters.deserializations.fetch_add(1, Ordering::Relaxed);
    let ns = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
    collector.offer_deserialize_ns(ns, config().sample_capacity);
}
