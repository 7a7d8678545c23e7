// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev

//! Metrics collection with atomic counters and latency reservoirs.
//!
//! Thread-safe: counters are atomics (Relaxed ordering), reservoirs sit
//! behind a mutex. Counter increments cost one `fetch_add`; a latency sample
//! costs a lock plus one slot write.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Default reservoir capacity (samples kept per histogram).
pub const RESERVOIR_CAPACITY: usize = 1024;

/// Operation counters tracked by the collector.
#[derive(Debug, Default)]
pub struct Counters {
    pub reads: AtomicU64,
    pub writes: AtomicU64,
    pub serializations: AtomicU64,
    pub deserializations: AtomicU64,
    pub copies: AtomicU64,
    pub moves: AtomicU64,
}

/// Uniform reservoir sample of nanosecond latencies.
///
/// Classic reservoir sampling: the first `capacity` samples fill the buffer,
/// after which sample `n` replaces a random slot with probability
/// `capacity / n`. Percentiles are computed over the reservoir.
pub struct Reservoir {
    samples: Vec<u64>,
    seen: u64,
    /// xorshift64 state for slot selection; seeded non-zero.
    rng: u64,
}

impl Reservoir {
    pub fn new() -> Self {
        Self {
            samples: Vec::with_capacity(RESERVOIR_CAPACITY),
            seen: 0,
            rng: 0x9E37_79B9_7F4A_7C15,
        }
    }

    fn next_random(&mut self) -> u64 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng = x;
        x
    }

    /// Offer one sample, keeping the reservoir uniform over all seen.
    pub fn offer(&mut self, value_ns: u64, capacity: usize) {
        self.seen += 1;
        if self.samples.len() < capacity {
            self.samples.push(value_ns);
            return;
        }
        let slot = self.next_random() % self.seen;
        if (slot as usize) < self.samples.len() {
            self.samples[slot as usize] = value_ns;
        }
    }

    /// Total samples offered (not just retained).
    pub fn seen(&self) -> u64 {
        self.seen
    }

    /// Percentile summary of the retained samples.
    pub fn percentiles(&self) -> LatencyStats {
        if self.samples.is_empty() {
            return LatencyStats::default();
        }
        let mut sorted = self.samples.clone();
        sorted.sort_unstable();
        let pick = |per_mille: usize| -> u64 {
            let idx = (sorted.len() * per_mille) / 1000;
            sorted[idx.min(sorted.len() - 1)]
        };
        LatencyStats {
            count: self.seen,
            p50_ns: pick(500),
            p95_ns: pick(950),
            p99_ns: pick(990),
            p999_ns: pick(999),
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.seen = 0;
    }
}

impl Default for Reservoir {
    fn default() -> Self {
        Self::new()
    }
}

/// Percentile summary (nanoseconds).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct LatencyStats {
    pub count: u64,
    pub p50_ns: u64,
    pub p95_ns: u64,
    pub p99_ns: u64,
    pub p999_ns: u64,
}

/// Process-wide metrics collector.
pub struct Collector {
    pub counters: Counters,
    pub serialize_latency: Mutex<Reservoir>,
    pub deserialize_latency: Mutex<Reservoir>,
}

impl Collector {
    pub fn new() -> Self {
        Self {
            counters: Counters::default(),
            serialize_latency: Mutex::new(Reservoir::new()),
            deserialize_latency: Mutex::new(Reservoir::new()),
        }
    }

    pub fn offer_serialize_ns(&self, ns: u64, capacity: usize) {
        if let Ok(mut reservoir) = self.serialize_latency.lock() {
            reservoir.offer(ns, capacity);
        }
    }

    pub fn offer_deserialize_ns(&self, ns: u64, capacity: usize) {
        if let Ok(mut reservoir) = self.deserialize_latency.lock() {
            reservoir.offer(ns, capacity);
        }
    }

    /// Copy counters and percentiles into an exportable snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        MetricsSnapshot {
            reads: load(&self.counters.reads),
            writes: load(&self.counters.writes),
            serializations: load(&self.counters.serializations),
            deserializations: load(&self.counters.deserializations),
            copies: load(&self.counters.copies),
            moves: load(&self.counters.moves),
            serialize_latency: self
                .serialize_latency
                .lock()
                .map(|r| r.percentiles())
                .unwrap_or_default(),
            deserialize_latency: self
                .deserialize_latency
                .lock()
                .map(|r| r.percentiles())
                .unwrap_or_default(),
        }
    }

    pub fn reset(&self) {
        self.counters.reads.store(0, Ordering::Relaxed);
        self.counters.writes.store(0, Ordering::Relaxed);
        self.counters.serializations.store(0, Ordering::Relaxed);
        self.counters.deserializations.store(0, Ordering::Relaxed);
        self.counters.copies.store(0, Ordering::Relaxed);
        self.counters.moves.store(0, Ordering::Relaxed);
        if let Ok(mut reservoir) = self.serialize_latency.lock() {
            reservoir.clear();
        }
        if let Ok(mut reservoir) = self.deserialize_latency.lock() {
            reservoir.clear();
        }
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time metrics, serializable for the JSON export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub reads: u64,
    pub writes: u64,
    pub serializations: u64,
    pub deserializations: u64,
    pub copies: u64,
    pub moves: u64,
    pub serialize_latency: LatencyStats,
    pub deserialize_latency: LatencyStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservoir_fills_then_samples() {
        let mut reservoir = Reservoir::new();
        for i in 0..100 {
            reservoir.offer(i, RESERVOIR_CAPACITY);
        }
        assert_eq!(reservoir.seen(), 100);
        let stats = reservoir.percentiles();
        assert!(stats.p50_ns >= 40 && stats.p50_ns <= 60);
        assert!(stats.p99_ns >= 95);
    }

    #[test]
    fn test_reservoir_bounded_by_capacity() {
        let mut reservoir = Reservoir::new();
        for i in 0..10_000 {
            reservoir.offer(i, 64);
        }
        assert_eq!(reservoir.seen(), 10_000);
        assert!(reservoir.samples.len() <= 64);
    }

    #[test]
    fn test_empty_reservoir_percentiles_are_zero() {
        let reservoir = Reservoir::new();
        assert_eq!(reservoir.percentiles(), LatencyStats::default());
    }

    #[test]
    fn test_collector_snapshot_counts() {
        let collector = Collector::new();
        collector.counters.reads.fetch_add(3, Ordering::Relaxed);
        collector.counters.writes.fetch_add(2, Ordering::Relaxed);
        collector.offer_serialize_ns(500, RESERVOIR_CAPACITY);

        let snap = collector.snapshot();
        assert_eq!(snap.reads, 3);
        assert_eq!(snap.writes, 2);
        assert_eq!(snap.serialize_latency.count, 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let collector = Collector::new();
        collector.counters.copies.fetch_add(5, Ordering::Relaxed);
        collector.offer_deserialize_ns(100, RESERVOIR_CAPACITY);
        collector.reset();
        let snap = collector.snapshot();
        assert_eq!(snap.copies, 0);
        assert_eq!(snap.deserialize_latency.count, 0);
    }
}
