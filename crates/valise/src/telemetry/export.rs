// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev

//! Metrics export: JSON and Prometheus exposition text.

use super::metrics::{LatencyStats, MetricsSnapshot};
use crate::error::{ErrorCode, ErrorInfo, Result};
use std::fmt::Write;

/// Render a snapshot as a JSON object.
pub fn to_json(snapshot: &MetricsSnapshot) -> Result<String> {
    serde_json::to_string(snapshot).map_err(|err| {
        ErrorInfo::with_details(ErrorCode::SerializationFailed, "telemetry::export", err.to_string())
    })
}

/// Render a snapshot in the Prometheus text exposition format.
///
/// Counters become `valise_<name>_total`; each latency reservoir becomes a
/// summary with quantile labels plus a `_count` series.
pub fn to_prometheus(snapshot: &MetricsSnapshot) -> String {
    let mut out = String::with_capacity(1024);

    let mut counter = |name: &str, help: &str, value: u64| {
        let _ = writeln!(out, "# HELP valise_{name}_total {help}");
        let _ = writeln!(out, "# TYPE valise_{name}_total counter");
        let _ = writeln!(out, "valise_{name}_total {value}");
    };
    counter("reads", "Value reads served.", snapshot.reads);
    counter("writes", "Mutations applied.", snapshot.writes);
    counter("serializations", "Codec emissions.", snapshot.serializations);
    counter("deserializations", "Codec parses.", snapshot.deserializations);
    counter("copies", "Deep value copies.", snapshot.copies);
    counter("moves", "Values moved into containers.", snapshot.moves);

    summary(&mut out, "serialize_latency_ns", &snapshot.serialize_latency);
    summary(&mut out, "deserialize_latency_ns", &snapshot.deserialize_latency);
    out
}

fn summary(out: &mut String, name: &str, stats: &LatencyStats) {
    let _ = writeln!(out, "# TYPE valise_{name} summary");
    let _ = writeln!(out, "valise_{name}{{quantile=\"0.5\"}} {}", stats.p50_ns);
    let _ = writeln!(out, "valise_{name}{{quantile=\"0.95\"}} {}", stats.p95_ns);
    let _ = writeln!(out, "valise_{name}{{quantile=\"0.99\"}} {}", stats.p99_ns);
    let _ = writeln!(out, "valise_{name}{{quantile=\"0.999\"}} {}", stats.p999_ns);
    let _ = writeln!(out, "valise_{name}_count {}", stats.count);
}
