// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev

//! # valise - typed heterogeneous containers with pluggable serialization
//!
//! A high-performance, thread-safe key-value container intended as the
//! shared in-memory data model between messaging, networking, and
//! persistence subsystems. A container carries an addressing header
//! (source/target endpoints, message type, version) and an ordered set of
//! named, kind-tagged values: scalars, byte blobs, strings, homogeneous
//! arrays, and nested containers.
//!
//! ## Quick Start
//!
//! ```rust
//! use valise::{Container, Result};
//!
//! fn main() -> Result<()> {
//!     let container = Container::builder()
//!         .source("gateway-7", "ingest")
//!         .target("store-1", "wal")
//!         .message_type("sensor_report")
//!         .version("1.2")
//!         .value("temperature", 23.5f64)
//!         .value("unit", "celsius")
//!         .build()?;
//!
//!     // Round-trip through any codec.
//!     let wire = container.to_bytes()?;
//!     let restored = Container::from_bytes(&wire)?;
//!     assert_eq!(container, restored);
//!
//!     // Typed access.
//!     let temperature: f64 = restored.get("temperature")?;
//!     assert_eq!(temperature, 23.5);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------------+
//! |                        Application Layer                           |
//! |     builders -> Container -> typed get / batch ops / schemas       |
//! +--------------------------------------------------------------------+
//! |                        Concurrency Layer                           |
//! |  RwLock shared/exclusive | RCU snapshots | epoch reclamation       |
//! +--------------------------------------------------------------------+
//! |                          Codec Layer                               |
//! |  canonical binary | JSON | XML | MessagePack | zero-copy views     |
//! +--------------------------------------------------------------------+
//! |                         Support Layer                              |
//! |  block pools | telemetry counters/histograms | async file surface  |
//! +--------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Container`] | Ordered, hash-indexed, thread-safe value collection |
//! | [`Value`] / [`ValueData`] | Named, kind-tagged datum (16 kinds) |
//! | [`SnapshotReader`] | Wait-free reads over an epoch-published snapshot |
//! | [`ContainerView`] | Zero-copy lazy view over serialized bytes |
//! | [`Schema`] | Declarative validation (ranges, patterns, nesting) |
//! | [`ErrorInfo`] | Stable coded error carried by every fallible API |
//!
//! ## Concurrency
//!
//! Containers are always thread-safe: writers take the exclusive lock,
//! locked readers share it, and [`Container::snapshot_reader`] serves
//! wait-free reads from the last published snapshot (crossbeam-epoch
//! reclaims retired snapshots after a grace period). Batch APIs acquire
//! the lock once per call; `update_batch_if` is all-or-nothing.
//!
//! ## Modules Overview
//!
//! - [`container`] - the container, batch ops, snapshots (start here)
//! - [`value`] - value kinds, tagged storage, typed extraction
//! - [`codec`] - the four codecs, format detection, zero-copy views
//! - [`schema`] - declarative validation
//! - [`pool`] - thread-local fixed-block pools
//! - [`telemetry`] - process-wide counters, latency reservoirs, exporters
//! - `aio` - async serialize/file surface (feature `async`, default on)

pub mod codec;
pub mod container;
pub mod error;
pub mod pool;
pub mod schema;
pub mod telemetry;
pub mod value;

#[cfg(feature = "async")]
pub mod aio;

pub use codec::{detect_format, ContainerView, Format, ValueView, MAX_NESTING_DEPTH};
pub use container::{
    CasSpec, Container, ContainerBuilder, Header, SnapshotReader, StatsSnapshot,
};
pub use error::{ErrorCode, ErrorInfo, Result, VoidResult};
pub use schema::{Schema, ValidationError, ValidationErrorKind};
pub use value::{
    normalize_signed64, FromValue, Storage, Value, ValueArray, ValueData, ValueKind,
};
