// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev

//! Serialization engines and format detection.
//!
//! Four codecs share one logical value model: the canonical binary wire form,
//! RFC 8259 JSON, XML 1.0, and MessagePack. Emission is deterministic for a
//! given logical input (insertion order preserved, shortest-form floats in
//! the textual codecs, no optional framing in binary), so byte-stable
//! round-trips hold for every codec.

pub mod binary;
mod cursor;
pub mod json;
pub mod msgpack;
pub mod view;
pub mod xml;

pub use view::{ContainerView, ValueView};

use crate::container::Container;
use crate::error::Result;
use crate::telemetry;

/// Nested container depth accepted by every codec; one level beyond fails
/// with `InvalidFormat`.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Serialization format, as produced by [`detect_format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Binary,
    Json,
    Xml,
    MessagePack,
}

/// Classify a payload by magic-byte heuristics.
///
/// The canonical binary form opens with the big-endian length of
/// `source_id`; any id shorter than 16 MiB therefore puts `0x00` in the
/// first byte, which no other supported format can start with. MessagePack
/// containers open with a map marker, JSON with `{`/`[` (whitespace
/// allowed), XML with `<`.
pub fn detect_format(bytes: &[u8]) -> Option<Format> {
    if bytes.is_empty() {
        return None;
    }
    if bytes[0] == 0x00 {
        return Some(Format::Binary);
    }
    if matches!(bytes[0], 0x80..=0x8f | 0xde | 0xdf) {
        return Some(Format::MessagePack);
    }
    let first = bytes.iter().copied().find(|b| !b.is_ascii_whitespace())?;
    match first {
        b'{' | b'[' => Some(Format::Json),
        b'<' => Some(Format::Xml),
        _ => None,
    }
}

impl Container {
    /// Emit the canonical binary wire form.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let clock = telemetry::clock_start();
        let bytes = binary::encode(self);
        telemetry::record_serialization(clock);
        bytes
    }

    /// Parse the canonical binary wire form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let clock = telemetry::clock_start();
        let container = binary::decode(bytes);
        telemetry::record_deserialization(clock);
        container
    }

    /// Emit RFC 8259 JSON.
    pub fn to_json(&self) -> Result<String> {
        let clock = telemetry::clock_start();
        let text = json::encode(self);
        telemetry::record_serialization(clock);
        text
    }

    /// Parse JSON (canonical emission or any field order/whitespace).
    pub fn from_json(text: &str) -> Result<Self> {
        let clock = telemetry::clock_start();
        let container = json::decode(text);
        telemetry::record_deserialization(clock);
        container
    }

    /// Emit XML 1.0 with entity encoding.
    pub fn to_xml(&self) -> Result<String> {
        let clock = telemetry::clock_start();
        let text = xml::encode(self);
        telemetry::record_serialization(clock);
        text
    }

    /// Parse the XML layout emitted by [`to_xml`](Self::to_xml).
    pub fn from_xml(text: &str) -> Result<Self> {
        let clock = telemetry::clock_start();
        let container = xml::decode(text);
        telemetry::record_deserialization(clock);
        container
    }

    /// Emit MessagePack.
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        let clock = telemetry::clock_start();
        let bytes = msgpack::encode(self);
        telemetry::record_serialization(clock);
        bytes
    }

    /// Parse MessagePack.
    pub fn from_msgpack(bytes: &[u8]) -> Result<Self> {
        let clock = telemetry::clock_start();
        let container = msgpack::decode(bytes);
        telemetry::record_deserialization(clock);
        container
    }

    /// Parse any supported format, dispatching on [`detect_format`].
    pub fn deserialize_auto(bytes: &[u8]) -> Result<Self> {
        use crate::error::{ErrorCode, ErrorInfo};
        match detect_format(bytes) {
            Some(Format::Binary) => Self::from_bytes(bytes),
            Some(Format::MessagePack) => Self::from_msgpack(bytes),
            Some(Format::Json) => {
                let text = std::str::from_utf8(bytes).map_err(|err| {
                    ErrorInfo::with_details(ErrorCode::InvalidFormat, "codec", err.to_string())
                })?;
                Self::from_json(text)
            }
            Some(Format::Xml) => {
                let text = std::str::from_utf8(bytes).map_err(|err| {
                    ErrorInfo::with_details(ErrorCode::InvalidFormat, "codec", err.to_string())
                })?;
                Self::from_xml(text)
            }
            None => Err(ErrorInfo::with_details(
                ErrorCode::InvalidFormat,
                "codec",
                "unrecognized payload",
            )),
        }
    }
}
