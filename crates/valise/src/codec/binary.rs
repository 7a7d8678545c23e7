// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev

//! Canonical binary wire form.
//!
//! Big-endian throughout; floats travel as their IEEE-754 bit patterns in
//! big-endian byte order. Layout:
//!
//! ```text
//! Container := Header Values
//! Header    := var_str source_id
//!              var_str source_sub_id
//!              var_str target_id
//!              var_str target_sub_id
//!              var_str message_type
//!              var_str version
//! Values    := uint32 count, Value{count}
//! Value     := uint8 kind_ordinal, var_str name, Payload(kind)
//! var_str   := uint32 length, bytes
//! ```
//!
//! Scalar payloads are raw fixed-width bits; `bytes`/`string` are
//! length-prefixed; `container` recurses; `array` is
//! `uint8 element_kind, uint32 n, Payload(element_kind){n}`.
//!
//! Nesting is bounded by [`MAX_NESTING_DEPTH`]; emission detects reference
//! cycles with a visited set. Both conditions are `InvalidFormat`;
//! truncation is `DeserializationFailed`.

use super::cursor::Cursor;
use super::MAX_NESTING_DEPTH;
use crate::container::{Container, Header};
use crate::error::{ErrorCode, ErrorInfo, Result, VoidResult};
use crate::value::{normalize_signed64, SmallBuf, SmallStr, Value, ValueArray, ValueData, ValueKind};
use std::sync::Arc;

const MODULE: &str = "codec::binary";

// ============================================================================
// Emission
// ============================================================================

struct Encoder {
    buf: Vec<u8>,
    /// Containers on the current recursion path (cycle detection).
    visited: Vec<*const Container>,
}

impl Encoder {
    fn new() -> Self {
        Self {
            buf: Vec::with_capacity(256),
            visited: Vec::new(),
        }
    }

    fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    fn write_u32_be(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    fn write_var_bytes(&mut self, bytes: &[u8]) -> VoidResult {
        let len = u32::try_from(bytes.len()).map_err(|_| {
            ErrorInfo::with_details(ErrorCode::SerializationFailed, MODULE, "payload exceeds u32 length")
        })?;
        self.write_u32_be(len);
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn write_var_str(&mut self, s: &str) -> VoidResult {
        self.write_var_bytes(s.as_bytes())
    }

    fn write_container(&mut self, container: &Container, depth: usize) -> VoidResult {
        if depth >= MAX_NESTING_DEPTH {
            return Err(ErrorInfo::with_details(
                ErrorCode::InvalidFormat,
                MODULE,
                format!("nesting exceeds {MAX_NESTING_DEPTH}"),
            ));
        }
        let ptr = container as *const Container;
        if self.visited.contains(&ptr) {
            return Err(ErrorInfo::with_details(
                ErrorCode::InvalidFormat,
                MODULE,
                "reference cycle",
            ));
        }
        self.visited.push(ptr);
        let result = self.write_container_body(container, depth);
        self.visited.pop();
        result
    }

    fn write_container_body(&mut self, container: &Container, depth: usize) -> VoidResult {
        let (header, entries) = container.export_state();
        self.write_header(&header)?;
        let count = u32::try_from(entries.len()).map_err(|_| {
            ErrorInfo::with_details(ErrorCode::SerializationFailed, MODULE, "too many values")
        })?;
        self.write_u32_be(count);
        for entry in &entries {
            self.write_value(entry, depth)?;
        }
        Ok(())
    }

    fn write_header(&mut self, header: &Header) -> VoidResult {
        self.write_var_str(&header.source_id)?;
        self.write_var_str(&header.source_sub_id)?;
        self.write_var_str(&header.target_id)?;
        self.write_var_str(&header.target_sub_id)?;
        self.write_var_str(&header.message_type)?;
        self.write_var_str(&header.version)
    }

    fn write_value(&mut self, value: &Value, depth: usize) -> VoidResult {
        self.write_u8(value.kind().ordinal());
        self.write_var_str(value.name())?;
        self.write_payload(value.data(), depth)
    }

    fn write_payload(&mut self, data: &ValueData, depth: usize) -> VoidResult {
        match data {
            ValueData::Null => {}
            ValueData::Bool(v) => self.write_u8(u8::from(*v)),
            ValueData::Short(v) => self.buf.extend_from_slice(&v.to_be_bytes()),
            ValueData::UShort(v) => self.buf.extend_from_slice(&v.to_be_bytes()),
            ValueData::Int(v) => self.buf.extend_from_slice(&v.to_be_bytes()),
            ValueData::UInt(v) => self.buf.extend_from_slice(&v.to_be_bytes()),
            ValueData::Long(v) | ValueData::LLong(v) => {
                self.buf.extend_from_slice(&v.to_be_bytes());
            }
            ValueData::ULong(v) | ValueData::ULLong(v) => {
                self.buf.extend_from_slice(&v.to_be_bytes());
            }
            ValueData::Float(v) => self.write_u32_be(v.to_bits()),
            ValueData::Double(v) => self.buf.extend_from_slice(&v.to_bits().to_be_bytes()),
            ValueData::Bytes(b) => self.write_var_bytes(b.as_slice())?,
            ValueData::Str(s) => self.write_var_str(s.as_str())?,
            ValueData::Container(inner) => self.write_container(inner, depth + 1)?,
            ValueData::Array(array) => {
                self.write_u8(array.elem_kind().ordinal());
                let n = u32::try_from(array.len()).map_err(|_| {
                    ErrorInfo::with_details(ErrorCode::SerializationFailed, MODULE, "array too long")
                })?;
                self.write_u32_be(n);
                for item in array.items() {
                    self.write_payload(item, depth)?;
                }
            }
        }
        Ok(())
    }
}

/// Emit the canonical wire form.
pub fn encode(container: &Container) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new();
    encoder.write_container(container, 0)?;
    Ok(encoder.buf)
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse the canonical wire form. Trailing bytes are rejected.
pub fn decode(bytes: &[u8]) -> Result<Container> {
    let mut cursor = Cursor::new(bytes);
    let container = decode_container(&mut cursor, 0)?;
    if !cursor.is_eof() {
        return Err(ErrorInfo::with_details(
            ErrorCode::DeserializationFailed,
            MODULE,
            format!("{} trailing bytes", cursor.remaining()),
        ));
    }
    Ok(container)
}

pub(crate) fn decode_container(cursor: &mut Cursor<'_>, depth: usize) -> Result<Container> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(ErrorInfo::with_details(
            ErrorCode::InvalidFormat,
            MODULE,
            format!("nesting exceeds {MAX_NESTING_DEPTH}"),
        ));
    }
    let header = decode_header(cursor)?;
    let count = cursor.read_u32_be()? as usize;
    let mut entries = Vec::with_capacity(count.min(4096));
    for _ in 0..count {
        entries.push(Arc::new(decode_value(cursor, depth)?));
    }
    Ok(Container::from_parts(header, entries))
}

pub(crate) fn decode_header(cursor: &mut Cursor<'_>) -> Result<Header> {
    Ok(Header {
        source_id: cursor.read_var_str()?.to_string(),
        source_sub_id: cursor.read_var_str()?.to_string(),
        target_id: cursor.read_var_str()?.to_string(),
        target_sub_id: cursor.read_var_str()?.to_string(),
        message_type: cursor.read_var_str()?.to_string(),
        version: cursor.read_var_str()?.to_string(),
    })
}

fn decode_value(cursor: &mut Cursor<'_>, depth: usize) -> Result<Value> {
    let kind = read_kind(cursor)?;
    let name = cursor.read_var_str()?;
    if name.is_empty() {
        return Err(ErrorInfo::with_details(
            ErrorCode::InvalidFormat,
            MODULE,
            "empty value name",
        ));
    }
    let name = name.to_string();
    let data = decode_payload(cursor, kind, depth, true)?;
    Ok(Value::new(name, data))
}

pub(crate) fn read_kind(cursor: &mut Cursor<'_>) -> Result<ValueKind> {
    let at = cursor.offset();
    let ordinal = cursor.read_u8()?;
    ValueKind::from_ordinal(ordinal).ok_or_else(|| {
        ErrorInfo::with_details(
            ErrorCode::InvalidFormat,
            MODULE,
            format!("unknown kind ordinal {ordinal} at offset {at}"),
        )
    })
}

/// `normalize` applies the long/llong tag rule for standalone values; array
/// elements keep the declared element kind so homogeneity survives decode.
fn decode_payload(
    cursor: &mut Cursor<'_>,
    kind: ValueKind,
    depth: usize,
    normalize: bool,
) -> Result<ValueData> {
    Ok(match kind {
        ValueKind::Null => ValueData::Null,
        ValueKind::Bool => match cursor.read_u8()? {
            0 => ValueData::Bool(false),
            1 => ValueData::Bool(true),
            other => {
                return Err(ErrorInfo::with_details(
                    ErrorCode::InvalidFormat,
                    MODULE,
                    format!("bool payload {other}"),
                ))
            }
        },
        ValueKind::Short => ValueData::Short(cursor.read_i16_be()?),
        ValueKind::UShort => ValueData::UShort(cursor.read_u16_be()?),
        ValueKind::Int => ValueData::Int(cursor.read_i32_be()?),
        ValueKind::UInt => ValueData::UInt(cursor.read_u32_be()?),
        ValueKind::Long | ValueKind::LLong => {
            let raw = cursor.read_i64_be()?;
            let restored = if normalize {
                normalize_signed64(kind, raw)
            } else {
                kind
            };
            match restored {
                ValueKind::Long => ValueData::Long(raw),
                _ => ValueData::LLong(raw),
            }
        }
        ValueKind::ULong => ValueData::ULong(cursor.read_u64_be()?),
        ValueKind::ULLong => ValueData::ULLong(cursor.read_u64_be()?),
        ValueKind::Float => ValueData::Float(cursor.read_f32_be()?),
        ValueKind::Double => ValueData::Double(cursor.read_f64_be()?),
        ValueKind::Bytes => ValueData::Bytes(SmallBuf::from_slice(cursor.read_var_bytes()?)),
        ValueKind::String => ValueData::Str(SmallStr::from_str(cursor.read_var_str()?)),
        ValueKind::Container => {
            ValueData::Container(Arc::new(decode_container(cursor, depth + 1)?))
        }
        ValueKind::Array => {
            let elem = read_kind(cursor)?;
            let n = cursor.read_u32_be()? as usize;
            // A non-null element consumes at least one byte, which bounds n.
            if elem != ValueKind::Null && n > cursor.remaining() {
                return Err(ErrorInfo::with_details(
                    ErrorCode::DeserializationFailed,
                    MODULE,
                    format!("array length {n} exceeds remaining input"),
                ));
            }
            let mut items = Vec::with_capacity(n.min(4096));
            for _ in 0..n {
                items.push(decode_payload(cursor, elem, depth, false)?);
            }
            ValueData::Array(ValueArray::new(elem, items)?)
        }
    })
}
