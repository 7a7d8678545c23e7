// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev

//! RFC 8259 JSON codec.
//!
//! Emission is hand-written for determinism: fields come out in a fixed
//! order, floats use the shortest round-trip form, and every string escapes
//! `"`, `\`, and all of U+0000..U+001F (short escapes where RFC 8259 names
//! one, `\uXXXX` otherwise). Layout:
//!
//! ```json
//! {"header":{"source_id":"...","source_sub_id":"...","target_id":"...",
//!            "target_sub_id":"...","message_type":"...","version":"..."},
//!  "values":[{"name":"msg","type":"string","data":"hello"}]}
//! ```
//!
//! `bytes` payloads ride as `"base64:<payload>"`; nested containers emit as
//! an object with `header` and `values`; arrays emit as a JSON array of
//! typed records plus an `element_type` tag on the value record (which is
//! what lets an empty array restore its element kind).
//!
//! Parsing accepts the canonical emission plus any field order and JSON
//! whitespace; the `values` array order restores insertion order, including
//! duplicates.

use super::MAX_NESTING_DEPTH;
use crate::container::{Container, Header};
use crate::error::{ErrorCode, ErrorInfo, Result, VoidResult};
use crate::value::{normalize_signed64, Value, ValueArray, ValueData, ValueKind};
use base64::Engine as _;
use std::fmt::Write as _;
use std::sync::Arc;

const MODULE: &str = "codec::json";

/// Prefix carried by `bytes` payloads in their string form.
const BYTES_PREFIX: &str = "base64:";

fn err(details: impl Into<String>) -> ErrorInfo {
    ErrorInfo::with_details(ErrorCode::InvalidFormat, MODULE, details)
}

// ============================================================================
// Emission
// ============================================================================

/// Append `s` with RFC 8259 escaping.
fn escape_into(out: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    escape_into(out, s);
    out.push('"');
}

fn write_f32(out: &mut String, v: f32) -> VoidResult {
    if !v.is_finite() {
        return Err(ErrorInfo::with_details(
            ErrorCode::SerializationFailed,
            MODULE,
            "non-finite float has no JSON form",
        ));
    }
    let _ = write!(out, "{v}");
    Ok(())
}

fn write_f64(out: &mut String, v: f64) -> VoidResult {
    if !v.is_finite() {
        return Err(ErrorInfo::with_details(
            ErrorCode::SerializationFailed,
            MODULE,
            "non-finite double has no JSON form",
        ));
    }
    let _ = write!(out, "{v}");
    Ok(())
}

/// Emit a container as canonical JSON text.
pub fn encode(container: &Container) -> Result<String> {
    let mut out = String::with_capacity(256);
    let mut visited = Vec::new();
    write_container(&mut out, container, 0, &mut visited)?;
    Ok(out)
}

fn write_container(
    out: &mut String,
    container: &Container,
    depth: usize,
    visited: &mut Vec<*const Container>,
) -> VoidResult {
    if depth >= MAX_NESTING_DEPTH {
        return Err(err(format!("nesting exceeds {MAX_NESTING_DEPTH}")));
    }
    let ptr = container as *const Container;
    if visited.contains(&ptr) {
        return Err(err("reference cycle"));
    }
    visited.push(ptr);
    let result = write_container_body(out, container, depth, visited);
    visited.pop();
    result
}

fn write_container_body(
    out: &mut String,
    container: &Container,
    depth: usize,
    visited: &mut Vec<*const Container>,
) -> VoidResult {
    let (header, entries) = container.export_state();
    out.push_str("{\"header\":{");
    let fields = [
        ("source_id", &header.source_id),
        ("source_sub_id", &header.source_sub_id),
        ("target_id", &header.target_id),
        ("target_sub_id", &header.target_sub_id),
        ("message_type", &header.message_type),
        ("version", &header.version),
    ];
    for (i, (name, value)) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_string(out, name);
        out.push(':');
        write_string(out, value);
    }
    out.push_str("},\"values\":[");
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_value(out, entry, depth, visited)?;
    }
    out.push_str("]}");
    Ok(())
}

fn write_value(
    out: &mut String,
    value: &Value,
    depth: usize,
    visited: &mut Vec<*const Container>,
) -> VoidResult {
    out.push_str("{\"name\":");
    write_string(out, value.name());
    out.push_str(",\"type\":");
    write_string(out, value.kind().name());
    if let ValueData::Array(array) = value.data() {
        out.push_str(",\"element_type\":");
        write_string(out, array.elem_kind().name());
    }
    out.push_str(",\"data\":");
    write_payload(out, value.data(), depth, visited)?;
    out.push('}');
    Ok(())
}

fn write_payload(
    out: &mut String,
    data: &ValueData,
    depth: usize,
    visited: &mut Vec<*const Container>,
) -> VoidResult {
    match data {
        ValueData::Null => out.push_str("null"),
        ValueData::Bool(v) => out.push_str(if *v { "true" } else { "false" }),
        ValueData::Short(v) => {
            let _ = write!(out, "{v}");
        }
        ValueData::UShort(v) => {
            let _ = write!(out, "{v}");
        }
        ValueData::Int(v) => {
            let _ = write!(out, "{v}");
        }
        ValueData::UInt(v) => {
            let _ = write!(out, "{v}");
        }
        ValueData::Long(v) | ValueData::LLong(v) => {
            let _ = write!(out, "{v}");
        }
        ValueData::ULong(v) | ValueData::ULLong(v) => {
            let _ = write!(out, "{v}");
        }
        ValueData::Float(v) => write_f32(out, *v)?,
        ValueData::Double(v) => write_f64(out, *v)?,
        ValueData::Bytes(b) => {
            out.push('"');
            out.push_str(BYTES_PREFIX);
            out.push_str(&base64::engine::general_purpose::STANDARD.encode(b.as_slice()));
            out.push('"');
        }
        ValueData::Str(s) => write_string(out, s.as_str()),
        ValueData::Container(inner) => write_container(out, inner, depth + 1, visited)?,
        ValueData::Array(array) => {
            out.push('[');
            for (i, item) in array.items().iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str("{\"type\":");
                write_string(out, array.elem_kind().name());
                if let ValueData::Array(nested) = item {
                    out.push_str(",\"element_type\":");
                    write_string(out, nested.elem_kind().name());
                }
                out.push_str(",\"data\":");
                write_payload(out, item, depth, visited)?;
                out.push('}');
            }
            out.push(']');
        }
    }
    Ok(())
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse JSON text (canonical or relaxed field order/whitespace).
pub fn decode(text: &str) -> Result<Container> {
    let root: serde_json::Value = serde_json::from_str(text).map_err(|e| {
        ErrorInfo::with_details(ErrorCode::DeserializationFailed, MODULE, e.to_string())
    })?;
    parse_container(&root, 0)
}

fn parse_container(node: &serde_json::Value, depth: usize) -> Result<Container> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(err(format!("nesting exceeds {MAX_NESTING_DEPTH}")));
    }
    let obj = node.as_object().ok_or_else(|| err("container is not an object"))?;

    let header = match obj.get("header") {
        Some(node) => parse_header(node)?,
        None => Header::default(),
    };

    let mut values = Vec::new();
    if let Some(node) = obj.get("values") {
        let records = node.as_array().ok_or_else(|| err("values is not an array"))?;
        for record in records {
            values.push(parse_value(record, depth)?);
        }
    }

    let entries: Vec<Arc<Value>> = values.into_iter().map(Arc::new).collect();
    Ok(Container::from_parts(header, entries))
}

fn parse_header(node: &serde_json::Value) -> Result<Header> {
    let obj = node.as_object().ok_or_else(|| err("header is not an object"))?;
    let field = |name: &str| -> Result<String> {
        match obj.get(name) {
            Some(value) => value
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| err(format!("header field {name} is not a string"))),
            None => Ok(String::new()),
        }
    };
    Ok(Header {
        source_id: field("source_id")?,
        source_sub_id: field("source_sub_id")?,
        target_id: field("target_id")?,
        target_sub_id: field("target_sub_id")?,
        message_type: field("message_type")?,
        version: field("version")?,
    })
}

fn parse_value(node: &serde_json::Value, depth: usize) -> Result<Value> {
    let obj = node.as_object().ok_or_else(|| err("value record is not an object"))?;
    let name = obj
        .get("name")
        .and_then(|n| n.as_str())
        .ok_or_else(|| err("value record missing name"))?;
    if name.is_empty() {
        return Err(err("empty value name"));
    }
    let kind = parse_kind(obj)?;
    let null = serde_json::Value::Null;
    let data = obj.get("data").unwrap_or(&null);
    let payload = parse_payload(data, kind, obj, depth, true)?;
    Ok(Value::new(name.to_string(), payload))
}

fn parse_kind(obj: &serde_json::Map<String, serde_json::Value>) -> Result<ValueKind> {
    let tag = obj
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or_else(|| err("value record missing type"))?;
    ValueKind::from_name(tag).ok_or_else(|| err(format!("unknown type tag {tag:?}")))
}

fn int_in_range<T>(node: &serde_json::Value, kind: ValueKind) -> Result<T>
where
    T: TryFrom<i128>,
{
    let wide = if let Some(v) = node.as_i64() {
        i128::from(v)
    } else if let Some(v) = node.as_u64() {
        i128::from(v)
    } else {
        return Err(err(format!("{} payload is not an integer", kind.name())));
    };
    T::try_from(wide).map_err(|_| err(format!("{wide} out of range for {}", kind.name())))
}

/// `record` supplies array metadata (`element_type`) for array payloads;
/// `normalize` applies the long/llong tag rule (off inside arrays).
fn parse_payload(
    node: &serde_json::Value,
    kind: ValueKind,
    record: &serde_json::Map<String, serde_json::Value>,
    depth: usize,
    normalize: bool,
) -> Result<ValueData> {
    Ok(match kind {
        ValueKind::Null => {
            if !node.is_null() {
                return Err(err("null payload must be JSON null"));
            }
            ValueData::Null
        }
        ValueKind::Bool => ValueData::Bool(node.as_bool().ok_or_else(|| err("bool payload"))?),
        ValueKind::Short => ValueData::Short(int_in_range(node, kind)?),
        ValueKind::UShort => ValueData::UShort(int_in_range(node, kind)?),
        ValueKind::Int => ValueData::Int(int_in_range(node, kind)?),
        ValueKind::UInt => ValueData::UInt(int_in_range(node, kind)?),
        ValueKind::Long | ValueKind::LLong => {
            let raw: i64 = int_in_range(node, kind)?;
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
        ValueKind::ULong => ValueData::ULong(int_in_range(node, kind)?),
        ValueKind::ULLong => ValueData::ULLong(int_in_range(node, kind)?),
        ValueKind::Float => {
            let v = node.as_f64().ok_or_else(|| err("float payload"))?;
            ValueData::Float(v as f32)
        }
        ValueKind::Double => {
            ValueData::Double(node.as_f64().ok_or_else(|| err("double payload"))?)
        }
        ValueKind::Bytes => {
            let text = node.as_str().ok_or_else(|| err("bytes payload is not a string"))?;
            let encoded = text
                .strip_prefix(BYTES_PREFIX)
                .ok_or_else(|| err("bytes payload missing base64: prefix"))?;
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| err(format!("bad base64: {e}")))?;
            ValueData::from(decoded)
        }
        ValueKind::String => {
            ValueData::string(node.as_str().ok_or_else(|| err("string payload"))?)
        }
        ValueKind::Container => ValueData::Container(Arc::new(parse_container(node, depth + 1)?)),
        ValueKind::Array => {
            let elem = record
                .get("element_type")
                .and_then(|t| t.as_str())
                .map(|tag| ValueKind::from_name(tag).ok_or_else(|| err(format!("unknown element type {tag:?}"))))
                .transpose()?;
            let records = node.as_array().ok_or_else(|| err("array payload"))?;
            // Emission always writes element_type; tolerate its absence when
            // the first record can supply the kind.
            let elem = match elem {
                Some(kind) => kind,
                None => match records.first() {
                    Some(first) => parse_kind(
                        first.as_object().ok_or_else(|| err("array record is not an object"))?,
                    )?,
                    None => return Err(err("array without element_type")),
                },
            };
            let null = serde_json::Value::Null;
            let mut items = Vec::with_capacity(records.len());
            for record in records {
                let obj = record
                    .as_object()
                    .ok_or_else(|| err("array record is not an object"))?;
                let tagged = parse_kind(obj)?;
                if tagged != elem {
                    return Err(err(format!(
                        "array element tagged {} in {} array",
                        tagged.name(),
                        elem.name()
                    )));
                }
                let data = obj.get("data").unwrap_or(&null);
                items.push(parse_payload(data, elem, obj, depth, false)?);
            }
            ValueData::Array(ValueArray::new(elem, items)?)
        }
    })
}
