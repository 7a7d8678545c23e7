// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev

//! MessagePack codec.
//!
//! Containers map onto a two-entry MessagePack map:
//!
//! ```text
//! {"header": {six string fields}, "values": [[name, kind, payload], ...]}
//! ```
//!
//! Every value triple carries its kind ordinal explicitly, so `long`/`llong`
//! survive even though MessagePack itself only knows "integer". Array
//! payloads are `[element_kind, [payload, ...]]`; `bytes` ride the bin
//! family, strings the str family. Typically 50-80% smaller than the JSON
//! form for the same logical input.

use super::MAX_NESTING_DEPTH;
use crate::container::{Container, Header};
use crate::error::{ErrorCode, ErrorInfo, Result};
use crate::value::{normalize_signed64, Value, ValueArray, ValueData, ValueKind};
use std::sync::Arc;

const MODULE: &str = "codec::msgpack";

fn err(details: impl Into<String>) -> ErrorInfo {
    ErrorInfo::with_details(ErrorCode::InvalidFormat, MODULE, details)
}

// ============================================================================
// Emission
// ============================================================================

/// Emit a container as MessagePack bytes.
pub fn encode(container: &Container) -> Result<Vec<u8>> {
    let mut visited = Vec::new();
    let tree = container_to_value(container, 0, &mut visited)?;
    let mut buf = Vec::with_capacity(128);
    rmpv::encode::write_value(&mut buf, &tree).map_err(|e| {
        ErrorInfo::with_details(ErrorCode::SerializationFailed, MODULE, e.to_string())
    })?;
    Ok(buf)
}

fn container_to_value(
    container: &Container,
    depth: usize,
    visited: &mut Vec<*const Container>,
) -> Result<rmpv::Value> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(err(format!("nesting exceeds {MAX_NESTING_DEPTH}")));
    }
    let ptr = container as *const Container;
    if visited.contains(&ptr) {
        return Err(err("reference cycle"));
    }
    visited.push(ptr);
    let result = container_body_to_value(container, depth, visited);
    visited.pop();
    result
}

fn container_body_to_value(
    container: &Container,
    depth: usize,
    visited: &mut Vec<*const Container>,
) -> Result<rmpv::Value> {
    let (header, entries) = container.export_state();
    let header_map = rmpv::Value::Map(vec![
        (rmpv::Value::from("source_id"), rmpv::Value::from(header.source_id.as_str())),
        (rmpv::Value::from("source_sub_id"), rmpv::Value::from(header.source_sub_id.as_str())),
        (rmpv::Value::from("target_id"), rmpv::Value::from(header.target_id.as_str())),
        (rmpv::Value::from("target_sub_id"), rmpv::Value::from(header.target_sub_id.as_str())),
        (rmpv::Value::from("message_type"), rmpv::Value::from(header.message_type.as_str())),
        (rmpv::Value::from("version"), rmpv::Value::from(header.version.as_str())),
    ]);

    let mut triples = Vec::with_capacity(entries.len());
    for entry in &entries {
        triples.push(value_to_triple(entry, depth, visited)?);
    }

    Ok(rmpv::Value::Map(vec![
        (rmpv::Value::from("header"), header_map),
        (rmpv::Value::from("values"), rmpv::Value::Array(triples)),
    ]))
}

fn value_to_triple(
    value: &Value,
    depth: usize,
    visited: &mut Vec<*const Container>,
) -> Result<rmpv::Value> {
    Ok(rmpv::Value::Array(vec![
        rmpv::Value::from(value.name()),
        rmpv::Value::from(value.kind().ordinal()),
        payload_to_value(value.data(), depth, visited)?,
    ]))
}

fn payload_to_value(
    data: &ValueData,
    depth: usize,
    visited: &mut Vec<*const Container>,
) -> Result<rmpv::Value> {
    Ok(match data {
        ValueData::Null => rmpv::Value::Nil,
        ValueData::Bool(v) => rmpv::Value::from(*v),
        ValueData::Short(v) => rmpv::Value::from(*v),
        ValueData::UShort(v) => rmpv::Value::from(*v),
        ValueData::Int(v) => rmpv::Value::from(*v),
        ValueData::UInt(v) => rmpv::Value::from(*v),
        ValueData::Long(v) | ValueData::LLong(v) => rmpv::Value::from(*v),
        ValueData::ULong(v) | ValueData::ULLong(v) => rmpv::Value::from(*v),
        ValueData::Float(v) => rmpv::Value::F32(*v),
        ValueData::Double(v) => rmpv::Value::F64(*v),
        ValueData::Bytes(b) => rmpv::Value::Binary(b.as_slice().to_vec()),
        ValueData::Str(s) => rmpv::Value::from(s.as_str()),
        ValueData::Container(inner) => container_to_value(inner, depth + 1, visited)?,
        ValueData::Array(array) => {
            let mut items = Vec::with_capacity(array.len());
            for item in array.items() {
                items.push(payload_to_value(item, depth, visited)?);
            }
            rmpv::Value::Array(vec![
                rmpv::Value::from(array.elem_kind().ordinal()),
                rmpv::Value::Array(items),
            ])
        }
    })
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse MessagePack bytes. Trailing bytes are rejected.
pub fn decode(bytes: &[u8]) -> Result<Container> {
    let mut reader = bytes;
    let tree = rmpv::decode::read_value(&mut reader).map_err(|e| {
        ErrorInfo::with_details(ErrorCode::DeserializationFailed, MODULE, e.to_string())
    })?;
    if !reader.is_empty() {
        return Err(ErrorInfo::with_details(
            ErrorCode::DeserializationFailed,
            MODULE,
            format!("{} trailing bytes", reader.len()),
        ));
    }
    value_to_container(&tree, 0)
}

fn map_get<'v>(map: &'v [(rmpv::Value, rmpv::Value)], key: &str) -> Option<&'v rmpv::Value> {
    map.iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v)
}

fn value_to_container(tree: &rmpv::Value, depth: usize) -> Result<Container> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(err(format!("nesting exceeds {MAX_NESTING_DEPTH}")));
    }
    let rmpv::Value::Map(map) = tree else {
        return Err(err("container is not a map"));
    };

    let header = match map_get(map, "header") {
        Some(node) => parse_header(node)?,
        None => Header::default(),
    };

    let mut entries = Vec::new();
    if let Some(node) = map_get(map, "values") {
        let rmpv::Value::Array(triples) = node else {
            return Err(err("values is not an array"));
        };
        for triple in triples {
            entries.push(Arc::new(parse_triple(triple, depth)?));
        }
    }

    Ok(Container::from_parts(header, entries))
}

fn parse_header(node: &rmpv::Value) -> Result<Header> {
    let rmpv::Value::Map(map) = node else {
        return Err(err("header is not a map"));
    };
    let field = |name: &str| -> Result<String> {
        match map_get(map, name) {
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

fn parse_triple(triple: &rmpv::Value, depth: usize) -> Result<Value> {
    let rmpv::Value::Array(parts) = triple else {
        return Err(err("value triple is not an array"));
    };
    let [name, kind, payload] = parts.as_slice() else {
        return Err(err(format!("value triple has {} parts", parts.len())));
    };
    let name = name.as_str().ok_or_else(|| err("value name is not a string"))?;
    if name.is_empty() {
        return Err(err("empty value name"));
    }
    let kind = parse_kind(kind)?;
    let data = parse_payload(payload, kind, depth, true)?;
    Ok(Value::new(name.to_string(), data))
}

fn parse_kind(node: &rmpv::Value) -> Result<ValueKind> {
    let ordinal = node
        .as_u64()
        .and_then(|v| u8::try_from(v).ok())
        .ok_or_else(|| err("kind ordinal is not a small integer"))?;
    ValueKind::from_ordinal(ordinal).ok_or_else(|| err(format!("unknown kind ordinal {ordinal}")))
}

fn int_from(node: &rmpv::Value) -> Option<i128> {
    node.as_i64()
        .map(i128::from)
        .or_else(|| node.as_u64().map(i128::from))
}

fn int_in_range<T: TryFrom<i128>>(node: &rmpv::Value, kind: ValueKind) -> Result<T> {
    let wide = int_from(node).ok_or_else(|| err(format!("{} payload is not an integer", kind.name())))?;
    T::try_from(wide).map_err(|_| err(format!("{wide} out of range for {}", kind.name())))
}

/// `normalize` applies the long/llong tag rule (off inside arrays).
fn parse_payload(
    node: &rmpv::Value,
    kind: ValueKind,
    depth: usize,
    normalize: bool,
) -> Result<ValueData> {
    Ok(match kind {
        ValueKind::Null => {
            if !node.is_nil() {
                return Err(err("null payload must be nil"));
            }
            ValueData::Null
        }
        ValueKind::Bool => {
            ValueData::Bool(node.as_bool().ok_or_else(|| err("bool payload"))?)
        }
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
        ValueKind::Float => match node {
            rmpv::Value::F32(v) => ValueData::Float(*v),
            _ => return Err(err("float payload is not f32")),
        },
        ValueKind::Double => match node {
            rmpv::Value::F64(v) => ValueData::Double(*v),
            _ => return Err(err("double payload is not f64")),
        },
        ValueKind::Bytes => match node {
            rmpv::Value::Binary(b) => ValueData::bytes(b),
            _ => return Err(err("bytes payload is not bin")),
        },
        ValueKind::String => {
            ValueData::string(node.as_str().ok_or_else(|| err("string payload"))?)
        }
        ValueKind::Container => {
            ValueData::Container(Arc::new(value_to_container(node, depth + 1)?))
        }
        ValueKind::Array => {
            let rmpv::Value::Array(parts) = node else {
                return Err(err("array payload is not an array"));
            };
            let [elem, items] = parts.as_slice() else {
                return Err(err("array payload must be [element_kind, items]"));
            };
            let elem = parse_kind(elem)?;
            let rmpv::Value::Array(items) = items else {
                return Err(err("array items is not an array"));
            };
            let mut decoded = Vec::with_capacity(items.len());
            for item in items {
                decoded.push(parse_payload(item, elem, depth, false)?);
            }
            ValueData::Array(ValueArray::new(elem, decoded)?)
        }
    })
}
