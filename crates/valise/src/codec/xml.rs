// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev

//! XML 1.0 codec.
//!
//! Emission encodes `& < > " '` as named entities and control characters
//! 0x00-0x1F (except TAB/LF/CR) as numeric character references, applied to
//! all string values and header fields. Attribute values additionally
//! reference TAB/LF/CR numerically so parsers cannot whitespace-normalize
//! them away. Layout:
//!
//! ```text
//! <container>
//!   <header><source_id>..</source_id> .. <version>..</version></header>
//!   <values>
//!     <value type="int" name="x">42</value>
//!     <value type="array" name="xs" element_type="double"><item>0.5</item></value>
//!   </values>
//! </container>
//! ```
//!
//! `bytes` payloads ride as base64 text; nested containers nest a
//! `<container>` element inside their `<value>`.
//!
//! Parsing accepts documents in this layout via roxmltree. Control
//! characters below 0x20 other than TAB/LF/CR are not valid XML 1.0
//! document characters, so they exist on the emit side only.

use super::MAX_NESTING_DEPTH;
use crate::container::{Container, Header};
use crate::error::{ErrorCode, ErrorInfo, Result, VoidResult};
use crate::value::{normalize_signed64, Value, ValueArray, ValueData, ValueKind};
use base64::Engine as _;
use std::fmt::Write as _;
use std::sync::Arc;

const MODULE: &str = "codec::xml";

fn err(details: impl Into<String>) -> ErrorInfo {
    ErrorInfo::with_details(ErrorCode::InvalidFormat, MODULE, details)
}

// ============================================================================
// Emission
// ============================================================================

fn escape_text(out: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "&#x{:X};", c as u32);
            }
            c => out.push(c),
        }
    }
}

/// Attribute form: TAB/LF/CR become references too, so attribute-value
/// normalization cannot rewrite them into spaces.
fn escape_attr(out: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "&#x{:X};", c as u32);
            }
            c => out.push(c),
        }
    }
}

fn write_element(out: &mut String, tag: &str, text: &str) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    escape_text(out, text);
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

/// Emit a container as XML text.
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
    out.push_str("<container><header>");
    write_element(out, "source_id", &header.source_id);
    write_element(out, "source_sub_id", &header.source_sub_id);
    write_element(out, "target_id", &header.target_id);
    write_element(out, "target_sub_id", &header.target_sub_id);
    write_element(out, "message_type", &header.message_type);
    write_element(out, "version", &header.version);
    out.push_str("</header><values>");
    for entry in &entries {
        write_value(out, entry, depth, visited)?;
    }
    out.push_str("</values></container>");
    Ok(())
}

fn write_value(
    out: &mut String,
    value: &Value,
    depth: usize,
    visited: &mut Vec<*const Container>,
) -> VoidResult {
    out.push_str("<value type=\"");
    out.push_str(value.kind().name());
    out.push_str("\" name=\"");
    escape_attr(out, value.name());
    out.push('"');
    if let ValueData::Array(array) = value.data() {
        out.push_str(" element_type=\"");
        out.push_str(array.elem_kind().name());
        out.push('"');
    }
    out.push('>');
    write_payload(out, value.data(), depth, visited)?;
    out.push_str("</value>");
    Ok(())
}

fn write_payload(
    out: &mut String,
    data: &ValueData,
    depth: usize,
    visited: &mut Vec<*const Container>,
) -> VoidResult {
    match data {
        ValueData::Null => {}
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
        ValueData::Float(v) => {
            let _ = write!(out, "{v}");
        }
        ValueData::Double(v) => {
            let _ = write!(out, "{v}");
        }
        ValueData::Bytes(b) => {
            out.push_str(&base64::engine::general_purpose::STANDARD.encode(b.as_slice()));
        }
        ValueData::Str(s) => escape_text(out, s.as_str()),
        ValueData::Container(inner) => write_container(out, inner, depth + 1, visited)?,
        ValueData::Array(array) => {
            for item in array.items() {
                out.push_str("<item");
                if let ValueData::Array(nested) = item {
                    out.push_str(" element_type=\"");
                    out.push_str(nested.elem_kind().name());
                    out.push('"');
                }
                out.push('>');
                write_payload(out, item, depth, visited)?;
                out.push_str("</item>");
            }
        }
    }
    Ok(())
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse the XML layout emitted by [`encode`].
pub fn decode(text: &str) -> Result<Container> {
    let doc = roxmltree::Document::parse(text).map_err(|e| {
        ErrorInfo::with_details(ErrorCode::DeserializationFailed, MODULE, e.to_string())
    })?;
    let root = doc.root_element();
    if root.tag_name().name() != "container" {
        return Err(err(format!("root element is {:?}", root.tag_name().name())));
    }
    parse_container(root, 0)
}

fn parse_container(node: roxmltree::Node<'_, '_>, depth: usize) -> Result<Container> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(err(format!("nesting exceeds {MAX_NESTING_DEPTH}")));
    }

    let mut header = Header::default();
    if let Some(header_node) = child_element(node, "header") {
        for field in header_node.children().filter(roxmltree::Node::is_element) {
            let text = field.text().unwrap_or("").to_string();
            match field.tag_name().name() {
                "source_id" => header.source_id = text,
                "source_sub_id" => header.source_sub_id = text,
                "target_id" => header.target_id = text,
                "target_sub_id" => header.target_sub_id = text,
                "message_type" => header.message_type = text,
                "version" => header.version = text,
                other => return Err(err(format!("unknown header field {other:?}"))),
            }
        }
    }

    let mut values = Vec::new();
    if let Some(values_node) = child_element(node, "values") {
        for value_node in values_node.children().filter(roxmltree::Node::is_element) {
            if value_node.tag_name().name() != "value" {
                return Err(err(format!(
                    "unexpected element {:?} in values",
                    value_node.tag_name().name()
                )));
            }
            values.push(Arc::new(parse_value(value_node, depth)?));
        }
    }

    Ok(Container::from_parts(header, values))
}

fn child_element<'a>(node: roxmltree::Node<'a, 'a>, tag: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == tag)
}

fn parse_value(node: roxmltree::Node<'_, '_>, depth: usize) -> Result<Value> {
    let kind_tag = node.attribute("type").ok_or_else(|| err("value missing type"))?;
    let kind = ValueKind::from_name(kind_tag)
        .ok_or_else(|| err(format!("unknown type tag {kind_tag:?}")))?;
    let name = node.attribute("name").ok_or_else(|| err("value missing name"))?;
    if name.is_empty() {
        return Err(err("empty value name"));
    }
    let data = parse_payload(node, kind, depth, true)?;
    Ok(Value::new(name.to_string(), data))
}

fn parse_int<T: std::str::FromStr>(node: roxmltree::Node<'_, '_>, kind: ValueKind) -> Result<T> {
    let text = node.text().unwrap_or("").trim();
    text.parse::<T>()
        .map_err(|_| err(format!("{:?} is not a valid {}", text, kind.name())))
}

/// `normalize` applies the long/llong tag rule (off inside arrays).
fn parse_payload(
    node: roxmltree::Node<'_, '_>,
    kind: ValueKind,
    depth: usize,
    normalize: bool,
) -> Result<ValueData> {
    Ok(match kind {
        ValueKind::Null => {
            if node.text().is_some_and(|t| !t.is_empty()) {
                return Err(err("null payload must be empty"));
            }
            ValueData::Null
        }
        ValueKind::Bool => match node.text().unwrap_or("").trim() {
            "true" => ValueData::Bool(true),
            "false" => ValueData::Bool(false),
            other => return Err(err(format!("{other:?} is not a valid bool"))),
        },
        ValueKind::Short => ValueData::Short(parse_int(node, kind)?),
        ValueKind::UShort => ValueData::UShort(parse_int(node, kind)?),
        ValueKind::Int => ValueData::Int(parse_int(node, kind)?),
        ValueKind::UInt => ValueData::UInt(parse_int(node, kind)?),
        ValueKind::Long | ValueKind::LLong => {
            let raw: i64 = parse_int(node, kind)?;
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
        ValueKind::ULong => ValueData::ULong(parse_int(node, kind)?),
        ValueKind::ULLong => ValueData::ULLong(parse_int(node, kind)?),
        ValueKind::Float => {
            let text = node.text().unwrap_or("").trim();
            ValueData::Float(
                text.parse::<f32>()
                    .map_err(|_| err(format!("{text:?} is not a valid float")))?,
            )
        }
        ValueKind::Double => {
            let text = node.text().unwrap_or("").trim();
            ValueData::Double(
                text.parse::<f64>()
                    .map_err(|_| err(format!("{text:?} is not a valid double")))?,
            )
        }
        ValueKind::Bytes => {
            let text = node.text().unwrap_or("").trim();
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(text)
                .map_err(|e| err(format!("bad base64: {e}")))?;
            ValueData::from(decoded)
        }
        ValueKind::String => ValueData::string(node.text().unwrap_or("")),
        ValueKind::Container => {
            let inner = child_element(node, "container")
                .ok_or_else(|| err("container payload missing <container>"))?;
            ValueData::Container(Arc::new(parse_container(inner, depth + 1)?))
        }
        ValueKind::Array => {
            let elem_tag = node
                .attribute("element_type")
                .ok_or_else(|| err("array missing element_type"))?;
            let elem = ValueKind::from_name(elem_tag)
                .ok_or_else(|| err(format!("unknown element type {elem_tag:?}")))?;
            let mut items = Vec::new();
            for item in node.children().filter(roxmltree::Node::is_element) {
                if item.tag_name().name() != "item" {
                    return Err(err(format!(
                        "unexpected element {:?} in array",
                        item.tag_name().name()
                    )));
                }
                items.push(parse_payload(item, elem, depth, false)?);
            }
            ValueData::Array(ValueArray::new(elem, items)?)
        }
    })
}
