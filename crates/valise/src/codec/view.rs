// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev

//! Zero-copy views over the canonical binary wire form.
//!
//! [`parse_view`] validates the header eagerly (six slices into the source
//! buffer) and defers everything else: the value region is scanned exactly
//! once, on first lookup, producing a `name -> (offset, kind)` index. A
//! [`ValueView`] is a non-owning handle — string and bytes payloads are
//! slices of the source buffer, scalars decode once per entry and cache the
//! result.
//!
//! The view borrows the buffer: the `'a` lifetime is the retention
//! contract, the compiler refuses a view that outlives its bytes. Any
//! mutation requires materializing with [`ContainerView::to_owned`].

use super::binary;
use super::cursor::Cursor;
use super::MAX_NESTING_DEPTH;
use crate::container::{Container, Header};
use crate::error::{ErrorCode, ErrorInfo, Result};
use crate::value::{normalize_signed64, ValueKind};
use std::collections::HashMap;
use std::ops::Range;
use std::sync::OnceLock;

const MODULE: &str = "codec::view";

/// Borrowed header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderView<'a> {
    pub source_id: &'a str,
    pub source_sub_id: &'a str,
    pub target_id: &'a str,
    pub target_sub_id: &'a str,
    pub message_type: &'a str,
    pub version: &'a str,
}

impl HeaderView<'_> {
    /// Materialize an owned header.
    pub fn to_owned(&self) -> Header {
        Header {
            source_id: self.source_id.to_string(),
            source_sub_id: self.source_sub_id.to_string(),
            target_id: self.target_id.to_string(),
            target_sub_id: self.target_sub_id.to_string(),
            message_type: self.message_type.to_string(),
            version: self.version.to_string(),
        }
    }
}

/// Cached scalar decode of one entry.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Scalar {
    Null,
    Bool(bool),
    Signed(i64),
    Unsigned(u64),
    Float(f32),
    Double(f64),
}

struct ViewEntry {
    name: Range<usize>,
    kind: ValueKind,
    /// Payload bytes: the raw content for `string`/`bytes` (length prefix
    /// excluded), fixed-width bits for scalars, the full encoding for
    /// `container`/`array`.
    payload: Range<usize>,
    scalar: OnceLock<Scalar>,
}

struct ViewIndex<'a> {
    entries: Vec<ViewEntry>,
    /// First entry per name (duplicates keep arrival order in `entries`).
    by_name: HashMap<&'a str, usize>,
}

/// Read-only lazy view over one serialized container.
pub struct ContainerView<'a> {
    buf: &'a [u8],
    header: HeaderView<'a>,
    values_offset: usize,
    count: usize,
    index: OnceLock<Result<ViewIndex<'a>>>,
}

/// Parse the header of a canonical binary payload, deferring values.
pub fn parse_view(bytes: &[u8]) -> Result<ContainerView<'_>> {
    ContainerView::parse(bytes)
}

impl<'a> ContainerView<'a> {
    /// See [`parse_view`].
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        let mut cursor = Cursor::new(buf);
        let header = HeaderView {
            source_id: cursor.read_var_str()?,
            source_sub_id: cursor.read_var_str()?,
            target_id: cursor.read_var_str()?,
            target_sub_id: cursor.read_var_str()?,
            message_type: cursor.read_var_str()?,
            version: cursor.read_var_str()?,
        };
        let count = cursor.read_u32_be()? as usize;
        Ok(Self {
            buf,
            header,
            values_offset: cursor.offset(),
            count,
            index: OnceLock::new(),
        })
    }

    /// Borrowed header fields.
    pub fn header(&self) -> HeaderView<'a> {
        self.header
    }

    /// Number of values (known without scanning).
    pub fn len(&self) -> usize {
        self.count
    }

    /// True when the container holds no values.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Build (or fetch) the lazy index. One scan of the value region.
    fn index(&self) -> Result<&ViewIndex<'a>> {
        self.index
            .get_or_init(|| build_index(self.buf, self.values_offset, self.count))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Force the lazy index now; useful to surface malformed input early.
    pub fn ensure_indexed(&self) -> Result<()> {
        self.index().map(|_| ())
    }

    /// Non-owning handle to the first match.
    pub fn get_view(&self, name: &str) -> Option<ValueView<'_>> {
        let index = self.index().ok()?;
        let &position = index.by_name.get(name)?;
        Some(ValueView {
            buf: self.buf,
            entry: &index.entries[position],
        })
    }

    /// Views in wire order.
    pub fn iter(&self) -> impl Iterator<Item = ValueView<'_>> {
        let entries = match self.index() {
            Ok(index) => index.entries.as_slice(),
            Err(_) => &[],
        };
        entries.iter().map(|entry| ValueView {
            buf: self.buf,
            entry,
        })
    }

    /// Materialize an owned container (full parse of the source buffer).
    pub fn to_owned(&self) -> Result<Container> {
        binary::decode(self.buf)
    }
}

/// Non-owning view of one value.
pub struct ValueView<'v> {
    buf: &'v [u8],
    entry: &'v ViewEntry,
}

impl<'v> ValueView<'v> {
    /// Value name (borrowed from the source buffer).
    pub fn name(&self) -> &'v str {
        // Validated UTF-8 during index build.
        str_from(self.buf, &self.entry.name)
    }

    /// Kind tag, with the long/llong rule already applied.
    pub fn kind(&self) -> ValueKind {
        self.entry.kind
    }

    /// Raw payload slice for `bytes` values.
    pub fn as_bytes(&self) -> Option<&'v [u8]> {
        (self.entry.kind == ValueKind::Bytes).then(|| &self.buf[self.entry.payload.clone()])
    }

    /// Borrowed UTF-8 slice for `string` values.
    pub fn as_str(&self) -> Option<&'v str> {
        (self.entry.kind == ValueKind::String).then(|| str_from(self.buf, &self.entry.payload))
    }

    fn scalar(&self) -> Option<Scalar> {
        if !self.entry.kind.is_scalar() {
            return None;
        }
        Some(*self.entry.scalar.get_or_init(|| {
            decode_scalar(self.entry.kind, &self.buf[self.entry.payload.clone()])
        }))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.scalar()? {
            Scalar::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Signed integer kinds, widened.
    pub fn as_i64(&self) -> Option<i64> {
        match self.scalar()? {
            Scalar::Signed(v) => Some(v),
            Scalar::Unsigned(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Unsigned integer kinds, widened.
    pub fn as_u64(&self) -> Option<u64> {
        match self.scalar()? {
            Scalar::Unsigned(v) => Some(v),
            Scalar::Signed(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self.scalar()? {
            Scalar::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.scalar()? {
            Scalar::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.scalar(), Some(Scalar::Null))
    }

    /// Materialize a nested container payload.
    pub fn to_container(&self) -> Result<Container> {
        if self.entry.kind != ValueKind::Container {
            return Err(ErrorInfo::with_details(
                ErrorCode::TypeMismatch,
                MODULE,
                format!("expected container, got {}", self.entry.kind.name()),
            ));
        }
        let mut cursor = Cursor::new(&self.buf[self.entry.payload.clone()]);
        binary::decode_container(&mut cursor, 0)
    }
}

fn str_from<'b>(buf: &'b [u8], range: &Range<usize>) -> &'b str {
    // SAFETY: index build validated this range as UTF-8.
    unsafe { std::str::from_utf8_unchecked(&buf[range.clone()]) }
}

fn decode_scalar(kind: ValueKind, bytes: &[u8]) -> Scalar {
    // Ranges were cut to the exact scalar width during index build.
    let be = |n: usize| -> u64 {
        let mut acc = 0u64;
        for &b in &bytes[..n] {
            acc = (acc << 8) | u64::from(b);
        }
        acc
    };
    match kind {
        ValueKind::Null => Scalar::Null,
        ValueKind::Bool => Scalar::Bool(bytes.first().copied() == Some(1)),
        ValueKind::Short => Scalar::Signed(i64::from(be(2) as u16 as i16)),
        ValueKind::UShort => Scalar::Unsigned(be(2)),
        ValueKind::Int => Scalar::Signed(i64::from(be(4) as u32 as i32)),
        ValueKind::UInt => Scalar::Unsigned(be(4)),
        ValueKind::Long | ValueKind::LLong => Scalar::Signed(be(8) as i64),
        ValueKind::ULong | ValueKind::ULLong => Scalar::Unsigned(be(8)),
        ValueKind::Float => Scalar::Float(f32::from_bits(be(4) as u32)),
        ValueKind::Double => Scalar::Double(f64::from_bits(be(8))),
        // Non-scalar kinds never reach here (guarded by the caller).
        ValueKind::Bytes | ValueKind::String | ValueKind::Container | ValueKind::Array => {
            Scalar::Null
        }
    }
}

fn build_index<'a>(buf: &'a [u8], values_offset: usize, count: usize) -> Result<ViewIndex<'a>> {
    let mut cursor = Cursor::new(buf);
    // Skip the already-validated header region.
    cursor.take(values_offset)?;

    let mut entries = Vec::with_capacity(count.min(4096));
    let mut by_name: HashMap<&'a str, usize> = HashMap::with_capacity(count.min(4096));

    for position in 0..count {
        let kind = binary::read_kind(&mut cursor)?;
        let name_at = cursor.offset() + 4;
        let name = cursor.read_var_str()?;
        if name.is_empty() {
            return Err(ErrorInfo::with_details(
                ErrorCode::InvalidFormat,
                MODULE,
                "empty value name",
            ));
        }
        let name_range = name_at..name_at + name.len();

        let payload_start = cursor.offset();
        let (payload, kind) = skip_payload(&mut cursor, kind, 0, payload_start)?;

        by_name.entry(name).or_insert(position);
        entries.push(ViewEntry {
            name: name_range,
            kind,
            payload,
            scalar: OnceLock::new(),
        });
    }

    if !cursor.is_eof() {
        return Err(ErrorInfo::with_details(
            ErrorCode::DeserializationFailed,
            MODULE,
            format!("{} trailing bytes", cursor.remaining()),
        ));
    }

    Ok(ViewIndex { entries, by_name })
}

/// Advance past one payload, returning its byte range and the normalized
/// kind tag.
fn skip_payload(
    cursor: &mut Cursor<'_>,
    kind: ValueKind,
    depth: usize,
    start: usize,
) -> Result<(Range<usize>, ValueKind)> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(ErrorInfo::with_details(
            ErrorCode::InvalidFormat,
            MODULE,
            format!("nesting exceeds {MAX_NESTING_DEPTH}"),
        ));
    }
    match kind {
        _ if kind.is_scalar() => {
            // scalar_width is Some for every scalar kind.
            let width = kind.scalar_width().unwrap_or(0);
            let bytes = cursor.take(width)?;
            let kind = if kind == ValueKind::Long {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                normalize_signed64(kind, i64::from_be_bytes(raw))
            } else {
                kind
            };
            Ok((start..start + width, kind))
        }
        ValueKind::Bytes => {
            let bytes = cursor.read_var_bytes()?;
            let at = cursor.offset() - bytes.len();
            Ok((at..at + bytes.len(), kind))
        }
        ValueKind::String => {
            let s = cursor.read_var_str()?;
            let at = cursor.offset() - s.len();
            Ok((at..at + s.len(), kind))
        }
        ValueKind::Container => {
            skip_container(cursor, depth + 1)?;
            Ok((start..cursor.offset(), kind))
        }
        ValueKind::Array => {
            let elem = binary::read_kind(cursor)?;
            let n = cursor.read_u32_be()? as usize;
            if elem != ValueKind::Null && n > cursor.remaining() {
                return Err(ErrorInfo::with_details(
                    ErrorCode::DeserializationFailed,
                    MODULE,
                    format!("array length {n} exceeds remaining input"),
                ));
            }
            for _ in 0..n {
                let at = cursor.offset();
                skip_payload(cursor, elem, depth, at)?;
            }
            Ok((start..cursor.offset(), kind))
        }
        // Scalars are matched by the guard arm; nothing else remains.
        _ => Err(ErrorInfo::with_details(
            ErrorCode::InvalidFormat,
            MODULE,
            format!("unskippable kind {}", kind.name()),
        )),
    }
}

fn skip_container(cursor: &mut Cursor<'_>, depth: usize) -> Result<()> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(ErrorInfo::with_details(
            ErrorCode::InvalidFormat,
            MODULE,
            format!("nesting exceeds {MAX_NESTING_DEPTH}"),
        ));
    }
    for _ in 0..6 {
        cursor.read_var_str()?;
    }
    let count = cursor.read_u32_be()? as usize;
    for _ in 0..count {
        let kind = binary::read_kind(cursor)?;
        let name = cursor.read_var_str()?;
        if name.is_empty() {
            return Err(ErrorInfo::with_details(
                ErrorCode::InvalidFormat,
                MODULE,
                "empty value name",
            ));
        }
        let at = cursor.offset();
        skip_payload(cursor, kind, depth, at)?;
    }
    Ok(())
}
