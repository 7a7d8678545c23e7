// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev

//! Named, kind-tagged values.
//!
//! A [`Value`] is a name plus a [`ValueData`] tagged union. Scalars live
//! inline in the union; `bytes`/`string` payloads ride pooled small blocks or
//! the heap (see [`buf`]); nested containers are shared references so a
//! container can appear in several parents without copies.
//!
//! Values are immutable once inserted. The container's update APIs replace
//! entries, they never mutate payloads in place.

mod buf;
mod kind;

pub use buf::{SmallBuf, SmallStr, Storage};
pub use kind::{normalize_signed64, ValueKind};

use crate::container::Container;
use crate::error::{ErrorCode, ErrorInfo, Result};
use std::fmt;
use std::sync::Arc;

const MODULE: &str = "value";

/// Homogeneous ordered sequence of payloads.
///
/// All elements share the declared element kind; construction and decode
/// both enforce the agreement.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueArray {
    elem: ValueKind,
    items: Vec<ValueData>,
}

impl ValueArray {
    /// Build an array, checking every element against `elem`.
    pub fn new(elem: ValueKind, items: Vec<ValueData>) -> Result<Self> {
        for (i, item) in items.iter().enumerate() {
            if item.kind() != elem {
                return Err(ErrorInfo::with_details(
                    ErrorCode::TypeMismatch,
                    MODULE,
                    format!("array element {i} is {}, declared {}", item.kind().name(), elem.name()),
                ));
            }
        }
        Ok(Self { elem, items })
    }

    /// Empty array of the given element kind.
    pub fn empty(elem: ValueKind) -> Self {
        Self {
            elem,
            items: Vec::new(),
        }
    }

    /// Declared element kind.
    pub fn elem_kind(&self) -> ValueKind {
        self.elem
    }

    /// Element payloads in order.
    pub fn items(&self) -> &[ValueData] {
        &self.items
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Tagged-union payload. The discriminant and active arm always agree.
#[derive(Debug, Clone)]
pub enum ValueData {
    Null,
    Bool(bool),
    Short(i16),
    UShort(u16),
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    LLong(i64),
    ULLong(u64),
    Float(f32),
    Double(f64),
    Bytes(SmallBuf),
    Str(SmallStr),
    Container(Arc<Container>),
    Array(ValueArray),
}

impl ValueData {
    /// Kind of the active arm.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Short(_) => ValueKind::Short,
            Self::UShort(_) => ValueKind::UShort,
            Self::Int(_) => ValueKind::Int,
            Self::UInt(_) => ValueKind::UInt,
            Self::Long(_) => ValueKind::Long,
            Self::ULong(_) => ValueKind::ULong,
            Self::LLong(_) => ValueKind::LLong,
            Self::ULLong(_) => ValueKind::ULLong,
            Self::Float(_) => ValueKind::Float,
            Self::Double(_) => ValueKind::Double,
            Self::Bytes(_) => ValueKind::Bytes,
            Self::Str(_) => ValueKind::String,
            Self::Container(_) => ValueKind::Container,
            Self::Array(_) => ValueKind::Array,
        }
    }

    /// Explicit `long` constructor (see [`normalize_signed64`]).
    pub fn long(v: i64) -> Self {
        Self::Long(v)
    }

    /// Explicit `llong` constructor.
    pub fn llong(v: i64) -> Self {
        Self::LLong(v)
    }

    /// Byte payload from a slice.
    pub fn bytes(data: &[u8]) -> Self {
        Self::Bytes(SmallBuf::from_slice(data))
    }

    /// String payload from a slice.
    pub fn string(s: &str) -> Self {
        Self::Str(SmallStr::from_str(s))
    }

    /// Nested container payload.
    pub fn container(inner: Arc<Container>) -> Self {
        Self::Container(inner)
    }

    /// Integer payload widened to `i128`, for any of the eight integer kinds.
    pub fn as_integer(&self) -> Option<i128> {
        Some(match self {
            Self::Short(v) => i128::from(*v),
            Self::UShort(v) => i128::from(*v),
            Self::Int(v) => i128::from(*v),
            Self::UInt(v) => i128::from(*v),
            Self::Long(v) | Self::LLong(v) => i128::from(*v),
            Self::ULong(v) | Self::ULLong(v) => i128::from(*v),
            _ => return None,
        })
    }

    /// Borrow the string payload.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Borrow the byte payload.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    /// Borrow the nested container.
    pub fn as_container(&self) -> Option<&Arc<Container>> {
        match self {
            Self::Container(c) => Some(c),
            _ => None,
        }
    }

    /// Borrow the array payload.
    pub fn as_array(&self) -> Option<&ValueArray> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Payload footprint in bytes (recursive for composites).
    pub fn size_bytes(&self) -> usize {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Short(_) | Self::UShort(_) => 2,
            Self::Int(_) | Self::UInt(_) | Self::Float(_) => 4,
            Self::Long(_) | Self::ULong(_) | Self::LLong(_) | Self::ULLong(_) | Self::Double(_) => 8,
            Self::Bytes(b) => b.len(),
            Self::Str(s) => s.len(),
            Self::Container(c) => c.payload_bytes(),
            Self::Array(a) => a.items().iter().map(ValueData::size_bytes).sum(),
        }
    }

    /// Provenance flag for telemetry.
    pub fn storage(&self) -> Storage {
        match self {
            Self::Bytes(b) => b.storage(),
            Self::Str(s) => s.storage(),
            Self::Container(_) | Self::Array(_) => Storage::Heap,
            _ => Storage::Inline,
        }
    }

    /// Compare-and-swap equality.
    ///
    /// Scalars compare by numeric value with kind compatibility (any two
    /// integer kinds holding the same value are equal); floats compare
    /// bit-exact and NaN payloads never succeed; `bytes`/`string` compare by
    /// byte sequence; containers compare by canonical binary serialization.
    pub fn cas_eq(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (self.as_integer(), other.as_integer()) {
            return a == b;
        }
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => !a.is_nan() && a.to_bits() == b.to_bits(),
            (Self::Double(a), Self::Double(b)) => !a.is_nan() && a.to_bits() == b.to_bits(),
            (Self::Bytes(a), Self::Bytes(b)) => a.as_slice() == b.as_slice(),
            (Self::Str(a), Self::Str(b)) => a.as_str() == b.as_str(),
            (Self::Container(a), Self::Container(b)) => {
                match (crate::codec::binary::encode(a), crate::codec::binary::encode(b)) {
                    (Ok(ea), Ok(eb)) => ea == eb,
                    _ => false,
                }
            }
            (Self::Array(a), Self::Array(b)) => {
                a.elem_kind() == b.elem_kind()
                    && a.len() == b.len()
                    && a.items().iter().zip(b.items()).all(|(x, y)| x.cas_eq(y))
            }
            _ => false,
        }
    }
}

/// Structural equality: exact kinds, bit-exact floats (NaN equals itself,
/// which is what deterministic round-trip checks need).
impl PartialEq for ValueData {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Short(a), Self::Short(b)) => a == b,
            (Self::UShort(a), Self::UShort(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::UInt(a), Self::UInt(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::ULong(a), Self::ULong(b)) => a == b,
            (Self::LLong(a), Self::LLong(b)) => a == b,
            (Self::ULLong(a), Self::ULLong(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Container(a), Self::Container(b)) => a.as_ref() == b.as_ref(),
            (Self::Array(a), Self::Array(b)) => a == b,
            _ => false,
        }
    }
}

// Conversion traits (construction side)
impl From<bool> for ValueData {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i16> for ValueData {
    fn from(v: i16) -> Self {
        Self::Short(v)
    }
}

impl From<u16> for ValueData {
    fn from(v: u16) -> Self {
        Self::UShort(v)
    }
}

impl From<i32> for ValueData {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for ValueData {
    fn from(v: u32) -> Self {
        Self::UInt(v)
    }
}

impl From<i64> for ValueData {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<u64> for ValueData {
    fn from(v: u64) -> Self {
        Self::ULong(v)
    }
}

impl From<f32> for ValueData {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for ValueData {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for ValueData {
    fn from(v: &str) -> Self {
        Self::string(v)
    }
}

impl From<String> for ValueData {
    fn from(v: String) -> Self {
        Self::Str(SmallStr::from_string(v))
    }
}

impl From<&[u8]> for ValueData {
    fn from(v: &[u8]) -> Self {
        Self::bytes(v)
    }
}

impl From<Vec<u8>> for ValueData {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(SmallBuf::from_vec(v))
    }
}

impl From<Arc<Container>> for ValueData {
    fn from(v: Arc<Container>) -> Self {
        Self::Container(v)
    }
}

impl From<Container> for ValueData {
    fn from(v: Container) -> Self {
        Self::Container(Arc::new(v))
    }
}

impl From<ValueArray> for ValueData {
    fn from(v: ValueArray) -> Self {
        Self::Array(v)
    }
}

/// Extraction trait for [`Value::get`] / [`Container::get`].
///
/// Exact kind matches always succeed. Integer kinds additionally convert
/// when the stored value fits the requested type's range, so a `long` 42 is
/// readable as `i32` and an `int` is readable as `i64`. An out-of-range or
/// cross-category request is a `TypeMismatch`.
pub trait FromValue: Sized {
    fn from_value(data: &ValueData) -> Result<Self>;
}

fn mismatch(expected: &'static str, got: ValueKind) -> ErrorInfo {
    ErrorInfo::with_details(
        ErrorCode::TypeMismatch,
        MODULE,
        format!("expected {expected}, got {}", got.name()),
    )
}

macro_rules! impl_from_value_int {
    ($type:ty, $expected:expr) => {
        impl FromValue for $type {
            fn from_value(data: &ValueData) -> Result<Self> {
                let wide = data.as_integer().ok_or_else(|| mismatch($expected, data.kind()))?;
                <$type>::try_from(wide).map_err(|_| {
                    ErrorInfo::with_details(
                        ErrorCode::TypeMismatch,
                        MODULE,
                        format!("{} does not fit {}", wide, $expected),
                    )
                })
            }
        }
    };
}

impl_from_value_int!(i16, "short");
impl_from_value_int!(u16, "ushort");
impl_from_value_int!(i32, "int");
impl_from_value_int!(u32, "uint");
impl_from_value_int!(i64, "long");
impl_from_value_int!(u64, "ulong");

impl FromValue for bool {
    fn from_value(data: &ValueData) -> Result<Self> {
        match data {
            ValueData::Bool(v) => Ok(*v),
            other => Err(mismatch("bool", other.kind())),
        }
    }
}

impl FromValue for f32 {
    fn from_value(data: &ValueData) -> Result<Self> {
        match data {
            ValueData::Float(v) => Ok(*v),
            other => Err(mismatch("float", other.kind())),
        }
    }
}

impl FromValue for f64 {
    fn from_value(data: &ValueData) -> Result<Self> {
        match data {
            ValueData::Double(v) => Ok(*v),
            other => Err(mismatch("double", other.kind())),
        }
    }
}

impl FromValue for String {
    fn from_value(data: &ValueData) -> Result<Self> {
        match data {
            ValueData::Str(s) => Ok(s.as_str().to_string()),
            other => Err(mismatch("string", other.kind())),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(data: &ValueData) -> Result<Self> {
        match data {
            ValueData::Bytes(b) => Ok(b.as_slice().to_vec()),
            other => Err(mismatch("bytes", other.kind())),
        }
    }
}

impl FromValue for Arc<Container> {
    fn from_value(data: &ValueData) -> Result<Self> {
        match data {
            ValueData::Container(c) => Ok(c.clone()),
            other => Err(mismatch("container", other.kind())),
        }
    }
}

impl FromValue for ValueArray {
    fn from_value(data: &ValueData) -> Result<Self> {
        match data {
            ValueData::Array(a) => Ok(a.clone()),
            other => Err(mismatch("array", other.kind())),
        }
    }
}

/// Named, kind-tagged datum.
#[derive(Clone, PartialEq)]
pub struct Value {
    name: Arc<str>,
    data: ValueData,
}

impl Value {
    /// Build a value. Empty names are legal here; the container's `set`
    /// rejects them at insertion.
    pub fn new(name: impl Into<Arc<str>>, data: impl Into<ValueData>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Value name (key).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared name handle, used by the container index.
    pub(crate) fn name_arc(&self) -> &Arc<str> {
        &self.name
    }

    /// Kind of the payload.
    pub fn kind(&self) -> ValueKind {
        self.data.kind()
    }

    /// Borrow the payload.
    pub fn data(&self) -> &ValueData {
        &self.data
    }

    /// Consume the value, returning the payload.
    pub fn into_data(self) -> ValueData {
        self.data
    }

    /// Typed extraction (see [`FromValue`]).
    pub fn get<T: FromValue>(&self) -> Result<T> {
        T::from_value(&self.data)
    }

    /// Payload footprint in bytes.
    pub fn size_bytes(&self) -> usize {
        self.data.size_bytes()
    }

    /// Provenance flag for telemetry.
    pub fn storage(&self) -> Storage {
        self.data.storage()
    }

    /// Same value under a different name.
    pub fn renamed(&self, name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            data: self.data.clone(),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("name", &self.name)
            .field("kind", &self.kind().name())
            .field("data", &self.data)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_payload_agreement() {
        assert_eq!(ValueData::from(true).kind(), ValueKind::Bool);
        assert_eq!(ValueData::from(7i16).kind(), ValueKind::Short);
        assert_eq!(ValueData::from(7u16).kind(), ValueKind::UShort);
        assert_eq!(ValueData::from(7i32).kind(), ValueKind::Int);
        assert_eq!(ValueData::from(7u32).kind(), ValueKind::UInt);
        assert_eq!(ValueData::from(7i64).kind(), ValueKind::Long);
        assert_eq!(ValueData::from(7u64).kind(), ValueKind::ULong);
        assert_eq!(ValueData::llong(7).kind(), ValueKind::LLong);
        assert_eq!(ValueData::from(1.5f32).kind(), ValueKind::Float);
        assert_eq!(ValueData::from(1.5f64).kind(), ValueKind::Double);
        assert_eq!(ValueData::from("s").kind(), ValueKind::String);
        assert_eq!(ValueData::bytes(b"b").kind(), ValueKind::Bytes);
        assert_eq!(ValueData::Null.kind(), ValueKind::Null);
    }

    #[test]
    fn test_typed_get_exact_kind() {
        let v = Value::new("n", 42i32);
        assert_eq!(v.get::<i32>().expect("exact kind should extract"), 42);
        assert_eq!(v.kind(), ValueKind::Int);
    }

    #[test]
    fn test_typed_get_integer_narrowing() {
        // A long in int32 range reads back as int.
        let v = Value::new("n", ValueData::long(42));
        assert_eq!(v.get::<i32>().expect("in-range narrowing should succeed"), 42);
        assert_eq!(v.get::<i16>().expect("in-range narrowing should succeed"), 42);

        // Out of range narrows fail with TypeMismatch.
        let wide = Value::new("n", ValueData::long(1 << 40));
        let err = wide.get::<i32>().unwrap_err();
        assert_eq!(err.code, ErrorCode::TypeMismatch);
    }

    #[test]
    fn test_typed_get_cross_category_rejected() {
        let v = Value::new("n", "text");
        assert_eq!(v.get::<i32>().unwrap_err().code, ErrorCode::TypeMismatch);
        assert_eq!(v.get::<f64>().unwrap_err().code, ErrorCode::TypeMismatch);

        let f = Value::new("n", 2.5f64);
        assert_eq!(f.get::<i64>().unwrap_err().code, ErrorCode::TypeMismatch);
    }

    #[test]
    fn test_size_bytes() {
        assert_eq!(Value::new("a", ValueData::Null).size_bytes(), 0);
        assert_eq!(Value::new("a", true).size_bytes(), 1);
        assert_eq!(Value::new("a", 1i16).size_bytes(), 2);
        assert_eq!(Value::new("a", 1i32).size_bytes(), 4);
        assert_eq!(Value::new("a", 1i64).size_bytes(), 8);
        assert_eq!(Value::new("a", "abcd").size_bytes(), 4);
        assert_eq!(Value::new("a", ValueData::bytes(&[1, 2, 3])).size_bytes(), 3);
    }

    #[test]
    fn test_storage_provenance() {
        assert_eq!(Value::new("a", 1i32).storage(), Storage::Inline);
        assert_eq!(Value::new("a", "short").storage(), Storage::Pooled);
        let big = "x".repeat(100);
        assert_eq!(Value::new("a", big.as_str()).storage(), Storage::Heap);
    }

    #[test]
    fn test_array_homogeneity_enforced() {
        let ok = ValueArray::new(
            ValueKind::Int,
            vec![ValueData::from(1i32), ValueData::from(2i32)],
        );
        assert!(ok.is_ok());

        let bad = ValueArray::new(
            ValueKind::Int,
            vec![ValueData::from(1i32), ValueData::from("two")],
        );
        assert_eq!(bad.unwrap_err().code, ErrorCode::TypeMismatch);
    }

    #[test]
    fn test_cas_eq_integer_kind_compatibility() {
        assert!(ValueData::from(42i32).cas_eq(&ValueData::long(42)));
        assert!(ValueData::from(42u64).cas_eq(&ValueData::from(42i16)));
        assert!(!ValueData::from(42i32).cas_eq(&ValueData::from(43i32)));
    }

    #[test]
    fn test_cas_eq_nan_never_succeeds() {
        let nan = ValueData::from(f64::NAN);
        assert!(!nan.cas_eq(&nan.clone()));
        let f32_nan = ValueData::from(f32::NAN);
        assert!(!f32_nan.cas_eq(&f32_nan.clone()));
    }

    #[test]
    fn test_cas_eq_float_bit_exact() {
        assert!(ValueData::from(0.5f64).cas_eq(&ValueData::from(0.5f64)));
        // -0.0 and 0.0 differ bitwise.
        assert!(!ValueData::from(-0.0f64).cas_eq(&ValueData::from(0.0f64)));
        // Cross-width float kinds never compare equal.
        assert!(!ValueData::from(0.5f32).cas_eq(&ValueData::from(0.5f64)));
    }

    #[test]
    fn test_structural_eq_nan_is_reflexive() {
        let nan = ValueData::from(f64::NAN);
        assert_eq!(nan, nan.clone());
    }

    #[test]
    fn test_renamed_shares_payload() {
        let v = Value::new("old", 9i32);
        let r = v.renamed("new");
        assert_eq!(r.name(), "new");
        assert_eq!(r.get::<i32>().expect("payload should survive rename"), 9);
    }
}
