// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev

//! Error codes and the public `Result` surface.
//!
//! Every fallible public API returns [`Result<T>`] with an [`ErrorInfo`]
//! payload: a stable integer code, a stable message, the originating module,
//! and an optional free-form detail string. Codes are grouped by hundreds so
//! callers can route on category without matching every variant.

use std::fmt;

/// Stable error codes, grouped by category.
///
/// | Range | Category |
/// |-------|----------|
/// | 1xx   | value access |
/// | 2xx   | serialization |
/// | 3xx   | schema validation |
/// | 4xx   | resources |
/// | 5xx   | concurrency |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // ========================================================================
    // Value errors (1xx)
    // ========================================================================
    /// Lookup on a key that is not present.
    KeyNotFound = 100,
    /// Stored kind does not satisfy the requested logical type.
    TypeMismatch = 101,
    /// Empty string used as a value name.
    EmptyKey = 102,

    // ========================================================================
    // Serialization errors (2xx)
    // ========================================================================
    /// Emission failed (unrepresentable payload, I/O sink error).
    SerializationFailed = 200,
    /// Input ended before the encoded structure was complete.
    DeserializationFailed = 201,
    /// Input is structurally invalid (bad tag, depth limit, cycle).
    InvalidFormat = 202,
    /// Wire version is not understood by this build.
    VersionMismatch = 203,

    // ========================================================================
    // Validation errors (3xx)
    // ========================================================================
    /// A required field is absent.
    MissingRequired = 300,
    /// Numeric value falls outside the declared range.
    OutOfRange = 301,
    /// String/bytes/array length falls outside the declared bounds.
    LengthViolation = 302,
    /// String does not match the declared pattern.
    PatternMismatch = 303,
    /// Value is not a member of the declared enumeration.
    NotInEnumeration = 304,
    /// A nested container failed its sub-schema.
    NestedValidationFailed = 305,
    /// A caller-supplied predicate rejected the value.
    CustomPredicateFailed = 306,
    /// Field exists but carries the wrong kind.
    ValidationTypeMismatch = 307,

    // ========================================================================
    // Resource errors (4xx)
    // ========================================================================
    /// Fixed-block pool has no free block and is at its growth cap.
    PoolExhausted = 400,
    /// General allocation request could not be satisfied.
    AllocationFailed = 401,
    /// File could not be opened.
    FileOpenFailed = 402,
    /// File write failed mid-stream.
    FileWriteFailed = 403,
    /// Other I/O failure.
    IoError = 404,

    // ========================================================================
    // Concurrency errors (5xx)
    // ========================================================================
    /// Lock could not be acquired (timeout or poisoned peer).
    LockAcquisitionFailed = 500,
    /// A conditional update lost its race.
    ConcurrentModification = 501,
}

impl ErrorCode {
    /// Stable numeric code for external reporting.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Stable human-readable message for this code.
    pub fn message(self) -> &'static str {
        match self {
            Self::KeyNotFound => "key not found",
            Self::TypeMismatch => "type mismatch",
            Self::EmptyKey => "empty key",
            Self::SerializationFailed => "serialization failed",
            Self::DeserializationFailed => "deserialization failed",
            Self::InvalidFormat => "invalid format",
            Self::VersionMismatch => "version mismatch",
            Self::MissingRequired => "missing required field",
            Self::OutOfRange => "value out of range",
            Self::LengthViolation => "length violation",
            Self::PatternMismatch => "pattern mismatch",
            Self::NotInEnumeration => "value not in enumeration",
            Self::NestedValidationFailed => "nested validation failed",
            Self::CustomPredicateFailed => "custom predicate failed",
            Self::ValidationTypeMismatch => "field has wrong kind",
            Self::PoolExhausted => "pool exhausted",
            Self::AllocationFailed => "allocation failed",
            Self::FileOpenFailed => "file open failed",
            Self::FileWriteFailed => "file write failed",
            Self::IoError => "i/o error",
            Self::LockAcquisitionFailed => "lock acquisition failed",
            Self::ConcurrentModification => "concurrent modification",
        }
    }

    /// Category name derived from the hundreds digit.
    pub fn category(self) -> &'static str {
        match self.code() / 100 {
            1 => "value",
            2 => "serialization",
            3 => "validation",
            4 => "resource",
            _ => "concurrency",
        }
    }
}

/// Error payload carried by every fallible public API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Stable code (see [`ErrorCode`]).
    pub code: ErrorCode,
    /// Module that raised the error (e.g. `"container"`, `"codec::binary"`).
    pub module: &'static str,
    /// Optional free-form context (offsets, field names, inner messages).
    pub details: Option<String>,
}

impl ErrorInfo {
    /// Build an error with no detail string.
    pub fn new(code: ErrorCode, module: &'static str) -> Self {
        Self {
            code,
            module,
            details: None,
        }
    }

    /// Build an error with a detail string.
    pub fn with_details(code: ErrorCode, module: &'static str, details: impl Into<String>) -> Self {
        Self {
            code,
            module,
            details: Some(details.into()),
        }
    }

    /// Stable message associated with the code.
    pub fn message(&self) -> &'static str {
        self.code.message()
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{}] {}: {}",
            self.code.category(),
            self.code.code(),
            self.module,
            self.code.message()
        )?;
        if let Some(details) = &self.details {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorInfo {}

impl From<std::io::Error> for ErrorInfo {
    fn from(err: std::io::Error) -> Self {
        ErrorInfo::with_details(ErrorCode::IoError, "io", err.to_string())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ErrorInfo>;

/// Result alias for operations with no payload.
pub type VoidResult = Result<()>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(ErrorCode::KeyNotFound.code(), 100);
        assert_eq!(ErrorCode::InvalidFormat.code(), 202);
        assert_eq!(ErrorCode::OutOfRange.code(), 301);
        assert_eq!(ErrorCode::PoolExhausted.code(), 400);
        assert_eq!(ErrorCode::ConcurrentModification.code(), 501);
    }

    #[test]
    fn test_error_display_includes_category_and_details() {
        let err = ErrorInfo::with_details(ErrorCode::TypeMismatch, "container", "expected int");
        let rendered = format!("{err}");
        assert_eq!(rendered, "[value:101] container: type mismatch (expected int)");

        let bare = ErrorInfo::new(ErrorCode::PoolExhausted, "pool");
        assert_eq!(format!("{bare}"), "[resource:400] pool: pool exhausted");
    }

    #[test]
    fn test_category_from_code_range() {
        assert_eq!(ErrorCode::EmptyKey.category(), "value");
        assert_eq!(ErrorCode::VersionMismatch.category(), "serialization");
        assert_eq!(ErrorCode::PatternMismatch.category(), "validation");
        assert_eq!(ErrorCode::FileOpenFailed.category(), "resource");
        assert_eq!(ErrorCode::LockAcquisitionFailed.category(), "concurrency");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ErrorInfo = io.into();
        assert_eq!(err.code, ErrorCode::IoError);
        assert!(err.details.as_deref().is_some_and(|d| d.contains("gone")));
    }
}
