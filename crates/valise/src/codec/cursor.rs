// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev

//! Bounds-checked big-endian read cursor for the canonical wire form.

use crate::error::{ErrorCode, ErrorInfo, Result};

const MODULE: &str = "codec::binary";

/// Generate read methods for fixed-width big-endian integers.
///
/// Each generated method bounds-checks, reads N bytes, converts via
/// `from_be_bytes`, and advances the offset.
macro_rules! impl_read_be {
    ($name:ident, $type:ty, $size:expr) => {
        pub(crate) fn $name(&mut self) -> Result<$type> {
            let mut bytes = [0u8; $size];
            bytes.copy_from_slice(self.take($size)?);
            Ok(<$type>::from_be_bytes(bytes))
        }
    };
}

/// Immutable cursor over serialized input (bounds-checked, zero-copy).
pub(crate) struct Cursor<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.offset)
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.offset >= self.buf.len()
    }

    /// Advance past `len` bytes, returning the slice.
    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(ErrorInfo::with_details(
                ErrorCode::DeserializationFailed,
                MODULE,
                format!("truncated at offset {}", self.offset),
            ));
        }
        let slice = &self.buf[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    impl_read_be!(read_u8, u8, 1);
    impl_read_be!(read_u16_be, u16, 2);
    impl_read_be!(read_u32_be, u32, 4);
    impl_read_be!(read_u64_be, u64, 8);
    impl_read_be!(read_i16_be, i16, 2);
    impl_read_be!(read_i32_be, i32, 4);
    impl_read_be!(read_i64_be, i64, 8);

    pub(crate) fn read_f32_be(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32_be()?))
    }

    pub(crate) fn read_f64_be(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64_be()?))
    }

    /// Length-prefixed byte run (`uint32 length, bytes`).
    pub(crate) fn read_var_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u32_be()? as usize;
        self.take(len)
    }

    /// Length-prefixed UTF-8 string; invalid UTF-8 is `InvalidFormat`.
    pub(crate) fn read_var_str(&mut self) -> Result<&'a str> {
        let at = self.offset;
        let bytes = self.read_var_bytes()?;
        std::str::from_utf8(bytes).map_err(|err| {
            ErrorInfo::with_details(
                ErrorCode::InvalidFormat,
                MODULE,
                format!("invalid utf-8 at offset {at}: {err}"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_primitives_big_endian() {
        let buf = [
            0xAB, // u8
            0x12, 0x34, // u16
            0x01, 0x02, 0x03, 0x04, // u32
            0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE, // i64 = -2
        ];
        let mut cursor = Cursor::new(&buf);
        assert_eq!(cursor.read_u8().expect("read should succeed"), 0xAB);
        assert_eq!(cursor.read_u16_be().expect("read should succeed"), 0x1234);
        assert_eq!(cursor.read_u32_be().expect("read should succeed"), 0x0102_0304);
        assert_eq!(cursor.read_i64_be().expect("read should succeed"), -2);
        assert!(cursor.is_eof());
    }

    #[test]
    fn test_truncation_reports_offset() {
        let buf = [0x00, 0x01];
        let mut cursor = Cursor::new(&buf);
        cursor.read_u8().expect("read should succeed");
        let err = cursor.read_u32_be().unwrap_err();
        assert_eq!(err.code, ErrorCode::DeserializationFailed);
        assert!(err.details.as_deref().is_some_and(|d| d.contains("offset 1")));
    }

    #[test]
    fn test_var_str_round_trip() {
        let mut buf = vec![0x00, 0x00, 0x00, 0x05];
        buf.extend_from_slice(b"hello");
        let mut cursor = Cursor::new(&buf);
        assert_eq!(cursor.read_var_str().expect("read should succeed"), "hello");
    }

    #[test]
    fn test_var_str_empty() {
        let buf = [0x00, 0x00, 0x00, 0x00];
        let mut cursor = Cursor::new(&buf);
        assert_eq!(cursor.read_var_str().expect("read should succeed"), "");
        assert!(cursor.is_eof());
    }

    #[test]
    fn test_var_str_invalid_utf8() {
        let buf = [0x00, 0x00, 0x00, 0x02, 0xFF, 0xFE];
        let mut cursor = Cursor::new(&buf);
        let err = cursor.read_var_str().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFormat);
    }

    #[test]
    fn test_float_bit_patterns() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1.5f32.to_bits().to_be_bytes());
        buf.extend_from_slice(&(-0.0f64).to_bits().to_be_bytes());
        let mut cursor = Cursor::new(&buf);
        assert_eq!(cursor.read_f32_be().expect("read should succeed"), 1.5);
        assert!(cursor.read_f64_be().expect("read should succeed").is_sign_negative());
    }
}
