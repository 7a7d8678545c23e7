// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev

//! Small-object byte storage for `bytes` and `string` payloads.
//!
//! Payloads up to [`pool::SMALL_BLOCK_SIZE`] ride a pool-leased block; larger
//! ones use the general allocator. When the pool is exhausted the payload
//! falls back to the heap and the provenance flag records it.

use crate::pool::{self, PoolBlock, SMALL_BLOCK_SIZE};
use std::fmt;

/// Provenance of a payload, exposed for memory telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// Fixed-width scalar held inline in the tagged union.
    Inline,
    /// Pool-leased small block.
    Pooled,
    /// General heap allocation.
    Heap,
}

/// Byte storage with small-object pooling.
pub enum SmallBuf {
    Pooled(PoolBlock),
    Heap(Vec<u8>),
}

impl SmallBuf {
    /// Copy `data` into pooled or heap storage by size.
    pub fn from_slice(data: &[u8]) -> Self {
        if data.len() <= SMALL_BLOCK_SIZE {
            match pool::acquire_with(data) {
                Ok(block) => return Self::Pooled(block),
                Err(err) => {
                    log::warn!("[valise] pool fallback for {}-byte payload: {err}", data.len());
                }
            }
        }
        Self::Heap(data.to_vec())
    }

    /// Take ownership of an existing heap buffer (no copy for large inputs).
    pub fn from_vec(data: Vec<u8>) -> Self {
        if data.len() <= SMALL_BLOCK_SIZE {
            return Self::from_slice(&data);
        }
        Self::Heap(data)
    }

    /// Payload bytes.
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Self::Pooled(block) => block.as_slice(),
            Self::Heap(vec) => vec,
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        match self {
            Self::Pooled(block) => block.len(),
            Self::Heap(vec) => vec.len(),
        }
    }

    /// True when the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Provenance flag for telemetry.
    pub fn storage(&self) -> Storage {
        match self {
            Self::Pooled(_) => Storage::Pooled,
            Self::Heap(_) => Storage::Heap,
        }
    }
}

impl Clone for SmallBuf {
    fn clone(&self) -> Self {
        Self::from_slice(self.as_slice())
    }
}

impl PartialEq for SmallBuf {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

// Debug prints length + provenance, not raw bytes (payloads may be large).
impl fmt::Debug for SmallBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmallBuf")
            .field("len", &self.len())
            .field("storage", &self.storage())
            .finish()
    }
}

/// UTF-8 string storage over [`SmallBuf`].
///
/// Construction sites guarantee valid UTF-8 (either from `&str` or after
/// explicit validation on decode), which is what makes `as_str` total.
#[derive(Clone, PartialEq)]
pub struct SmallStr(SmallBuf);

impl SmallStr {
    /// Store a string slice.
    pub fn from_str(s: &str) -> Self {
        Self(SmallBuf::from_slice(s.as_bytes()))
    }

    /// Store an owned string.
    pub fn from_string(s: String) -> Self {
        Self(SmallBuf::from_vec(s.into_bytes()))
    }

    /// View the payload as `&str`.
    pub fn as_str(&self) -> &str {
        // SAFETY: every constructor takes `&str`/`String` or validates the
        // bytes first, so the buffer is always valid UTF-8.
        unsafe { std::str::from_utf8_unchecked(self.0.as_slice()) }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the string is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Provenance flag for telemetry.
    pub fn storage(&self) -> Storage {
        self.0.storage()
    }
}

impl fmt::Debug for SmallStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_payload_is_pooled() {
        let buf = SmallBuf::from_slice(b"short payload");
        assert_eq!(buf.storage(), Storage::Pooled);
        assert_eq!(buf.as_slice(), b"short payload");
    }

    #[test]
    fn test_boundary_payload_is_pooled() {
        let data = vec![0xAB; SMALL_BLOCK_SIZE];
        let buf = SmallBuf::from_slice(&data);
        assert_eq!(buf.storage(), Storage::Pooled);
        assert_eq!(buf.len(), SMALL_BLOCK_SIZE);
    }

    #[test]
    fn test_large_payload_is_heap() {
        let data = vec![0xCD; SMALL_BLOCK_SIZE + 1];
        let buf = SmallBuf::from_slice(&data);
        assert_eq!(buf.storage(), Storage::Heap);
        assert_eq!(buf.as_slice(), &data[..]);
    }

    #[test]
    fn test_zero_length_payload() {
        let buf = SmallBuf::from_slice(b"");
        assert!(buf.is_empty());
        assert_eq!(buf.as_slice(), b"");
    }

    #[test]
    fn test_clone_preserves_bytes() {
        let buf = SmallBuf::from_slice(b"clone me");
        let copy = buf.clone();
        assert_eq!(buf, copy);
    }

    #[test]
    fn test_small_str_round_trip() {
        let s = SmallStr::from_str("héllo wörld");
        assert_eq!(s.as_str(), "héllo wörld");
        assert_eq!(s.len(), "héllo wörld".len());

        let owned = SmallStr::from_string(String::from("owned"));
        assert_eq!(owned.as_str(), "owned");
    }
}
