// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev

//! The 16 value kinds and their stable ordinal/name tables.
//!
//! Ordinals are wire-stable: the binary and MessagePack codecs emit them
//! verbatim, and the textual codecs emit [`ValueKind::name`]. Never reorder.

/// Discriminant of a stored value. Ordinal == variant slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueKind {
    Null = 0,
    Bool = 1,
    Short = 2,
    UShort = 3,
    Int = 4,
    UInt = 5,
    Long = 6,
    ULong = 7,
    LLong = 8,
    ULLong = 9,
    Float = 10,
    Double = 11,
    Bytes = 12,
    String = 13,
    Container = 14,
    Array = 15,
}

impl ValueKind {
    /// Number of kinds.
    pub const COUNT: usize = 16;

    /// Wire ordinal (0..=15).
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Reverse of [`ordinal`](Self::ordinal).
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Some(match ordinal {
            0 => Self::Null,
            1 => Self::Bool,
            2 => Self::Short,
            3 => Self::UShort,
            4 => Self::Int,
            5 => Self::UInt,
            6 => Self::Long,
            7 => Self::ULong,
            8 => Self::LLong,
            9 => Self::ULLong,
            10 => Self::Float,
            11 => Self::Double,
            12 => Self::Bytes,
            13 => Self::String,
            14 => Self::Container,
            15 => Self::Array,
            _ => return None,
        })
    }

    /// Textual tag used by the JSON and XML codecs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Short => "short",
            Self::UShort => "ushort",
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Long => "long",
            Self::ULong => "ulong",
            Self::LLong => "llong",
            Self::ULLong => "ullong",
            Self::Float => "float",
            Self::Double => "double",
            Self::Bytes => "bytes",
            Self::String => "string",
            Self::Container => "container",
            Self::Array => "array",
        }
    }

    /// Reverse of [`name`](Self::name).
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "null" => Self::Null,
            "bool" => Self::Bool,
            "short" => Self::Short,
            "ushort" => Self::UShort,
            "int" => Self::Int,
            "uint" => Self::UInt,
            "long" => Self::Long,
            "ulong" => Self::ULong,
            "llong" => Self::LLong,
            "ullong" => Self::ULLong,
            "float" => Self::Float,
            "double" => Self::Double,
            "bytes" => Self::Bytes,
            "string" => Self::String,
            "container" => Self::Container,
            "array" => Self::Array,
            _ => return None,
        })
    }

    /// Fixed payload width in bytes for scalar kinds, `None` otherwise.
    pub fn scalar_width(self) -> Option<usize> {
        Some(match self {
            Self::Null => 0,
            Self::Bool => 1,
            Self::Short | Self::UShort => 2,
            Self::Int | Self::UInt | Self::Float => 4,
            Self::Long | Self::ULong | Self::LLong | Self::ULLong | Self::Double => 8,
            Self::Bytes | Self::String | Self::Container | Self::Array => return None,
        })
    }

    /// True for kinds with a fixed-width inline payload.
    pub fn is_scalar(self) -> bool {
        self.scalar_width().is_some()
    }

    /// True for the eight integer kinds.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Short
                | Self::UShort
                | Self::Int
                | Self::UInt
                | Self::Long
                | Self::ULong
                | Self::LLong
                | Self::ULLong
        )
    }

    /// True for `float`/`double`.
    pub fn is_float(self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }
}

/// Normalize a signed 64-bit kind against its payload.
///
/// The `long`/`llong` pair shares one machine representation on 64-bit
/// targets; the logical kind rides the wire as a tag. Decode consults the
/// tag first: `long` survives only when the payload also fits `i32`,
/// otherwise the value lands as `llong`. Range never overrides an `llong`
/// tag.
pub fn normalize_signed64(tag: ValueKind, value: i64) -> ValueKind {
    if tag == ValueKind::Long && i32::try_from(value).is_err() {
        ValueKind::LLong
    } else {
        tag
    }
}
