//! Target platform profiles
//!
//! Constant folding and `sizeof` simplification consult the selected profile,
//! never the host machine.

use super::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// Named platform profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Unix32,
    #[default]
    Unix64,
    Win32A,
    Win32W,
    Win64,
    Avr8,
    Elf32,
}

impl PlatformKind {
    pub const NAMES: [&'static str; 7] = ["unix32", "unix64", "win32a", "win32w", "win64", "avr8", "elf32"];

    pub fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "unix32" => Ok(Self::Unix32),
            "unix64" => Ok(Self::Unix64),
            "win32a" => Ok(Self::Win32A),
            "win32w" => Ok(Self::Win32W),
            "win64" => Ok(Self::Win64),
            "avr8" => Ok(Self::Avr8),
            "elf32" => Ok(Self::Elf32),
            other => Err(ConfigError::unknown_platform(other, &Self::NAMES)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unix32 => "unix32",
            Self::Unix64 => "unix64",
            Self::Win32A => "win32a",
            Self::Win32W => "win32w",
            Self::Win64 => "win64",
            Self::Avr8 => "avr8",
            Self::Elf32 => "elf32",
        }
    }
}

/// Primitive types whose size depends on the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Bool,
    Char,
    Short,
    WChar,
    Int,
    Long,
    LongLong,
    Float,
    Double,
    LongDouble,
    Pointer,
    SizeT,
}

/// Integer widths, pointer size and signedness defaults of a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub kind: PlatformKind,
    pub char_bit: u32,
    pub sizeof_bool: u32,
    pub sizeof_short: u32,
    pub sizeof_int: u32,
    pub sizeof_long: u32,
    pub sizeof_long_long: u32,
    pub sizeof_float: u32,
    pub sizeof_double: u32,
    pub sizeof_long_double: u32,
    pub sizeof_wchar_t: u32,
    pub sizeof_size_t: u32,
    pub sizeof_pointer: u32,
    /// Plain `char` is signed
    pub char_is_signed: bool,
}

impl Platform {
    pub fn from_kind(kind: PlatformKind) -> Self {
        match kind {
            PlatformKind::Unix32 | PlatformKind::Elf32 => Self {
                kind,
                sizeof_long: 4,
                sizeof_long_double: 12,
                sizeof_size_t: 4,
                sizeof_pointer: 4,
                ..Self::unix64()
            },
            PlatformKind::Unix64 => Self::unix64(),
            PlatformKind::Win32A | PlatformKind::Win32W => Self {
                kind,
                sizeof_long: 4,
                sizeof_long_double: 8,
                sizeof_wchar_t: 2,
                sizeof_size_t: 4,
                sizeof_pointer: 4,
                ..Self::unix64()
            },
            PlatformKind::Win64 => Self {
                kind,
                sizeof_long: 4,
                sizeof_long_double: 8,
                sizeof_wchar_t: 2,
                ..Self::unix64()
            },
            PlatformKind::Avr8 => Self {
                kind,
                char_bit: 8,
                sizeof_bool: 1,
                sizeof_short: 2,
                sizeof_int: 2,
                sizeof_long: 4,
                sizeof_long_long: 8,
                sizeof_float: 4,
                sizeof_double: 4,
                sizeof_long_double: 4,
                sizeof_wchar_t: 2,
                sizeof_size_t: 2,
                sizeof_pointer: 2,
                char_is_signed: true,
            },
        }
    }

    fn unix64() -> Self {
        Self {
            kind: PlatformKind::Unix64,
            char_bit: 8,
            sizeof_bool: 1,
            sizeof_short: 2,
            sizeof_int: 4,
            sizeof_long: 8,
            sizeof_long_long: 8,
            sizeof_float: 4,
            sizeof_double: 8,
            sizeof_long_double: 16,
            sizeof_wchar_t: 4,
            sizeof_size_t: 8,
            sizeof_pointer: 8,
            char_is_signed: true,
        }
    }

    pub fn from_name(name: &str) -> ConfigResult<Self> {
        Ok(Self::from_kind(PlatformKind::from_str(name)?))
    }

    /// `sizeof` in bytes
    pub fn size_of(&self, ty: PrimitiveType) -> u32 {
        match ty {
            PrimitiveType::Bool => self.sizeof_bool,
            PrimitiveType::Char => 1,
            PrimitiveType::Short => self.sizeof_short,
            PrimitiveType::WChar => self.sizeof_wchar_t,
            PrimitiveType::Int => self.sizeof_int,
            PrimitiveType::Long => self.sizeof_long,
            PrimitiveType::LongLong => self.sizeof_long_long,
            PrimitiveType::Float => self.sizeof_float,
            PrimitiveType::Double => self.sizeof_double,
            PrimitiveType::LongDouble => self.sizeof_long_double,
            PrimitiveType::Pointer => self.sizeof_pointer,
            PrimitiveType::SizeT => self.sizeof_size_t,
        }
    }

    pub fn bits_of(&self, ty: PrimitiveType) -> u32 {
        self.size_of(ty) * self.char_bit
    }

    /// Wrap `value` into the range of an integer of `bits` width
    pub fn truncate(value: i64, bits: u32, signed: bool) -> i64 {
        if bits == 0 || bits >= 64 {
            return value;
        }
        let mask = (1i64 << bits) - 1;
        let low = value & mask;
        if signed && (low >> (bits - 1)) & 1 == 1 {
            low | !mask
        } else {
            low
        }
    }

    pub fn min_value(bits: u32, signed: bool) -> i64 {
        match (signed, bits) {
            (false, _) => 0,
            (true, b) if b >= 64 => i64::MIN,
            (true, b) => -(1i64 << (b - 1)),
        }
    }

    pub fn max_value(bits: u32, signed: bool) -> i64 {
        match (signed, bits) {
            (_, b) if b >= 64 => i64::MAX,
            (true, b) => (1i64 << (b - 1)) - 1,
            (false, b) => (1i64 << b) - 1,
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::unix64()
    }
}
