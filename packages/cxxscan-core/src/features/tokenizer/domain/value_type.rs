//! Expression types attached to tokens by the symbol database

use crate::config::{Platform, PrimitiveType};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Sign {
    #[default]
    Unknown,
    Signed,
    Unsigned,
}

/// Base type, ordered by conversion rank for the arithmetic kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum BaseType {
    #[default]
    Unknown,
    Void,
    Nullptr,
    Record,
    Container,
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
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ValueType {
    pub sign: Sign,
    pub base: BaseType,
    /// Pointer depth
    pub pointer: u32,
    /// Bit per indirection level, bit 0 is the value itself
    pub constness: u32,
    /// Spelled type for records and containers (`std::vector`, `Foo`)
    pub type_name: String,
}

impl ValueType {
    pub fn new(sign: Sign, base: BaseType, pointer: u32) -> Self {
        Self {
            sign,
            base,
            pointer,
            constness: 0,
            type_name: String::new(),
        }
    }

    pub fn named(base: BaseType, name: impl Into<String>) -> Self {
        Self {
            type_name: name.into(),
            ..Self::new(Sign::Unknown, base, 0)
        }
    }

    pub fn int() -> Self {
        Self::new(Sign::Signed, BaseType::Int, 0)
    }

    pub fn bool() -> Self {
        Self::new(Sign::Unknown, BaseType::Bool, 0)
    }

    pub fn size_t() -> Self {
        Self::new(Sign::Unsigned, BaseType::Long, 0)
    }

    pub fn is_integral(&self) -> bool {
        self.pointer == 0 && self.base >= BaseType::Bool && self.base <= BaseType::LongLong
    }

    pub fn is_float(&self) -> bool {
        self.pointer == 0 && self.base >= BaseType::Float
    }

    pub fn is_arithmetic(&self) -> bool {
        self.is_integral() || self.is_float()
    }

    pub fn is_pointer(&self) -> bool {
        self.pointer > 0
    }

    pub fn is_container(&self) -> bool {
        self.pointer == 0 && self.base == BaseType::Container
    }

    pub fn deref(&self) -> Self {
        let mut vt = self.clone();
        vt.pointer = vt.pointer.saturating_sub(1);
        vt.constness >>= 1;
        vt
    }

    pub fn address_of(&self) -> Self {
        let mut vt = self.clone();
        vt.pointer += 1;
        vt.constness <<= 1;
        vt
    }

    fn primitive(&self) -> Option<PrimitiveType> {
        if self.pointer > 0 {
            return Some(PrimitiveType::Pointer);
        }
        Some(match self.base {
            BaseType::Bool => PrimitiveType::Bool,
            BaseType::Char => PrimitiveType::Char,
            BaseType::Short => PrimitiveType::Short,
            BaseType::WChar => PrimitiveType::WChar,
            BaseType::Int => PrimitiveType::Int,
            BaseType::Long => PrimitiveType::Long,
            BaseType::LongLong => PrimitiveType::LongLong,
            BaseType::Float => PrimitiveType::Float,
            BaseType::Double => PrimitiveType::Double,
            BaseType::LongDouble => PrimitiveType::LongDouble,
            _ => return None,
        })
    }

    /// `sizeof` on the given platform
    pub fn size_of(&self, platform: &Platform) -> Option<u32> {
        self.primitive().map(|p| platform.size_of(p))
    }

    pub fn bits(&self, platform: &Platform) -> Option<u32> {
        self.primitive().map(|p| platform.bits_of(p))
    }

    pub fn is_signed(&self, platform: &Platform) -> bool {
        match self.sign {
            Sign::Signed => true,
            Sign::Unsigned => false,
            Sign::Unknown => self.base == BaseType::Char && platform.char_is_signed,
        }
    }

    /// Usual arithmetic conversions
    pub fn arithmetic_result(a: &ValueType, b: &ValueType, platform: &Platform) -> ValueType {
        if a.pointer > 0 || b.pointer > 0 {
            return if a.pointer >= b.pointer { a.clone() } else { b.clone() };
        }
        let a = a.promoted();
        let b = b.promoted();
        if a.is_float() || b.is_float() {
            return if a.base >= b.base { a } else { b };
        }
        if a.base == b.base {
            let sign = if a.sign == Sign::Unsigned || b.sign == Sign::Unsigned {
                Sign::Unsigned
            } else {
                Sign::Signed
            };
            return ValueType::new(sign, a.base, 0);
        }
        let (hi, lo) = if a.base > b.base { (a, b) } else { (b, a) };
        if hi.sign == Sign::Unsigned || lo.sign != Sign::Unsigned {
            return hi;
        }
        // unsigned lower rank vs signed higher rank: signed wins when it can hold every value
        if hi.bits(platform) > lo.bits(platform) {
            hi
        } else {
            ValueType::new(Sign::Unsigned, hi.base, 0)
        }
    }

    /// Integer promotion
    pub fn promoted(&self) -> ValueType {
        if self.is_integral() && self.base < BaseType::Int {
            ValueType::int()
        } else {
            self.clone()
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.constness & 1 == 1 {
            f.write_str("const ")?;
        }
        match self.sign {
            Sign::Unsigned => f.write_str("unsigned ")?,
            Sign::Signed if self.base == BaseType::Char => f.write_str("signed ")?,
            _ => {}
        }
        let base = match self.base {
            BaseType::Unknown => "?",
            BaseType::Void => "void",
            BaseType::Nullptr => "nullptr_t",
            BaseType::Record | BaseType::Container => self.type_name.as_str(),
            BaseType::Bool => "bool",
            BaseType::Char => "char",
            BaseType::Short => "short",
            BaseType::WChar => "wchar_t",
            BaseType::Int => "int",
            BaseType::Long => "long",
            BaseType::LongLong => "long long",
            BaseType::Float => "float",
            BaseType::Double => "double",
            BaseType::LongDouble => "long double",
        };
        f.write_str(base)?;
        for _ in 0..self.pointer {
            f.write_str(" *")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promotion_and_conversion() {
        let platform = Platform::default();
        let ch = ValueType::new(Sign::Signed, BaseType::Char, 0);
        let r = ValueType::arithmetic_result(&ch, &ch, &platform);
        assert_eq!(r.base, BaseType::Int);

        let uint = ValueType::new(Sign::Unsigned, BaseType::Int, 0);
        let long = ValueType::new(Sign::Signed, BaseType::Long, 0);
        // long is 64-bit on unix64 and holds every unsigned int
        assert_eq!(ValueType::arithmetic_result(&uint, &long, &platform), long);

        let r = ValueType::arithmetic_result(&uint, &ValueType::int(), &platform);
        assert_eq!(r.sign, Sign::Unsigned);
    }

    #[test]
    fn test_display() {
        let vt = ValueType::new(Sign::Unsigned, BaseType::Int, 1);
        assert_eq!(vt.to_string(), "unsigned int *");
    }
}
