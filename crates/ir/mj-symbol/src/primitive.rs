//! Built-in primitive types

use std::fmt;

/// Primitive types known to every compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveType {
    Void,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F16,
    F32,
    F64,
    F96,
    C16,
    Str,
}

impl PrimitiveType {
    /// Every primitive, in allocation order
    pub const ALL: [Self; 16] = [
        Self::Void,
        Self::Bool,
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::U8,
        Self::U16,
        Self::U32,
        Self::U64,
        Self::F16,
        Self::F32,
        Self::F64,
        Self::F96,
        Self::C16,
        Self::Str,
    ];

    /// Order in which a numeric literal commits to a type when nothing in
    /// its context decides: widest signed first, then unsigned, then float.
    pub const LITERAL_PRIORITY: [Self; 12] = [
        Self::I64,
        Self::I32,
        Self::I16,
        Self::I8,
        Self::U64,
        Self::U32,
        Self::U16,
        Self::U8,
        Self::F64,
        Self::F32,
        Self::F16,
        Self::F96,
    ];

    /// Case-insensitive lookup by name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|primitive| primitive.name().eq_ignore_ascii_case(name))
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Void => "Void",
            Self::Bool => "Bool",
            Self::I8 => "I8",
            Self::I16 => "I16",
            Self::I32 => "I32",
            Self::I64 => "I64",
            Self::U8 => "U8",
            Self::U16 => "U16",
            Self::U32 => "U32",
            Self::U64 => "U64",
            Self::F16 => "F16",
            Self::F32 => "F32",
            Self::F64 => "F64",
            Self::F96 => "F96",
            Self::C16 => "C16",
            Self::Str => "Str",
        }
    }

    /// Storage size; `Str` is a pointer-sized handle
    pub fn size_in_bytes(self) -> u32 {
        match self {
            Self::Void => 0,
            Self::Bool | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 | Self::F16 | Self::C16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 | Self::Str => 8,
            Self::F96 => 12,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    pub fn is_unsigned(self) -> bool {
        matches!(self, Self::U8 | Self::U16 | Self::U32 | Self::U64)
    }

    pub fn is_integer(self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::F16 | Self::F32 | Self::F64 | Self::F96)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Inclusive value range of an integer type
    pub fn integer_range(self) -> Option<(i128, i128)> {
        let range = match self {
            Self::I8 => (i128::from(i8::MIN), i128::from(i8::MAX)),
            Self::I16 => (i128::from(i16::MIN), i128::from(i16::MAX)),
            Self::I32 => (i128::from(i32::MIN), i128::from(i32::MAX)),
            Self::I64 => (i128::from(i64::MIN), i128::from(i64::MAX)),
            Self::U8 => (0, i128::from(u8::MAX)),
            Self::U16 => (0, i128::from(u16::MAX)),
            Self::U32 => (0, i128::from(u32::MAX)),
            Self::U64 => (0, i128::from(u64::MAX)),
            _ => return None,
        };
        Some(range)
    }

    /// Largest finite magnitude of a float type
    pub fn float_max(self) -> Option<f64> {
        match self {
            Self::F16 => Some(65504.0),
            Self::F32 => Some(f64::from(f32::MAX)),
            Self::F64 | Self::F96 => Some(f64::MAX),
            _ => None,
        }
    }

    /// Whether an integer value fits in this type. Floats hold any integer
    /// within their finite range.
    pub fn can_hold_integer(self, value: i128) -> bool {
        if let Some((min, max)) = self.integer_range() {
            return min <= value && value <= max;
        }
        self.float_max()
            .is_some_and(|max| (value as f64).abs() <= max)
    }

    pub fn can_hold_float(self, value: f64) -> bool {
        self.float_max().is_some_and(|max| value.abs() <= max)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}
