//! Static type model
//!
//! A variable type descriptor (VTD) pairs a base type with an array shape.
//! Scalars have `depth == 0` and no segments; `u8[2][3]` has segments
//! `[2, 3]` and depth 6.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Base type of a variable or expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    Float,
    String,
    Array,
    UserDefined,
    Undef,
    Nil,
}

impl BaseType {
    /// Map a source type name to a base type; unknown names are `Undef`
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "u8" => BaseType::U8,
            "u16" => BaseType::U16,
            "u32" => BaseType::U32,
            "u64" => BaseType::U64,
            "i8" => BaseType::I8,
            "i16" => BaseType::I16,
            "i32" => BaseType::I32,
            "i64" => BaseType::I64,
            "float" => BaseType::Float,
            "string" => BaseType::String,
            "nil" => BaseType::Nil,
            _ => BaseType::Undef,
        }
    }

    /// Whether this is one of the eight integer kinds
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            BaseType::U8
                | BaseType::U16
                | BaseType::U32
                | BaseType::U64
                | BaseType::I8
                | BaseType::I16
                | BaseType::I32
                | BaseType::I64
        )
    }

    /// Whether this is a signed integer kind
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            BaseType::I8 | BaseType::I16 | BaseType::I32 | BaseType::I64
        )
    }

    /// Position in the implicit widening order
    ///
    /// `U8 < U16 < U32 < U64 < I8 < I16 < I32 < I64 < Float < String`.
    /// Types outside the order return `None`.
    pub fn rank(self) -> Option<u8> {
        match self {
            BaseType::U8 => Some(0),
            BaseType::U16 => Some(1),
            BaseType::U32 => Some(2),
            BaseType::U64 => Some(3),
            BaseType::I8 => Some(4),
            BaseType::I16 => Some(5),
            BaseType::I32 => Some(6),
            BaseType::I64 => Some(7),
            BaseType::Float => Some(8),
            BaseType::String => Some(9),
            _ => None,
        }
    }

    /// The wider of two ranked types
    pub fn wider(self, other: BaseType) -> Option<BaseType> {
        let (a, b) = (self.rank()?, other.rank()?);
        Some(if a >= b { self } else { other })
    }

    /// Bit width of an integer kind
    pub fn int_bits(self) -> Option<u32> {
        match self {
            BaseType::U8 | BaseType::I8 => Some(8),
            BaseType::U16 | BaseType::I16 => Some(16),
            BaseType::U32 | BaseType::I32 => Some(32),
            BaseType::U64 | BaseType::I64 => Some(64),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BaseType::U8 => "u8",
            BaseType::U16 => "u16",
            BaseType::U32 => "u32",
            BaseType::U64 => "u64",
            BaseType::I8 => "i8",
            BaseType::I16 => "i16",
            BaseType::I32 => "i32",
            BaseType::I64 => "i64",
            BaseType::Float => "float",
            BaseType::String => "string",
            BaseType::Array => "array",
            BaseType::UserDefined => "user-defined",
            BaseType::Undef => "undefined",
            BaseType::Nil => "nil",
        }
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variable type descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vtd {
    pub base: BaseType,
    /// Total element count (product of segments), 0 for scalars
    pub depth: u64,
    /// Size of each array dimension, outermost first
    pub segments: Vec<u64>,
}

impl Vtd {
    /// A scalar of the given base type
    pub fn scalar(base: BaseType) -> Self {
        Self {
            base,
            depth: 0,
            segments: Vec::new(),
        }
    }

    /// An array of the given base type and shape
    pub fn array(base: BaseType, segments: Vec<u64>) -> Self {
        let depth = if segments.is_empty() {
            0
        } else {
            segments.iter().product()
        };
        Self {
            base,
            depth,
            segments,
        }
    }

    pub fn nil() -> Self {
        Self::scalar(BaseType::Nil)
    }

    pub fn undef() -> Self {
        Self::scalar(BaseType::Undef)
    }

    pub fn is_array(&self) -> bool {
        !self.segments.is_empty()
    }

    pub fn is_nil(&self) -> bool {
        self.base == BaseType::Nil && !self.is_array()
    }

    /// The type produced by indexing once: the leading segment is dropped
    pub fn element(&self) -> Vtd {
        match self.segments.split_first() {
            Some((_, rest)) => Vtd::array(self.base, rest.to_vec()),
            None => Vtd::scalar(self.base),
        }
    }
}

impl fmt::Display for Vtd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        for seg in &self.segments {
            write!(f, "[{}]", seg)?;
        }
        Ok(())
    }
}

/// A named, typed slot: a parameter or a declared variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub vtd: Vtd,
}

impl Variable {
    pub fn new(name: impl Into<String>, vtd: Vtd) -> Self {
        Self {
            name: name.into(),
            vtd,
        }
    }
}

/// Why an implicit cast was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastRefusal {
    Depth,
    UserDefined,
    Untyped,
    FromString,
}

impl CastRefusal {
    pub fn message(self) -> &'static str {
        match self {
            CastRefusal::Depth => "Unable to cast items of mismatched depth",
            CastRefusal::UserDefined => "User defined data casting is not yet supported",
            CastRefusal::Untyped => "Unable to cast to or from an undefined or nil type",
            CastRefusal::FromString => {
                "Can not safely cast directly from type 'string' to non-string data type"
            }
        }
    }
}

/// Check whether `actual` may be implicitly cast into a slot of type `expected`
pub fn check_cast(expected: &Vtd, actual: &Vtd) -> Result<(), CastRefusal> {
    if actual.depth > expected.depth {
        return Err(CastRefusal::Depth);
    }
    if expected.base == actual.base {
        return Ok(());
    }
    if expected.base == BaseType::UserDefined || actual.base == BaseType::UserDefined {
        return Err(CastRefusal::UserDefined);
    }
    if matches!(expected.base, BaseType::Undef | BaseType::Nil)
        || matches!(actual.base, BaseType::Undef | BaseType::Nil)
    {
        return Err(CastRefusal::Untyped);
    }
    if actual.base == BaseType::String {
        return Err(CastRefusal::FromString);
    }
    Ok(())
}

/// Boolean form of [`check_cast`]
pub fn can_cast_to_expected(expected: &Vtd, actual: &Vtd) -> bool {
    check_cast(expected, actual).is_ok()
}

/// Result of classifying an integer literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntClass {
    /// Smallest integer kind that holds the value
    pub kind: BaseType,
    pub value: i128,
}

/// Classify an integer literal into the smallest kind that holds it
///
/// Negative values pick from `I8..I64`, non-negative values from `U8..U64`.
/// Returns `None` for text that is not an integer or does not fit 64 bits.
pub fn classify_integer_literal(text: &str) -> Option<IntClass> {
    let value: i128 = text.trim().parse().ok()?;
    let kind = if value < 0 {
        if value >= i8::MIN as i128 {
            BaseType::I8
        } else if value >= i16::MIN as i128 {
            BaseType::I16
        } else if value >= i32::MIN as i128 {
            BaseType::I32
        } else if value >= i64::MIN as i128 {
            BaseType::I64
        } else {
            return None;
        }
    } else if value <= u8::MAX as i128 {
        BaseType::U8
    } else if value <= u16::MAX as i128 {
        BaseType::U16
    } else if value <= u32::MAX as i128 {
        BaseType::U32
    } else if value <= u64::MAX as i128 {
        BaseType::U64
    } else {
        return None;
    };
    Some(IntClass { kind, value })
}
