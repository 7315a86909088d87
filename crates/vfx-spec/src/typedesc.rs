//! Per-channel scalar data types.
//!
//! [`TypeDesc`] names the storage type of one channel sample, both for the
//! data persisted in a file and for the buffers callers hand to the I/O
//! layer. The I/O layer converts between the two on every read and write.
//!
//! # Usage
//!
//! ```rust
//! use vfx_spec::TypeDesc;
//!
//! let t: TypeDesc = "half".parse().unwrap();
//! assert_eq!(t, TypeDesc::Half);
//! assert_eq!(t.size(), 2);
//! assert!(t.is_float());
//! ```

use crate::error::SpecError;
use std::str::FromStr;

/// Scalar data type of one channel sample.
///
/// Byte-aligned types only; packed encodings (10/12-bit) are a codec
/// concern and are presented to callers in the next larger type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TypeDesc {
    /// 8-bit unsigned integer.
    #[default]
    UInt8,
    /// 8-bit signed integer.
    Int8,
    /// 16-bit unsigned integer.
    UInt16,
    /// 16-bit signed integer.
    Int16,
    /// 32-bit unsigned integer.
    UInt32,
    /// 32-bit signed integer.
    Int32,
    /// 16-bit half-precision float.
    Half,
    /// 32-bit single-precision float.
    Float,
    /// 64-bit double-precision float.
    Double,
}

impl TypeDesc {
    /// All types, smallest integer first.
    pub const ALL: [TypeDesc; 9] = [
        Self::UInt8,
        Self::Int8,
        Self::UInt16,
        Self::Int16,
        Self::UInt32,
        Self::Int32,
        Self::Half,
        Self::Float,
        Self::Double,
    ];

    /// Number of bytes per sample.
    #[inline]
    pub const fn size(&self) -> usize {
        match self {
            Self::UInt8 | Self::Int8 => 1,
            Self::UInt16 | Self::Int16 | Self::Half => 2,
            Self::UInt32 | Self::Int32 | Self::Float => 4,
            Self::Double => 8,
        }
    }

    /// Number of bits per sample.
    #[inline]
    pub const fn bits(&self) -> u32 {
        self.size() as u32 * 8
    }

    /// Whether this is a floating-point type.
    #[inline]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Half | Self::Float | Self::Double)
    }

    /// Whether this is a signed type (floats included).
    #[inline]
    pub const fn is_signed(&self) -> bool {
        !matches!(self, Self::UInt8 | Self::UInt16 | Self::UInt32)
    }

    /// Canonical lowercase name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UInt8 => "uint8",
            Self::Int8 => "int8",
            Self::UInt16 => "uint16",
            Self::Int16 => "int16",
            Self::UInt32 => "uint32",
            Self::Int32 => "int32",
            Self::Half => "half",
            Self::Float => "float",
            Self::Double => "double",
        }
    }
}

impl std::fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TypeDesc {
    type Err = SpecError;

    /// Parses canonical names and the common short aliases
    /// (`u8`, `i16`, `f16`, `f32`, `uint`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uint8" | "u8" | "uchar" => Ok(Self::UInt8),
            "int8" | "i8" | "char" => Ok(Self::Int8),
            "uint16" | "u16" | "ushort" => Ok(Self::UInt16),
            "int16" | "i16" | "short" => Ok(Self::Int16),
            "uint32" | "u32" | "uint" => Ok(Self::UInt32),
            "int32" | "i32" | "int" => Ok(Self::Int32),
            "half" | "f16" | "float16" => Ok(Self::Half),
            "float" | "f32" | "float32" => Ok(Self::Float),
            "double" | "f64" | "float64" => Ok(Self::Double),
            other => Err(SpecError::UnknownType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(TypeDesc::UInt8.size(), 1);
        assert_eq!(TypeDesc::Int16.size(), 2);
        assert_eq!(TypeDesc::Half.size(), 2);
        assert_eq!(TypeDesc::Float.size(), 4);
        assert_eq!(TypeDesc::Double.size(), 8);
        assert_eq!(TypeDesc::UInt32.bits(), 32);
    }

    #[test]
    fn test_parse_names() {
        for t in TypeDesc::ALL {
            assert_eq!(t.name().parse::<TypeDesc>().unwrap(), t);
        }
        assert_eq!("F32".parse::<TypeDesc>().unwrap(), TypeDesc::Float);
        assert!("rgb".parse::<TypeDesc>().is_err());
    }

    #[test]
    fn test_signedness() {
        assert!(!TypeDesc::UInt16.is_signed());
        assert!(TypeDesc::Int8.is_signed());
        assert!(TypeDesc::Half.is_signed());
        assert!(!TypeDesc::UInt32.is_float());
    }
}
