use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A numeric primitive element kind.
///
/// Complex kinds store the real part followed by the imaginary part.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum NumericKind {
    #[display("uint8")]
    UInt8,
    #[display("int8")]
    Int8,
    #[display("uint16")]
    UInt16,
    #[display("int16")]
    Int16,
    #[display("uint32")]
    UInt32,
    #[display("int32")]
    Int32,
    #[display("uint64")]
    UInt64,
    #[display("int64")]
    Int64,
    #[display("float16")]
    Float16,
    #[display("float32")]
    Float32,
    #[display("float64")]
    Float64,
    #[display("complex_int16")]
    ComplexInt16,
    #[display("complex_int32")]
    ComplexInt32,
    #[display("complex_float16")]
    ComplexFloat16,
    #[display("complex_float32")]
    ComplexFloat32,
    #[display("complex_float64")]
    ComplexFloat64,
}

impl NumericKind {
    /// The size of an element in bytes.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::UInt8 | Self::Int8 => 1,
            Self::UInt16 | Self::Int16 | Self::Float16 => 2,
            Self::UInt32 | Self::Int32 | Self::Float32 | Self::ComplexInt16 | Self::ComplexFloat16 => 4,
            Self::UInt64
            | Self::Int64
            | Self::Float64
            | Self::ComplexInt32
            | Self::ComplexFloat32 => 8,
            Self::ComplexFloat64 => 16,
        }
    }

    /// Returns true for integer kinds (including complex integer kinds).
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::UInt8
                | Self::Int8
                | Self::UInt16
                | Self::Int16
                | Self::UInt32
                | Self::Int32
                | Self::UInt64
                | Self::Int64
                | Self::ComplexInt16
                | Self::ComplexInt32
        )
    }

    /// Returns true for signed kinds, including all floating point and complex kinds.
    #[must_use]
    pub const fn is_signed(self) -> bool {
        !matches!(
            self,
            Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64
        )
    }

    /// Returns true for real or complex floating point kinds.
    #[must_use]
    pub const fn is_floating(self) -> bool {
        matches!(
            self,
            Self::Float16
                | Self::Float32
                | Self::Float64
                | Self::ComplexFloat16
                | Self::ComplexFloat32
                | Self::ComplexFloat64
        )
    }

    /// Returns true for complex kinds.
    #[must_use]
    pub const fn is_complex(self) -> bool {
        matches!(
            self,
            Self::ComplexInt16
                | Self::ComplexInt32
                | Self::ComplexFloat16
                | Self::ComplexFloat32
                | Self::ComplexFloat64
        )
    }

    /// The number of significant decimal digits needed to round-trip a value of this kind through a string.
    ///
    /// Returns [`None`] for integer kinds, which are always printed exactly.
    #[must_use]
    pub const fn significant_digits(self) -> Option<usize> {
        match self {
            Self::Float16 | Self::ComplexFloat16 => Some(5),
            Self::Float32 | Self::ComplexFloat32 => Some(9),
            Self::Float64 | Self::ComplexFloat64 => Some(17),
            _ => None,
        }
    }
}
