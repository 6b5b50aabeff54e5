//! Value conversion between [`ValueType`]s.

use half::f16;
use thiserror::Error;

use crate::{NumericKind, ValueType, format_significant};

/// A value conversion error.
#[derive(Clone, Debug, Error)]
pub enum ValueConversionError {
    /// The source and destination value types are not convertible.
    #[error("cannot convert values of type {from} to {to}")]
    Incompatible {
        /// The source value type.
        from: Box<ValueType>,
        /// The destination value type.
        to: Box<ValueType>,
    },
    /// A destination compound component has no source counterpart.
    #[error("compound component `{0}` has no counterpart in the source type")]
    MissingComponent(String),
    /// A buffer is too small to hold the values.
    #[error("buffer of {got} bytes is too small, expected at least {expected} bytes")]
    BufferTooSmall {
        /// The buffer size.
        got: usize,
        /// The required size.
        expected: usize,
    },
}

/// A decoded numeric value.
///
/// Integer kinds decode to [`UInt`](NumericValue::UInt) or [`Int`](NumericValue::Int) so 64-bit integers are carried exactly.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum NumericValue {
    /// An unsigned integer.
    UInt(u64),
    /// A signed integer.
    Int(i64),
    /// A real floating point value.
    Float(f64),
    /// A complex value (real, imaginary).
    Complex(f64, f64),
}

fn ne_bytes<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut array = [0u8; N];
    array.copy_from_slice(&bytes[..N]);
    array
}

fn check_len(bytes: &[u8], expected: usize) -> Result<(), ValueConversionError> {
    if bytes.len() < expected {
        Err(ValueConversionError::BufferTooSmall {
            got: bytes.len(),
            expected,
        })
    } else {
        Ok(())
    }
}

#[allow(clippy::cast_precision_loss)]
impl NumericValue {
    /// Decode a value of `kind` from the start of `bytes`.
    ///
    /// # Errors
    /// Returns [`ValueConversionError::BufferTooSmall`] if `bytes` is shorter than the `kind` size.
    pub fn read(kind: NumericKind, bytes: &[u8]) -> Result<Self, ValueConversionError> {
        check_len(bytes, kind.size())?;
        Ok(match kind {
            NumericKind::UInt8 => Self::UInt(u64::from(bytes[0])),
            NumericKind::Int8 => Self::Int(i64::from(i8::from_ne_bytes([bytes[0]]))),
            NumericKind::UInt16 => Self::UInt(u64::from(u16::from_ne_bytes(ne_bytes(bytes)))),
            NumericKind::Int16 => Self::Int(i64::from(i16::from_ne_bytes(ne_bytes(bytes)))),
            NumericKind::UInt32 => Self::UInt(u64::from(u32::from_ne_bytes(ne_bytes(bytes)))),
            NumericKind::Int32 => Self::Int(i64::from(i32::from_ne_bytes(ne_bytes(bytes)))),
            NumericKind::UInt64 => Self::UInt(u64::from_ne_bytes(ne_bytes(bytes))),
            NumericKind::Int64 => Self::Int(i64::from_ne_bytes(ne_bytes(bytes))),
            NumericKind::Float16 => Self::Float(f16::from_ne_bytes(ne_bytes(bytes)).to_f64()),
            NumericKind::Float32 => Self::Float(f64::from(f32::from_ne_bytes(ne_bytes(bytes)))),
            NumericKind::Float64 => Self::Float(f64::from_ne_bytes(ne_bytes(bytes))),
            NumericKind::ComplexInt16 => Self::Complex(
                f64::from(i16::from_ne_bytes(ne_bytes(bytes))),
                f64::from(i16::from_ne_bytes(ne_bytes(&bytes[2..]))),
            ),
            NumericKind::ComplexInt32 => Self::Complex(
                f64::from(i32::from_ne_bytes(ne_bytes(bytes))),
                f64::from(i32::from_ne_bytes(ne_bytes(&bytes[4..]))),
            ),
            NumericKind::ComplexFloat16 => Self::Complex(
                f16::from_ne_bytes(ne_bytes(bytes)).to_f64(),
                f16::from_ne_bytes(ne_bytes(&bytes[2..])).to_f64(),
            ),
            NumericKind::ComplexFloat32 => Self::Complex(
                f64::from(f32::from_ne_bytes(ne_bytes(bytes))),
                f64::from(f32::from_ne_bytes(ne_bytes(&bytes[4..]))),
            ),
            NumericKind::ComplexFloat64 => Self::Complex(
                f64::from_ne_bytes(ne_bytes(bytes)),
                f64::from_ne_bytes(ne_bytes(&bytes[8..])),
            ),
        })
    }

    /// The real part of the value as a float.
    #[must_use]
    pub fn to_f64(self) -> f64 {
        match self {
            Self::UInt(v) => v as f64,
            Self::Int(v) => v as f64,
            Self::Float(v) | Self::Complex(v, _) => v,
        }
    }

    /// The value as a (real, imaginary) pair.
    #[must_use]
    pub fn to_complex(self) -> (f64, f64) {
        match self {
            Self::Complex(re, im) => (re, im),
            other => (other.to_f64(), 0.0),
        }
    }

    /// The real part of the value, dropping any imaginary part.
    #[must_use]
    const fn real(self) -> Self {
        match self {
            Self::Complex(re, _) => Self::Float(re),
            other => other,
        }
    }

    /// Encode the value as `kind` into the start of `bytes`.
    ///
    /// Integer destinations saturate at their bounds, floats are rounded to the nearest integer and NaN becomes zero.
    /// A complex source written to a real destination keeps its real part.
    ///
    /// # Errors
    /// Returns [`ValueConversionError::BufferTooSmall`] if `bytes` is shorter than the `kind` size.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_lossless
    )]
    pub fn write(self, kind: NumericKind, bytes: &mut [u8]) -> Result<(), ValueConversionError> {
        check_len(bytes, kind.size())?;

        macro_rules! to_int {
            ($value:expr, $ty:ty) => {
                match $value.real() {
                    Self::UInt(v) => {
                        i128::from(v).clamp(<$ty>::MIN.into(), <$ty>::MAX.into()) as $ty
                    }
                    Self::Int(v) => {
                        i128::from(v).clamp(<$ty>::MIN.into(), <$ty>::MAX.into()) as $ty
                    }
                    Self::Float(v) | Self::Complex(v, _) => v.round() as $ty,
                }
            };
        }
        macro_rules! put {
            ($offset:expr, $value:expr) => {{
                let value_bytes = $value.to_ne_bytes();
                bytes[$offset..$offset + value_bytes.len()].copy_from_slice(&value_bytes);
            }};
        }

        match kind {
            NumericKind::UInt8 => put!(0, to_int!(self, u8)),
            NumericKind::Int8 => put!(0, to_int!(self, i8)),
            NumericKind::UInt16 => put!(0, to_int!(self, u16)),
            NumericKind::Int16 => put!(0, to_int!(self, i16)),
            NumericKind::UInt32 => put!(0, to_int!(self, u32)),
            NumericKind::Int32 => put!(0, to_int!(self, i32)),
            NumericKind::UInt64 => put!(0, to_int!(self, u64)),
            NumericKind::Int64 => put!(0, to_int!(self, i64)),
            NumericKind::Float16 => put!(0, f16::from_f64(self.to_f64())),
            NumericKind::Float32 => put!(0, self.to_f64() as f32),
            NumericKind::Float64 => put!(0, self.to_f64()),
            NumericKind::ComplexInt16 => {
                let (re, im) = self.to_complex();
                put!(0, to_int!(Self::Float(re), i16));
                put!(2, to_int!(Self::Float(im), i16));
            }
            NumericKind::ComplexInt32 => {
                let (re, im) = self.to_complex();
                put!(0, to_int!(Self::Float(re), i32));
                put!(4, to_int!(Self::Float(im), i32));
            }
            NumericKind::ComplexFloat16 => {
                let (re, im) = self.to_complex();
                put!(0, f16::from_f64(re));
                put!(2, f16::from_f64(im));
            }
            NumericKind::ComplexFloat32 => {
                let (re, im) = self.to_complex();
                put!(0, re as f32);
                put!(4, im as f32);
            }
            NumericKind::ComplexFloat64 => {
                let (re, im) = self.to_complex();
                put!(0, re);
                put!(8, im);
            }
        }
        Ok(())
    }

    /// Format the value, read from an element of `kind`, as a string.
    ///
    /// Integers are printed exactly, floats with enough significant digits to round-trip, and complex values as `re+imj`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn format(self, kind: NumericKind) -> String {
        let digits = kind.significant_digits();
        match (self, digits) {
            (Self::UInt(v), _) => v.to_string(),
            (Self::Int(v), _) => v.to_string(),
            (Self::Float(v), Some(digits)) => format_significant(v, digits),
            (Self::Float(v), None) => (v as i64).to_string(),
            (Self::Complex(re, im), Some(digits)) => format!(
                "{}+{}j",
                format_significant(re, digits),
                format_significant(im, digits)
            ),
            (Self::Complex(re, im), None) => format!("{}+{}j", re as i64, im as i64),
        }
    }

    /// Parse `text` as a value destined for an element of `kind`.
    ///
    /// Integer kinds are parsed exactly where possible, falling back to a float parse.
    /// Parsing is locale independent, and unparseable or empty text is zero.
    #[must_use]
    pub fn parse(text: &str, kind: NumericKind) -> Self {
        let text = text.trim();
        if kind.is_integer() {
            if let Ok(v) = text.parse::<i64>() {
                return Self::Int(v);
            }
            if let Ok(v) = text.parse::<u64>() {
                return Self::UInt(v);
            }
        }
        Self::Float(text.parse::<f64>().unwrap_or(0.0))
    }
}

/// Convert a single value of `src_type` held at the start of `src` to a value of `dst_type` at the start of `dst`.
///
/// Compound to compound conversion copies each destination component from the same-named source component.
/// Destination bytes not covered by a component are left untouched.
///
/// # Errors
/// Returns a [`ValueConversionError`] if
///  - the value types are not convertible (see [`ValueType::can_convert_to`]),
///  - a destination compound component has no source counterpart, or
///  - `src` or `dst` is too small.
pub fn copy_value(
    src: &[u8],
    src_type: &ValueType,
    dst: &mut [u8],
    dst_type: &ValueType,
) -> Result<(), ValueConversionError> {
    check_len(src, src_type.size())?;
    check_len(dst, dst_type.size())?;
    match (src_type, dst_type) {
        (ValueType::Numeric(src_kind), ValueType::Numeric(dst_kind)) => {
            if src_kind == dst_kind {
                let size = src_kind.size();
                dst[..size].copy_from_slice(&src[..size]);
                Ok(())
            } else {
                NumericValue::read(*src_kind, src)?.write(*dst_kind, dst)
            }
        }
        (ValueType::Numeric(src_kind), ValueType::String(_)) => {
            let text = NumericValue::read(*src_kind, src)?.format(*src_kind);
            dst_type.write_string(dst, &text);
            Ok(())
        }
        (ValueType::String(_), ValueType::Numeric(dst_kind)) => {
            let text = src_type.read_string(src).unwrap_or_default();
            NumericValue::parse(&text, *dst_kind).write(*dst_kind, dst)
        }
        (ValueType::String(_), ValueType::String(_)) => {
            let text = src_type.read_string(src).unwrap_or_default();
            dst_type.write_string(dst, &text);
            Ok(())
        }
        (ValueType::Compound(src_compound), ValueType::Compound(dst_compound)) => {
            for dst_component in dst_compound.components() {
                let src_component = src_compound
                    .component(dst_component.name())
                    .ok_or_else(|| {
                        ValueConversionError::MissingComponent(dst_component.name().to_string())
                    })?;
                copy_value(
                    &src[src_component.offset()..],
                    src_component.value_type(),
                    &mut dst[dst_component.offset()..],
                    dst_component.value_type(),
                )?;
            }
            Ok(())
        }
        _ => Err(ValueConversionError::Incompatible {
            from: Box::new(src_type.clone()),
            to: Box::new(dst_type.clone()),
        }),
    }
}

/// Convert `count` values of `src_type` to `dst_type`.
///
/// `src_stride` and `dst_stride` are the distances between consecutive values in elements of the respective type.
///
/// # Errors
/// Returns a [`ValueConversionError`] if the value types are not convertible or a buffer is too small for `count` strided values.
pub fn copy_values(
    src: &[u8],
    src_type: &ValueType,
    src_stride: usize,
    dst: &mut [u8],
    dst_type: &ValueType,
    dst_stride: usize,
    count: usize,
) -> Result<(), ValueConversionError> {
    if count == 0 {
        return Ok(());
    }
    let src_size = src_type.size();
    let dst_size = dst_type.size();
    let required = |stride: usize, size: usize| {
        (count - 1)
            .checked_mul(stride)
            .and_then(|n| n.checked_mul(size))
            .and_then(|n| n.checked_add(size))
            .unwrap_or(usize::MAX)
    };
    check_len(src, required(src_stride, src_size))?;
    check_len(dst, required(dst_stride, dst_size))?;

    if src_type == dst_type && src_stride == 1 && dst_stride == 1 && src_type.is_numeric() {
        let len = count * src_size;
        dst[..len].copy_from_slice(&src[..len]);
        return Ok(());
    }
    for i in 0..count {
        let src_offset = i * src_stride * src_size;
        let dst_offset = i * dst_stride * dst_size;
        copy_value(
            &src[src_offset..],
            src_type,
            &mut dst[dst_offset..],
            dst_type,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::*;
    use crate::{CompoundComponent, CompoundType};

    fn numeric(kind: NumericKind) -> ValueType {
        ValueType::Numeric(kind)
    }

    fn string(len: usize) -> ValueType {
        ValueType::string(NonZeroUsize::new(len).unwrap())
    }

    fn convert(src: &[u8], src_type: &ValueType, dst_type: &ValueType) -> Vec<u8> {
        let mut dst = vec![0u8; dst_type.size()];
        copy_value(src, src_type, &mut dst, dst_type).unwrap();
        dst
    }

    #[test]
    fn numeric_to_numeric() {
        let float64 = numeric(NumericKind::Float64);
        let uint8 = numeric(NumericKind::UInt8);
        let int16 = numeric(NumericKind::Int16);

        assert_eq!(convert(&300.7f64.to_ne_bytes(), &float64, &uint8), [255]);
        assert_eq!(convert(&(-3.5f64).to_ne_bytes(), &float64, &uint8), [0]);
        assert_eq!(convert(&f64::NAN.to_ne_bytes(), &float64, &uint8), [0]);
        assert_eq!(convert(&2.5f64.to_ne_bytes(), &float64, &int16), 3i16.to_ne_bytes());
        assert_eq!(convert(&(-70000i32).to_ne_bytes(), &numeric(NumericKind::Int32), &int16), i16::MIN.to_ne_bytes());
        assert_eq!(
            convert(&u64::MAX.to_ne_bytes(), &numeric(NumericKind::UInt64), &numeric(NumericKind::Int64)),
            i64::MAX.to_ne_bytes()
        );
        assert_eq!(
            convert(&200u8.to_ne_bytes(), &uint8, &numeric(NumericKind::Float16)),
            f16::from_f64(200.0).to_ne_bytes()
        );
    }

    #[test]
    fn numeric_complex() {
        let cfloat64 = numeric(NumericKind::ComplexFloat64);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1.5f64.to_ne_bytes());
        bytes.extend_from_slice(&(-2.0f64).to_ne_bytes());

        let cint16 = convert(&bytes, &cfloat64, &numeric(NumericKind::ComplexInt16));
        assert_eq!(&cint16[..2], &2i16.to_ne_bytes());
        assert_eq!(&cint16[2..], &(-2i16).to_ne_bytes());

        let real = convert(&bytes, &cfloat64, &numeric(NumericKind::Float32));
        assert_eq!(real, 1.5f32.to_ne_bytes());

        let widened = convert(&7u16.to_ne_bytes(), &numeric(NumericKind::UInt16), &cfloat64);
        assert_eq!(NumericValue::read(NumericKind::ComplexFloat64, &widened).unwrap(), NumericValue::Complex(7.0, 0.0));
    }

    #[test]
    fn numeric_to_string() {
        let s = string(32);
        let text = |bytes: Vec<u8>| s.read_string(&bytes).unwrap();
        assert_eq!(text(convert(&(-42i64).to_ne_bytes(), &numeric(NumericKind::Int64), &s)), "-42");
        assert_eq!(text(convert(&u64::MAX.to_ne_bytes(), &numeric(NumericKind::UInt64), &s)), "18446744073709551615");
        assert_eq!(text(convert(&0.1f64.to_ne_bytes(), &numeric(NumericKind::Float64), &s)), "0.10000000000000001");
        assert_eq!(text(convert(&0.1f32.to_ne_bytes(), &numeric(NumericKind::Float32), &s)), "0.100000001");

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1.0f32.to_ne_bytes());
        bytes.extend_from_slice(&(-2.0f32).to_ne_bytes());
        assert_eq!(text(convert(&bytes, &numeric(NumericKind::ComplexFloat32), &s)), "1+-2j");
    }

    #[test]
    fn string_to_numeric() {
        let s = string(24);
        let mut slot = vec![0u8; 24];

        s.write_string(&mut slot, "9007199254740993");
        assert_eq!(convert(&slot, &s, &numeric(NumericKind::Int64)), 9_007_199_254_740_993i64.to_ne_bytes());

        s.write_string(&mut slot, " 2.75 ");
        assert_eq!(convert(&slot, &s, &numeric(NumericKind::Float64)), 2.75f64.to_ne_bytes());
        assert_eq!(convert(&slot, &s, &numeric(NumericKind::Int32)), 3i32.to_ne_bytes());

        s.write_string(&mut slot, "not a number");
        assert_eq!(convert(&slot, &s, &numeric(NumericKind::Float32)), 0f32.to_ne_bytes());

        // null string
        assert_eq!(convert(&[0u8; 24], &s, &numeric(NumericKind::UInt16)), 0u16.to_ne_bytes());
    }

    #[test]
    fn compound_to_compound() {
        let src_type: ValueType = CompoundType::new(
            "src",
            12,
            vec![
                CompoundComponent::new("a", 0, numeric(NumericKind::Int32)),
                CompoundComponent::new("b", 4, numeric(NumericKind::Float64)),
            ],
        )
        .unwrap()
        .into();
        let dst_type: ValueType = CompoundType::new(
            "dst",
            6,
            vec![
                CompoundComponent::new("b", 0, numeric(NumericKind::Int16)),
                CompoundComponent::new("a", 2, numeric(NumericKind::Float32)),
            ],
        )
        .unwrap()
        .into();

        let mut src = Vec::new();
        src.extend_from_slice(&7i32.to_ne_bytes());
        src.extend_from_slice(&(-4.0f64).to_ne_bytes());
        let dst = convert(&src, &src_type, &dst_type);
        assert_eq!(&dst[..2], &(-4i16).to_ne_bytes());
        assert_eq!(&dst[2..], &7.0f32.to_ne_bytes());

        let missing: ValueType = CompoundType::single_field("c", numeric(NumericKind::UInt8)).into();
        let mut out = [0u8; 1];
        assert!(matches!(
            copy_value(&src, &src_type, &mut out, &missing),
            Err(ValueConversionError::MissingComponent(name)) if name == "c"
        ));
    }

    #[test]
    fn incompatible_classes() {
        let compound: ValueType = CompoundType::single_field("a", numeric(NumericKind::UInt8)).into();
        let mut out = [0u8; 8];
        assert!(matches!(
            copy_value(&[1], &compound, &mut out, &numeric(NumericKind::Float64)),
            Err(ValueConversionError::Incompatible { .. })
        ));
        assert!(matches!(
            copy_value(&[1], &numeric(NumericKind::UInt16), &mut out, &numeric(NumericKind::Float64)),
            Err(ValueConversionError::BufferTooSmall { got: 1, expected: 2 })
        ));
    }

    #[test]
    fn strided_values() {
        let src: Vec<u8> = [1u16, 99, 2, 99, 3, 99]
            .iter()
            .flat_map(|v| v.to_ne_bytes())
            .collect();
        let mut dst = vec![0u8; 3 * 8];
        copy_values(
            &src,
            &numeric(NumericKind::UInt16),
            2,
            &mut dst,
            &numeric(NumericKind::Float64),
            1,
            3,
        )
        .unwrap();
        let values: Vec<f64> = bytemuck::pod_collect_to_vec(&dst);
        assert_eq!(values, [1.0, 2.0, 3.0]);

        assert!(copy_values(
            &src,
            &numeric(NumericKind::UInt16),
            3,
            &mut dst,
            &numeric(NumericKind::Float64),
            1,
            3,
        )
        .is_err());
    }
}
