use crate::data_type::{NumericKind, ValueType};

/// A trait representing a numeric array element type.
///
/// Elements are plain old data, so element slices are reinterpreted as caller buffers without a copy.
pub trait Element: bytemuck::Pod + Send + Sync {
    /// The numeric kind of the element.
    const KIND: NumericKind;

    /// The value type of a buffer of elements.
    #[must_use]
    fn value_type() -> ValueType {
        ValueType::Numeric(Self::KIND)
    }
}

macro_rules! impl_element {
    ($raw_type:ty, $kind:ident) => {
        impl Element for $raw_type {
            const KIND: NumericKind = NumericKind::$kind;
        }
    };
}

impl_element!(u8, UInt8);
impl_element!(i8, Int8);
impl_element!(u16, UInt16);
impl_element!(i16, Int16);
impl_element!(u32, UInt32);
impl_element!(i32, Int32);
impl_element!(u64, UInt64);
impl_element!(i64, Int64);
impl_element!(half::f16, Float16);
impl_element!(f32, Float32);
impl_element!(f64, Float64);
impl_element!(num::complex::Complex32, ComplexFloat32);
impl_element!(num::complex::Complex64, ComplexFloat64);

#[cfg(test)]
mod tests {
    use num::complex::Complex32;

    use super::*;
    use crate::array::MdArrayExt;
    use crate::chunk_grid::ArrayRegion;
    use crate::dimension::Dimension;
    use crate::memory::MemoryArray;

    #[test]
    fn element_complex() {
        assert_eq!(Complex32::value_type().size(), 8);
        let x = Dimension::new("/", "x", "", "", 2);
        let array = MemoryArray::new("c", &[x], NumericKind::ComplexFloat32.into()).unwrap();
        let elements = [Complex32::new(1.0, -2.0), Complex32::new(0.5, 4.0)];
        array
            .write_elements(&ArrayRegion::new(vec![0], vec![2]), &elements)
            .unwrap();
        assert_eq!(array.read_all_elements::<Complex32>().unwrap(), elements);
    }
}
