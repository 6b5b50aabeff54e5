use crate::config::global_config;

use super::{ArrayError, MdArray, MdArrayExt};

/// Returns `(start, increment)` if `array` is a 1-D real numeric array of regularly spaced values.
///
/// The increment is the mean step between the first and last value.
/// Every consecutive step must be within the [regular spacing tolerance](crate::config::Config#regular-spacing-tolerance) of the increment, relative to the increment.
/// A single-element array is regularly spaced with an increment of `0`.
///
/// Returns [`None`] for arrays that are not 1-D, are empty, or have a non-real value type.
///
/// # Errors
/// Returns an [`ArrayError`] if the array cannot be read.
pub fn is_regularly_spaced(array: &dyn MdArray) -> Result<Option<(f64, f64)>, ArrayError> {
    array.check_valid()?;
    let kind = array.value_type().numeric_kind();
    if array.dimensionality() != 1 || !kind.is_some_and(|kind| !kind.is_complex()) {
        return Ok(None);
    }
    let values: Vec<f64> = array.read_all_elements()?;
    let (Some(&first), Some(&last)) = (values.first(), values.last()) else {
        return Ok(None);
    };
    if values.len() == 1 {
        return Ok(Some((first, 0.0)));
    }

    #[allow(clippy::cast_precision_loss)]
    let increment = (last - first) / (values.len() - 1) as f64;
    let tolerance = global_config().regular_spacing_tolerance() * increment.abs();
    let regular = values
        .windows(2)
        .all(|pair| ((pair[1] - pair[0]) - increment).abs() <= tolerance);
    Ok(regular.then_some((first, increment)))
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use crate::chunk_grid::ArrayRegion;
    use crate::data_type::NumericKind;
    use crate::dimension::Dimension;
    use crate::memory::MemoryArray;

    use super::*;

    fn coordinates(values: &[f64]) -> std::sync::Arc<MemoryArray> {
        let dim = Dimension::new("/", "x", "", "", values.len() as u64);
        let array = MemoryArray::new("x", &[dim], NumericKind::Float64.into()).unwrap();
        array
            .write_elements(&ArrayRegion::new(vec![0], vec![values.len()]), values)
            .unwrap();
        array
    }

    #[test]
    #[serial]
    fn regularly_spaced() {
        let array = coordinates(&[10.0, 12.0, 14.0, 16.0]);
        assert_eq!(is_regularly_spaced(&*array).unwrap(), Some((10.0, 2.0)));

        let array = coordinates(&[10.0, 12.0, 14.001, 16.0]);
        assert_eq!(is_regularly_spaced(&*array).unwrap(), Some((10.0, 2.0)));

        let array = coordinates(&[10.0, 12.0, 15.0, 16.0]);
        assert_eq!(is_regularly_spaced(&*array).unwrap(), None);

        let array = coordinates(&[5.0]);
        assert_eq!(is_regularly_spaced(&*array).unwrap(), Some((5.0, 0.0)));
    }

    #[test]
    fn regularly_spaced_not_1d() {
        let y = Dimension::new("/", "y", "", "", 2);
        let x = Dimension::new("/", "x", "", "", 2);
        let array = MemoryArray::new("a", &[y, x], NumericKind::Float64.into()).unwrap();
        assert_eq!(is_regularly_spaced(&*array).unwrap(), None);
    }
}
