use crate::chunk_grid::{ArrayRegion, ArraySubset, ChunkWalker};
use crate::options::CopyOptions;
use crate::progress::Progress;

use super::{ArrayError, MdArray};

/// Copy the data of `src` into `dst` one processing chunk at a time.
///
/// The processing chunk of `src` is sized so the temporary buffer holds at most [`CopyOptions::chunk_memory`] bytes.
/// Values are converted from the `src` value type to the `dst` value type by [`MdArray::write`].
///
/// # Errors
/// Returns an [`ArrayError`] if
///  - the shapes of `src` and `dst` differ,
///  - a read or write fails, or
///  - `progress` aborts the copy ([`ArrayError::Aborted`]), in which case `dst` is partially written.
pub fn copy_array_data(
    dst: &dyn MdArray,
    src: &dyn MdArray,
    options: &CopyOptions,
    progress: &mut Progress,
) -> Result<(), ArrayError> {
    src.check_valid()?;
    dst.check_valid()?;
    let shape = src.shape();
    let dst_shape = dst.shape();
    if shape != dst_shape {
        return Err(ArrayError::ShapeMismatch {
            got: dst_shape,
            expected: shape,
        });
    }
    if shape.contains(&0) {
        return Ok(());
    }

    let value_type = src.value_type().clone();
    let element_size = value_type.size();
    let chunk_shape = src.processing_chunk_size(options.chunk_memory())?;
    let mut walker = ChunkWalker::new(&ArraySubset::new_with_shape(shape), &chunk_shape)?;
    let mut buffer = Vec::new();
    let completed = walker.walk(|visit| -> Result<bool, ArrayError> {
        let region = ArrayRegion::try_from(&visit.subset)?;
        let num_elements = region
            .num_elements()
            .and_then(|num_elements| num_elements.checked_mul(element_size))
            .ok_or_else(|| ArrayError::Other("chunk has too many elements".to_string()))?;
        buffer.resize(num_elements, 0);
        src.read(&region, &value_type, &mut buffer)?;
        dst.write(&region, &value_type, &buffer)?;
        #[allow(clippy::cast_precision_loss)]
        let fraction = (visit.index + 1) as f64 / visit.total as f64;
        Ok(progress.report(fraction, "copying array data"))
    })?;
    if completed {
        Ok(())
    } else {
        Err(ArrayError::Aborted)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::array::MdArrayExt;
    use crate::data_type::NumericKind;
    use crate::dimension::Dimension;
    use crate::memory::MemoryArray;

    use super::*;

    fn array_2d(kind: NumericKind) -> Arc<MemoryArray> {
        let y = Dimension::new("/", "y", "", "", 5);
        let x = Dimension::new("/", "x", "", "", 7);
        MemoryArray::new("a", &[y, x], kind.into()).unwrap()
    }

    #[test]
    fn copy_array_data_chunked() {
        let src = array_2d(NumericKind::Int16);
        let elements: Vec<i16> = (0..35).collect();
        src.write_elements(&ArrayRegion::new(vec![0, 0], vec![5, 7]), &elements)
            .unwrap();
        let dst = array_2d(NumericKind::Float32);

        let mut fractions = Vec::new();
        let mut callback = |fraction: f64, _: &str| {
            fractions.push(fraction);
            true
        };
        let options = CopyOptions {
            chunk_memory: Some(8),
            ..Default::default()
        };
        copy_array_data(&*dst, &*src, &options, &mut Progress::new(&mut callback)).unwrap();
        assert!(fractions.len() > 1);
        assert_eq!(fractions.last().copied(), Some(1.0));
        let expected: Vec<f32> = (0..35u8).map(f32::from).collect();
        assert_eq!(dst.read_all_elements::<f32>().unwrap(), expected);
    }

    #[test]
    fn copy_array_data_abort() {
        let src = array_2d(NumericKind::UInt8);
        let dst = array_2d(NumericKind::UInt8);
        let mut callback = |_: f64, _: &str| false;
        let options = CopyOptions {
            chunk_memory: Some(7),
            ..Default::default()
        };
        assert!(matches!(
            copy_array_data(&*dst, &*src, &options, &mut Progress::new(&mut callback)),
            Err(ArrayError::Aborted)
        ));
    }

    #[test]
    fn copy_array_data_shape_mismatch() {
        let src = array_2d(NumericKind::UInt8);
        let x = Dimension::new("/", "x", "", "", 7);
        let dst = MemoryArray::new("b", &[x], NumericKind::UInt8.into()).unwrap();
        assert!(matches!(
            copy_array_data(&*dst, &*src, &CopyOptions::default(), &mut Progress::none()),
            Err(ArrayError::ShapeMismatch { .. })
        ));
    }
}
