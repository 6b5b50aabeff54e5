use std::num::NonZeroU64;

use crate::{ChunkShape, IncompatibleDimensionalityError};

/// Choose a processing chunk shape for an array of `array_shape` that holds at most `max_bytes` of elements of `element_size` bytes.
///
/// The chunk starts from the natural `block_shape` of the array, where a zero block extent becomes `default_block_size`.
/// Block extents are clamped to the array size.
///
/// - If the block exceeds the budget, axes are kept whole starting from the last (fastest varying) axis for as long as they fit.
///   The first axis that does not fit is reduced to fit and all slower axes become `1`.
/// - Otherwise axes are grown by integer multiples of the block, fastest varying first, while the budget allows and without exceeding the array size.
///
/// The chunk always holds at least one element.
///
/// # Errors
/// Returns [`IncompatibleDimensionalityError`] if the length of `block_shape` does not match `array_shape`.
pub fn chunk_size_for_budget(
    array_shape: &[u64],
    block_shape: &[u64],
    element_size: usize,
    max_bytes: usize,
    default_block_size: u64,
) -> Result<ChunkShape, IncompatibleDimensionalityError> {
    if block_shape.len() != array_shape.len() {
        return Err(IncompatibleDimensionalityError::new(
            block_shape.len(),
            array_shape.len(),
        ));
    }
    let max_elements = (max_bytes as u64 / (element_size as u64).max(1)).max(1);
    let sizes: Vec<u64> = array_shape.iter().map(|&size| size.max(1)).collect();
    let mut chunk: Vec<u64> = std::iter::zip(&sizes, block_shape)
        .map(|(&size, &block)| {
            let block = if block == 0 { default_block_size } else { block };
            block.clamp(1, size)
        })
        .collect();

    let product = |chunk: &[u64]| {
        chunk
            .iter()
            .try_fold(1u64, |acc, &c| acc.checked_mul(c))
    };

    if product(&chunk).is_none_or(|elements| elements > max_elements) {
        let mut elements = 1u64;
        for axis in (0..chunk.len()).rev() {
            match elements.checked_mul(chunk[axis]) {
                Some(n) if n <= max_elements => elements = n,
                _ => {
                    chunk[axis] = (max_elements / elements).max(1);
                    chunk[..axis].fill(1);
                    break;
                }
            }
        }
    } else {
        for axis in (0..chunk.len()).rev() {
            let elements = product(&chunk).unwrap_or(u64::MAX);
            let budget_factor = max_elements / elements;
            if budget_factor <= 1 {
                break;
            }
            chunk[axis] *= budget_factor.min(sizes[axis] / chunk[axis]);
        }
    }

    log::debug!(
        "processing chunk shape {chunk:?} for array shape {array_shape:?}, block shape {block_shape:?} and budget {max_bytes} bytes"
    );
    Ok(chunk
        .into_iter()
        .map(|c| NonZeroU64::new(c).unwrap_or(NonZeroU64::MIN))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(shape: &[u64], block: &[u64], element_size: usize, max_bytes: usize) -> Vec<u64> {
        chunk_size_for_budget(shape, block, element_size, max_bytes, 256)
            .unwrap()
            .into_iter()
            .map(NonZeroU64::get)
            .collect()
    }

    #[test]
    fn budget_default_block() {
        assert_eq!(budget(&[100, 1000], &[0, 0], 1, 100 * 256), vec![100, 256]);
        assert_eq!(budget(&[10], &[0], 1, 1 << 20), vec![10]);
    }

    #[test]
    fn budget_shrink() {
        // a 512x512 block of float64 in a 4 KiB budget
        assert_eq!(budget(&[1024, 1024], &[512, 512], 8, 4096), vec![1, 512]);
        assert_eq!(budget(&[1024, 1024], &[512, 512], 8, 1024), vec![1, 128]);
        assert_eq!(budget(&[64, 64, 64], &[64, 64, 64], 1, 64 * 64 * 3), vec![3, 64, 64]);
        assert_eq!(budget(&[8, 8], &[8, 8], 16, 1), vec![1, 1]);
    }

    #[test]
    fn budget_grow() {
        // rows of 100 columns grow along the fastest axis first
        assert_eq!(budget(&[1000, 1000], &[1, 100], 1, 1000 * 10), vec![10, 1000]);
        assert_eq!(budget(&[1000, 1000], &[1, 100], 1, 550), vec![1, 500]);
        // never exceeds the array size
        assert_eq!(budget(&[30, 250], &[1, 100], 1, 1 << 30), vec![30, 200]);
        assert_eq!(budget(&[30, 100], &[1, 100], 1, 1000), vec![10, 100]);
    }

    #[test]
    fn budget_dimensionality() {
        assert!(chunk_size_for_budget(&[1, 2], &[1], 1, 1, 256).is_err());
        assert!(chunk_size_for_budget(&[], &[], 1, 1, 256).unwrap().is_empty());
    }
}
