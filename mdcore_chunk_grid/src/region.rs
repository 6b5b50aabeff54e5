//! Strided read/write requests and their validation.
//!
//! An [`ArrayRegion`] selects, along each axis `i`, the `count[i]` indices `start[i] + k * step[i]`.
//! Element `k` (an ND index within `count`) is held in the caller buffer at byte offset `buffer_offset + Σ k[i] * buffer_stride[i] * element_size`.
//!
//! [`check_region`] validates a region with overflow-checked 64-bit arithmetic and fills in defaults:
//!  - a missing `step` is `1` on every axis,
//!  - missing buffer strides are the row-major (C-contiguous) strides of `count`.

use itertools::izip;
use thiserror::Error;

use crate::iterators::OffsetPairs;
use crate::{ArraySubset, IncompatibleDimensionalityError, row_major_strides};

/// The maximum dimensionality supported by the buffer envelope check when a buffer stride is negative.
const MAX_CORNER_DIMENSIONALITY: usize = 30;

/// A region validation error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegionError {
    /// A region parameter does not match the array dimensionality.
    #[error(transparent)]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
    /// The count of an axis is zero.
    #[error("count is zero on axis {0}")]
    ZeroCount(usize),
    /// The start of an axis is outside the array.
    #[error("start {start} is out of bounds for axis {axis} of size {size}")]
    StartOutOfBounds {
        /// The axis.
        axis: usize,
        /// The start index.
        start: u64,
        /// The axis size.
        size: u64,
    },
    /// The last selected index of an axis is outside the array.
    #[error("last index {end} is out of bounds for axis {axis} of size {size}")]
    EndOutOfBounds {
        /// The axis.
        axis: usize,
        /// The last selected index.
        end: i64,
        /// The axis size.
        size: u64,
    },
    /// Index arithmetic on an axis overflowed.
    #[error("index arithmetic overflow on axis {0}")]
    Overflow(usize),
    /// Buffer offset arithmetic overflowed.
    #[error("buffer offset arithmetic overflow")]
    BufferOverflow,
    /// An element would be accessed outside the caller buffer.
    #[error("element at byte offset {offset} with size {element_size} is outside the buffer of {len} bytes")]
    BufferOutOfBounds {
        /// The byte offset of the element.
        offset: i64,
        /// The element size.
        element_size: usize,
        /// The buffer length.
        len: usize,
    },
    /// The dimensionality is too large to check the corners of the buffer envelope.
    #[error("dimensionality {0} is too large for negative buffer strides")]
    TooManyDimensions(usize),
}

/// A strided hyper-rectangle read or write request.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ArrayRegion {
    start: Vec<u64>,
    count: Vec<usize>,
    step: Option<Vec<i64>>,
    buffer_stride: Option<Vec<isize>>,
    buffer_offset: usize,
}

impl ArrayRegion {
    /// Create a new region with unit steps and a row-major caller buffer.
    #[must_use]
    pub fn new(start: Vec<u64>, count: Vec<usize>) -> Self {
        Self {
            start,
            count,
            ..Default::default()
        }
    }

    /// Create a region covering an entire array of `shape`.
    ///
    /// # Errors
    /// Returns [`RegionError::Overflow`] if an axis size exceeds [`usize::MAX`].
    pub fn new_with_shape(shape: &[u64]) -> Result<Self, RegionError> {
        Self::try_from(&ArraySubset::new_with_shape(shape.to_vec()))
    }

    /// Set the per-axis step (may be negative or zero).
    #[must_use]
    pub fn with_step(mut self, step: Vec<i64>) -> Self {
        self.step = Some(step);
        self
    }

    /// Set the per-axis buffer strides in elements (may be negative).
    #[must_use]
    pub fn with_buffer_stride(mut self, buffer_stride: Vec<isize>) -> Self {
        self.buffer_stride = Some(buffer_stride);
        self
    }

    /// Set the byte offset of the first selected element in the caller buffer.
    #[must_use]
    pub fn with_buffer_offset(mut self, buffer_offset: usize) -> Self {
        self.buffer_offset = buffer_offset;
        self
    }

    /// The start indices.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// The number of selected indices per axis.
    #[must_use]
    pub fn count(&self) -> &[usize] {
        &self.count
    }

    /// The steps, if set.
    #[must_use]
    pub fn step(&self) -> Option<&[i64]> {
        self.step.as_deref()
    }

    /// The buffer strides, if set.
    #[must_use]
    pub fn buffer_stride(&self) -> Option<&[isize]> {
        self.buffer_stride.as_deref()
    }

    /// The byte offset of the first selected element in the caller buffer.
    #[must_use]
    pub const fn buffer_offset(&self) -> usize {
        self.buffer_offset
    }

    /// The dimensionality of the region.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// The number of selected elements, or [`None`] on overflow.
    #[must_use]
    pub fn num_elements(&self) -> Option<usize> {
        self.count
            .iter()
            .try_fold(1usize, |acc, &count| acc.checked_mul(count))
    }
}

impl TryFrom<&ArraySubset> for ArrayRegion {
    type Error = RegionError;

    fn try_from(subset: &ArraySubset) -> Result<Self, Self::Error> {
        let count = subset
            .shape()
            .iter()
            .enumerate()
            .map(|(axis, &size)| usize::try_from(size).map_err(|_| RegionError::Overflow(axis)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(subset.start().to_vec(), count))
    }
}

/// A validated [`ArrayRegion`] with all defaults filled in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckedRegion {
    start: Vec<u64>,
    count: Vec<usize>,
    step: Vec<i64>,
    buffer_stride: Vec<isize>,
    buffer_offset: usize,
    num_elements: usize,
}

impl CheckedRegion {
    /// The start indices.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// The number of selected indices per axis.
    #[must_use]
    pub fn count(&self) -> &[usize] {
        &self.count
    }

    /// The steps.
    #[must_use]
    pub fn step(&self) -> &[i64] {
        &self.step
    }

    /// The buffer strides in elements.
    #[must_use]
    pub fn buffer_stride(&self) -> &[isize] {
        &self.buffer_stride
    }

    /// The byte offset of the first selected element in the caller buffer.
    #[must_use]
    pub const fn buffer_offset(&self) -> usize {
        self.buffer_offset
    }

    /// The dimensionality of the region.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// The number of selected elements.
    #[must_use]
    pub const fn num_elements(&self) -> usize {
        self.num_elements
    }

    /// Returns true if the steps are all one, so the region is a dense [`ArraySubset`].
    #[must_use]
    pub fn is_dense(&self) -> bool {
        self.step.iter().all(|&step| step == 1)
    }

    /// Returns the dense array subset selected by the region if [`is_dense`](Self::is_dense).
    #[must_use]
    pub fn as_subset(&self) -> Option<ArraySubset> {
        self.is_dense().then(|| {
            ArraySubset::from(
                std::iter::zip(&self.start, &self.count)
                    .map(|(&start, &count)| start..start.saturating_add(count as u64)),
            )
        })
    }

    /// Iterate over `(array element index, buffer byte offset)` for each selected element in row-major order.
    ///
    /// The array element index is the row-major linear index into an array of `array_shape`.
    /// Offsets that cannot be represented (only possible if `array_shape` is not the shape the region was checked against) are [`usize::MAX`].
    pub fn element_offsets(
        &self,
        array_shape: &[u64],
        element_size: usize,
    ) -> impl Iterator<Item = (usize, usize)> + use<> {
        let array_strides = row_major_strides(array_shape).unwrap_or_default();
        let as_i64 = |v: u64| i64::try_from(v).unwrap_or(i64::MAX);
        let array_base = izip!(&self.start, &array_strides).fold(0i64, |acc, (&start, &stride)| {
            acc.wrapping_add(as_i64(start).wrapping_mul(as_i64(stride)))
        });
        let array_steps = izip!(&self.step, &array_strides)
            .map(|(&step, &stride)| step.wrapping_mul(as_i64(stride)))
            .collect();
        self.pairs_with((array_base, array_steps), element_size)
    }

    /// Iterate over `(dense element index, buffer byte offset)` for each selected element in row-major order.
    ///
    /// The dense element index is the row-major linear index of the element within `count`.
    pub fn dense_offsets(&self, element_size: usize) -> impl Iterator<Item = (usize, usize)> + use<> {
        let dense_strides = row_major_strides(
            &self.count.iter().map(|&c| c as u64).collect::<Vec<_>>(),
        )
        .unwrap_or_default()
        .into_iter()
        .map(|stride| i64::try_from(stride).unwrap_or(i64::MAX))
        .collect();
        self.pairs_with((0, dense_strides), element_size)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn pairs_with(
        &self,
        a: (i64, Vec<i64>),
        element_size: usize,
    ) -> impl Iterator<Item = (usize, usize)> + use<> {
        let element_size = element_size as i64;
        let buffer_strides = self
            .buffer_stride
            .iter()
            .map(|&stride| (stride as i64).wrapping_mul(element_size))
            .collect();
        OffsetPairs::new(
            self.count.clone(),
            a,
            (self.buffer_offset as i64, buffer_strides),
        )
        .map(|(a, b)| {
            (
                usize::try_from(a).unwrap_or(usize::MAX),
                usize::try_from(b).unwrap_or(usize::MAX),
            )
        })
    }
}

impl From<CheckedRegion> for ArrayRegion {
    fn from(region: CheckedRegion) -> Self {
        Self {
            start: region.start,
            count: region.count,
            step: Some(region.step),
            buffer_stride: Some(region.buffer_stride),
            buffer_offset: region.buffer_offset,
        }
    }
}

/// Compute the row-major buffer strides (in elements) of a dense buffer holding `count`.
fn default_buffer_strides(count: &[usize]) -> Result<Vec<isize>, RegionError> {
    let mut strides = vec![1isize; count.len()];
    for axis in (1..count.len()).rev() {
        strides[axis - 1] = isize::try_from(count[axis])
            .ok()
            .and_then(|count| strides[axis].checked_mul(count))
            .ok_or(RegionError::Overflow(axis))?;
    }
    Ok(strides)
}

/// Validate `region` against an array of `array_shape` and a caller buffer of `buffer_len` bytes holding elements of `element_size` bytes.
///
/// For every axis `i`:
///  - `count[i] > 0`,
///  - `start[i] < array_shape[i]`, and
///  - the last selected index `start[i] + (count[i] - 1) * step[i]` lies within `[0, array_shape[i])` for either sign of `step[i]`.
///
/// Every byte of every element touched in the caller buffer must lie within `buffer_len`.
/// If all buffer strides are non-negative only the maximal offset is checked, otherwise all `2^d` corners of the buffer envelope are checked.
/// A region of zero dimensions selects a single scalar element.
///
/// # Errors
/// Returns a [`RegionError`] if the region is invalid or any index or offset arithmetic overflows.
pub fn check_region(
    array_shape: &[u64],
    region: &ArrayRegion,
    element_size: usize,
    buffer_len: usize,
) -> Result<CheckedRegion, RegionError> {
    let dimensionality = array_shape.len();
    let check_len = |len: usize| {
        if len == dimensionality {
            Ok(())
        } else {
            Err(IncompatibleDimensionalityError::new(len, dimensionality))
        }
    };
    check_len(region.start.len())?;
    check_len(region.count.len())?;
    let step = match &region.step {
        Some(step) => {
            check_len(step.len())?;
            step.clone()
        }
        None => vec![1; dimensionality],
    };
    let buffer_stride = match &region.buffer_stride {
        Some(buffer_stride) => {
            check_len(buffer_stride.len())?;
            buffer_stride.clone()
        }
        None => default_buffer_strides(&region.count)?,
    };

    let mut num_elements = 1usize;
    for (axis, (&start, &count, &step, &size)) in
        izip!(&region.start, &region.count, &step, array_shape).enumerate()
    {
        if count == 0 {
            return Err(RegionError::ZeroCount(axis));
        }
        if start >= size {
            return Err(RegionError::StartOutOfBounds { axis, start, size });
        }
        let end = i64::try_from(start)
            .ok()
            .zip(i64::try_from(count - 1).ok())
            .and_then(|(start, n)| n.checked_mul(step).and_then(|d| start.checked_add(d)))
            .ok_or(RegionError::Overflow(axis))?;
        if !u64::try_from(end).is_ok_and(|end| end < size) {
            return Err(RegionError::EndOutOfBounds { axis, end, size });
        }
        num_elements = num_elements
            .checked_mul(count)
            .ok_or(RegionError::Overflow(axis))?;
    }

    check_buffer_envelope(
        &region.count,
        &buffer_stride,
        region.buffer_offset,
        element_size,
        buffer_len,
    )?;

    Ok(CheckedRegion {
        start: region.start.clone(),
        count: region.count.clone(),
        step,
        buffer_stride,
        buffer_offset: region.buffer_offset,
        num_elements,
    })
}

fn check_buffer_envelope(
    count: &[usize],
    buffer_stride: &[isize],
    buffer_offset: usize,
    element_size: usize,
    buffer_len: usize,
) -> Result<(), RegionError> {
    let element_size_i64 = i64::try_from(element_size).map_err(|_| RegionError::BufferOverflow)?;
    let base = i64::try_from(buffer_offset).map_err(|_| RegionError::BufferOverflow)?;
    let len = i64::try_from(buffer_len).unwrap_or(i64::MAX);

    // byte extent of each axis from the first to the last selected element
    let extents = std::iter::zip(count, buffer_stride)
        .map(|(&count, &stride)| {
            i64::try_from(count.saturating_sub(1))
                .ok()
                .zip(i64::try_from(stride).ok())
                .and_then(|(n, stride)| n.checked_mul(stride))
                .and_then(|n| n.checked_mul(element_size_i64))
                .ok_or(RegionError::BufferOverflow)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let check_offset = |offset: i64| {
        let end = offset
            .checked_add(element_size_i64)
            .ok_or(RegionError::BufferOverflow)?;
        if offset < 0 || end > len {
            Err(RegionError::BufferOutOfBounds {
                offset,
                element_size,
                len: buffer_len,
            })
        } else {
            Ok(())
        }
    };

    if buffer_stride.iter().all(|&stride| stride >= 0) {
        let max_offset = extents
            .iter()
            .try_fold(base, |acc, &extent| acc.checked_add(extent))
            .ok_or(RegionError::BufferOverflow)?;
        check_offset(max_offset)
    } else {
        let dimensionality = extents.len();
        if dimensionality > MAX_CORNER_DIMENSIONALITY {
            return Err(RegionError::TooManyDimensions(dimensionality));
        }
        // axes with a zero extent do not move the corners
        let extents: Vec<i64> = extents.into_iter().filter(|&extent| extent != 0).collect();
        for corner in 0u32..(1u32 << extents.len()) {
            let offset = extents
                .iter()
                .enumerate()
                .filter(|(axis, _)| corner & (1 << axis) != 0)
                .try_fold(base, |acc, (_, &extent)| acc.checked_add(extent))
                .ok_or(RegionError::BufferOverflow)?;
            check_offset(offset)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_defaults() {
        let region = ArrayRegion::new(vec![1, 2], vec![2, 3]);
        let checked = check_region(&[4, 5], &region, 2, 12).unwrap();
        assert_eq!(checked.step(), &[1, 1]);
        assert_eq!(checked.buffer_stride(), &[3, 1]);
        assert_eq!(checked.num_elements(), 6);
        assert!(checked.is_dense());
        assert_eq!(
            checked.as_subset().unwrap(),
            ArraySubset::new_with_ranges(&[1..3, 2..5])
        );
        let offsets: Vec<_> = checked.element_offsets(&[4, 5], 2).collect();
        assert_eq!(
            offsets,
            vec![(7, 0), (8, 2), (9, 4), (12, 6), (13, 8), (14, 10)]
        );
        assert_eq!(ArrayRegion::from(checked.clone()).step(), Some(&[1i64, 1][..]));
    }

    #[test]
    fn region_axis_errors() {
        let shape = [8u64];
        let check = |region: ArrayRegion| check_region(&shape, &region, 1, 100);
        assert_eq!(
            check(ArrayRegion::new(vec![0], vec![0])),
            Err(RegionError::ZeroCount(0))
        );
        assert_eq!(
            check(ArrayRegion::new(vec![8], vec![1])),
            Err(RegionError::StartOutOfBounds {
                axis: 0,
                start: 8,
                size: 8
            })
        );
        assert_eq!(
            check(ArrayRegion::new(vec![6], vec![3])),
            Err(RegionError::EndOutOfBounds {
                axis: 0,
                end: 8,
                size: 8
            })
        );
        assert_eq!(
            check(ArrayRegion::new(vec![2], vec![4]).with_step(vec![-1])),
            Err(RegionError::EndOutOfBounds {
                axis: 0,
                end: -1,
                size: 8
            })
        );
        assert_eq!(
            check(ArrayRegion::new(vec![7], vec![4]).with_step(vec![-2])).map(|r| r.count().to_vec()),
            Ok(vec![4])
        );
        assert_eq!(
            check(ArrayRegion::new(vec![1], vec![usize::MAX]).with_step(vec![i64::MAX])),
            Err(RegionError::Overflow(0))
        );
        assert_eq!(
            check(ArrayRegion::new(vec![1, 1], vec![1, 1])),
            Err(RegionError::IncompatibleDimensionality(
                IncompatibleDimensionalityError::new(2, 1)
            ))
        );
        // a zero step repeats the start index
        assert!(check(ArrayRegion::new(vec![3], vec![10]).with_step(vec![0])).is_ok());
    }

    #[test]
    fn region_buffer_envelope() {
        let shape = [4u64, 4];
        let region = ArrayRegion::new(vec![0, 0], vec![2, 2]);
        assert!(check_region(&shape, &region, 4, 16).is_ok());
        assert_eq!(
            check_region(&shape, &region, 4, 15),
            Err(RegionError::BufferOutOfBounds {
                offset: 12,
                element_size: 4,
                len: 15
            })
        );

        // negative strides: the first element sits at the end of the buffer
        let reversed = region.clone().with_buffer_stride(vec![-2, -1]).with_buffer_offset(12);
        assert!(check_region(&shape, &reversed, 4, 16).is_ok());
        let reversed_low = region.clone().with_buffer_stride(vec![-2, -1]).with_buffer_offset(8);
        assert_eq!(
            check_region(&shape, &reversed_low, 4, 16),
            Err(RegionError::BufferOutOfBounds {
                offset: -4,
                element_size: 4,
                len: 16
            })
        );

        // mixed signs
        let mixed = region.with_buffer_stride(vec![-2, 1]).with_buffer_offset(8);
        assert!(check_region(&shape, &mixed, 4, 16).is_ok());
        let offsets: Vec<_> = check_region(&shape, &mixed, 4, 16)
            .unwrap()
            .dense_offsets(4)
            .collect();
        assert_eq!(offsets, vec![(0, 8), (1, 12), (2, 0), (3, 4)]);
    }

    #[test]
    fn region_too_many_dimensions() {
        let shape = vec![1u64; 31];
        let region = ArrayRegion::new(vec![0; 31], vec![1; 31])
            .with_buffer_stride(vec![-1; 31]);
        assert_eq!(
            check_region(&shape, &region, 1, 1),
            Err(RegionError::TooManyDimensions(31))
        );
        let region = ArrayRegion::new(vec![0; 30], vec![1; 30])
            .with_buffer_stride(vec![-1; 30]);
        assert!(check_region(&shape[..30], &region, 1, 1).is_ok());
    }

    #[test]
    fn region_scalar() {
        let region = ArrayRegion::new(vec![], vec![]);
        let checked = check_region(&[], &region, 8, 8).unwrap();
        assert_eq!(checked.num_elements(), 1);
        assert_eq!(checked.element_offsets(&[], 8).collect::<Vec<_>>(), vec![(0, 0)]);
        assert!(check_region(&[], &region, 8, 7).is_err());
    }
}
