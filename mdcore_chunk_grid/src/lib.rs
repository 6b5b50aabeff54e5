//! Request regions, bounds checking and chunk walking for the [`mdcore`](https://docs.rs/mdcore/latest/mdcore/index.html) crate.
//!
//! - An [`ArrayRegion`] is a strided hyper-rectangle read or write request: `start`, `count`, optional `step` and optional buffer strides.
//! - [`check_region`] validates a region against an array shape and a caller buffer, producing a normalised [`CheckedRegion`].
//! - [`ChunkWalker`] decomposes an [`ArraySubset`] into chunk-aligned sub-rectangles.
//! - [`chunk_size_for_budget`] picks a processing chunk shape that fits a memory budget.
//!
//! ## Licence
//! `mdcore_chunk_grid` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

mod array_subset;
pub use array_subset::{ArraySubset, ArraySubsetError};

mod region;
pub use region::{ArrayRegion, CheckedRegion, RegionError, check_region};

mod budget;
pub use budget::chunk_size_for_budget;

pub mod iterators;

mod walker;
pub use walker::{ChunkVisit, ChunkWalker};

use std::num::NonZeroU64;

/// The shape of an array.
pub type ArrayShape = Vec<u64>;

/// The shape of a chunk. All chunk extents are non-zero.
pub type ChunkShape = Vec<NonZeroU64>;

/// An ND index to an element in an array.
pub type ArrayIndices = Vec<u64>;

/// An incompatible dimensionality error.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("incompatible dimensionality {0}, expected {1}")]
pub struct IncompatibleDimensionalityError(usize, usize);

impl IncompatibleDimensionalityError {
    /// Create a new incompatible dimensionality error.
    #[must_use]
    pub const fn new(got: usize, expected: usize) -> Self {
        Self(got, expected)
    }
}

/// Compute the row-major (C-contiguous) element strides of `shape`.
///
/// Returns [`None`] if a stride overflows [`u64`].
#[must_use]
pub fn row_major_strides(shape: &[u64]) -> Option<Vec<u64>> {
    let mut strides = vec![1u64; shape.len()];
    for i in (1..shape.len()).rev() {
        strides[i - 1] = strides[i].checked_mul(shape[i].max(1))?;
    }
    Some(strides)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_major() {
        assert_eq!(row_major_strides(&[2, 3, 4]), Some(vec![12, 4, 1]));
        assert_eq!(row_major_strides(&[]), Some(vec![]));
        assert_eq!(row_major_strides(&[u64::MAX, 2, 2]), Some(vec![4, 2, 1]));
        assert_eq!(row_major_strides(&[2, u64::MAX, 2]), None);
    }
}
