use std::num::NonZeroU64;

use crate::{ArraySubset, IncompatibleDimensionalityError};

/// A chunk-aligned sub-rectangle visited by a [`ChunkWalker`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkVisit {
    /// The sub-rectangle, in array coordinates.
    pub subset: ArraySubset,
    /// The sequence index of the visit, starting at zero.
    pub index: u64,
    /// The total number of visits.
    pub total: u64,
}

/// Decomposes a request rectangle into chunk-aligned sub-rectangles.
///
/// Chunk boundaries lie at multiples of the chunk shape from the array origin.
/// Chunks partially covered by the request are clipped to it, so the union of the visited sub-rectangles is exactly the request and no two overlap.
///
/// Sub-rectangles are visited in outer-product order with the first dimension varying slowest.
///
/// ```
/// # use std::num::NonZeroU64;
/// # use mdcore_chunk_grid::{ArraySubset, ChunkWalker};
/// let chunk_shape = [NonZeroU64::new(4).unwrap()];
/// let walker = ChunkWalker::new(&ArraySubset::new_with_ranges(&[3..9]), &chunk_shape).unwrap();
/// let visits: Vec<_> = walker.map(|visit| visit.subset.to_ranges()).collect();
/// assert_eq!(visits, vec![vec![3..4], vec![4..8], vec![8..9]]);
/// ```
#[derive(Clone, Debug)]
pub struct ChunkWalker {
    region: ArraySubset,
    chunk_shape: Vec<u64>,
    first_chunk: Vec<u64>,
    num_chunks: Vec<u64>,
    chunk_index: Vec<u64>,
    next_index: u64,
    total: u64,
}

impl ChunkWalker {
    /// Create a new chunk walker over `region` with chunks of `chunk_shape`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the dimensionality of `chunk_shape` does not match `region`.
    pub fn new(
        region: &ArraySubset,
        chunk_shape: &[NonZeroU64],
    ) -> Result<Self, IncompatibleDimensionalityError> {
        if chunk_shape.len() != region.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                chunk_shape.len(),
                region.dimensionality(),
            ));
        }
        let chunk_shape: Vec<u64> = chunk_shape.iter().map(|c| c.get()).collect();
        let (first_chunk, num_chunks): (Vec<u64>, Vec<u64>) = if region.is_empty() {
            (vec![0; chunk_shape.len()], vec![0; chunk_shape.len()])
        } else {
            std::iter::zip(region.to_ranges(), &chunk_shape)
                .map(|(range, &chunk)| {
                    let first = range.start / chunk;
                    let last = (range.end - 1) / chunk;
                    (first, last - first + 1)
                })
                .unzip()
        };
        let total = num_chunks
            .iter()
            .try_fold(1u64, |acc, &n| acc.checked_mul(n))
            .unwrap_or(u64::MAX);
        Ok(Self {
            region: region.clone(),
            chunk_index: first_chunk.clone(),
            chunk_shape,
            first_chunk,
            num_chunks,
            next_index: 0,
            total,
        })
    }

    /// The total number of sub-rectangles.
    #[must_use]
    pub const fn total_chunks(&self) -> u64 {
        self.total
    }

    /// The number of chunks touched along each axis.
    #[must_use]
    pub fn num_chunks(&self) -> &[u64] {
        &self.num_chunks
    }

    /// Visit each remaining sub-rectangle with `visitor`, which returns `Ok(true)` to continue or `Ok(false)` to abort.
    ///
    /// Returns `Ok(false)` if the visitor aborted the walk, in which case no further sub-rectangles are visited.
    ///
    /// # Errors
    /// Returns the first error returned by `visitor`.
    pub fn walk<E>(
        &mut self,
        mut visitor: impl FnMut(&ChunkVisit) -> Result<bool, E>,
    ) -> Result<bool, E> {
        for visit in self.by_ref() {
            if !visitor(&visit)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn current(&self) -> ArraySubset {
        let region_end = self.region.end_exc();
        ArraySubset::from(
            itertools::izip!(
                &self.chunk_index,
                &self.chunk_shape,
                self.region.start(),
                &region_end
            )
            .map(|(&index, &chunk, &start, &end)| {
                let chunk_start = index.saturating_mul(chunk);
                let lo = chunk_start.max(start);
                let hi = chunk_start.saturating_add(chunk).min(end);
                lo..hi
            }),
        )
    }
}

impl Iterator for ChunkWalker {
    type Item = ChunkVisit;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_index >= self.total {
            return None;
        }
        let visit = ChunkVisit {
            subset: self.current(),
            index: self.next_index,
            total: self.total,
        };
        self.next_index += 1;
        for axis in (0..self.chunk_index.len()).rev() {
            self.chunk_index[axis] += 1;
            if self.chunk_index[axis] < self.first_chunk[axis] + self.num_chunks[axis] {
                break;
            }
            self.chunk_index[axis] = self.first_chunk[axis];
        }
        Some(visit)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.total - self.next_index).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl std::iter::FusedIterator for ChunkWalker {}
