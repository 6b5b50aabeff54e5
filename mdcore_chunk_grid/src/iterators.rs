//! Odometer iterators over strided regions.
//!
//! The iterators keep an explicit per-axis index state and increment it with carry, so the dimensionality of a region never bounds the stack depth.

use std::iter::FusedIterator;

/// An iterator over pairs of linear offsets of the elements of a strided region.
///
/// Each element `k` (an ND index within `count`) yields `(a_base + Σ k[i] * a_strides[i], b_base + Σ k[i] * b_strides[i])`.
/// The last axis varies fastest.
#[derive(Clone, Debug)]
pub struct OffsetPairs {
    count: Vec<usize>,
    index: Vec<usize>,
    a_strides: Vec<i64>,
    b_strides: Vec<i64>,
    a: i64,
    b: i64,
    remaining: usize,
}

impl OffsetPairs {
    /// Create a new offset pair iterator.
    ///
    /// Axes beyond the shortest of `count`, `a_strides` and `b_strides` are ignored.
    #[must_use]
    pub fn new(
        count: Vec<usize>,
        (a_base, a_strides): (i64, Vec<i64>),
        (b_base, b_strides): (i64, Vec<i64>),
    ) -> Self {
        let dimensionality = count.len().min(a_strides.len()).min(b_strides.len());
        let remaining = count[..dimensionality]
            .iter()
            .try_fold(1usize, |acc, &count| acc.checked_mul(count))
            .unwrap_or(usize::MAX);
        Self {
            index: vec![0; dimensionality],
            count: count[..dimensionality].to_vec(),
            a_strides,
            b_strides,
            a: a_base,
            b: b_base,
            remaining,
        }
    }

    /// Return the number of remaining offset pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.remaining
    }

    /// Returns true if there are no remaining offset pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining == 0
    }
}

#[allow(clippy::cast_possible_wrap)]
impl Iterator for OffsetPairs {
    type Item = (i64, i64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let item = (self.a, self.b);
        self.remaining -= 1;
        if self.remaining > 0 {
            for axis in (0..self.index.len()).rev() {
                self.index[axis] += 1;
                self.a = self.a.wrapping_add(self.a_strides[axis]);
                self.b = self.b.wrapping_add(self.b_strides[axis]);
                if self.index[axis] < self.count[axis] {
                    break;
                }
                let n = self.count[axis] as i64;
                self.a = self.a.wrapping_sub(self.a_strides[axis].wrapping_mul(n));
                self.b = self.b.wrapping_sub(self.b_strides[axis].wrapping_mul(n));
                self.index[axis] = 0;
            }
        }
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for OffsetPairs {}

impl FusedIterator for OffsetPairs {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_pairs_2d() {
        // a 2x3 region of a 4x5 array starting at (1, 1), written transposed into a 3x2 buffer
        let pairs: Vec<_> = OffsetPairs::new(vec![2, 3], (6, vec![5, 1]), (0, vec![1, 2])).collect();
        assert_eq!(
            pairs,
            vec![(6, 0), (7, 2), (8, 4), (11, 1), (12, 3), (13, 5)]
        );
    }

    #[test]
    fn offset_pairs_negative() {
        let pairs: Vec<_> = OffsetPairs::new(vec![3], (7, vec![-2]), (2, vec![-1])).collect();
        assert_eq!(pairs, vec![(7, 2), (5, 1), (3, 0)]);
    }

    #[test]
    fn offset_pairs_scalar_and_empty() {
        let scalar: Vec<_> = OffsetPairs::new(vec![], (3, vec![]), (4, vec![])).collect();
        assert_eq!(scalar, vec![(3, 4)]);
        let mut empty = OffsetPairs::new(vec![2, 0], (0, vec![1, 1]), (0, vec![1, 1]));
        assert!(empty.is_empty());
        assert_eq!(empty.next(), None);
    }

    #[test]
    fn offset_pairs_len() {
        let mut pairs = OffsetPairs::new(vec![2, 2, 2], (0, vec![4, 2, 1]), (0, vec![4, 2, 1]));
        assert_eq!(pairs.len(), 8);
        pairs.next();
        assert_eq!(pairs.len(), 7);
        assert_eq!(pairs.last(), Some((7, 7)));
    }
}
