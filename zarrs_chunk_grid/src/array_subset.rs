//! Axis-aligned hyperrectangular regions of an n-dimensional array.

use std::ops::Range;

use itertools::Itertools;
use thiserror::Error;

/// A point in an n-dimensional index space.
pub type ArrayIndices = Vec<u64>;

/// The shape of an n-dimensional array or chunk.
pub type ArrayShape = Vec<u64>;

/// Two array shapes/subsets of differing dimensionality were combined.
#[derive(Debug, Error)]
#[error("incompatible dimensionality: got {got}, expected {expected}")]
pub struct IncompatibleDimensionalityError {
    got: usize,
    expected: usize,
}

impl IncompatibleDimensionalityError {
    /// Create a new error.
    #[must_use]
    pub fn new(got: usize, expected: usize) -> Self {
        Self { got, expected }
    }
}

/// An axis-aligned hyperrectangular region of an n-dimensional index space, given by an
/// inclusive `start` and a `shape` (so the exclusive end is `start + shape`, element-wise).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArraySubset {
    start: ArrayIndices,
    shape: ArrayShape,
}

impl ArraySubset {
    /// Create a new subset from a `start` and `shape`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if `start.len() != shape.len()`.
    pub fn new(start: ArrayIndices, shape: ArrayShape) -> Result<Self, IncompatibleDimensionalityError> {
        if start.len() == shape.len() {
            Ok(Self { start, shape })
        } else {
            Err(IncompatibleDimensionalityError::new(start.len(), shape.len()))
        }
    }

    /// Create a subset covering the whole of `shape`, i.e. `start = 0`.
    #[must_use]
    pub fn full(shape: ArrayShape) -> Self {
        let start = vec![0; shape.len()];
        Self { start, shape }
    }

    /// Create a subset from a set of per-axis exclusive ranges.
    #[must_use]
    pub fn from_ranges(ranges: &[Range<u64>]) -> Self {
        let start = ranges.iter().map(|r| r.start).collect();
        let shape = ranges.iter().map(|r| r.end - r.start).collect();
        Self { start, shape }
    }

    /// The dimensionality of the subset.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// The inclusive start coordinates.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// The shape (extent along each axis).
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// The exclusive end coordinates (`start + shape`).
    #[must_use]
    pub fn end(&self) -> ArrayIndices {
        self.start
            .iter()
            .zip(&self.shape)
            .map(|(s, l)| s + l)
            .collect()
    }

    /// Per-axis exclusive ranges.
    #[must_use]
    pub fn to_ranges(&self) -> Vec<Range<u64>> {
        self.start
            .iter()
            .zip(&self.shape)
            .map(|(s, l)| *s..(s + l))
            .collect()
    }

    /// The total number of elements in the subset (zero if any axis has zero extent).
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Whether the subset has zero elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shape.iter().any(|&s| s == 0)
    }

    /// Whether `self` lies entirely within `[0, array_shape)`.
    #[must_use]
    pub fn in_bounds(&self, array_shape: &[u64]) -> bool {
        self.dimensionality() == array_shape.len()
            && self
                .end()
                .iter()
                .zip(array_shape)
                .all(|(e, s)| e <= s)
    }

    /// The intersection of `self` and `other`, or `None` if they are disjoint or of
    /// differing dimensionality.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if self.dimensionality() != other.dimensionality() {
            return None;
        }
        let self_end = self.end();
        let other_end = other.end();
        let mut start = Vec::with_capacity(self.dimensionality());
        let mut shape = Vec::with_capacity(self.dimensionality());
        for i in 0..self.dimensionality() {
            let s = self.start[i].max(other.start[i]);
            let e = self_end[i].min(other_end[i]);
            if e <= s {
                return None;
            }
            start.push(s);
            shape.push(e - s);
        }
        Some(Self { start, shape })
    }

    /// Translate `self` so that `origin.start()` becomes the zero coordinate.
    ///
    /// Used to turn an absolute overlap region into a region relative to a chunk's
    /// (`chunk_selection`) or the caller's output buffer (`out_selection`).
    ///
    /// # Panics
    /// Panics if `self` does not lie within `origin`'s extent when translated, which would
    /// indicate a logic error in the caller (the two subsets must share dimensionality and
    /// `self` must be derived from an intersection against a region containing `origin.start()`).
    #[must_use]
    pub fn relative_to(&self, origin: &Self) -> Self {
        let start = self
            .start
            .iter()
            .zip(&origin.start)
            .map(|(s, o)| {
                s.checked_sub(*o)
                    .expect("relative_to: self starts before origin")
            })
            .collect();
        Self {
            start,
            shape: self.shape.clone(),
        }
    }

    /// Iterate over every point in the subset in row-major order.
    pub fn iter_indices(&self) -> impl Iterator<Item = ArrayIndices> + '_ {
        self.to_ranges()
            .into_iter()
            .multi_cartesian_product()
            .filter(move |_| !self.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_of_disjoint_subsets_is_none() {
        let a = ArraySubset::new(vec![0, 0], vec![2, 2]).unwrap();
        let b = ArraySubset::new(vec![5, 5], vec![2, 2]).unwrap();
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn intersection_of_overlapping_subsets() {
        let a = ArraySubset::new(vec![0, 0], vec![5, 5]).unwrap();
        let b = ArraySubset::new(vec![3, 3], vec![5, 5]).unwrap();
        let i = a.intersection(&b).unwrap();
        assert_eq!(i.start(), &[3, 3]);
        assert_eq!(i.shape(), &[2, 2]);
    }

    #[test]
    fn relative_to_translates_to_local_coordinates() {
        let chunk = ArraySubset::new(vec![3, 2], vec![3, 2]).unwrap();
        let overlap = ArraySubset::new(vec![4, 2], vec![2, 1]).unwrap();
        let local = overlap.relative_to(&chunk);
        assert_eq!(local.start(), &[1, 0]);
        assert_eq!(local.shape(), &[2, 1]);
    }

    #[test]
    fn iter_indices_enumerates_row_major() {
        let s = ArraySubset::new(vec![0, 0], vec![2, 2]).unwrap();
        let points: Vec<_> = s.iter_indices().collect();
        assert_eq!(points, vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);
    }
}
