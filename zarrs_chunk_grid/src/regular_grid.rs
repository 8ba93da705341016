//! The regular chunk grid: every chunk (except possibly the last along each axis) has the
//! same fixed shape.

use thiserror::Error;

use crate::array_subset::{ArrayIndices, ArraySubset, ArrayShape};

/// The grid coordinates of a chunk, one entry per array dimension.
pub type ChunkCoords = Vec<u64>;

/// A `chunk_shape` was invalid for use with a given array shape.
#[derive(Debug, Error)]
pub enum ChunkGridError {
    /// `chunk_shape` and `array_shape` have differing lengths.
    #[error("chunk shape has dimensionality {got}, array has {expected}")]
    IncompatibleDimensionality {
        /// the chunk shape's dimensionality
        got: usize,
        /// the array shape's dimensionality
        expected: usize,
    },
    /// A chunk shape axis was zero.
    #[error("chunk shape axes must be non-zero, got {0:?}")]
    ZeroChunkShape(ArrayShape),
}

/// A regular (fixed-shape) chunk grid, per the `regular` chunk grid in the Zarr V3 spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegularChunkGrid {
    chunk_shape: ArrayShape,
}

impl RegularChunkGrid {
    /// Create a new regular chunk grid with the given `chunk_shape`.
    ///
    /// # Errors
    /// Returns [`ChunkGridError::ZeroChunkShape`] if any axis of `chunk_shape` is zero.
    pub fn new(chunk_shape: ArrayShape) -> Result<Self, ChunkGridError> {
        if chunk_shape.iter().any(|&s| s == 0) {
            return Err(ChunkGridError::ZeroChunkShape(chunk_shape));
        }
        Ok(Self { chunk_shape })
    }

    /// The fixed chunk shape.
    #[must_use]
    pub fn chunk_shape(&self) -> &[u64] {
        &self.chunk_shape
    }

    /// The number of chunks along each axis required to cover `array_shape`.
    ///
    /// # Errors
    /// Returns [`ChunkGridError::IncompatibleDimensionality`] on a dimensionality mismatch.
    pub fn grid_shape(&self, array_shape: &[u64]) -> Result<ArrayShape, ChunkGridError> {
        self.check_dimensionality(array_shape)?;
        Ok(array_shape
            .iter()
            .zip(&self.chunk_shape)
            .map(|(&a, &c)| a.div_ceil(c))
            .collect())
    }

    /// Iterate over every chunk's grid coordinates covering `array_shape`, in row-major order.
    ///
    /// # Errors
    /// Returns [`ChunkGridError::IncompatibleDimensionality`] on a dimensionality mismatch.
    pub fn chunk_indices(
        &self,
        array_shape: &[u64],
    ) -> Result<impl Iterator<Item = ChunkCoords>, ChunkGridError> {
        let grid_shape = self.grid_shape(array_shape)?;
        Ok(ArraySubset::full(grid_shape).iter_indices())
    }

    /// The unclipped subset occupied by chunk `chunk_coords`, i.e. as if every chunk were
    /// full-size regardless of array boundary truncation.
    ///
    /// # Errors
    /// Returns [`ChunkGridError::IncompatibleDimensionality`] if `chunk_coords` doesn't match
    /// this grid's dimensionality.
    pub fn chunk_subset(&self, chunk_coords: &[u64]) -> Result<ArraySubset, ChunkGridError> {
        self.check_dimensionality(chunk_coords)?;
        let start: ArrayIndices = chunk_coords
            .iter()
            .zip(&self.chunk_shape)
            .map(|(&c, &s)| c * s)
            .collect();
        ArraySubset::new(start, self.chunk_shape.clone())
            .map_err(|_| ChunkGridError::IncompatibleDimensionality {
                got: chunk_coords.len(),
                expected: self.chunk_shape.len(),
            })
    }

    /// The subset occupied by chunk `chunk_coords`, clipped to `array_shape` (the last chunk
    /// along a boundary axis may be smaller than [`chunk_shape`](Self::chunk_shape)).
    ///
    /// # Errors
    /// Returns [`ChunkGridError`] on a dimensionality mismatch.
    pub fn chunk_subset_clipped(
        &self,
        chunk_coords: &[u64],
        array_shape: &[u64],
    ) -> Result<ArraySubset, ChunkGridError> {
        self.check_dimensionality(array_shape)?;
        let unclipped = self.chunk_subset(chunk_coords)?;
        let full = ArraySubset::full(array_shape.to_vec());
        Ok(unclipped
            .intersection(&full)
            .unwrap_or_else(|| ArraySubset::new(unclipped.start().to_vec(), vec![0; unclipped.dimensionality()]).unwrap()))
    }

    /// The range of chunk grid coordinates (inclusive lower, inclusive upper) that overlap
    /// `subset`.
    ///
    /// # Errors
    /// Returns [`ChunkGridError::IncompatibleDimensionality`] on a dimensionality mismatch.
    pub fn chunks_in_subset(
        &self,
        subset: &ArraySubset,
    ) -> Result<impl Iterator<Item = ChunkCoords>, ChunkGridError> {
        self.check_dimensionality(subset.shape())?;
        let end = subset.end();
        let lower: ChunkCoords = subset
            .start()
            .iter()
            .zip(&self.chunk_shape)
            .map(|(&s, &c)| s / c)
            .collect();
        let upper: ChunkCoords = end
            .iter()
            .zip(&self.chunk_shape)
            .map(|(&e, &c)| (e.saturating_sub(1)) / c)
            .collect();
        let shape: ArrayShape = lower
            .iter()
            .zip(&upper)
            .map(|(&l, &u)| u - l + 1)
            .collect();
        let lower_subset = ArraySubset::new(lower, shape).unwrap();
        Ok(lower_subset.iter_indices())
    }

    fn check_dimensionality(&self, other: &[u64]) -> Result<(), ChunkGridError> {
        if other.len() == self.chunk_shape.len() {
            Ok(())
        } else {
            Err(ChunkGridError::IncompatibleDimensionality {
                got: other.len(),
                expected: self.chunk_shape.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_shape_rounds_up() {
        let grid = RegularChunkGrid::new(vec![3, 3]).unwrap();
        assert_eq!(grid.grid_shape(&[10, 9]).unwrap(), vec![4, 3]);
    }

    #[test]
    fn chunk_subset_clipped_truncates_boundary_chunk() {
        let grid = RegularChunkGrid::new(vec![3, 3]).unwrap();
        let clipped = grid.chunk_subset_clipped(&[3, 2], &[10, 9]).unwrap();
        assert_eq!(clipped.start(), &[9, 6]);
        assert_eq!(clipped.shape(), &[1, 3]);
    }

    #[test]
    fn chunk_subset_is_unclipped() {
        let grid = RegularChunkGrid::new(vec![3, 3]).unwrap();
        let full = grid.chunk_subset(&[3, 2]).unwrap();
        assert_eq!(full.shape(), &[3, 3]);
    }

    #[test]
    fn chunks_in_subset_covers_overlap() {
        let grid = RegularChunkGrid::new(vec![3, 3]).unwrap();
        let subset = ArraySubset::new(vec![2, 2], vec![5, 5]).unwrap();
        let coords: Vec<_> = grid.chunks_in_subset(&subset).unwrap().collect();
        assert_eq!(coords.len(), 9); // chunks (0..=2, 0..=2)
    }

    #[test]
    fn zero_chunk_shape_axis_is_rejected() {
        assert!(RegularChunkGrid::new(vec![0, 3]).is_err());
    }
}
