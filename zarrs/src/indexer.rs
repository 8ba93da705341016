//! Decomposing an array-wide selection into per-chunk work.
//!
//! Three selection kinds are supported: orthogonal (an [`ArraySubset`], the axis-aligned region
//! produced by a Cartesian product of per-axis ranges), block (a hyperrectangle of whole chunks,
//! addressed by chunk-grid coordinates rather than array indices), and coordinate/fancy (an
//! explicit list of individual element points, gathered or scattered independently of one
//! another). Block selection reduces to orthogonal selection once its chunk-grid bounds are
//! translated to array indices, since a rectangle of whole chunks is itself an [`ArraySubset`].
//! Coordinate selection cannot: its output is a flat list of one value per point, not a dense
//! rectangular buffer, so it gets its own decomposition ([`PointSelection`]/[`plan_points`])
//! rather than sharing [`ChunkSelection`].

use zarrs_chunk_grid::{ArraySubset, RegularChunkGrid};

use crate::error::ArrayError;

/// One chunk's share of a larger selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSelection {
    /// The grid coordinates of the chunk.
    pub chunk_coords: Vec<u64>,
    /// The part of the selection that falls within this chunk, relative to the chunk's origin.
    pub chunk_subset: ArraySubset,
    /// The same region, relative to the origin of the overall selection — where this chunk's
    /// data lands in (or comes from) the caller's flat output/input buffer.
    pub output_subset: ArraySubset,
}

/// Decompose `selection` into the chunks it overlaps.
///
/// # Errors
/// Returns [`ArrayError::InvalidArraySubset`] if `selection` is not fully contained within
/// `array_shape`.
pub fn plan(
    chunk_grid: &RegularChunkGrid,
    array_shape: &[u64],
    selection: &ArraySubset,
) -> Result<Vec<ChunkSelection>, ArrayError> {
    if !selection.in_bounds(array_shape) {
        return Err(ArrayError::InvalidArraySubset {
            subset: format!("{selection:?}"),
            shape: array_shape.to_vec(),
        });
    }
    if selection.is_empty() {
        return Ok(Vec::new());
    }

    let chunk_coords: Vec<_> = chunk_grid.chunks_in_subset(selection)?.collect();
    let mut plans = Vec::with_capacity(chunk_coords.len());
    for chunk_coords in chunk_coords {
        let chunk_subset_clipped = chunk_grid.chunk_subset_clipped(&chunk_coords, array_shape)?;
        let Some(overlap) = selection.intersection(&chunk_subset_clipped) else {
            continue;
        };
        plans.push(ChunkSelection {
            chunk_subset: overlap.relative_to(&chunk_subset_clipped),
            output_subset: overlap.relative_to(selection),
            chunk_coords,
        });
    }
    Ok(plans)
}

/// Translate a block selection — `block_shape` whole chunks starting at chunk-grid coordinates
/// `block_start` — into the [`ArraySubset`] of array indices it covers, clipped to `array_shape`.
///
/// # Errors
/// Returns [`ArrayError::InvalidArraySubset`] if the block extends past the chunk grid implied by
/// `array_shape`.
pub fn block_to_array_subset(
    chunk_grid: &RegularChunkGrid,
    array_shape: &[u64],
    block_start: &[u64],
    block_shape: &[u64],
) -> Result<ArraySubset, ArrayError> {
    let grid_shape = chunk_grid.grid_shape(array_shape)?;
    let block_end: Vec<u64> = block_start.iter().zip(block_shape).map(|(&s, &n)| s + n).collect();
    if block_start.len() != grid_shape.len()
        || block_end.iter().zip(&grid_shape).any(|(&e, &g)| e > g)
        || block_shape.iter().any(|&n| n == 0)
    {
        return Err(ArrayError::InvalidArraySubset {
            subset: format!("block {block_start:?}+{block_shape:?}"),
            shape: grid_shape,
        });
    }

    let first_chunk: Vec<u64> = block_start.to_vec();
    let last_chunk: Vec<u64> = block_end.iter().map(|&e| e - 1).collect();
    let start = chunk_grid.chunk_subset(&first_chunk)?.start().to_vec();
    let last_subset_clipped = chunk_grid.chunk_subset_clipped(&last_chunk, array_shape)?;
    let end: Vec<u64> = last_subset_clipped
        .start()
        .iter()
        .zip(last_subset_clipped.shape())
        .map(|(&s, &n)| s + n)
        .collect();
    let shape: Vec<u64> = start.iter().zip(&end).map(|(&s, &e)| e - s).collect();
    Ok(ArraySubset::new(start, shape)?)
}

/// Decompose a block selection into per-chunk work, by first translating it to the equivalent
/// [`ArraySubset`] and reusing [`plan`].
///
/// # Errors
/// See [`block_to_array_subset`] and [`plan`].
pub fn plan_block(
    chunk_grid: &RegularChunkGrid,
    array_shape: &[u64],
    block_start: &[u64],
    block_shape: &[u64],
) -> Result<Vec<ChunkSelection>, ArrayError> {
    let subset = block_to_array_subset(chunk_grid, array_shape, block_start, block_shape)?;
    plan(chunk_grid, array_shape, &subset)
}

/// One point's share of a coordinate (fancy) selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointSelection {
    /// The grid coordinates of the chunk this point falls in.
    pub chunk_coords: Vec<u64>,
    /// The point's position relative to the chunk's (unclipped) origin.
    pub point_in_chunk: Vec<u64>,
    /// This point's position in the caller's flat list of points (and so in the flat
    /// gather/scatter output buffer, one element per point, in input order).
    pub output_index: usize,
}

/// Decompose an explicit list of `points` (one entry per selected element, each of array
/// dimensionality) into per-point chunk work.
///
/// Unlike [`plan`]/[`plan_block`], the result does not partition into a dense output region:
/// each point is independent, and the caller's gathered/scattered buffer has one element per
/// point, in the order `points` was given.
///
/// # Errors
/// Returns [`ArrayError::InvalidArraySubset`] if any point is out of bounds of `array_shape`, or
/// [`ArrayError::IncompatibleDimensionality`] if a point's dimensionality does not match
/// `array_shape`.
pub fn plan_points(
    chunk_grid: &RegularChunkGrid,
    array_shape: &[u64],
    points: &[Vec<u64>],
) -> Result<Vec<PointSelection>, ArrayError> {
    let chunk_shape = chunk_grid.chunk_shape();
    let mut plans = Vec::with_capacity(points.len());
    for (output_index, point) in points.iter().enumerate() {
        if point.len() != array_shape.len() {
            return Err(zarrs_chunk_grid::IncompatibleDimensionalityError::new(point.len(), array_shape.len()).into());
        }
        if point.iter().zip(array_shape).any(|(&p, &s)| p >= s) {
            return Err(ArrayError::InvalidArraySubset {
                subset: format!("point {point:?}"),
                shape: array_shape.to_vec(),
            });
        }
        let chunk_coords: Vec<u64> = point.iter().zip(chunk_shape).map(|(&p, &c)| p / c).collect();
        let point_in_chunk: Vec<u64> = point.iter().zip(chunk_shape).map(|(&p, &c)| p % c).collect();
        plans.push(PointSelection {
            chunk_coords,
            point_in_chunk,
            output_index,
        });
    }
    Ok(plans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plans_a_selection_spanning_two_chunks() {
        let grid = RegularChunkGrid::new(vec![3, 3]).unwrap();
        let selection = ArraySubset::new(vec![2, 0], vec![2, 3]).unwrap();
        let plans = plan(&grid, &[10, 9], &selection).unwrap();
        assert_eq!(plans.len(), 2);
        let first = &plans[0];
        assert_eq!(first.chunk_coords, vec![0, 0]);
        assert_eq!(first.chunk_subset.start(), &[2, 0]);
        assert_eq!(first.output_subset.start(), &[0, 0]);
    }

    #[test]
    fn whole_array_selection_covers_every_chunk() {
        let grid = RegularChunkGrid::new(vec![2, 2]).unwrap();
        let selection = ArraySubset::full(vec![4, 4]);
        let plans = plan(&grid, &[4, 4], &selection).unwrap();
        assert_eq!(plans.len(), 4);
    }

    #[test]
    fn out_of_bounds_selection_is_rejected() {
        let grid = RegularChunkGrid::new(vec![2, 2]).unwrap();
        let selection = ArraySubset::new(vec![0, 0], vec![10, 10]).unwrap();
        assert!(plan(&grid, &[4, 4], &selection).is_err());
    }

    #[test]
    fn empty_selection_plans_to_no_chunks() {
        let grid = RegularChunkGrid::new(vec![2, 2]).unwrap();
        let selection = ArraySubset::new(vec![0, 0], vec![0, 4]).unwrap();
        assert!(plan(&grid, &[4, 4], &selection).unwrap().is_empty());
    }

    #[test]
    fn block_selection_covers_the_requested_chunk_rectangle() {
        // 10x9 array, 3x3 chunks: a 4x3 chunk grid. Block [1,0]+[2,2] covers chunk rows 1..3,
        // cols 0..2, i.e. array rows 3..9, cols 0..6.
        let grid = RegularChunkGrid::new(vec![3, 3]).unwrap();
        let subset = block_to_array_subset(&grid, &[10, 9], &[1, 0], &[2, 2]).unwrap();
        assert_eq!(subset.start(), &[3, 0]);
        assert_eq!(subset.shape(), &[6, 6]);

        let plans = plan_block(&grid, &[10, 9], &[1, 0], &[2, 2]).unwrap();
        assert_eq!(plans.len(), 4);
    }

    #[test]
    fn block_selection_clips_to_a_boundary_chunk() {
        // 10-wide array, 3-wide chunks: grid shape is 4. The last chunk (index 3) is clipped to
        // width 1. A block covering chunks [2,4) must clip its far edge to the array bound.
        let grid = RegularChunkGrid::new(vec![3]).unwrap();
        let subset = block_to_array_subset(&grid, &[10], &[2], &[2]).unwrap();
        assert_eq!(subset.start(), &[6]);
        assert_eq!(subset.shape(), &[4]);
    }

    #[test]
    fn block_selection_out_of_grid_bounds_is_rejected() {
        let grid = RegularChunkGrid::new(vec![3, 3]).unwrap();
        assert!(block_to_array_subset(&grid, &[10, 9], &[0, 0], &[10, 10]).is_err());
    }

    #[test]
    fn point_selection_resolves_chunk_and_offset() {
        let grid = RegularChunkGrid::new(vec![3, 3]).unwrap();
        let points = vec![vec![0, 0], vec![4, 5], vec![9, 8]];
        let plans = plan_points(&grid, &[10, 9], &points).unwrap();
        assert_eq!(plans.len(), 3);
        assert_eq!(plans[0].chunk_coords, vec![0, 0]);
        assert_eq!(plans[0].point_in_chunk, vec![0, 0]);
        assert_eq!(plans[1].chunk_coords, vec![1, 1]);
        assert_eq!(plans[1].point_in_chunk, vec![1, 2]);
        assert_eq!(plans[2].chunk_coords, vec![3, 2]);
        assert_eq!(plans[2].point_in_chunk, vec![0, 2]);
        assert_eq!(plans[2].output_index, 2);
    }

    #[test]
    fn out_of_bounds_point_is_rejected() {
        let grid = RegularChunkGrid::new(vec![3, 3]).unwrap();
        assert!(plan_points(&grid, &[10, 9], &[vec![10, 0]]).is_err());
    }
}
