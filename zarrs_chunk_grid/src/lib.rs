//! The chunk grid and array subset/indexing machinery for the [`zarrs`](https://docs.rs/zarrs/latest/zarrs/index.html) crate.
//!
//! A chunk grid partitions an array's `shape` into a regular grid of fixed-size chunks, per the
//! Zarr V3 specification's `regular` chunk grid. [`ArraySubset`] is the hyperrectangular region
//! type used throughout `zarrs` to describe both array-level selections and the portion of an
//! individual chunk they touch.
//!
//! ## Licence
//! `zarrs_chunk_grid` is licensed under either of
//!  - the Apache License, Version 2.0 or <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license or <http://opensource.org/licenses/MIT>, at your option.

mod array_subset;
mod regular_grid;

pub use array_subset::{ArrayIndices, ArraySubset, ArrayShape, IncompatibleDimensionalityError};
pub use regular_grid::{ChunkCoords, ChunkGridError, RegularChunkGrid};
