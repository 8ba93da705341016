//! A library for the Zarr storage format for multidimensional arrays and metadata.
//!
//! This crate is the facade over the rest of the `zarrs` workspace: it resolves an array's
//! on-disk [Zarr V2 or V3](https://zarr-specs.readthedocs.io/) metadata document into a typed
//! [`ArraySpec`], and exposes [`Array`] for creating, opening, and reading/writing chunked
//! n-dimensional data against any store implementing [`zarrs_storage`]'s storage traits.
//!
//! ```
//! # use zarrs::Array;
//! # use zarrs_data_type::{DataType, FillValue};
//! # use zarrs_storage::MemoryStore;
//! # use std::sync::Arc;
//! let storage = Arc::new(MemoryStore::new());
//! let array = Array::create(
//!     storage,
//!     "group/array",
//!     vec![8, 8],
//!     vec![4, 4],
//!     DataType::Float32,
//!     FillValue::zero(DataType::Float32),
//! )?;
//! # Ok::<(), zarrs::ArrayCreateError>(())
//! ```
//!
//! ## Scope
//! This implementation covers the chunked array model: regular chunk grids, the `default`/`v2`
//! chunk key encodings, the array-to-array/array-to-bytes/bytes-to-bytes codec pipeline
//! (including sharding), and the fixed numeric data type set. It does not cover groups,
//! consolidated metadata, or async I/O.
//!
//! ## Licence
//! `zarrs` is licensed under either of
//!  - the Apache License, Version 2.0 or <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license or <http://opensource.org/licenses/MIT>, at your option.

mod array;
pub mod concurrency;
pub mod config;
mod error;
mod indexer;
mod metadata;

pub use array::{Array, ArrayBuilder};
pub use error::{ArrayCreateError, ArrayError};
pub use indexer::ChunkSelection;
pub use metadata::{create_v3_metadata, resolve, ArrayMetadata, ArraySpec};

pub use zarrs_chunk_grid::{ArraySubset, RegularChunkGrid};
pub use zarrs_chunk_key_encoding::{ChunkKeyEncoding, Separator};
pub use zarrs_codec::{
    ArrayToArrayCodec, ArrayToBytesCodec, BytesToBytesCodec, CodecChain, CodecOptions,
};
pub use zarrs_data_type::{DataType, Endianness, FillValue};
pub use zarrs_storage::{
    MemoryStore, ReadableWritableListableStorage, StorageError, StoreKey,
};
