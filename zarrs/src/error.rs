//! Errors produced while creating, opening, or operating on an [`crate::Array`].

use thiserror::Error;
use zarrs_chunk_grid::{ChunkGridError, IncompatibleDimensionalityError};
use zarrs_storage::StoreKeyError;
use zarrs_codec::CodecError;
use zarrs_data_type::UnknownDataTypeError;
use zarrs_metadata::fill_value::InvalidFillValueMetadataError;
use zarrs_plugin::PluginCreateError;
use zarrs_storage::StorageError;

/// An error that occurred while creating a new array or parsing an existing array's metadata.
#[derive(Debug, Error)]
pub enum ArrayCreateError {
    /// The array's metadata document is not valid JSON, or does not match the expected shape
    /// for a Zarr V2 or V3 array.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(#[from] serde_json::Error),
    /// The array's `data_type` field is not a recognised data type name.
    #[error(transparent)]
    UnknownDataType(#[from] UnknownDataTypeError),
    /// The array's `fill_value` field does not match its `data_type`.
    #[error(transparent)]
    InvalidFillValue(#[from] InvalidFillValueMetadataError),
    /// The array's chunk grid is invalid, or incompatible with the array's shape.
    #[error(transparent)]
    InvalidChunkGrid(#[from] ChunkGridError),
    /// A codec in the array's `codecs` pipeline is unrecognised or misconfigured.
    #[error(transparent)]
    InvalidCodec(#[from] PluginCreateError),
    /// The array's codec pipeline itself is invalid (e.g. missing the mandatory
    /// `array->bytes` codec).
    #[error(transparent)]
    InvalidCodecChain(#[from] CodecError),
    /// The metadata document does not exist at the requested path.
    #[error("array metadata not found")]
    MissingMetadata,
    /// A Zarr V2 array used an unsupported combination of `compressor`/`filters` or
    /// `order: "F"` (column-major); `zarrs` only supports a compatible subset of Zarr V2.
    #[error("unsupported zarr v2 array: {0}")]
    UnsupportedZarrV2Array(String),
    /// An underlying store operation failed.
    #[error(transparent)]
    StorageError(#[from] StorageError),
}

/// An error that occurred while reading or writing array data.
#[derive(Debug, Error)]
pub enum ArrayError {
    /// A selection's dimensionality did not match the array's.
    #[error(transparent)]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
    /// A selection referenced indices outside the array's current shape.
    #[error("array subset {subset:?} is out of bounds of array shape {shape:?}")]
    InvalidArraySubset {
        /// The offending selection, rendered for diagnostics.
        subset: String,
        /// The array's shape at the time of the call.
        shape: Vec<u64>,
    },
    /// A value supplied to `store_array_subset` did not hold exactly as many elements as the
    /// selection it was being written to.
    #[error("got {got} elements, expected {expected}")]
    InvalidElementCount {
        /// The number of elements actually supplied.
        got: u64,
        /// The number of elements the selection requires.
        expected: u64,
    },
    /// A codec in the pipeline failed to encode or decode a chunk.
    #[error(transparent)]
    CodecError(#[from] CodecError),
    /// A selection's chunk grid decomposition failed.
    #[error(transparent)]
    InvalidChunkGrid(#[from] ChunkGridError),
    /// A chunk key could not be formed from the array's path and a chunk's coordinates.
    #[error(transparent)]
    InvalidChunkKey(#[from] StoreKeyError),
    /// An underlying store operation failed.
    #[error(transparent)]
    StorageError(#[from] StorageError),
}
