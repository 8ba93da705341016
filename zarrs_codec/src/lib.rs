//! The codec API and built-in codecs for the [`zarrs`](https://docs.rs/zarrs/latest/zarrs/index.html) crate.
//!
//! A chunk is encoded by a sequence of codecs: zero or more `array->array` codecs, exactly one
//! `array->bytes` codec, then zero or more `bytes->bytes` codecs ([`CodecChain`]). Every codec is
//! a reversible transform; a chunk is produced by running the chain forward and recovered by
//! running it backward.
//!
//! Codecs are modelled as a capability tag rather than a class hierarchy: [`ArrayToArrayCodec`],
//! [`ArrayToBytesCodec`], and [`BytesToBytesCodec`] are closed
//! enums over the small, fixed codec set this crate implements, not `Box<dyn Trait>` objects.
//! This keeps dispatch static while a name -> codec mapping is still available through
//! [`ArrayToArrayCodec::from_metadata`] and friends for parsing stored metadata.
//!
//! The pipeline that runs a [`CodecChain`] against a chunk is itself pluggable by name: see
//! [`CodecPipeline`] and [`resolve_codec_pipeline`].
//!
//! ## Licence
//! `zarrs_codec` is licensed under either of
//!  - the Apache License, Version 2.0 or <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license or <http://opensource.org/licenses/MIT>, at your option.

pub mod array_to_array;
pub mod array_to_bytes;
pub mod bytes_to_bytes;
mod chain;
mod partial_decoder;
mod pipeline;
pub mod raw;

pub use array_to_array::{transpose::TransposeCodec, ArrayToArrayCodec};
pub use array_to_bytes::{bytes::BytesCodec, sharding::ShardingCodec, ArrayToBytesCodec};
pub use bytes_to_bytes::{
    blosc::BloscCodec, crc32c::Crc32cCodec, gzip::GzipCodec, zstd::ZstdCodec, BytesToBytesCodec,
};
pub use chain::CodecChain;
pub use partial_decoder::{BytesPartialDecoder, BytesPartialDecoderTraits, StoragePartialDecoder};
pub use pipeline::{
    register_codec_pipeline, resolve_codec_pipeline, unregister_codec_pipeline, CodecPipeline,
    DirectCodecPipeline,
};

use thiserror::Error;
use zarrs_chunk_grid::IncompatibleDimensionalityError;
use zarrs_data_type::{DataType, FillValue};
use zarrs_plugin::PluginCreateError;
use zarrs_storage::byte_range::InvalidByteRangeError;
use zarrs_storage::StorageError;

/// The decoded (array-side) representation a codec is asked to operate on: the shape of one
/// chunk (or shard, or sub-chunk), its element type, and the fill value used for any portion of
/// the chunk a codec chooses not to materialize explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRepresentation {
    shape: Vec<u64>,
    data_type: DataType,
    fill_value: FillValue,
}

impl ChunkRepresentation {
    /// Create a new chunk representation.
    #[must_use]
    pub fn new(shape: Vec<u64>, data_type: DataType, fill_value: FillValue) -> Self {
        Self {
            shape,
            data_type,
            fill_value,
        }
    }

    /// The shape of the chunk this representation describes.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// The element type.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// The fill value used for unmaterialized elements.
    #[must_use]
    pub fn fill_value(&self) -> &FillValue {
        &self.fill_value
    }

    /// The number of elements described by [`shape`](Self::shape).
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// The size, in bytes, of the uncompressed native-endian representation of this chunk.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.num_elements() * self.data_type.size_bytes() as u64
    }
}

/// The size of an encoded (bytes-side) representation, as far as it can be known without
/// actually running the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BytesRepresentation {
    /// The encoded size is exactly this many bytes for any input of the decoded size it was
    /// derived from (e.g. the `bytes` codec, or a `bytes->bytes` codec that only appends a
    /// fixed-size trailer to a fixed-size input).
    FixedSize(u64),
    /// The encoded size cannot exceed this many bytes, but the exact size depends on the data
    /// (currently unused by any codec in this crate, kept for codecs that can bound but not
    /// fix their output, e.g. a store-level compressor with a known worst case).
    BoundedSize(u64),
    /// The encoded size is unknown ahead of time (general-purpose compressors).
    UnboundedSize,
}

impl BytesRepresentation {
    /// The exact size, if known.
    #[must_use]
    pub fn exact_size(&self) -> Option<u64> {
        match self {
            Self::FixedSize(size) => Some(*size),
            _ => None,
        }
    }
}

/// Tuning knobs for a single codec operation: an upper bound on how many chunks/sub-chunks a
/// [`CodecChain`] or [`ShardingCodec`] processes in parallel via `rayon`. `None` means unbounded,
/// the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodecOptions {
    concurrent_limit: Option<usize>,
}

impl CodecOptions {
    /// The default options: unbounded concurrency.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the number of chunks/sub-chunks processed concurrently.
    #[must_use]
    pub fn with_concurrent_limit(limit: usize) -> Self {
        Self {
            concurrent_limit: Some(limit),
        }
    }

    /// The configured concurrency bound, if any.
    #[must_use]
    pub fn concurrent_limit(&self) -> Option<usize> {
        self.concurrent_limit
    }
}

/// An error produced by a codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// An I/O error from the underlying store.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A codec chain referenced an unrecognised codec, or one with an invalid configuration.
    #[error(transparent)]
    UnknownCodec(#[from] PluginCreateError),
    /// An invalid byte range was requested of an encoded value.
    #[error(transparent)]
    InvalidByteRange(#[from] InvalidByteRangeError),
    /// An array subset had a dimensionality mismatch with the chunk it was applied to.
    #[error(transparent)]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
    /// The decoded size of a value did not match what the chunk representation required.
    #[error("decoded size is {got} bytes, expected {expected}")]
    UnexpectedDecodedSize {
        /// The size actually produced.
        got: u64,
        /// The size required by the chunk representation.
        expected: u64,
    },
    /// A codec was configured in a way that fails validation against its chunk representation
    /// or against its own parameters (e.g. a sharding inner chunk shape that does not evenly
    /// divide the outer chunk shape, or an index codec chain with a non-fixed encoded size).
    #[error("invalid codec configuration: {0}")]
    InvalidConfiguration(String),
    /// Encoded data failed to decode: a checksum mismatch, a corrupt shard index, or any other
    /// encoded value that could not be interpreted as the format its codec expects.
    #[error("corrupt encoded data: {0}")]
    CorruptData(String),
    /// The data type is not supported by this codec.
    #[error("{1} does not support data type {0}")]
    UnsupportedDataType(DataType, &'static str),
    /// Any other codec-specific failure.
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        Self::Other(err.to_string())
    }
}
