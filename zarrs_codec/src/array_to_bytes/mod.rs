//! `array->bytes` codecs: the mandatory terminal codec in a chain, turning a chunk's elements
//! into the one byte buffer that the `bytes->bytes` phase (or the store) sees.

pub mod bytes;
pub mod sharding;

use zarrs_chunk_grid::ArraySubset;
use zarrs_metadata::v3::MetadataV3;
use zarrs_plugin::PluginCreateError;
use zarrs_registry::codec;

use crate::partial_decoder::BytesPartialDecoderTraits;
use crate::{BytesRepresentation, ChunkRepresentation, CodecError, CodecOptions};
use bytes::BytesCodec;
use sharding::ShardingCodec;

/// An `array->bytes` codec.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayToBytesCodec {
    /// The mandatory default: a flat byte reinterpretation of the chunk's elements.
    Bytes(BytesCodec),
    /// Splits a chunk into a regular grid of inner chunks, each independently encoded, with an
    /// index table recording their location within the shard.
    ShardingIndexed(ShardingCodec),
}

impl ArrayToBytesCodec {
    /// Construct a codec from its Zarr V3 metadata entry.
    ///
    /// # Errors
    /// Returns [`PluginCreateError`] if `metadata`'s name is not a known `array->bytes` codec, or
    /// its configuration does not parse.
    pub fn from_metadata(metadata: &MetadataV3) -> Result<Self, PluginCreateError> {
        match metadata.name() {
            codec::BYTES | codec::ENDIAN => Ok(Self::Bytes(BytesCodec::from_configuration(
                metadata.configuration(),
            )?)),
            codec::SHARDING_INDEXED => Ok(Self::ShardingIndexed(ShardingCodec::from_configuration(
                metadata.configuration(),
            )?)),
            name => Err(PluginCreateError::Unknown {
                name: name.to_string(),
            }),
        }
    }

    /// Re-derive this codec's Zarr V3 metadata entry.
    #[must_use]
    pub fn create_metadata(&self) -> MetadataV3 {
        match self {
            Self::Bytes(c) => c.create_metadata(),
            Self::ShardingIndexed(c) => c.create_metadata(),
        }
    }

    /// Encode a chunk already conforming to `decoded_representation`.
    ///
    /// Returns `Ok(None)` when the chunk is entirely composed of its fill value and the caller
    /// should delete rather than write its stored key (only ever produced by
    /// [`ShardingCodec`]).
    ///
    /// # Errors
    /// Returns [`CodecError`] if `decoded_value` does not conform to `decoded_representation`.
    pub fn encode(
        &self,
        decoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
        options: &CodecOptions,
    ) -> Result<Option<Vec<u8>>, CodecError> {
        match self {
            Self::Bytes(c) => c.encode(decoded_value, decoded_representation, options).map(Some),
            Self::ShardingIndexed(c) => c.encode(decoded_value, decoded_representation, options),
        }
    }

    /// Decode a chunk back to `decoded_representation`.
    ///
    /// # Errors
    /// Returns [`CodecError`] on malformed input.
    pub fn decode(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
        options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::Bytes(c) => c.decode(encoded_value, decoded_representation, options),
            Self::ShardingIndexed(c) => c.decode(encoded_value, decoded_representation, options),
        }
    }

    /// Decode only the elements of `array_subsets` from `input`.
    ///
    /// # Errors
    /// Returns [`CodecError`] if the underlying read or decode fails.
    pub fn partial_decode(
        &self,
        input: &dyn BytesPartialDecoderTraits,
        decoded_representation: &ChunkRepresentation,
        array_subsets: &[ArraySubset],
        options: &CodecOptions,
    ) -> Result<Vec<Vec<u8>>, CodecError> {
        match self {
            Self::Bytes(c) => c.partial_decode(input, decoded_representation, array_subsets, options),
            Self::ShardingIndexed(c) => {
                c.partial_decode(input, decoded_representation, array_subsets, options)
            }
        }
    }

    /// The encoded size given a decoded chunk representation, as precisely as can be known
    /// without running the codec.
    #[must_use]
    pub fn compute_encoded_size(&self, decoded_representation: &ChunkRepresentation) -> BytesRepresentation {
        match self {
            Self::Bytes(c) => c.compute_encoded_size(decoded_representation),
            Self::ShardingIndexed(c) => c.compute_encoded_size(decoded_representation),
        }
    }
}
