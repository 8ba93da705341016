//! `array->array` codecs: transforms that rearrange or reinterpret array elements without
//! changing them to a byte-oriented representation.

pub mod transpose;

use zarrs_metadata::v3::MetadataV3;
use zarrs_plugin::PluginCreateError;
use zarrs_registry::codec;

use crate::{ChunkRepresentation, CodecError, CodecOptions};
use transpose::TransposeCodec;

/// An `array->array` codec.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayToArrayCodec {
    /// Permute the axes of the chunk.
    Transpose(TransposeCodec),
}

impl ArrayToArrayCodec {
    /// Construct a codec from its Zarr V3 metadata entry.
    ///
    /// # Errors
    /// Returns [`PluginCreateError`] if `metadata`'s name is not a known `array->array` codec, or
    /// its configuration does not parse.
    pub fn from_metadata(metadata: &MetadataV3) -> Result<Self, PluginCreateError> {
        match metadata.name() {
            codec::TRANSPOSE => Ok(Self::Transpose(TransposeCodec::from_configuration(
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
            Self::Transpose(c) => c.create_metadata(),
        }
    }

    /// Encode a chunk already conforming to `decoded_representation`.
    ///
    /// # Errors
    /// Returns [`CodecError`] if `decoded_value` is not exactly `decoded_representation.size_bytes()`.
    pub fn encode(
        &self,
        decoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
        options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::Transpose(c) => c.encode(decoded_value, decoded_representation, options),
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
            Self::Transpose(c) => c.decode(encoded_value, decoded_representation, options),
        }
    }

    /// The chunk representation produced by [`encode`](Self::encode) given `decoded_representation`.
    #[must_use]
    pub fn compute_encoded_representation(
        &self,
        decoded_representation: &ChunkRepresentation,
    ) -> ChunkRepresentation {
        match self {
            Self::Transpose(c) => c.compute_encoded_representation(decoded_representation),
        }
    }
}
