//! `bytes->bytes` codecs: transforms applied to the already-serialized byte representation of a
//! chunk, e.g. general-purpose compression or a checksum trailer.

pub mod blosc;
pub mod crc32c;
pub mod gzip;
pub mod zstd;

use zarrs_metadata::v3::MetadataV3;
use zarrs_plugin::PluginCreateError;
use zarrs_registry::codec;

use crate::{BytesRepresentation, CodecError, CodecOptions};
use blosc::BloscCodec;
use crc32c::Crc32cCodec;
use gzip::GzipCodec;
use zstd::ZstdCodec;

/// A `bytes->bytes` codec.
#[derive(Debug, Clone, PartialEq)]
pub enum BytesToBytesCodec {
    /// gzip (DEFLATE) compression.
    Gzip(GzipCodec),
    /// Zstandard compression.
    Zstd(ZstdCodec),
    /// Blosc meta-compression (shuffle/bit-shuffle plus an inner compressor).
    Blosc(BloscCodec),
    /// A trailing 4-byte CRC32C checksum.
    Crc32c(Crc32cCodec),
}

impl BytesToBytesCodec {
    /// Construct a codec from its Zarr V3 metadata entry.
    ///
    /// # Errors
    /// Returns [`PluginCreateError`] if `metadata`'s name is not a known `bytes->bytes` codec, or
    /// its configuration does not parse.
    pub fn from_metadata(metadata: &MetadataV3) -> Result<Self, PluginCreateError> {
        match metadata.name() {
            codec::GZIP => Ok(Self::Gzip(GzipCodec::from_configuration(
                metadata.configuration(),
            )?)),
            codec::ZSTD => Ok(Self::Zstd(ZstdCodec::from_configuration(
                metadata.configuration(),
            )?)),
            codec::BLOSC => Ok(Self::Blosc(BloscCodec::from_configuration(
                metadata.configuration(),
            )?)),
            codec::CRC32C => Ok(Self::Crc32c(Crc32cCodec::new())),
            name => Err(PluginCreateError::Unknown {
                name: name.to_string(),
            }),
        }
    }

    /// Re-derive this codec's Zarr V3 metadata entry.
    #[must_use]
    pub fn create_metadata(&self) -> MetadataV3 {
        match self {
            Self::Gzip(c) => c.create_metadata(),
            Self::Zstd(c) => c.create_metadata(),
            Self::Blosc(c) => c.create_metadata(),
            Self::Crc32c(c) => c.create_metadata(),
        }
    }

    /// Encode already-serialized bytes.
    ///
    /// # Errors
    /// Returns [`CodecError`] if the underlying compressor fails.
    pub fn encode(&self, decoded_value: Vec<u8>, options: &CodecOptions) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::Gzip(c) => c.encode(decoded_value, options),
            Self::Zstd(c) => c.encode(decoded_value, options),
            Self::Blosc(c) => c.encode(decoded_value, options),
            Self::Crc32c(c) => c.encode(decoded_value, options),
        }
    }

    /// Decode back to the bytes the matching `encode` call was given.
    ///
    /// # Errors
    /// Returns [`CodecError`] if `encoded_value` is corrupt.
    pub fn decode(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &BytesRepresentation,
        options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::Gzip(c) => c.decode(encoded_value, decoded_representation, options),
            Self::Zstd(c) => c.decode(encoded_value, decoded_representation, options),
            Self::Blosc(c) => c.decode(encoded_value, decoded_representation, options),
            Self::Crc32c(c) => c.decode(encoded_value, decoded_representation, options),
        }
    }

    /// The encoded size given a decoded size, as precisely as can be known without running the
    /// codec.
    #[must_use]
    pub fn compute_encoded_size(&self, decoded_representation: BytesRepresentation) -> BytesRepresentation {
        match self {
            Self::Gzip(c) => c.compute_encoded_size(decoded_representation),
            Self::Zstd(c) => c.compute_encoded_size(decoded_representation),
            Self::Blosc(c) => c.compute_encoded_size(decoded_representation),
            Self::Crc32c(c) => c.compute_encoded_size(decoded_representation),
        }
    }
}
