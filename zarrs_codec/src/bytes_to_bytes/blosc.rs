//! The `blosc` codec: the Blosc meta-compressor (shuffle/bit-shuffle plus a pluggable inner
//! compressor), via the safe high-level `blosc` crate.
//!
//! This implementation deliberately uses the `blosc` crate's safe wrapper rather than binding
//! directly to `libblosc`'s C API, since there is no build/test loop here to validate raw FFI
//! usage; see `DESIGN.md`.

use ::blosc::{Clevel, Compressor, Context, ShuffleMode};
use serde::{Deserialize, Serialize};
use zarrs_metadata::v3::MetadataV3;
use zarrs_metadata::Configuration;
use zarrs_plugin::PluginCreateError;
use zarrs_registry::codec;

use crate::{BytesRepresentation, CodecError, CodecOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum BloscShuffleConfiguration {
    Noshuffle,
    Shuffle,
    Bitshuffle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct BloscCodecConfiguration {
    cname: String,
    clevel: u8,
    shuffle: BloscShuffleConfiguration,
    typesize: Option<usize>,
    #[serde(default)]
    blocksize: usize,
}

/// Blosc meta-compression, matching the Zarr V3 `blosc` codec.
#[derive(Debug, Clone, PartialEq)]
pub struct BloscCodec {
    cname: String,
    clevel: u8,
    shuffle: BloscShuffleConfiguration,
    typesize: Option<usize>,
    blocksize: usize,
}

impl BloscCodec {
    /// Create a new blosc codec. `cname` is one of `"blosclz"`, `"lz4"`, `"lz4hc"`, `"zlib"`,
    /// `"zstd"`. `typesize` enables shuffling at the element width of the array's data type and
    /// is required when `shuffle` is not [`BloscShuffleConfiguration::Noshuffle`].
    #[must_use]
    pub fn new(
        cname: impl Into<String>,
        clevel: u8,
        shuffle_bits: bool,
        shuffle_enabled: bool,
        typesize: Option<usize>,
        blocksize: usize,
    ) -> Self {
        let shuffle = if !shuffle_enabled {
            BloscShuffleConfiguration::Noshuffle
        } else if shuffle_bits {
            BloscShuffleConfiguration::Bitshuffle
        } else {
            BloscShuffleConfiguration::Shuffle
        };
        Self {
            cname: cname.into(),
            clevel,
            shuffle,
            typesize,
            blocksize,
        }
    }

    pub(crate) fn from_configuration(configuration: Configuration) -> Result<Self, PluginCreateError> {
        let parsed: BloscCodecConfiguration = configuration.to_typed().map_err(|e| {
            PluginCreateError::InvalidConfiguration {
                name: codec::BLOSC.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            cname: parsed.cname,
            clevel: parsed.clevel,
            shuffle: parsed.shuffle,
            typesize: parsed.typesize,
            blocksize: parsed.blocksize,
        })
    }

    pub(crate) fn create_metadata(&self) -> MetadataV3 {
        let configuration = serde_json::to_value(BloscCodecConfiguration {
            cname: self.cname.clone(),
            clevel: self.clevel,
            shuffle: self.shuffle,
            typesize: self.typesize,
            blocksize: self.blocksize,
        })
        .expect("BloscCodecConfiguration always serializes");
        MetadataV3::new_with_configuration(
            codec::BLOSC,
            Configuration::from_map(configuration.as_object().unwrap().clone()),
        )
    }

    fn compressor(&self) -> Result<Compressor, CodecError> {
        match self.cname.as_str() {
            "blosclz" => Ok(Compressor::BloscLZ),
            "lz4" => Ok(Compressor::LZ4),
            "lz4hc" => Ok(Compressor::LZ4HC),
            "zlib" => Ok(Compressor::Zlib),
            "zstd" => Ok(Compressor::Zstd),
            other => Err(CodecError::InvalidConfiguration(format!(
                "unknown blosc compressor {other:?}"
            ))),
        }
    }

    fn shuffle_mode(&self) -> ShuffleMode {
        match self.shuffle {
            BloscShuffleConfiguration::Noshuffle => ShuffleMode::None,
            BloscShuffleConfiguration::Shuffle => ShuffleMode::Byte,
            BloscShuffleConfiguration::Bitshuffle => ShuffleMode::Bit,
        }
    }

    pub(crate) fn encode(
        &self,
        decoded_value: Vec<u8>,
        _options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let typesize = self.typesize.unwrap_or(1).max(1);
        let context = Context::new()
            .clevel(Clevel::try_from(i32::from(self.clevel)).unwrap_or(Clevel::L5))
            .shuffle(self.shuffle_mode())
            .blocksize(if self.blocksize == 0 {
                None
            } else {
                Some(self.blocksize)
            })
            .compressor(self.compressor()?)
            .map_err(|e| CodecError::Other(e.to_string()))?;
        Ok(context.compress(typesize, &decoded_value).into_vec())
    }

    pub(crate) fn decode(
        &self,
        encoded_value: Vec<u8>,
        _decoded_representation: &BytesRepresentation,
        _options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        // SAFETY: `encoded_value` is trusted to be a well-formed blosc frame; a malformed one
        // surfaces as an `Err` from the underlying `libblosc` call, not undefined behaviour.
        let decompressed: Vec<u8> = unsafe { ::blosc::decompress_bytes(&encoded_value) }
            .map_err(|e| CodecError::CorruptData(e.to_string()))?;
        Ok(decompressed)
    }

    pub(crate) fn compute_encoded_size(&self, _decoded_representation: BytesRepresentation) -> BytesRepresentation {
        BytesRepresentation::UnboundedSize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let codec = BloscCodec::new("zstd", 5, false, true, Some(4), 0);
        let data: Vec<u8> = (0..256u32).flat_map(|v| v.to_le_bytes()).collect();
        let encoded = codec.encode(data.clone(), &CodecOptions::new()).unwrap();
        let decoded = codec
            .decode(encoded, &BytesRepresentation::UnboundedSize, &CodecOptions::new())
            .unwrap();
        assert_eq!(decoded, data);
    }
}
