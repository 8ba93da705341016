//! The `zstd` codec: Zstandard compression via the `zstd` crate.

use serde::{Deserialize, Serialize};
use zarrs_metadata::v3::MetadataV3;
use zarrs_metadata::Configuration;
use zarrs_plugin::PluginCreateError;
use zarrs_registry::codec;

use crate::{BytesRepresentation, CodecError, CodecOptions};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ZstdCodecConfiguration {
    level: i32,
    #[serde(default)]
    checksum: bool,
}

/// Zstandard compression, matching the Zarr V3 `zstd` codec.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZstdCodec {
    level: i32,
    checksum: bool,
}

impl ZstdCodec {
    /// Create a new zstd codec at the given compression level, optionally embedding a
    /// content checksum in each frame.
    #[must_use]
    pub fn new(level: i32, checksum: bool) -> Self {
        Self { level, checksum }
    }

    pub(crate) fn from_configuration(configuration: Configuration) -> Result<Self, PluginCreateError> {
        let parsed: ZstdCodecConfiguration = configuration.to_typed().map_err(|e| {
            PluginCreateError::InvalidConfiguration {
                name: codec::ZSTD.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self::new(parsed.level, parsed.checksum))
    }

    pub(crate) fn create_metadata(&self) -> MetadataV3 {
        let configuration = serde_json::to_value(ZstdCodecConfiguration {
            level: self.level,
            checksum: self.checksum,
        })
        .expect("ZstdCodecConfiguration always serializes");
        MetadataV3::new_with_configuration(
            codec::ZSTD,
            Configuration::from_map(configuration.as_object().unwrap().clone()),
        )
    }

    pub(crate) fn encode(
        &self,
        decoded_value: Vec<u8>,
        _options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let mut encoder = zstd::stream::Encoder::new(Vec::new(), self.level)?;
        encoder.include_checksum(self.checksum)?;
        std::io::Write::write_all(&mut encoder, &decoded_value)?;
        Ok(encoder.finish()?)
    }

    pub(crate) fn decode(
        &self,
        encoded_value: Vec<u8>,
        _decoded_representation: &BytesRepresentation,
        _options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        zstd::stream::decode_all(encoded_value.as_slice())
            .map_err(|e| CodecError::CorruptData(e.to_string()))
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
        let codec = ZstdCodec::new(3, false);
        let data = b"the quick brown fox jumps over the lazy dog".repeat(4);
        let encoded = codec.encode(data.clone(), &CodecOptions::new()).unwrap();
        let decoded = codec
            .decode(encoded, &BytesRepresentation::UnboundedSize, &CodecOptions::new())
            .unwrap();
        assert_eq!(decoded, data);
    }
}
