//! The `gzip` codec: DEFLATE compression via `flate2`.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use zarrs_metadata::v3::MetadataV3;
use zarrs_metadata::Configuration;
use zarrs_plugin::PluginCreateError;
use zarrs_registry::codec;

use crate::{BytesRepresentation, CodecError, CodecOptions};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GzipCodecConfiguration {
    level: u32,
}

/// gzip (DEFLATE) compression, matching the Zarr V3 `gzip` codec.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GzipCodec {
    level: u32,
}

impl GzipCodec {
    /// Create a new gzip codec at the given compression level (0-9).
    #[must_use]
    pub fn new(level: u32) -> Self {
        Self { level }
    }

    pub(crate) fn from_configuration(configuration: Configuration) -> Result<Self, PluginCreateError> {
        let parsed: GzipCodecConfiguration = configuration.to_typed().map_err(|e| {
            PluginCreateError::InvalidConfiguration {
                name: codec::GZIP.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self::new(parsed.level))
    }

    pub(crate) fn create_metadata(&self) -> MetadataV3 {
        let configuration = serde_json::to_value(GzipCodecConfiguration { level: self.level })
            .expect("GzipCodecConfiguration always serializes");
        MetadataV3::new_with_configuration(
            codec::GZIP,
            Configuration::from_map(configuration.as_object().unwrap().clone()),
        )
    }

    pub(crate) fn encode(
        &self,
        decoded_value: Vec<u8>,
        _options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(self.level));
        encoder.write_all(&decoded_value)?;
        Ok(encoder.finish()?)
    }

    pub(crate) fn decode(
        &self,
        encoded_value: Vec<u8>,
        _decoded_representation: &BytesRepresentation,
        _options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let mut decoder = GzDecoder::new(encoded_value.as_slice());
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
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
        let codec = GzipCodec::new(6);
        let data = b"the quick brown fox jumps over the lazy dog".repeat(4);
        let encoded = codec.encode(data.clone(), &CodecOptions::new()).unwrap();
        assert!(encoded.len() < data.len());
        let decoded = codec
            .decode(encoded, &BytesRepresentation::UnboundedSize, &CodecOptions::new())
            .unwrap();
        assert_eq!(decoded, data);
    }
}
