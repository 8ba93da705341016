//! The `crc32c` codec: appends a trailing little-endian CRC32C checksum of the encoded bytes.

use zarrs_metadata::v3::MetadataV3;
use zarrs_metadata::Configuration;
use zarrs_registry::codec;

use crate::{BytesRepresentation, CodecError, CodecOptions};

const CHECKSUM_SIZE: u64 = 4;

/// Appends/verifies a trailing 4-byte CRC32C checksum. Takes no configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Crc32cCodec {}

impl Crc32cCodec {
    /// Create a new crc32c codec.
    #[must_use]
    pub fn new() -> Self {
        Self {}
    }

    pub(crate) fn create_metadata(&self) -> MetadataV3 {
        MetadataV3::new_with_configuration(codec::CRC32C, Configuration::default())
    }

    pub(crate) fn encode(
        &self,
        mut decoded_value: Vec<u8>,
        _options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let checksum = crc32c::crc32c(&decoded_value);
        decoded_value.extend_from_slice(&checksum.to_le_bytes());
        Ok(decoded_value)
    }

    pub(crate) fn decode(
        &self,
        mut encoded_value: Vec<u8>,
        _decoded_representation: &BytesRepresentation,
        _options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        if (encoded_value.len() as u64) < CHECKSUM_SIZE {
            return Err(CodecError::CorruptData(
                "crc32c: encoded value shorter than the checksum trailer".to_string(),
            ));
        }
        let split_at = encoded_value.len() - CHECKSUM_SIZE as usize;
        let trailer = [
            encoded_value[split_at],
            encoded_value[split_at + 1],
            encoded_value[split_at + 2],
            encoded_value[split_at + 3],
        ];
        let expected = u32::from_le_bytes(trailer);
        encoded_value.truncate(split_at);
        let actual = crc32c::crc32c(&encoded_value);
        if actual != expected {
            return Err(CodecError::CorruptData(format!(
                "crc32c checksum mismatch: expected {expected:#x}, got {actual:#x}"
            )));
        }
        Ok(encoded_value)
    }

    pub(crate) fn compute_encoded_size(
        &self,
        decoded_representation: BytesRepresentation,
    ) -> BytesRepresentation {
        match decoded_representation {
            BytesRepresentation::FixedSize(n) => BytesRepresentation::FixedSize(n + CHECKSUM_SIZE),
            BytesRepresentation::BoundedSize(n) => {
                BytesRepresentation::BoundedSize(n + CHECKSUM_SIZE)
            }
            BytesRepresentation::UnboundedSize => BytesRepresentation::UnboundedSize,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let codec = Crc32cCodec::new();
        let data = b"the quick brown fox jumps over the lazy dog".to_vec();
        let encoded = codec.encode(data.clone(), &CodecOptions::new()).unwrap();
        assert_eq!(encoded.len(), data.len() + 4);
        let decoded = codec
            .decode(
                encoded,
                &BytesRepresentation::FixedSize(data.len() as u64),
                &CodecOptions::new(),
            )
            .unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn detects_corruption() {
        let codec = Crc32cCodec::new();
        let data = b"hello world".to_vec();
        let mut encoded = codec.encode(data, &CodecOptions::new()).unwrap();
        let last = encoded.len() - 1;
        encoded[last] ^= 0xFF;
        assert!(codec
            .decode(
                encoded,
                &BytesRepresentation::UnboundedSize,
                &CodecOptions::new()
            )
            .is_err());
    }

    #[test]
    fn compute_encoded_size_adds_checksum_trailer() {
        let codec = Crc32cCodec::new();
        assert_eq!(
            codec.compute_encoded_size(BytesRepresentation::FixedSize(10)),
            BytesRepresentation::FixedSize(14)
        );
        assert_eq!(
            codec.compute_encoded_size(BytesRepresentation::UnboundedSize),
            BytesRepresentation::UnboundedSize
        );
    }
}
