//! The `bytes` codec: the mandatory terminal `array->bytes` codec, reinterpreting the chunk's
//! elements as a flat little/big-endian byte buffer. No compression, no restructuring.

use serde::{Deserialize, Serialize};
use zarrs_chunk_grid::ArraySubset;
use zarrs_data_type::Endianness;
use zarrs_metadata::v3::MetadataV3;
use zarrs_metadata::Configuration;
use zarrs_plugin::PluginCreateError;
use zarrs_registry::codec;

use crate::partial_decoder::BytesPartialDecoderTraits;
use crate::{raw, BytesRepresentation, ChunkRepresentation, CodecError, CodecOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum EndiannessConfiguration {
    Little,
    Big,
}

impl From<Endianness> for EndiannessConfiguration {
    fn from(e: Endianness) -> Self {
        match e {
            Endianness::Little => Self::Little,
            Endianness::Big => Self::Big,
        }
    }
}

impl From<EndiannessConfiguration> for Endianness {
    fn from(e: EndiannessConfiguration) -> Self {
        match e {
            EndiannessConfiguration::Little => Self::Little,
            EndiannessConfiguration::Big => Self::Big,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct BytesCodecConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    endian: Option<EndiannessConfiguration>,
}

/// Reinterprets array elements as a flat byte buffer in a given byte order. `endian` is `None`
/// only for single-byte data types, which have no byte order to record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BytesCodec {
    endian: Option<Endianness>,
}

impl Default for BytesCodec {
    fn default() -> Self {
        Self::new(Some(Endianness::native()))
    }
}

impl BytesCodec {
    /// Create a new bytes codec for the given byte order.
    #[must_use]
    pub fn new(endian: Option<Endianness>) -> Self {
        Self { endian }
    }

    /// A little-endian bytes codec.
    #[must_use]
    pub fn little() -> Self {
        Self::new(Some(Endianness::Little))
    }

    /// A big-endian bytes codec.
    #[must_use]
    pub fn big() -> Self {
        Self::new(Some(Endianness::Big))
    }

    pub(crate) fn from_configuration(
        configuration: Configuration,
    ) -> Result<Self, PluginCreateError> {
        let parsed: BytesCodecConfiguration = configuration.to_typed().map_err(|e| {
            PluginCreateError::InvalidConfiguration {
                name: codec::BYTES.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self::new(parsed.endian.map(Endianness::from)))
    }

    pub(crate) fn create_metadata(&self) -> MetadataV3 {
        let configuration = serde_json::to_value(BytesCodecConfiguration {
            endian: self.endian.map(EndiannessConfiguration::from),
        })
        .expect("BytesCodecConfiguration always serializes");
        MetadataV3::new_with_configuration(
            codec::BYTES,
            Configuration::from_map(configuration.as_object().unwrap().clone()),
        )
    }

    fn reverse_endianness_if_needed(
        &self,
        buffer: &mut [u8],
        decoded_representation: &ChunkRepresentation,
    ) -> Result<(), CodecError> {
        let element_size = decoded_representation.data_type().size_bytes();
        if element_size <= 1 {
            return Ok(());
        }
        let Some(endian) = self.endian else {
            return Err(CodecError::InvalidConfiguration(format!(
                "bytes codec has no endianness configured for multi-byte data type {}",
                decoded_representation.data_type()
            )));
        };
        if endian != Endianness::native() {
            for element in buffer.chunks_exact_mut(element_size) {
                element.reverse();
            }
        }
        Ok(())
    }

    pub(crate) fn encode(
        &self,
        mut decoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
        _options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let expected = decoded_representation.size_bytes();
        if decoded_value.len() as u64 != expected {
            return Err(CodecError::UnexpectedDecodedSize {
                got: decoded_value.len() as u64,
                expected,
            });
        }
        self.reverse_endianness_if_needed(&mut decoded_value, decoded_representation)?;
        Ok(decoded_value)
    }

    pub(crate) fn decode(
        &self,
        mut encoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
        _options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let expected = decoded_representation.size_bytes();
        if encoded_value.len() as u64 != expected {
            return Err(CodecError::UnexpectedDecodedSize {
                got: encoded_value.len() as u64,
                expected,
            });
        }
        // Applying the swap a second time restores native order; encode/decode are identical.
        self.reverse_endianness_if_needed(&mut encoded_value, decoded_representation)?;
        Ok(encoded_value)
    }

    pub(crate) fn compute_encoded_size(
        &self,
        decoded_representation: &ChunkRepresentation,
    ) -> BytesRepresentation {
        BytesRepresentation::FixedSize(decoded_representation.size_bytes())
    }

    /// Decode only the elements of `array_subsets`, by fully decoding then slicing: the `bytes`
    /// codec has no index structure that would let it fetch less than the whole chunk.
    pub(crate) fn partial_decode(
        &self,
        input: &dyn BytesPartialDecoderTraits,
        decoded_representation: &ChunkRepresentation,
        array_subsets: &[ArraySubset],
        options: &CodecOptions,
    ) -> Result<Vec<Vec<u8>>, CodecError> {
        let Some(encoded_value) = input.decode()? else {
            return Ok(array_subsets
                .iter()
                .map(|s| raw::fill_buffer(s.num_elements(), decoded_representation.fill_value()))
                .collect());
        };
        let decoded_value = self.decode(encoded_value, decoded_representation, options)?;
        let element_size = decoded_representation.data_type().size_bytes();
        Ok(array_subsets
            .iter()
            .map(|s| raw::extract_subset(&decoded_value, decoded_representation.shape(), element_size, s))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zarrs_data_type::{DataType, FillValue};

    #[test]
    fn native_endian_is_a_no_op() {
        let codec = BytesCodec::new(Some(Endianness::native()));
        let repr = ChunkRepresentation::new(
            vec![4],
            DataType::Int32,
            FillValue::zero(DataType::Int32),
        );
        let data: Vec<u8> = (0..16).collect();
        let encoded = codec.encode(data.clone(), &repr, &CodecOptions::new()).unwrap();
        assert_eq!(encoded, data);
    }

    #[test]
    fn swapped_endian_reverses_each_element_and_back() {
        let swapped = if Endianness::native() == Endianness::Little {
            Endianness::Big
        } else {
            Endianness::Little
        };
        let codec = BytesCodec::new(Some(swapped));
        let repr = ChunkRepresentation::new(
            vec![2],
            DataType::Int32,
            FillValue::zero(DataType::Int32),
        );
        let data: Vec<u8> = (0..8).collect();
        let encoded = codec.encode(data.clone(), &repr, &CodecOptions::new()).unwrap();
        assert_eq!(encoded, vec![3, 2, 1, 0, 7, 6, 5, 4]);
        let decoded = codec.decode(encoded, &repr, &CodecOptions::new()).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn multi_byte_type_without_endian_is_rejected() {
        let codec = BytesCodec::new(None);
        let repr = ChunkRepresentation::new(
            vec![1],
            DataType::Int32,
            FillValue::zero(DataType::Int32),
        );
        assert!(codec.encode(vec![0; 4], &repr, &CodecOptions::new()).is_err());
    }

    #[test]
    fn single_byte_type_needs_no_endian() {
        let codec = BytesCodec::new(None);
        let repr = ChunkRepresentation::new(
            vec![3],
            DataType::UInt8,
            FillValue::zero(DataType::UInt8),
        );
        let data = vec![1, 2, 3];
        let encoded = codec.encode(data.clone(), &repr, &CodecOptions::new()).unwrap();
        assert_eq!(encoded, data);
    }
}
