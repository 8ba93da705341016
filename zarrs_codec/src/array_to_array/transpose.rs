//! The `transpose` codec: permutes the axes of a chunk.

use serde::{Deserialize, Serialize};
use zarrs_metadata::v3::MetadataV3;
use zarrs_metadata::Configuration;
use zarrs_plugin::PluginCreateError;
use zarrs_registry::codec;

use crate::{raw, ChunkRepresentation, CodecError, CodecOptions};

/// The `transpose` codec configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TransposeCodecConfiguration {
    order: Vec<usize>,
}

/// Whether `order` is a permutation of `0, 1, ..., n-1`: every index in range, each used exactly
/// once. An empty `order` is not a valid permutation (there is no zero-dimensional chunk).
fn is_permutation(order: &[usize]) -> bool {
    let mut sorted = order.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    !order.is_empty() && sorted.len() == order.len() && sorted.last() == Some(&(order.len() - 1))
}

/// Permutes the axes of a chunk. The permuted chunk has shape `order.map(|i| shape[i])`; the
/// element at permuted coordinates `p` is the element at original coordinates `o` where
/// `o[order[d]] == p[d]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransposeCodec {
    order: Vec<usize>,
}

impl TransposeCodec {
    /// Create a new transpose codec for the given axis permutation.
    #[must_use]
    pub fn new(order: Vec<usize>) -> Self {
        Self { order }
    }

    pub(crate) fn from_configuration(
        configuration: Configuration,
    ) -> Result<Self, PluginCreateError> {
        let parsed: TransposeCodecConfiguration =
            configuration.to_typed().map_err(|e| PluginCreateError::InvalidConfiguration {
                name: codec::TRANSPOSE.to_string(),
                reason: e.to_string(),
            })?;
        if !is_permutation(&parsed.order) {
            return Err(PluginCreateError::InvalidConfiguration {
                name: codec::TRANSPOSE.to_string(),
                reason: "order must be a permutation of 0, 1, ..., n-1, where n is the number of dimensions".to_string(),
            });
        }
        Ok(Self::new(parsed.order))
    }

    pub(crate) fn create_metadata(&self) -> MetadataV3 {
        let configuration = serde_json::to_value(TransposeCodecConfiguration {
            order: self.order.clone(),
        })
        .expect("TransposeCodecConfiguration always serializes");
        MetadataV3::new_with_configuration(
            codec::TRANSPOSE,
            Configuration::from_map(configuration.as_object().unwrap().clone()),
        )
    }

    fn check_dimensionality(&self, shape: &[u64]) -> Result<(), CodecError> {
        if self.order.len() == shape.len() {
            Ok(())
        } else {
            Err(CodecError::InvalidConfiguration(format!(
                "transpose order has {} axes, chunk has {}",
                self.order.len(),
                shape.len()
            )))
        }
    }

    pub(crate) fn encode(
        &self,
        decoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
        _options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        self.check_dimensionality(decoded_representation.shape())?;
        let expected = decoded_representation.size_bytes();
        if decoded_value.len() as u64 != expected {
            return Err(CodecError::UnexpectedDecodedSize {
                got: decoded_value.len() as u64,
                expected,
            });
        }
        Ok(raw::permute_axes(
            &decoded_value,
            decoded_representation.shape(),
            decoded_representation.data_type().size_bytes(),
            &self.order,
        ))
    }

    pub(crate) fn decode(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
        _options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        self.check_dimensionality(decoded_representation.shape())?;
        let permuted_shape: Vec<u64> = self
            .order
            .iter()
            .map(|&i| decoded_representation.shape()[i])
            .collect();
        let expected: u64 =
            permuted_shape.iter().product::<u64>() * decoded_representation.data_type().size_bytes() as u64;
        if encoded_value.len() as u64 != expected {
            return Err(CodecError::UnexpectedDecodedSize {
                got: encoded_value.len() as u64,
                expected,
            });
        }
        Ok(raw::permute_axes(
            &encoded_value,
            &permuted_shape,
            decoded_representation.data_type().size_bytes(),
            &raw::inverse_permutation(&self.order),
        ))
    }

    pub(crate) fn compute_encoded_representation(
        &self,
        decoded_representation: &ChunkRepresentation,
    ) -> ChunkRepresentation {
        let shape = self
            .order
            .iter()
            .map(|&i| decoded_representation.shape()[i])
            .collect();
        ChunkRepresentation::new(
            shape,
            decoded_representation.data_type(),
            decoded_representation.fill_value().clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zarrs_data_type::{DataType, FillValue};

    #[test]
    fn round_trips_a_2d_chunk() {
        let codec = TransposeCodec::new(vec![1, 0]);
        let repr = ChunkRepresentation::new(
            vec![2, 3],
            DataType::UInt8,
            FillValue::zero(DataType::UInt8),
        );
        let data = vec![0, 1, 2, 3, 4, 5];
        let encoded = codec.encode(data.clone(), &repr, &CodecOptions::new()).unwrap();
        assert_eq!(encoded, vec![0, 3, 1, 4, 2, 5]);
        let decoded = codec.decode(encoded, &repr, &CodecOptions::new()).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn from_configuration_rejects_an_out_of_range_order() {
        let configuration = Configuration::from_map(
            serde_json::json!({ "order": [3, 1, 0] })
                .as_object()
                .unwrap()
                .clone(),
        );
        assert!(matches!(
            TransposeCodec::from_configuration(configuration),
            Err(PluginCreateError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn from_configuration_rejects_a_repeated_index() {
        let configuration = Configuration::from_map(
            serde_json::json!({ "order": [0, 0] }).as_object().unwrap().clone(),
        );
        assert!(matches!(
            TransposeCodec::from_configuration(configuration),
            Err(PluginCreateError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn from_configuration_accepts_a_valid_permutation() {
        let configuration = Configuration::from_map(
            serde_json::json!({ "order": [0, 2, 1] })
                .as_object()
                .unwrap()
                .clone(),
        );
        assert!(TransposeCodec::from_configuration(configuration).is_ok());
    }

    #[test]
    fn mismatched_order_length_is_rejected() {
        let codec = TransposeCodec::new(vec![0]);
        let repr = ChunkRepresentation::new(
            vec![2, 3],
            DataType::UInt8,
            FillValue::zero(DataType::UInt8),
        );
        assert!(codec.encode(vec![0; 6], &repr, &CodecOptions::new()).is_err());
    }
}
