//! A complete codec pipeline: zero or more `array->array` codecs, exactly one `array->bytes`
//! codec, then zero or more `bytes->bytes` codecs.

use zarrs_metadata::v3::MetadataV3;
use zarrs_plugin::PluginCreateError;

use crate::array_to_array::ArrayToArrayCodec;
use crate::array_to_bytes::ArrayToBytesCodec;
use crate::bytes_to_bytes::BytesToBytesCodec;
use crate::partial_decoder::BytesPartialDecoderTraits;
use crate::{raw, BytesRepresentation, ChunkRepresentation, CodecError, CodecOptions};
use zarrs_chunk_grid::ArraySubset;

/// The ordered codec pipeline used to encode and decode one chunk.
///
/// Codecs run forward in the order `array_to_array, array_to_bytes, bytes_to_bytes` and are
/// undone in the reverse order to decode, matching the Zarr V3 specification's codec pipeline
/// ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct CodecChain {
    array_to_array: Vec<ArrayToArrayCodec>,
    array_to_bytes: ArrayToBytesCodec,
    bytes_to_bytes: Vec<BytesToBytesCodec>,
}

impl CodecChain {
    /// Create a new codec chain from its three phases.
    #[must_use]
    pub fn new(
        array_to_array: Vec<ArrayToArrayCodec>,
        array_to_bytes: ArrayToBytesCodec,
        bytes_to_bytes: Vec<BytesToBytesCodec>,
    ) -> Self {
        Self {
            array_to_array,
            array_to_bytes,
            bytes_to_bytes,
        }
    }

    /// Parse a codec chain from a chunk's `codecs` metadata array.
    ///
    /// Codecs are classified in order: while no `array->bytes` codec has been seen, each entry is
    /// tried first as `array->array`, then as `array->bytes`; once one is found, every remaining
    /// entry must parse as `bytes->bytes`. This enforces the three-contiguous-phases ordering
    /// without a separate validation pass: an out-of-order entry simply fails to parse in its
    /// only remaining legal phase.
    ///
    /// # Errors
    /// Returns [`CodecError::UnknownCodec`] if any entry's name isn't recognised in its phase, or
    /// [`CodecError::InvalidConfiguration`] if no `array->bytes` codec is present.
    pub fn from_metadata(codecs: &[MetadataV3]) -> Result<Self, CodecError> {
        let mut array_to_array = Vec::new();
        let mut array_to_bytes: Option<ArrayToBytesCodec> = None;
        let mut bytes_to_bytes = Vec::new();

        for metadata in codecs {
            if array_to_bytes.is_none() {
                match ArrayToArrayCodec::from_metadata(metadata) {
                    Ok(codec) => {
                        array_to_array.push(codec);
                        continue;
                    }
                    Err(PluginCreateError::Unknown { .. }) => {}
                    Err(e) => return Err(e.into()),
                }
                match ArrayToBytesCodec::from_metadata(metadata) {
                    Ok(codec) => {
                        array_to_bytes = Some(codec);
                        continue;
                    }
                    Err(PluginCreateError::Unknown { .. }) => {}
                    Err(e) => return Err(e.into()),
                }
            }
            let codec = BytesToBytesCodec::from_metadata(metadata)?;
            bytes_to_bytes.push(codec);
        }

        let array_to_bytes = array_to_bytes.ok_or_else(|| {
            CodecError::InvalidConfiguration(
                "a codec chain requires exactly one array->bytes codec".to_string(),
            )
        })?;

        Ok(Self {
            array_to_array,
            array_to_bytes,
            bytes_to_bytes,
        })
    }

    /// Re-derive the `codecs` metadata array for this chain.
    #[must_use]
    pub fn create_metadata(&self) -> Vec<MetadataV3> {
        let mut out: Vec<MetadataV3> = self
            .array_to_array
            .iter()
            .map(ArrayToArrayCodec::create_metadata)
            .collect();
        out.push(self.array_to_bytes.create_metadata());
        out.extend(self.bytes_to_bytes.iter().map(BytesToBytesCodec::create_metadata));
        out
    }

    /// The `array->array` phase.
    #[must_use]
    pub fn array_to_array(&self) -> &[ArrayToArrayCodec] {
        &self.array_to_array
    }

    /// The single `array->bytes` codec.
    #[must_use]
    pub fn array_to_bytes(&self) -> &ArrayToBytesCodec {
        &self.array_to_bytes
    }

    /// The `bytes->bytes` phase.
    #[must_use]
    pub fn bytes_to_bytes(&self) -> &[BytesToBytesCodec] {
        &self.bytes_to_bytes
    }

    /// The chunk representation immediately before the `array->bytes` codec runs, after every
    /// `array->array` codec has been applied forward.
    #[must_use]
    fn inner_representation(&self, decoded_representation: &ChunkRepresentation) -> ChunkRepresentation {
        let mut representation = decoded_representation.clone();
        for codec in &self.array_to_array {
            representation = codec.compute_encoded_representation(&representation);
        }
        representation
    }

    /// Run the full chain forward. Returns `Ok(None)` only when the `array->bytes` codec reports
    /// the chunk is fully composed of its fill value and need not be stored at all (only
    /// [`crate::ShardingCodec`] ever does this).
    ///
    /// # Errors
    /// Returns [`CodecError`] if any codec in the chain rejects `decoded_value`.
    pub fn encode(
        &self,
        decoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
        options: &CodecOptions,
    ) -> Result<Option<Vec<u8>>, CodecError> {
        let mut value = decoded_value;
        let mut representation = decoded_representation.clone();
        for codec in &self.array_to_array {
            value = codec.encode(value, &representation, options)?;
            representation = codec.compute_encoded_representation(&representation);
        }
        let Some(mut value) = self.array_to_bytes.encode(value, &representation, options)? else {
            return Ok(None);
        };
        for codec in &self.bytes_to_bytes {
            value = codec.encode(value, options)?;
        }
        Ok(Some(value))
    }

    /// Run the full chain backward. `encoded_value` of `None` (a chunk the chain's `encode`
    /// reported as fully fill-valued) decodes directly to a fill-value buffer without invoking
    /// any codec.
    ///
    /// # Errors
    /// Returns [`CodecError`] if any codec in the chain rejects `encoded_value`.
    pub fn decode(
        &self,
        encoded_value: Option<Vec<u8>>,
        decoded_representation: &ChunkRepresentation,
        options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let Some(mut value) = encoded_value else {
            return Ok(raw::fill_buffer(
                decoded_representation.num_elements(),
                decoded_representation.fill_value(),
            ));
        };
        for codec in self.bytes_to_bytes.iter().rev() {
            value = codec.decode(value, &BytesRepresentation::UnboundedSize, options)?;
        }
        let inner_representation = self.inner_representation(decoded_representation);
        let mut value = self.array_to_bytes.decode(value, &inner_representation, options)?;
        let mut representations = Vec::with_capacity(self.array_to_array.len());
        let mut representation = decoded_representation.clone();
        for codec in &self.array_to_array {
            representations.push(representation.clone());
            representation = codec.compute_encoded_representation(&representation);
        }
        for (codec, representation) in self.array_to_array.iter().zip(representations.iter()).rev() {
            value = codec.decode(value, representation, options)?;
        }
        Ok(value)
    }

    /// Decode only the elements of `array_subsets`.
    ///
    /// Exploits the `array->bytes` codec's own partial-read support (relevant for
    /// [`crate::ShardingCodec`]) only when there are no `bytes->bytes` or `array->array` codecs
    /// wrapped around it, since a general-purpose compressor or axis permutation has no byte-range
    /// structure a partial read could exploit; otherwise falls back to a full decode followed by
    /// an in-memory slice.
    ///
    /// # Errors
    /// Returns [`CodecError`] if the underlying read or any codec fails.
    pub fn partial_decode(
        &self,
        input: &dyn BytesPartialDecoderTraits,
        decoded_representation: &ChunkRepresentation,
        array_subsets: &[ArraySubset],
        options: &CodecOptions,
    ) -> Result<Vec<Vec<u8>>, CodecError> {
        if self.bytes_to_bytes.is_empty() && self.array_to_array.is_empty() {
            return self
                .array_to_bytes
                .partial_decode(input, decoded_representation, array_subsets, options);
        }

        let Some(encoded_value) = input.decode()? else {
            return Ok(array_subsets
                .iter()
                .map(|s| raw::fill_buffer(s.num_elements(), decoded_representation.fill_value()))
                .collect());
        };
        let decoded_value = self.decode(Some(encoded_value), decoded_representation, options)?;
        let element_size = decoded_representation.data_type().size_bytes();
        Ok(array_subsets
            .iter()
            .map(|s| raw::extract_subset(&decoded_value, decoded_representation.shape(), element_size, s))
            .collect())
    }

    /// Run [`encode`](Self::encode) over `chunks`, grouped into batches of `batch_size`.
    ///
    /// Batching only controls how many chunks are queued together before moving to the next
    /// group; each chunk's result is identical to calling [`encode`](Self::encode) on it alone.
    ///
    /// # Errors
    /// Returns [`CodecError`] as soon as any chunk in `chunks` fails to encode.
    pub fn encode_batched(
        &self,
        chunks: Vec<(Vec<u8>, ChunkRepresentation)>,
        batch_size: usize,
        options: &CodecOptions,
    ) -> Result<Vec<Option<Vec<u8>>>, CodecError> {
        let batch_size = batch_size.max(1);
        let mut out = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(batch_size) {
            for (value, representation) in batch {
                out.push(self.encode(value.clone(), representation, options)?);
            }
        }
        Ok(out)
    }

    /// Run [`decode`](Self::decode) over `chunks`, grouped into batches of `batch_size`. See
    /// [`encode_batched`](Self::encode_batched).
    ///
    /// # Errors
    /// Returns [`CodecError`] as soon as any chunk in `chunks` fails to decode.
    pub fn decode_batched(
        &self,
        chunks: Vec<(Option<Vec<u8>>, ChunkRepresentation)>,
        batch_size: usize,
        options: &CodecOptions,
    ) -> Result<Vec<Vec<u8>>, CodecError> {
        let batch_size = batch_size.max(1);
        let mut out = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(batch_size) {
            for (value, representation) in batch {
                out.push(self.decode(value.clone(), representation, options)?);
            }
        }
        Ok(out)
    }

    /// The encoded size given a decoded chunk representation, as precisely as can be known
    /// without running the chain.
    #[must_use]
    pub fn compute_encoded_size(&self, decoded_representation: &ChunkRepresentation) -> BytesRepresentation {
        let inner_representation = self.inner_representation(decoded_representation);
        let mut size = self.array_to_bytes.compute_encoded_size(&inner_representation);
        for codec in &self.bytes_to_bytes {
            size = codec.compute_encoded_size(size);
        }
        size
    }
}
