//! The `sharding_indexed` codec: packs a regular grid of inner sub-chunks into one shard, with
//! an embedded offset/length index enabling random access to a single sub-chunk without reading
//! the whole shard.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use zarrs_chunk_grid::{ArraySubset, RegularChunkGrid};
use zarrs_metadata::v3::MetadataV3;
use zarrs_metadata::Configuration;
use zarrs_plugin::PluginCreateError;
use zarrs_registry::codec;
use zarrs_storage::byte_range::ByteRange;

use crate::bytes_to_bytes::BytesToBytesCodec;
use crate::partial_decoder::BytesPartialDecoderTraits;
use crate::{raw, BytesRepresentation, ChunkRepresentation, CodecChain, CodecError, CodecOptions};

/// Marks an inner sub-chunk as entirely composed of the fill value: it has no encoded bytes and
/// is not stored in the shard body.
const EMPTY_MARKER: u64 = u64::MAX;

/// The fixed per-entry width of the raw (pre `index_codecs`) index table: two little-endian u64.
const INDEX_ENTRY_SIZE: u64 = 16;

/// Where the encoded index table sits relative to the concatenated sub-chunk bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexLocation {
    /// The index precedes the sub-chunk bodies.
    Start,
    /// The index follows the sub-chunk bodies (the default).
    End,
}

fn default_index_location() -> IndexLocation {
    IndexLocation::End
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ShardingCodecConfiguration {
    chunk_shape: Vec<u64>,
    codecs: Vec<MetadataV3>,
    index_codecs: Vec<MetadataV3>,
    #[serde(default = "default_index_location")]
    index_location: IndexLocation,
}

/// Packs a regular grid of inner sub-chunks into one shard.
///
/// `chunk_shape` is the *inner* sub-chunk shape; it must evenly divide whatever outer chunk shape
/// this codec is asked to encode/decode (checked lazily against each call's
/// [`ChunkRepresentation`], since the outer shape is not known until then).
#[derive(Debug, Clone, PartialEq)]
pub struct ShardingCodec {
    chunk_shape: Vec<u64>,
    codecs: Box<CodecChain>,
    index_codecs: Vec<BytesToBytesCodec>,
    index_location: IndexLocation,
}

impl ShardingCodec {
    /// Create a new sharding codec.
    #[must_use]
    pub fn new(
        chunk_shape: Vec<u64>,
        codecs: CodecChain,
        index_codecs: Vec<BytesToBytesCodec>,
        index_location: IndexLocation,
    ) -> Self {
        Self {
            chunk_shape,
            codecs: Box::new(codecs),
            index_codecs,
            index_location,
        }
    }

    pub(crate) fn from_configuration(
        configuration: Configuration,
    ) -> Result<Self, PluginCreateError> {
        let parsed: ShardingCodecConfiguration = configuration.to_typed().map_err(|e| {
            PluginCreateError::InvalidConfiguration {
                name: codec::SHARDING_INDEXED.to_string(),
                reason: e.to_string(),
            }
        })?;
        let codecs = CodecChain::from_metadata(&parsed.codecs).map_err(|e| {
            PluginCreateError::InvalidConfiguration {
                name: codec::SHARDING_INDEXED.to_string(),
                reason: e.to_string(),
            }
        })?;
        let index_codecs = parsed
            .index_codecs
            .iter()
            .map(BytesToBytesCodec::from_metadata)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(
            parsed.chunk_shape,
            codecs,
            index_codecs,
            parsed.index_location,
        ))
    }

    pub(crate) fn create_metadata(&self) -> MetadataV3 {
        let configuration = ShardingCodecConfiguration {
            chunk_shape: self.chunk_shape.clone(),
            codecs: self.codecs.create_metadata(),
            index_codecs: self.index_codecs.iter().map(BytesToBytesCodec::create_metadata).collect(),
            index_location: self.index_location,
        };
        let value =
            serde_json::to_value(configuration).expect("ShardingCodecConfiguration always serializes");
        MetadataV3::new_with_configuration(
            codec::SHARDING_INDEXED,
            Configuration::from_map(value.as_object().unwrap().clone()),
        )
    }

    fn inner_grid(&self, outer_shape: &[u64]) -> Result<RegularChunkGrid, CodecError> {
        if outer_shape.len() != self.chunk_shape.len() {
            return Err(CodecError::InvalidConfiguration(format!(
                "sharding inner chunk shape has {} axes, outer chunk has {}",
                self.chunk_shape.len(),
                outer_shape.len()
            )));
        }
        for (o, i) in outer_shape.iter().zip(&self.chunk_shape) {
            if *i == 0 || o % i != 0 {
                return Err(CodecError::InvalidConfiguration(format!(
                    "sharding inner chunk shape {:?} does not evenly divide outer chunk shape {outer_shape:?}",
                    self.chunk_shape
                )));
            }
        }
        RegularChunkGrid::new(self.chunk_shape.clone())
            .map_err(|e| CodecError::InvalidConfiguration(e.to_string()))
    }

    /// The encoded size of the index table, given the number of inner sub-chunks. Fails if
    /// `index_codecs` does not produce a fixed-size encoding, since a tail/head-only partial read
    /// of the index is only possible when its size is known without reading the shard.
    fn index_representation(&self, num_inner_chunks: u64) -> Result<BytesRepresentation, CodecError> {
        let mut size = BytesRepresentation::FixedSize(num_inner_chunks * INDEX_ENTRY_SIZE);
        for index_codec in &self.index_codecs {
            size = index_codec.compute_encoded_size(size);
        }
        match size {
            BytesRepresentation::FixedSize(_) => Ok(size),
            _ => Err(CodecError::InvalidConfiguration(
                "sharding index_codecs must produce a fixed-size encoded index table".to_string(),
            )),
        }
    }

    fn inner_representation(&self, decoded_representation: &ChunkRepresentation) -> ChunkRepresentation {
        ChunkRepresentation::new(
            self.chunk_shape.clone(),
            decoded_representation.data_type(),
            decoded_representation.fill_value().clone(),
        )
    }

    /// Encode the outer chunk as a shard. Returns `Ok(None)` if every inner sub-chunk is
    /// entirely fill-valued, in which case the caller should delete the shard's key rather than
    /// write an empty-but-present object.
    pub(crate) fn encode(
        &self,
        decoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
        options: &CodecOptions,
    ) -> Result<Option<Vec<u8>>, CodecError> {
        let expected = decoded_representation.size_bytes();
        if decoded_value.len() as u64 != expected {
            return Err(CodecError::UnexpectedDecodedSize {
                got: decoded_value.len() as u64,
                expected,
            });
        }

        let grid = self.inner_grid(decoded_representation.shape())?;
        let grid_shape = grid
            .grid_shape(decoded_representation.shape())
            .map_err(|e| CodecError::InvalidConfiguration(e.to_string()))?;
        let num_inner_chunks: u64 = grid_shape.iter().product();
        let index_representation = self.index_representation(num_inner_chunks)?;
        let index_size = index_representation
            .exact_size()
            .expect("index_representation validated as fixed-size");

        let element_size = decoded_representation.data_type().size_bytes();
        let inner_representation = self.inner_representation(decoded_representation);
        let chunk_coords: Vec<_> = grid
            .chunk_indices(decoded_representation.shape())
            .map_err(|e| CodecError::InvalidConfiguration(e.to_string()))?
            .collect();

        let mut encoded_chunks: Vec<Option<Vec<u8>>> = Vec::with_capacity(chunk_coords.len());
        for coords in &chunk_coords {
            let subset = grid
                .chunk_subset(coords)
                .map_err(|e| CodecError::InvalidConfiguration(e.to_string()))?;
            let sub_bytes =
                raw::extract_subset(&decoded_value, decoded_representation.shape(), element_size, &subset);
            if raw::is_all_fill(&sub_bytes, decoded_representation.fill_value()) {
                encoded_chunks.push(None);
            } else {
                encoded_chunks.push(self.codecs.encode(sub_bytes, &inner_representation, options)?);
            }
        }

        if encoded_chunks.iter().all(Option::is_none) {
            return Ok(None);
        }

        let header_len = match self.index_location {
            IndexLocation::Start => index_size,
            IndexLocation::End => 0,
        };
        let mut body = Vec::new();
        let mut raw_index = Vec::with_capacity(encoded_chunks.len() * INDEX_ENTRY_SIZE as usize);
        for chunk in &encoded_chunks {
            let (offset, length) = match chunk {
                None => (EMPTY_MARKER, EMPTY_MARKER),
                Some(bytes) => {
                    let offset = header_len + body.len() as u64;
                    let length = bytes.len() as u64;
                    body.extend_from_slice(bytes);
                    (offset, length)
                }
            };
            raw_index.extend_from_slice(&offset.to_le_bytes());
            raw_index.extend_from_slice(&length.to_le_bytes());
        }

        let mut encoded_index = raw_index;
        for index_codec in &self.index_codecs {
            encoded_index = index_codec.encode(encoded_index, options)?;
        }

        let mut shard = Vec::with_capacity(body.len() + encoded_index.len());
        match self.index_location {
            IndexLocation::Start => {
                shard.extend_from_slice(&encoded_index);
                shard.extend_from_slice(&body);
            }
            IndexLocation::End => {
                shard.extend_from_slice(&body);
                shard.extend_from_slice(&encoded_index);
            }
        }
        Ok(Some(shard))
    }

    fn decode_index(
        &self,
        encoded_value: &[u8],
        index_size: u64,
        num_inner_chunks: u64,
        options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let total_len = encoded_value.len() as u64;
        if total_len < index_size {
            return Err(CodecError::CorruptData(
                "shard is shorter than its index table".to_string(),
            ));
        }
        let index_bytes: &[u8] = match self.index_location {
            IndexLocation::Start => &encoded_value[..index_size as usize],
            IndexLocation::End => &encoded_value[(total_len - index_size) as usize..],
        };
        let mut raw_index = index_bytes.to_vec();
        for index_codec in self.index_codecs.iter().rev() {
            raw_index = index_codec.decode(raw_index, &BytesRepresentation::UnboundedSize, options)?;
        }
        let expected_raw_len = num_inner_chunks * INDEX_ENTRY_SIZE;
        if raw_index.len() as u64 != expected_raw_len {
            return Err(CodecError::CorruptData(format!(
                "shard index table decoded to {} bytes, expected {expected_raw_len}",
                raw_index.len()
            )));
        }
        Ok(raw_index)
    }

    fn index_entry(raw_index: &[u8], linear: usize) -> (u64, u64) {
        let start = linear * INDEX_ENTRY_SIZE as usize;
        let offset = u64::from_le_bytes(raw_index[start..start + 8].try_into().unwrap());
        let length = u64::from_le_bytes(raw_index[start + 8..start + 16].try_into().unwrap());
        (offset, length)
    }

    /// Decode a complete shard, already held in memory, back to the outer chunk's bytes.
    pub(crate) fn decode(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &ChunkRepresentation,
        options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let grid = self.inner_grid(decoded_representation.shape())?;
        let grid_shape = grid
            .grid_shape(decoded_representation.shape())
            .map_err(|e| CodecError::InvalidConfiguration(e.to_string()))?;
        let num_inner_chunks: u64 = grid_shape.iter().product();
        let index_representation = self.index_representation(num_inner_chunks)?;
        let index_size = index_representation.exact_size().expect("validated fixed-size");
        let raw_index = self.decode_index(&encoded_value, index_size, num_inner_chunks, options)?;

        let element_size = decoded_representation.data_type().size_bytes();
        let inner_representation = self.inner_representation(decoded_representation);
        let mut out = raw::fill_buffer(
            decoded_representation.num_elements(),
            decoded_representation.fill_value(),
        );

        let chunk_coords: Vec<_> = grid
            .chunk_indices(decoded_representation.shape())
            .map_err(|e| CodecError::InvalidConfiguration(e.to_string()))?
            .collect();
        for (linear, coords) in chunk_coords.iter().enumerate() {
            let (offset, length) = Self::index_entry(&raw_index, linear);
            if offset == EMPTY_MARKER && length == EMPTY_MARKER {
                continue;
            }
            let start = offset as usize;
            let end = start
                .checked_add(length as usize)
                .ok_or_else(|| CodecError::CorruptData("sub-chunk length overflows shard".to_string()))?;
            if end > encoded_value.len() {
                return Err(CodecError::CorruptData(
                    "sub-chunk extent exceeds shard length".to_string(),
                ));
            }
            let sub_decoded =
                self.codecs
                    .decode(Some(encoded_value[start..end].to_vec()), &inner_representation, options)?;
            let subset = grid
                .chunk_subset(coords)
                .map_err(|e| CodecError::InvalidConfiguration(e.to_string()))?;
            raw::insert_subset(&mut out, decoded_representation.shape(), element_size, &subset, &sub_decoded);
        }
        Ok(out)
    }

    /// Decode only the inner sub-chunks overlapping `array_subsets`, reading just the index and
    /// the needed sub-chunk byte ranges when `input` supports partial reads.
    pub(crate) fn partial_decode(
        &self,
        input: &dyn BytesPartialDecoderTraits,
        decoded_representation: &ChunkRepresentation,
        array_subsets: &[ArraySubset],
        options: &CodecOptions,
    ) -> Result<Vec<Vec<u8>>, CodecError> {
        let grid = self.inner_grid(decoded_representation.shape())?;
        let grid_shape = grid
            .grid_shape(decoded_representation.shape())
            .map_err(|e| CodecError::InvalidConfiguration(e.to_string()))?;
        let num_inner_chunks: u64 = grid_shape.iter().product();
        let index_representation = self.index_representation(num_inner_chunks)?;
        let index_size = index_representation.exact_size().expect("validated fixed-size");

        let index_byte_range = match self.index_location {
            IndexLocation::Start => ByteRange::FromStart(0, Some(index_size)),
            IndexLocation::End => ByteRange::Suffix(index_size),
        };
        let Some(mut index_values) = input.partial_decode(&[index_byte_range])? else {
            return Ok(array_subsets
                .iter()
                .map(|s| raw::fill_buffer(s.num_elements(), decoded_representation.fill_value()))
                .collect());
        };
        let mut raw_index = index_values.remove(0);
        for index_codec in self.index_codecs.iter().rev() {
            raw_index = index_codec.decode(raw_index, &BytesRepresentation::UnboundedSize, options)?;
        }
        let expected_raw_len = num_inner_chunks * INDEX_ENTRY_SIZE;
        if raw_index.len() as u64 != expected_raw_len {
            return Err(CodecError::CorruptData(format!(
                "shard index table decoded to {} bytes, expected {expected_raw_len}",
                raw_index.len()
            )));
        }

        let element_size = decoded_representation.data_type().size_bytes();
        let inner_representation = self.inner_representation(decoded_representation);
        let strides = raw::row_major_strides(&grid_shape);

        let mut decoded_chunks: HashMap<usize, Vec<u8>> = HashMap::new();
        let mut fetch_linear: Vec<usize> = Vec::new();
        let mut fetch_ranges: Vec<ByteRange> = Vec::new();
        let mut seen: std::collections::HashSet<usize> = std::collections::HashSet::new();

        for subset in array_subsets {
            for coords in grid
                .chunks_in_subset(subset)
                .map_err(|e| CodecError::InvalidConfiguration(e.to_string()))?
            {
                let linear = coords.iter().zip(&strides).map(|(c, s)| c * s).sum::<u64>() as usize;
                if !seen.insert(linear) {
                    continue;
                }
                let (offset, length) = Self::index_entry(&raw_index, linear);
                if offset == EMPTY_MARKER && length == EMPTY_MARKER {
                    decoded_chunks.insert(
                        linear,
                        raw::fill_buffer(inner_representation.num_elements(), inner_representation.fill_value()),
                    );
                    continue;
                }
                fetch_linear.push(linear);
                fetch_ranges.push(ByteRange::FromStart(offset, Some(length)));
            }
        }

        if !fetch_ranges.is_empty() {
            let fetched = input.partial_decode(&fetch_ranges)?.ok_or_else(|| {
                CodecError::CorruptData("shard vanished while fetching sub-chunks".to_string())
            })?;
            for (linear, bytes) in fetch_linear.into_iter().zip(fetched.into_iter()) {
                let decoded = self.codecs.decode(Some(bytes), &inner_representation, options)?;
                decoded_chunks.insert(linear, decoded);
            }
        }

        let mut out = Vec::with_capacity(array_subsets.len());
        for subset in array_subsets {
            let mut buffer = vec![0u8; subset.num_elements() as usize * element_size];
            for coords in grid
                .chunks_in_subset(subset)
                .map_err(|e| CodecError::InvalidConfiguration(e.to_string()))?
            {
                let linear = coords.iter().zip(&strides).map(|(c, s)| c * s).sum::<u64>() as usize;
                let chunk_subset = grid
                    .chunk_subset(&coords)
                    .map_err(|e| CodecError::InvalidConfiguration(e.to_string()))?;
                let Some(overlap) = chunk_subset.intersection(subset) else {
                    continue;
                };
                let local = overlap.relative_to(&chunk_subset);
                let decoded_chunk = &decoded_chunks[&linear];
                let extracted = raw::extract_subset(decoded_chunk, &self.chunk_shape, element_size, &local);
                let out_local = overlap.relative_to(subset);
                raw::insert_subset(&mut buffer, subset.shape(), element_size, &out_local, &extracted);
            }
            out.push(buffer);
        }
        Ok(out)
    }

    /// The encoded size of a shard. Always [`BytesRepresentation::UnboundedSize`]: the shard's
    /// size depends on how many inner sub-chunks are entirely fill-valued, which is only known
    /// once the data is seen.
    pub(crate) fn compute_encoded_size(&self, _decoded_representation: &ChunkRepresentation) -> BytesRepresentation {
        BytesRepresentation::UnboundedSize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array_to_bytes::bytes::BytesCodec;
    use crate::partial_decoder::BytesPartialDecoder;
    use crate::ArrayToBytesCodec;
    use zarrs_data_type::{DataType, Endianness, FillValue};

    fn codec() -> ShardingCodec {
        ShardingCodec::new(
            vec![2, 2],
            CodecChain::new(
                vec![],
                ArrayToBytesCodec::Bytes(BytesCodec::new(Some(Endianness::native()))),
                vec![],
            ),
            vec![],
            IndexLocation::End,
        )
    }

    fn representation() -> ChunkRepresentation {
        ChunkRepresentation::new(vec![4, 4], DataType::UInt8, FillValue::zero(DataType::UInt8))
    }

    #[test]
    fn inner_chunk_shape_must_divide_outer_chunk_shape() {
        let codec = ShardingCodec::new(
            vec![3, 3],
            CodecChain::new(
                vec![],
                ArrayToBytesCodec::Bytes(BytesCodec::new(Some(Endianness::native()))),
                vec![],
            ),
            vec![],
            IndexLocation::End,
        );
        let repr = representation();
        assert!(codec.encode(vec![0; 16], &repr, &CodecOptions::new()).is_err());
    }

    #[test]
    fn index_table_is_exact_size_before_index_codecs() {
        let codec = codec();
        let repr = representation();
        let data: Vec<u8> = (1..=16).collect();
        let encoded = codec.encode(data, &repr, &CodecOptions::new()).unwrap().unwrap();
        // 4 inner 2x2 chunks, no index codec shrinkage/growth: 4 * 16 = 64 raw index bytes.
        assert_eq!(encoded.len(), 16 /* 4 sub-chunks x 4 bytes each */ + 64);
    }

    #[test]
    fn round_trips_a_shard() {
        let codec = codec();
        let repr = representation();
        let data: Vec<u8> = (1..=16).collect();
        let encoded = codec.encode(data.clone(), &repr, &CodecOptions::new()).unwrap().unwrap();
        let decoded = codec.decode(encoded, &repr, &CodecOptions::new()).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn fully_empty_shard_encodes_to_none() {
        let codec = codec();
        let repr = representation();
        let data = vec![0u8; 16];
        assert!(codec.encode(data, &repr, &CodecOptions::new()).unwrap().is_none());
    }

    #[test]
    fn overwriting_one_sub_chunk_preserves_the_others() {
        let codec = codec();
        let repr = representation();
        let original: Vec<u8> = (1..=16).collect();
        let encoded_before = codec
            .encode(original.clone(), &repr, &CodecOptions::new())
            .unwrap()
            .unwrap();

        let mut modified = original.clone();
        // Overwrite the top-left 2x2 inner sub-chunk (rows 0-1, cols 0-1) only.
        for row in 0..2 {
            for col in 0..2 {
                modified[row * 4 + col] = 0xFF;
            }
        }
        let encoded_after = codec
            .encode(modified, &repr, &CodecOptions::new())
            .unwrap()
            .unwrap();

        // Decode both and compare every element outside the touched sub-chunk.
        let decoded_before = codec.decode(encoded_before, &repr, &CodecOptions::new()).unwrap();
        let decoded_after = codec.decode(encoded_after, &repr, &CodecOptions::new()).unwrap();
        for row in 0..4 {
            for col in 0..4 {
                if row < 2 && col < 2 {
                    continue;
                }
                assert_eq!(decoded_before[row * 4 + col], decoded_after[row * 4 + col]);
            }
        }
    }

    #[test]
    fn partial_decode_matches_full_decode() {
        let codec = codec();
        let repr = representation();
        let data: Vec<u8> = (1..=16).collect();
        let encoded = codec.encode(data, &repr, &CodecOptions::new()).unwrap().unwrap();
        let full = codec.decode(encoded.clone(), &repr, &CodecOptions::new()).unwrap();

        let decoder = BytesPartialDecoder::new(&encoded);
        let subset = ArraySubset::new(vec![1, 1], vec![2, 2]).unwrap();
        let partial = codec
            .partial_decode(&decoder, &repr, &[subset.clone()], &CodecOptions::new())
            .unwrap();
        let expected = raw::extract_subset(&full, repr.shape(), 1, &subset);
        assert_eq!(partial[0], expected);
    }
}
