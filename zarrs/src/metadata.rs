//! Array metadata assembly and validation: turning an on-disk Zarr V2 or V3 metadata document
//! into the resolved, strongly typed pieces an [`crate::Array`] operates on, and back again.

use zarrs_chunk_grid::RegularChunkGrid;
use zarrs_chunk_key_encoding::{ChunkKeyEncoding, Separator};
use zarrs_codec::array_to_bytes::sharding::IndexLocation;
use zarrs_codec::{ArrayToBytesCodec, BytesCodec, BytesToBytesCodec, CodecChain, ShardingCodec};
use zarrs_data_type::{DataType, FillValue};
use zarrs_metadata::fill_value::{parse_fill_value, serialize_fill_value};
use zarrs_metadata::v2::{ArrayMetadataV2, ArrayMetadataV2Order, MetadataV2};
use zarrs_metadata::v3::{ArrayMetadataV3, MetadataV3};
use zarrs_registry::codec;

use crate::error::ArrayCreateError;

/// The on-disk metadata document an array was opened from, or will be stored as.
#[derive(Debug, Clone)]
pub enum ArrayMetadata {
    /// A Zarr V3 `zarr.json` document.
    V3(ArrayMetadataV3),
    /// A Zarr V2 `.zarray` (plus `.zattrs`) document pair.
    V2(ArrayMetadataV2),
}

impl ArrayMetadata {
    /// The array's user-defined attributes.
    #[must_use]
    pub fn attributes(&self) -> serde_json::Map<String, serde_json::Value> {
        match self {
            Self::V3(m) => m.attributes.clone().unwrap_or_default(),
            Self::V2(m) => m.attributes.clone(),
        }
    }
}

/// The fully resolved, typed form of an array's metadata: what [`crate::Array`] actually
/// operates against, independent of which on-disk version it was parsed from.
#[derive(Debug, Clone)]
pub struct ArraySpec {
    shape: Vec<u64>,
    data_type: DataType,
    fill_value: FillValue,
    chunk_grid: RegularChunkGrid,
    chunk_key_encoding: ChunkKeyEncoding,
    codecs: CodecChain,
    dimension_names: Option<Vec<Option<String>>>,
}

impl ArraySpec {
    /// The shape of the array.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// The element data type.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// The fill value used for unmaterialized chunks.
    #[must_use]
    pub fn fill_value(&self) -> &FillValue {
        &self.fill_value
    }

    /// The chunk grid.
    #[must_use]
    pub fn chunk_grid(&self) -> &RegularChunkGrid {
        &self.chunk_grid
    }

    /// The chunk key encoding.
    #[must_use]
    pub fn chunk_key_encoding(&self) -> &ChunkKeyEncoding {
        &self.chunk_key_encoding
    }

    /// The codec pipeline applied to every chunk.
    #[must_use]
    pub fn codecs(&self) -> &CodecChain {
        &self.codecs
    }

    /// Per-dimension names, if any.
    #[must_use]
    pub fn dimension_names(&self) -> Option<&[Option<String>]> {
        self.dimension_names.as_deref()
    }

    pub(crate) fn with_shape(&self, shape: Vec<u64>) -> Self {
        Self {
            shape,
            ..self.clone()
        }
    }
}

/// Resolve a [`ArrayMetadata`] document into an [`ArraySpec`].
///
/// # Errors
/// Returns [`ArrayCreateError`] if any field is invalid, or incompatible with another (e.g. a
/// fill value that does not match the data type, or a chunk grid whose dimensionality differs
/// from the array's shape).
pub fn resolve(metadata: &ArrayMetadata) -> Result<ArraySpec, ArrayCreateError> {
    match metadata {
        ArrayMetadata::V3(m) => resolve_v3(m),
        ArrayMetadata::V2(m) => resolve_v2(m),
    }
}

fn resolve_v3(m: &ArrayMetadataV3) -> Result<ArraySpec, ArrayCreateError> {
    let data_type = DataType::from_v3_name(&m.data_type)?;
    let fill_value = parse_fill_value(&m.fill_value, data_type)?;
    let chunk_shape = parse_regular_chunk_grid(&m.chunk_grid)?;
    let chunk_grid = RegularChunkGrid::new(chunk_shape)?;
    let chunk_key_encoding = parse_chunk_key_encoding_v3(&m.chunk_key_encoding);
    let codecs = CodecChain::from_metadata(&m.codecs)?;
    Ok(ArraySpec {
        shape: m.shape.clone(),
        data_type,
        fill_value,
        chunk_grid,
        chunk_key_encoding,
        codecs,
        dimension_names: m.dimension_names.clone(),
    })
}

fn resolve_v2(m: &ArrayMetadataV2) -> Result<ArraySpec, ArrayCreateError> {
    if matches!(m.order, ArrayMetadataV2Order::ColumnMajor) {
        return Err(ArrayCreateError::UnsupportedZarrV2Array(
            "column-major (order: \"F\") arrays are not supported".to_string(),
        ));
    }
    let (data_type, endian) = DataType::from_v2_dtype_string(&m.dtype)?;
    let fill_value = parse_fill_value(&m.fill_value, data_type)?;
    let separator = match m.dimension_separator {
        '/' => Separator::Slash,
        _ => Separator::Dot,
    };
    let chunk_key_encoding = ChunkKeyEncoding::V2(separator);

    let inner_array_to_bytes = ArrayToBytesCodec::Bytes(BytesCodec::new(if data_type.endianness_required() {
        Some(endian)
    } else {
        None
    }));
    let mut inner_bytes_to_bytes = Vec::new();
    if let Some(filters) = &m.filters {
        for filter in filters {
            inner_bytes_to_bytes.push(v2_compressor_to_codec(filter)?);
        }
    }
    if let Some(compressor) = &m.compressor {
        inner_bytes_to_bytes.push(v2_compressor_to_codec(compressor)?);
    }

    // A `shards`-bearing document packs `shards[i]` sub-chunks of shape `chunks[i]` along each
    // axis into one outer (shard) chunk of shape `chunks[i] * shards[i]`; the per-sub-chunk
    // codecs above (endian bytes, filters, compressor) run inside the shard, not on it.
    let (chunk_grid, codecs) = if let Some(shards) = &m.shards {
        if m.chunks.len() != shards.len() {
            return Err(ArrayCreateError::UnsupportedZarrV2Array(
                "sharded v2 array: chunks and shards have differing dimensionality".to_string(),
            ));
        }
        let shard_shape: Vec<u64> = m
            .chunks
            .iter()
            .zip(shards)
            .map(|(&c, &s)| c * s)
            .collect();
        let inner_codecs = CodecChain::new(Vec::new(), inner_array_to_bytes, inner_bytes_to_bytes);
        let sharding = ArrayToBytesCodec::ShardingIndexed(ShardingCodec::new(
            m.chunks.clone(),
            inner_codecs,
            Vec::new(),
            IndexLocation::End,
        ));
        (
            RegularChunkGrid::new(shard_shape)?,
            CodecChain::new(Vec::new(), sharding, Vec::new()),
        )
    } else {
        (
            RegularChunkGrid::new(m.chunks.clone())?,
            CodecChain::new(Vec::new(), inner_array_to_bytes, inner_bytes_to_bytes),
        )
    };

    Ok(ArraySpec {
        shape: m.shape.clone(),
        data_type,
        fill_value,
        chunk_grid,
        chunk_key_encoding,
        codecs,
        dimension_names: None,
    })
}

/// Maps a Zarr V2 `compressor`/`filters` entry id to the equivalent V3 `bytes->bytes` codec.
///
/// Only the compressors this library also implements as V3 codecs are supported; anything else
/// (e.g. `delta`, `shuffle`) is rejected as an unsupported V2 array — this crate supports V2 only
/// as a compatible subset that maps cleanly onto the V3 codec model.
fn v2_compressor_to_codec(meta: &MetadataV2) -> Result<BytesToBytesCodec, ArrayCreateError> {
    let v3_name = match meta.id() {
        "gzip" | "zlib" => codec::GZIP,
        "zstd" => codec::ZSTD,
        "blosc" => codec::BLOSC,
        "crc32" | "crc32c" => codec::CRC32C,
        other => {
            return Err(ArrayCreateError::UnsupportedZarrV2Array(format!(
                "compressor/filter {other:?} has no Zarr V3 equivalent"
            )))
        }
    };
    let metadata_v3 = MetadataV3::new_with_configuration(v3_name, meta.configuration().clone());
    Ok(BytesToBytesCodec::from_metadata(&metadata_v3)?)
}

fn parse_regular_chunk_grid(grid: &MetadataV3) -> Result<Vec<u64>, ArrayCreateError> {
    #[derive(serde::Deserialize)]
    struct RegularChunkGridConfiguration {
        chunk_shape: Vec<u64>,
    }
    if grid.name() != zarrs_registry::chunk_grid::REGULAR {
        return Err(ArrayCreateError::InvalidCodec(
            zarrs_plugin::PluginCreateError::Unknown {
                name: grid.name().to_string(),
            },
        ));
    }
    let parsed: RegularChunkGridConfiguration = grid.configuration().to_typed()?;
    Ok(parsed.chunk_shape)
}

fn parse_chunk_key_encoding_v3(encoding: &MetadataV3) -> ChunkKeyEncoding {
    #[derive(serde::Deserialize)]
    struct SeparatorConfiguration {
        #[serde(default = "default_separator")]
        separator: String,
    }
    fn default_separator() -> String {
        "/".to_string()
    }
    let parsed: SeparatorConfiguration = encoding
        .configuration()
        .to_typed()
        .unwrap_or(SeparatorConfiguration {
            separator: default_separator(),
        });
    let separator = if parsed.separator == "." {
        Separator::Dot
    } else {
        Separator::Slash
    };
    if encoding.name() == zarrs_registry::chunk_key_encoding::V2 {
        ChunkKeyEncoding::V2(separator)
    } else {
        ChunkKeyEncoding::Default(separator)
    }
}

/// Build a new Zarr V3 metadata document from an [`ArraySpec`] and attributes.
#[must_use]
pub fn create_v3_metadata(
    spec: &ArraySpec,
    attributes: serde_json::Map<String, serde_json::Value>,
) -> ArrayMetadataV3 {
    let chunk_grid = MetadataV3::new_with_configuration(
        zarrs_registry::chunk_grid::REGULAR,
        zarrs_metadata::Configuration::from_map(
            serde_json::json!({ "chunk_shape": spec.chunk_grid.chunk_shape() })
                .as_object()
                .unwrap()
                .clone(),
        ),
    );
    let (name, separator) = match spec.chunk_key_encoding {
        ChunkKeyEncoding::Default(sep) => (zarrs_registry::chunk_key_encoding::DEFAULT, sep),
        ChunkKeyEncoding::V2(sep) => (zarrs_registry::chunk_key_encoding::V2, sep),
    };
    let chunk_key_encoding = MetadataV3::new_with_configuration(
        name,
        zarrs_metadata::Configuration::from_map(
            serde_json::json!({ "separator": separator.as_char().to_string() })
                .as_object()
                .unwrap()
                .clone(),
        ),
    );
    let fill_value = serialize_fill_value(&spec.fill_value, spec.data_type);
    ArrayMetadataV3 {
        zarr_format: Default::default(),
        node_type: Default::default(),
        shape: spec.shape.clone(),
        data_type: spec.data_type.v3_name().to_string(),
        chunk_grid,
        chunk_key_encoding,
        fill_value,
        codecs: spec.codecs.create_metadata(),
        attributes: if attributes.is_empty() {
            None
        } else {
            Some(attributes)
        },
        dimension_names: spec.dimension_names.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v3_doc() -> ArrayMetadataV3 {
        serde_json::from_value(serde_json::json!({
            "zarr_format": 3,
            "node_type": "array",
            "shape": [4, 4],
            "data_type": "int32",
            "chunk_grid": {"name": "regular", "configuration": {"chunk_shape": [2, 2]}},
            "chunk_key_encoding": {"name": "default", "configuration": {"separator": "/"}},
            "fill_value": 0,
            "codecs": [{"name": "bytes", "configuration": {"endian": "little"}}],
        }))
        .unwrap()
    }

    #[test]
    fn resolves_a_v3_document() {
        let spec = resolve(&ArrayMetadata::V3(v3_doc())).unwrap();
        assert_eq!(spec.shape(), &[4, 4]);
        assert_eq!(spec.data_type(), DataType::Int32);
        assert_eq!(spec.chunk_grid().chunk_shape(), &[2, 2]);
    }

    #[test]
    fn resolves_a_v2_document_with_gzip_compressor() {
        let doc: ArrayMetadataV2 = serde_json::from_value(serde_json::json!({
            "zarr_format": 2,
            "shape": [4],
            "chunks": [2],
            "dtype": "<f8",
            "compressor": {"id": "gzip", "level": 5},
            "filters": null,
            "order": "C",
            "fill_value": "NaN",
            "dimension_separator": ".",
        }))
        .unwrap();
        let spec = resolve(&ArrayMetadata::V2(doc)).unwrap();
        assert_eq!(spec.data_type(), DataType::Float64);
        assert!(spec.fill_value().is_nan(DataType::Float64));
        assert_eq!(spec.codecs().bytes_to_bytes().len(), 1);
    }

    #[test]
    fn resolves_a_v2_sharded_document_with_shard_shape_chunks_times_shards() {
        let doc: ArrayMetadataV2 = serde_json::from_value(serde_json::json!({
            "zarr_format": 2,
            "shape": [20, 3],
            "chunks": [3, 2],
            "dtype": "<f8",
            "compressor": null,
            "filters": null,
            "order": "C",
            "fill_value": 0,
            "dimension_separator": ".",
            "shards": [2, 2],
            "shard_format": "indexed",
        }))
        .unwrap();
        let spec = resolve(&ArrayMetadata::V2(doc)).unwrap();
        assert_eq!(spec.chunk_grid().chunk_shape(), &[6, 4]);
        assert!(matches!(
            spec.codecs().array_to_bytes(),
            ArrayToBytesCodec::ShardingIndexed(_)
        ));
    }

    #[test]
    fn column_major_v2_array_is_rejected() {
        let doc: ArrayMetadataV2 = serde_json::from_value(serde_json::json!({
            "zarr_format": 2,
            "shape": [4],
            "chunks": [2],
            "dtype": "<i4",
            "compressor": null,
            "filters": null,
            "order": "F",
            "fill_value": 0,
            "dimension_separator": ".",
        }))
        .unwrap();
        assert!(resolve(&ArrayMetadata::V2(doc)).is_err());
    }

    #[test]
    fn round_trips_v3_metadata_through_create_v3_metadata() {
        let spec = resolve(&ArrayMetadata::V3(v3_doc())).unwrap();
        let recreated = create_v3_metadata(&spec, serde_json::Map::new());
        let reresolved = resolve(&ArrayMetadata::V3(recreated)).unwrap();
        assert_eq!(reresolved.shape(), spec.shape());
        assert!(reresolved
            .fill_value()
            .is_equal_nan_aware(spec.fill_value(), spec.data_type()));
    }
}
