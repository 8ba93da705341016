//! Zarr V3 metadata documents (`zarr.json`).

use serde::{Deserialize, Serialize};

use crate::Configuration;

/// A Zarr V3 `{name, configuration}` pair, used for chunk grids, chunk key encodings, and codecs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataV3 {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    configuration: Option<Configuration>,
}

impl MetadataV3 {
    /// Create new metadata with an empty configuration.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            configuration: None,
        }
    }

    /// Create new metadata with the given configuration.
    #[must_use]
    pub fn new_with_configuration(name: impl Into<String>, configuration: Configuration) -> Self {
        Self {
            name: name.into(),
            configuration: Some(configuration),
        }
    }

    /// The `name` field.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `configuration` field, or an empty configuration if absent.
    #[must_use]
    pub fn configuration(&self) -> Configuration {
        self.configuration.clone().unwrap_or_default()
    }
}

/// The `chunk_grid` field of [`ArrayMetadataV3`]. Only `regular` grids are supported.
pub type ChunkGridMetadataV3 = MetadataV3;

/// The `chunk_key_encoding` field of [`ArrayMetadataV3`].
pub type ChunkKeyEncodingMetadataV3 = MetadataV3;

/// A Zarr V3 array metadata document (`zarr.json`), per the Zarr V3 specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayMetadataV3 {
    /// Always `3`.
    pub zarr_format: monostate::MustBe!(3u64),
    /// Always `"array"`.
    pub node_type: monostate::MustBe!("array"),
    /// The shape of the array.
    pub shape: Vec<u64>,
    /// The Zarr V3 wire name of the data type, e.g. `"int32"`.
    pub data_type: String,
    /// The chunk grid, currently always `{"name": "regular", "configuration": {"chunk_shape": [...]}}`.
    pub chunk_grid: ChunkGridMetadataV3,
    /// The chunk key encoding.
    pub chunk_key_encoding: ChunkKeyEncodingMetadataV3,
    /// The raw (unparsed) fill value, interpreted against `data_type` by
    /// [`crate::fill_value::parse_fill_value`].
    pub fill_value: serde_json::Value,
    /// The codec pipeline: zero or more array-to-array, exactly one array-to-bytes, then zero
    /// or more bytes-to-bytes codecs, in that order.
    pub codecs: Vec<MetadataV3>,
    /// User-defined attributes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<serde_json::Map<String, serde_json::Value>>,
    /// Optional per-dimension names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension_names: Option<Vec<Option<String>>>,
}
