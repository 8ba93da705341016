//! Zarr V2 metadata documents (`.zarray` and `.zattrs`).

use serde::{Deserialize, Serialize};

use crate::Configuration;

/// A Zarr V2 `{"id": ..., ...configuration}` document, used for `compressor` and `filters`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataV2 {
    id: String,
    #[serde(flatten)]
    configuration: Configuration,
}

impl MetadataV2 {
    /// Create new metadata with an empty configuration.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            configuration: Configuration::new(),
        }
    }

    /// The `id` field.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The configuration (every field except `id`).
    #[must_use]
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }
}

/// The in-memory layout order of a Zarr V2 array (`order`). Always row-major (`"C"`) for
/// arrays created by this library; `"F"` is accepted on read for compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrayMetadataV2Order {
    /// Row-major (last dimension contiguous).
    #[serde(rename = "C")]
    RowMajor,
    /// Column-major (first dimension contiguous).
    #[serde(rename = "F")]
    ColumnMajor,
}

/// A Zarr V2 array metadata document (`.zarray`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayMetadataV2 {
    /// Always `2`.
    pub zarr_format: monostate::MustBe!(2u64),
    /// The shape of the array.
    pub shape: Vec<u64>,
    /// The chunk shape.
    pub chunks: Vec<u64>,
    /// The numpy-style dtype string, e.g. `"<f8"`.
    pub dtype: String,
    /// The single bytes-to-bytes compressor, or `null` for none.
    pub compressor: Option<MetadataV2>,
    /// Bytes-to-bytes filters applied before the compressor, or `null` for none.
    pub filters: Option<Vec<MetadataV2>>,
    /// The in-memory layout order.
    pub order: ArrayMetadataV2Order,
    /// The raw (unparsed) fill value.
    pub fill_value: serde_json::Value,
    /// The chunk key separator. Defaults to `.` when absent.
    #[serde(default = "default_dimension_separator")]
    pub dimension_separator: char,
    /// User-defined attributes, stored separately in `.zattrs`, not `.zarray`.
    #[serde(skip)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    /// The number of `chunks`-shaped sub-chunks packed along each axis into one shard, when this
    /// array uses the v2 sharding extension (`shard_format: "indexed"`); the shard (outer chunk)
    /// shape is `chunks[i] * shards[i]`. See the open question on v2 sharding support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shards: Option<Vec<u64>>,
    /// Marks `shards` as using the indexed shard format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard_format: Option<String>,
}

fn default_dimension_separator() -> char {
    '.'
}
