//! Zarr array metadata (v2 and v3) for the [`zarrs`](https://docs.rs/zarrs/latest/zarrs/index.html) crate.
//!
//! This crate owns the on-disk JSON document shapes (Zarr V2 and the Zarr V3 specification) and
//! the dtype-aware fill-value parsing rules used when a document is opened.
//!
//! ## Licence
//! `zarrs_metadata` is licensed under either of
//!  - the Apache License, Version 2.0 or <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license or <http://opensource.org/licenses/MIT>, at your option.

mod configuration;
pub mod fill_value;
pub mod v2;
pub mod v3;

pub use configuration::Configuration;
pub use fill_value::{parse_fill_value, serialize_fill_value, InvalidFillValueMetadataError};

use serde_json::Value;

/// Replace NaN/Infinity/-Infinity with the special string forms required by the Zarr core
/// specification, recursively through nested objects and arrays.
///
/// `serde_json` already rejects non-finite floats at serialization time (it has no literal for
/// them), so this pass must run over the value tree *before* serializing, not via a custom
/// [`serde::Serializer`] hook.
#[must_use]
pub fn replace_special_floats(value: Value) -> Value {
    match value {
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if f.is_nan() {
                    return Value::String("NaN".to_string());
                } else if f.is_infinite() {
                    return Value::String(
                        if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string(),
                    );
                }
            }
            Value::Number(n)
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, replace_special_floats(v)))
                .collect(),
        ),
        Value::Array(arr) => Value::Array(arr.into_iter().map(replace_special_floats).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v3_array_metadata_roundtrips_through_json() {
        let doc = serde_json::json!({
            "zarr_format": 3,
            "node_type": "array",
            "shape": [4, 4],
            "data_type": "float64",
            "chunk_grid": {"name": "regular", "configuration": {"chunk_shape": [2, 2]}},
            "chunk_key_encoding": {"name": "default", "configuration": {"separator": "/"}},
            "fill_value": "NaN",
            "codecs": [{"name": "bytes", "configuration": {"endian": "little"}}],
        });
        let parsed: v3::ArrayMetadataV3 = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(parsed.shape, vec![4, 4]);
        let back = serde_json::to_value(&parsed).unwrap();
        assert_eq!(back["fill_value"], doc["fill_value"]);
    }
}
