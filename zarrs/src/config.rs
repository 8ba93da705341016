//! Process-wide library configuration.
//!
//! A dotted-path JSON configuration tree, seeded with defaults, then overridden by
//! `ZARR_PYTHON_<SECTION>__<KEY>=<literal>` environment variables at first access. Unlike
//! `donfig`, there is no config-file layer and no nesting beyond two levels — the default key set
//! is flat enough that two levels (`section.key`) cover it.
//!
//! The global is mutated only through [`set`], [`reset`], and the scoped override returned by
//! [`scoped`]. All three replace the whole configuration outright; none merges into the existing
//! one, and none is safe to call concurrently with [`get`]/[`array_order`]/etc. from another
//! thread — matching `donfig`'s own "not reentrant-safe" caveat, which this implementation keeps
//! as a documented property rather than working around with a lock per lookup.

use std::sync::OnceLock;

use serde_json::{Map, Value};
use zarrs_metadata::Configuration;

static GLOBAL: OnceLock<std::sync::Mutex<Configuration>> = OnceLock::new();

fn cell() -> &'static std::sync::Mutex<Configuration> {
    GLOBAL.get_or_init(|| std::sync::Mutex::new(defaults_with_env()))
}

fn defaults() -> Configuration {
    let mut array = Map::new();
    array.insert("order".into(), Value::String("C".into()));

    let mut r#async = Map::new();
    r#async.insert("concurrency".into(), Value::Null);
    r#async.insert("timeout".into(), Value::Null);

    let mut codec_pipeline = Map::new();
    codec_pipeline.insert("name".into(), Value::String("CodecChain".into()));
    codec_pipeline.insert("batch_size".into(), Value::from(1u64));

    let mut codecs = Map::new();
    for (name, class) in [
        ("blosc", "BloscCodec"),
        ("gzip", "GzipCodec"),
        ("zstd", "ZstdCodec"),
        ("bytes", "BytesCodec"),
        ("endian", "BytesCodec"),
        ("crc32c", "Crc32cCodec"),
        ("sharding_indexed", "ShardingCodec"),
        ("transpose", "TransposeCodec"),
    ] {
        let mut entry = Map::new();
        entry.insert("name".into(), Value::String(class.into()));
        codecs.insert(name.into(), Value::Object(entry));
    }

    let mut root = Map::new();
    root.insert("array".into(), Value::Object(array));
    root.insert("async".into(), Value::Object(r#async));
    root.insert("codec_pipeline".into(), Value::Object(codec_pipeline));
    root.insert("codecs".into(), Value::Object(codecs));
    Configuration::from_map(root)
}

/// Parse a `ZARR_PYTHON_<SECTION>__<KEY>` environment variable name into its two path segments,
/// lower-cased (matching `donfig`'s env var convention).
fn parse_env_key(var: &str) -> Option<(String, String)> {
    let rest = var.strip_prefix("ZARR_PYTHON_")?;
    let (section, key) = rest.split_once("__")?;
    Some((section.to_lowercase(), key.to_lowercase()))
}

/// Parse an environment variable's string value as a JSON literal first, falling back to a
/// plain string if it isn't one (e.g. `name` values like `BloscCodec` aren't valid JSON).
fn parse_env_value(value: &str) -> Value {
    serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

fn defaults_with_env() -> Configuration {
    let mut map = defaults().as_map().clone();
    for (var, value) in std::env::vars() {
        let Some((section, key)) = parse_env_key(&var) else {
            continue;
        };
        let entry = map
            .entry(section)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(section_map) = entry {
            section_map.insert(key, parse_env_value(&value));
        }
    }
    Configuration::from_map(map)
}

/// Replace the global configuration outright.
///
/// Not reentrant-safe: callers must not call this concurrently with any other `config` function
/// on another thread.
pub fn set(configuration: Configuration) {
    *cell().lock().unwrap_or_else(std::sync::PoisonError::into_inner) = configuration;
}

/// Reset the global configuration to the built-in defaults plus the current environment.
pub fn reset() {
    *cell().lock().unwrap_or_else(std::sync::PoisonError::into_inner) = defaults_with_env();
}

/// A scoped override of the global configuration, restored when dropped.
///
/// Returned by [`scoped`]; holds the configuration that was active immediately before the
/// override so nested scopes unwind correctly (dropping the inner guard restores the enclosing
/// override, not the defaults).
#[must_use = "the override is undone when this guard is dropped; bind it to a variable"]
pub struct ConfigOverride {
    previous: Option<Configuration>,
}

impl Drop for ConfigOverride {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            *cell().lock().unwrap_or_else(std::sync::PoisonError::into_inner) = previous;
        }
    }
}

/// Apply `configuration` as the global configuration until the returned [`ConfigOverride`] is
/// dropped, then restore whatever was active immediately before this call.
///
/// Equivalent to `donfig`'s `Config.set(...)` used as a context manager: nesting composes, so an
/// override applied inside another override's scope restores back to that enclosing override, not
/// to the built-in defaults.
pub fn scoped(configuration: Configuration) -> ConfigOverride {
    let mut guard = cell().lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    let previous = guard.clone();
    *guard = configuration;
    ConfigOverride {
        previous: Some(previous),
    }
}

/// Look up a `section.key` dotted path in the global configuration.
#[must_use]
pub fn get(path: &str) -> Option<Value> {
    let (section, key) = path.split_once('.')?;
    let guard = cell().lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    guard.as_map().get(section)?.as_object()?.get(key).cloned()
}

/// `array.order`: `"C"` (row-major, the only order this implementation writes) or `"F"`.
#[must_use]
pub fn array_order() -> String {
    get("array.order")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "C".to_string())
}

/// `async.concurrency`: the default concurrency limit applied when a caller does not supply a
/// [`zarrs_codec::CodecOptions`] of their own.
#[must_use]
pub fn async_concurrency() -> Option<usize> {
    get("async.concurrency")?.as_u64().map(|v| v as usize)
}

/// `codec_pipeline.batch_size`: how many chunks `CodecChain::encode_batched`/`decode_batched`
/// groups together. Defaults to `1`, matching `zarr-python`.
#[must_use]
pub fn codec_pipeline_batch_size() -> usize {
    get("codec_pipeline.batch_size")
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .unwrap_or(1)
        .max(1)
}

/// `codecs.<name>.name`: the configured class/implementation name for a codec id, used only for
/// validation in this implementation (it has exactly one pipeline and one implementation per
/// codec id, so there is nothing to dispatch on).
#[must_use]
pub fn codec_name(id: &str) -> Option<String> {
    get(&format!("codecs.{id}"))
        .and_then(|v| v.get("name").cloned())
        .and_then(|v| v.as_str().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_expose_the_documented_keys() {
        reset();
        assert_eq!(array_order(), "C");
        assert_eq!(codec_pipeline_batch_size(), 1);
        assert_eq!(codec_name("gzip").as_deref(), Some("GzipCodec"));
        assert_eq!(async_concurrency(), None);
    }

    #[test]
    fn set_replaces_the_whole_configuration() {
        let mut array = Map::new();
        array.insert("order".into(), Value::String("F".into()));
        let mut root = Map::new();
        root.insert("array".into(), Value::Object(array));
        set(Configuration::from_map(root));
        assert_eq!(array_order(), "F");
        assert_eq!(codec_pipeline_batch_size(), 1);
        reset();
        assert_eq!(array_order(), "C");
    }

    #[test]
    fn parses_env_var_keys_into_section_and_key() {
        assert_eq!(
            parse_env_key("ZARR_PYTHON_CODEC_PIPELINE__BATCH_SIZE"),
            Some(("codec_pipeline".to_string(), "batch_size".to_string()))
        );
        assert_eq!(parse_env_key("UNRELATED_VAR"), None);
    }

    #[test]
    fn parses_literal_and_string_env_values() {
        assert_eq!(parse_env_value("4"), Value::from(4u64));
        assert_eq!(parse_env_value("true"), Value::Bool(true));
        assert_eq!(parse_env_value("BloscCodec"), Value::String("BloscCodec".into()));
    }

    #[test]
    fn scoped_override_restores_the_immediately_enclosing_scope_on_drop() {
        reset();
        assert_eq!(array_order(), "C");

        let mut outer_array = Map::new();
        outer_array.insert("order".into(), Value::String("F".into()));
        let mut outer_root = Map::new();
        outer_root.insert("array".into(), Value::Object(outer_array));
        let outer = scoped(Configuration::from_map(outer_root));
        assert_eq!(array_order(), "F");

        {
            let mut inner_array = Map::new();
            inner_array.insert("order".into(), Value::String("C".into()));
            let mut inner_root = Map::new();
            inner_root.insert("array".into(), Value::Object(inner_array));
            let inner = scoped(Configuration::from_map(inner_root));
            assert_eq!(array_order(), "C");
            drop(inner);
        }

        // Dropping the inner scope must restore the outer override, not the defaults.
        assert_eq!(array_order(), "F");

        drop(outer);
        assert_eq!(array_order(), "C");
    }
}
