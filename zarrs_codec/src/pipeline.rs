//! Pluggable dispatch for running a [`CodecChain`] against a chunk.
//!
//! By default a chunk's encode/decode calls run straight through [`CodecChain::encode`]/
//! [`CodecChain::decode`] via [`DirectCodecPipeline`]. An alternative implementation can be
//! registered under a name and selected at runtime (e.g. through `codec_pipeline.name`
//! configuration), mirroring `zarr-python`'s `codec_pipeline_class` resolution: a caller names the
//! pipeline it wants, and the registry resolves that name to a concrete implementation, raising on
//! zero or more than one match rather than silently picking one.

use std::sync::{Arc, OnceLock, RwLock};

use zarrs_plugin::PluginCreateError;

use crate::{ChunkRepresentation, CodecChain, CodecError, CodecOptions};

/// A strategy for running a [`CodecChain`] against a chunk's encoded/decoded bytes.
///
/// The default methods just delegate to the chain directly; an implementation can override either
/// to observe, redirect, or otherwise wrap those calls.
pub trait CodecPipeline: Send + Sync {
    /// Decode `encoded` (or produce the fill value if `None`) through `chain`.
    ///
    /// # Errors
    /// Returns [`CodecError`] if the chain's decode fails.
    fn decode(
        &self,
        chain: &CodecChain,
        encoded: Option<Vec<u8>>,
        representation: &ChunkRepresentation,
        options: &CodecOptions,
    ) -> Result<Vec<u8>, CodecError> {
        chain.decode(encoded, representation, options)
    }

    /// Encode `decoded` through `chain`, or `Ok(None)` if the chain reports the chunk is entirely
    /// the fill value and need not be stored.
    ///
    /// # Errors
    /// Returns [`CodecError`] if the chain's encode fails.
    fn encode(
        &self,
        chain: &CodecChain,
        decoded: Vec<u8>,
        representation: &ChunkRepresentation,
        options: &CodecOptions,
    ) -> Result<Option<Vec<u8>>, CodecError> {
        chain.encode(decoded, representation, options)
    }
}

/// The built-in pipeline: runs a [`CodecChain`] directly, with no batching, caching, or
/// indirection. Registered under the name `"CodecChain"`, matching this implementation's class
/// name the way `zarr-python` registers `BatchedCodecPipeline`.
#[derive(Debug, Default)]
pub struct DirectCodecPipeline;

impl CodecPipeline for DirectCodecPipeline {}

type Factory = fn() -> Arc<dyn CodecPipeline>;

fn registry() -> &'static RwLock<Vec<(&'static str, Factory)>> {
    static REGISTRY: OnceLock<RwLock<Vec<(&'static str, Factory)>>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        RwLock::new(vec![(
            "CodecChain",
            (|| Arc::new(DirectCodecPipeline) as Arc<dyn CodecPipeline>) as Factory,
        )])
    })
}

/// Register a codec pipeline implementation under `name`, making it selectable via
/// [`resolve_codec_pipeline`].
///
/// Intended for tests and embedding applications that supply their own pipeline; the built-in
/// `"CodecChain"` entry is always present.
pub fn register_codec_pipeline(name: &'static str, factory: Factory) {
    registry()
        .write()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .push((name, factory));
}

/// Remove every pipeline registered under `name` (for test teardown). The built-in
/// `"CodecChain"` entry cannot be removed this way.
pub fn unregister_codec_pipeline(name: &str) {
    if name == "CodecChain" {
        return;
    }
    registry()
        .write()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .retain(|(registered, _)| *registered != name);
}

/// Resolve `name` to a registered pipeline, matching it exactly or in camel-case form (e.g.
/// `mock_pipeline` also matches a plugin registered as `MockPipeline`), following `zarr-python`'s
/// `codec_pipeline_class` resolution.
///
/// # Errors
/// Returns [`PluginCreateError::Unknown`] if no registered pipeline matches `name`, or
/// [`PluginCreateError::Ambiguous`] if more than one does.
pub fn resolve_codec_pipeline(name: &str) -> Result<Arc<dyn CodecPipeline>, PluginCreateError> {
    let camel = camel_case(name);
    let guard = registry().read().unwrap_or_else(std::sync::PoisonError::into_inner);
    let matches: Vec<&(&'static str, Factory)> = guard
        .iter()
        .filter(|(registered, _)| *registered == name || *registered == camel)
        .collect();
    match matches.as_slice() {
        [] => Err(PluginCreateError::Unknown { name: name.to_string() }),
        [(_, factory)] => Ok(factory()),
        _ => Err(PluginCreateError::Ambiguous {
            name: name.to_string(),
            count: matches.len(),
        }),
    }
}

/// `snake_case` -> `CamelCase`, matching `name.replace("_", " ").title().replace(" ", "")`.
fn camel_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingPipeline {
        encodes: std::sync::atomic::AtomicUsize,
    }

    impl CodecPipeline for CountingPipeline {
        fn encode(
            &self,
            chain: &CodecChain,
            decoded: Vec<u8>,
            representation: &ChunkRepresentation,
            options: &CodecOptions,
        ) -> Result<Option<Vec<u8>>, CodecError> {
            self.encodes.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            chain.encode(decoded, representation, options)
        }
    }

    fn make_counting_pipeline() -> Arc<dyn CodecPipeline> {
        Arc::new(CountingPipeline {
            encodes: std::sync::atomic::AtomicUsize::new(0),
        })
    }

    #[test]
    fn default_pipeline_resolves_by_exact_name() {
        let pipeline = resolve_codec_pipeline("CodecChain").unwrap();
        let chain = CodecChain::new(Vec::new(), crate::ArrayToBytesCodec::Bytes(crate::BytesCodec::new(None)), Vec::new());
        let representation = ChunkRepresentation::new(
            vec![2],
            zarrs_data_type::DataType::UInt8,
            zarrs_data_type::FillValue::zero(zarrs_data_type::DataType::UInt8),
        );
        let encoded = pipeline.encode(&chain, vec![1, 2], &representation, &CodecOptions::new()).unwrap();
        assert!(encoded.is_some());
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert!(matches!(
            resolve_codec_pipeline("totally_unregistered_pipeline"),
            Err(PluginCreateError::Unknown { .. })
        ));
    }

    #[test]
    fn camel_case_fallback_matches_registered_name() {
        register_codec_pipeline("mock_pipeline", make_counting_pipeline);
        // Not actually ambiguous: only "mock_pipeline" is registered, so both the exact name and
        // its camelCase form resolve to the same single entry.
        assert!(resolve_codec_pipeline("mock_pipeline").is_ok());
        assert!(resolve_codec_pipeline("MockPipeline").is_ok());
        unregister_codec_pipeline("mock_pipeline");
        assert!(resolve_codec_pipeline("mock_pipeline").is_err());
    }

    #[test]
    fn two_registrations_under_the_same_name_are_ambiguous() {
        register_codec_pipeline("duplicate_pipeline", make_counting_pipeline);
        register_codec_pipeline("duplicate_pipeline", make_counting_pipeline);
        assert!(matches!(
            resolve_codec_pipeline("duplicate_pipeline"),
            Err(PluginCreateError::Ambiguous { count: 2, .. })
        ));
        unregister_codec_pipeline("duplicate_pipeline");
    }
}
