//! The plugin error type shared by every extension point (codec, chunk grid, chunk key
//! encoding, ...) in the [`zarrs`](https://docs.rs/zarrs/latest/zarrs/index.html) workspace.
//!
//! Most extension points resolve a metadata document's `name` to a concrete implementation via
//! their own closed `from_metadata`/`from_configuration` match, returning [`PluginCreateError`] on
//! failure, since their codec/chunk-grid/chunk-key-encoding set is fixed at compile time. The one
//! extension point that is genuinely pluggable at runtime is the codec pipeline itself
//! (`zarrs_codec::resolve_codec_pipeline`), which resolves a registered name to an implementation
//! the same way, so [`PluginCreateError::Unknown`] and [`PluginCreateError::Ambiguous`] are shared
//! across both kinds of lookup.
//!
//! ## Licence
//! `zarrs_plugin` is licensed under either of
//!  - the Apache License, Version 2.0 or <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license or <http://opensource.org/licenses/MIT>, at your option.

use thiserror::Error;

/// An extension (codec, chunk grid, ...) could not be created.
#[derive(Debug, Error)]
pub enum PluginCreateError {
    /// No registered plugin claims `name`.
    #[error("unknown extension {name:?}")]
    Unknown {
        /// The unresolved name.
        name: String,
    },
    /// More than one registered plugin claims `name`.
    #[error("ambiguous extension {name:?}: matched by {count} registered plugins")]
    Ambiguous {
        /// The ambiguous name.
        name: String,
        /// The number of plugins that matched.
        count: usize,
    },
    /// A plugin matched `name` but its configuration was invalid.
    #[error("invalid configuration for {name:?}: {reason}")]
    InvalidConfiguration {
        /// The plugin name.
        name: String,
        /// A human-readable explanation.
        reason: String,
    },
    /// Any other plugin-specific failure.
    #[error("{0}")]
    Other(String),
}
