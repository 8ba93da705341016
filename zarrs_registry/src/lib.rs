//! Identifiers of built-in Zarr V3 extensions, shared between the codec registry, the
//! metadata layer, and configuration defaults.
//!
//! Centralising these strings avoids typos between the place a codec registers itself and the
//! place its default configuration is declared.
//!
//! ## Licence
//! `zarrs_registry` is licensed under either of
//!  - the Apache License, Version 2.0 or <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license or <http://opensource.org/licenses/MIT>, at your option.

/// Chunk grid extension identifiers.
pub mod chunk_grid {
    /// The only chunk grid `zarrs` implements: a regular grid of fixed-size chunks.
    pub const REGULAR: &str = "regular";
}

/// Chunk key encoding extension identifiers.
pub mod chunk_key_encoding {
    /// The Zarr V3 default encoding: `"c" + sep + sep.join(coords)`.
    pub const DEFAULT: &str = "default";
    /// The Zarr V2-compatible encoding: `sep.join(coords)`.
    pub const V2: &str = "v2";
}

/// Codec extension identifiers.
pub mod codec {
    /// Array-to-array: permute dimensions.
    pub const TRANSPOSE: &str = "transpose";
    /// Array-to-bytes: fixed-width little/big-endian encoding.
    pub const BYTES: &str = "bytes";
    /// Deprecated alias of [`BYTES`], kept for reading older metadata.
    pub const ENDIAN: &str = "endian";
    /// Array-to-bytes: pack many inner chunks into one shard with an offset/length index.
    pub const SHARDING_INDEXED: &str = "sharding_indexed";
    /// Bytes-to-bytes: gzip.
    pub const GZIP: &str = "gzip";
    /// Bytes-to-bytes: zstd.
    pub const ZSTD: &str = "zstd";
    /// Bytes-to-bytes: blosc.
    pub const BLOSC: &str = "blosc";
    /// Bytes-to-bytes: CRC32C checksum, appended as a 4-byte trailer.
    pub const CRC32C: &str = "crc32c";
}
