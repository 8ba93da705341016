//! Chunk key encoding for the [`zarrs`](https://docs.rs/zarrs/latest/zarrs/index.html) crate.
//!
//! Maps a chunk's grid coordinates to the store key its encoded bytes are persisted under.
//!
//! ## Licence
//! `zarrs_chunk_key_encoding` is licensed under either of
//!  - the Apache License, Version 2.0 or <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license or <http://opensource.org/licenses/MIT>, at your option.

use itertools::Itertools;
use zarrs_storage::{StoreKey, StoreKeyError};

/// The separator character between chunk grid coordinates in a chunk key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    /// `/`, the default for Zarr V3.
    Slash,
    /// `.`, the default for Zarr V2.
    Dot,
}

impl Separator {
    /// The separator's character representation.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Slash => '/',
            Self::Dot => '.',
        }
    }
}

/// The grid coordinates of a chunk, one entry per array dimension.
pub type ChunkCoords = Vec<u64>;

/// Maps [`ChunkCoords`] to a [`StoreKey`], relative to an array's path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkKeyEncoding {
    /// Zarr V3 default: `"c" + sep + sep.join(coords)`, e.g. `"c/1/2"`.
    Default(Separator),
    /// Zarr V2-compatible: `sep.join(coords)`, e.g. `"1.2"`.
    V2(Separator),
}

impl ChunkKeyEncoding {
    /// Encode `chunk_coords` to a key relative to `path` (no leading or trailing `/`).
    ///
    /// # Errors
    /// Returns [`StoreKeyError`] only if `path` itself is malformed (begins with `/`);
    /// the coordinate encoding itself cannot fail.
    pub fn encode(&self, path: &str, chunk_coords: &[u64]) -> Result<StoreKey, StoreKeyError> {
        let relative = match self {
            Self::Default(sep) => {
                let sep = sep.as_char();
                if chunk_coords.is_empty() {
                    format!("c{sep}0")
                } else {
                    format!("c{sep}{}", chunk_coords.iter().join(&sep.to_string()))
                }
            }
            Self::V2(sep) => {
                let sep = sep.as_char();
                if chunk_coords.is_empty() {
                    "0".to_string()
                } else {
                    chunk_coords.iter().join(&sep.to_string())
                }
            }
        };
        if path.is_empty() {
            StoreKey::new(relative)
        } else {
            StoreKey::new(format!("{path}/{relative}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_encoding_uses_c_prefix() {
        let enc = ChunkKeyEncoding::Default(Separator::Slash);
        assert_eq!(
            enc.encode("array", &[1, 2]).unwrap().as_str(),
            "array/c/1/2"
        );
    }

    #[test]
    fn v2_encoding_has_no_prefix() {
        let enc = ChunkKeyEncoding::V2(Separator::Dot);
        assert_eq!(enc.encode("array", &[1, 2]).unwrap().as_str(), "array/1.2");
    }

    #[test]
    fn zero_dimensional_array_has_a_single_chunk() {
        let enc = ChunkKeyEncoding::Default(Separator::Slash);
        assert_eq!(enc.encode("array", &[]).unwrap().as_str(), "array/c/0");
    }
}
