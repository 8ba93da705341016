//! Partial decoding of an encoded value held either in memory or in a store.
//!
//! The sharding codec needs to read just the tail (the index) and then just the byte ranges of
//! the inner sub-chunks it actually needs, without first materializing the whole shard. This
//! trait is the seam that lets [`crate::ShardingCodec`] do that when the backing store supports
//! partial reads, while still working (by falling back to a full read) against one already held
//! in memory.

use zarrs_storage::byte_range::ByteRange;
use zarrs_storage::{ReadableStorageTraits, StoreKey};

use crate::CodecError;

/// A source of bytes that can be partially decoded by byte range, or fully read.
///
/// Returns `None` throughout if the underlying value does not exist at all (e.g. the store key
/// has never been written), matching [`ReadableStorageTraits::get`]'s representation of an
/// absent key.
pub trait BytesPartialDecoderTraits: Send + Sync {
    /// Read the given `byte_ranges` from the encoded value.
    ///
    /// # Errors
    /// Returns [`CodecError`] if a byte range is invalid or the underlying store fails.
    fn partial_decode(&self, byte_ranges: &[ByteRange]) -> Result<Option<Vec<Vec<u8>>>, CodecError>;

    /// Read the complete encoded value.
    ///
    /// # Errors
    /// Returns [`CodecError`] if the underlying store fails.
    fn decode(&self) -> Result<Option<Vec<u8>>, CodecError> {
        Ok(self
            .partial_decode(&[ByteRange::FromStart(0, None)])?
            .map(|mut v| v.remove(0)))
    }
}

/// A [`BytesPartialDecoderTraits`] backed by a value already fully held in memory.
pub struct BytesPartialDecoder<'a> {
    bytes: &'a [u8],
}

impl<'a> BytesPartialDecoder<'a> {
    /// Wrap an in-memory encoded value.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }
}

impl BytesPartialDecoderTraits for BytesPartialDecoder<'_> {
    fn partial_decode(&self, byte_ranges: &[ByteRange]) -> Result<Option<Vec<Vec<u8>>>, CodecError> {
        Ok(Some(zarrs_storage::byte_range::extract_byte_ranges(
            self.bytes,
            byte_ranges,
        )?))
    }
}

/// A [`BytesPartialDecoderTraits`] backed directly by a store key, using the store's own partial
/// read support where available.
pub struct StoragePartialDecoder<'a> {
    storage: &'a dyn ReadableStorageTraits,
    key: StoreKey,
}

impl<'a> StoragePartialDecoder<'a> {
    /// Create a decoder reading `key` from `storage`.
    #[must_use]
    pub fn new(storage: &'a dyn ReadableStorageTraits, key: StoreKey) -> Self {
        Self { storage, key }
    }
}

impl BytesPartialDecoderTraits for StoragePartialDecoder<'_> {
    fn partial_decode(&self, byte_ranges: &[ByteRange]) -> Result<Option<Vec<Vec<u8>>>, CodecError> {
        let Some(size) = self.storage.size_key(&self.key)? else {
            return Ok(None);
        };
        let mut out = Vec::with_capacity(byte_ranges.len());
        for byte_range in byte_ranges {
            let value = self
                .storage
                .get_partial(&self.key, *byte_range)?
                .ok_or_else(|| {
                    CodecError::Other(format!("key {} vanished during partial read", self.key))
                })?;
            let _ = size;
            out.push(value.to_vec());
        }
        Ok(Some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_partial_decode_extracts_ranges() {
        let data = [0u8, 1, 2, 3, 4, 5];
        let decoder = BytesPartialDecoder::new(&data);
        let out = decoder
            .partial_decode(&[ByteRange::FromStart(2, Some(2))])
            .unwrap()
            .unwrap();
        assert_eq!(out, vec![vec![2, 3]]);
    }

    #[test]
    fn in_memory_decode_reads_everything() {
        let data = [9u8, 8, 7];
        let decoder = BytesPartialDecoder::new(&data);
        assert_eq!(decoder.decode().unwrap(), Some(vec![9, 8, 7]));
    }
}
