//! A synchronous in-memory store.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::byte_range::ByteRange;
use crate::{
    Bytes, ListableStorageTraits, MaybeBytes, ReadableStorageTraits, StorageError, StoreKey,
    StoreKeys, StorePrefix, WritableStorageTraits,
};

/// A synchronous in-memory store, backed by a `BTreeMap<StoreKey, Bytes>` behind a mutex.
///
/// Useful as a reference store for tests and for small arrays that fit comfortably in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<BTreeMap<StoreKey, Bytes>>,
}

impl MemoryStore {
    /// Create a new, empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReadableStorageTraits for MemoryStore {
    fn get_partial_many(
        &self,
        key: &StoreKey,
        byte_ranges: &[ByteRange],
    ) -> Result<Option<Vec<Bytes>>, StorageError> {
        let data = self.data.lock().unwrap();
        let Some(value) = data.get(key) else {
            return Ok(None);
        };
        let length = value.len() as u64;
        let mut out = Vec::with_capacity(byte_ranges.len());
        for byte_range in byte_ranges {
            let range = byte_range.to_range_usize(length);
            if range.end > value.len() {
                return Err(StorageError::from(crate::byte_range::InvalidByteRangeError::new(
                    *byte_range,
                    length,
                )));
            }
            out.push(value.slice(range));
        }
        Ok(Some(out))
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        let data = self.data.lock().unwrap();
        Ok(data.get(key).map(|v| v.len() as u64))
    }
}

impl WritableStorageTraits for MemoryStore {
    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError> {
        let mut data = self.data.lock().unwrap();
        data.insert(key.clone(), value);
        Ok(())
    }

    fn delete(&self, key: &StoreKey) -> Result<(), StorageError> {
        let mut data = self.data.lock().unwrap();
        data.remove(key);
        Ok(())
    }

    fn supports_partial_writes(&self) -> bool {
        false
    }
}

impl ListableStorageTraits for MemoryStore {
    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        let data = self.data.lock().unwrap();
        Ok(data
            .keys()
            .filter(|k| k.as_str().starts_with(prefix.as_str()))
            .cloned()
            .collect())
    }
}

impl ReadableStorageTraits for &MemoryStore {
    fn get_partial_many(
        &self,
        key: &StoreKey,
        byte_ranges: &[ByteRange],
    ) -> Result<Option<Vec<Bytes>>, StorageError> {
        (**self).get_partial_many(key, byte_ranges)
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        (**self).size_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_missing_key_is_none() {
        let store = MemoryStore::new();
        let key = StoreKey::new("a/zarr.json").unwrap();
        assert!(store.get(&key).unwrap().is_none());
    }

    #[test]
    fn set_then_get_roundtrips() {
        let store = MemoryStore::new();
        let key = StoreKey::new("a/c/0/0").unwrap();
        store.set(&key, Bytes::from_static(b"hello")).unwrap();
        assert_eq!(store.get(&key).unwrap().unwrap(), Bytes::from_static(b"hello"));
    }

    #[test]
    fn delete_is_idempotent() {
        let store = MemoryStore::new();
        let key = StoreKey::new("a/c/0/0").unwrap();
        store.delete(&key).unwrap();
        store.set(&key, Bytes::from_static(b"x")).unwrap();
        store.delete(&key).unwrap();
        store.delete(&key).unwrap();
        assert!(store.get(&key).unwrap().is_none());
    }

    #[test]
    fn partial_read_extracts_range() {
        let store = MemoryStore::new();
        let key = StoreKey::new("a/c/0/0").unwrap();
        store.set(&key, Bytes::from_static(b"0123456789")).unwrap();
        let partial = store
            .get_partial(&key, ByteRange::FromStart(2, Some(3)))
            .unwrap()
            .unwrap();
        assert_eq!(&partial[..], b"234");
        let suffix = store
            .get_partial(&key, ByteRange::Suffix(4))
            .unwrap()
            .unwrap();
        assert_eq!(&suffix[..], b"6789");
    }

    #[test]
    fn list_prefix_filters_keys() {
        let store = MemoryStore::new();
        store
            .set(&StoreKey::new("a/zarr.json").unwrap(), Bytes::from_static(b"{}"))
            .unwrap();
        store
            .set(&StoreKey::new("a/c/0/0").unwrap(), Bytes::from_static(b"x"))
            .unwrap();
        store
            .set(&StoreKey::new("b/zarr.json").unwrap(), Bytes::from_static(b"{}"))
            .unwrap();
        let keys = store.list_prefix(&StorePrefix::new("a/")).unwrap();
        assert_eq!(keys.len(), 2);
    }
}
