//! The storage API for the [`zarrs`](https://docs.rs/zarrs/latest/zarrs/index.html) crate.
//!
//! Zarr chunks (and sharded chunk groups) are persisted as byte sequences under opaque string
//! keys in a pluggable key-value store. This crate defines that interface and a synchronous
//! in-memory reference store used throughout the `zarrs` test suite.
//!
//! ## Licence
//! `zarrs_storage` is licensed under either of
//!  - the Apache License, Version 2.0 or <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license or <http://opensource.org/licenses/MIT>, at your option.

pub mod byte_range;
mod store;

pub use store::MemoryStore;

use std::fmt::Display;
use std::sync::Arc;

pub use bytes::Bytes;
use byte_range::{ByteRange, InvalidByteRangeError};
use thiserror::Error;

/// An opaque store key, e.g. `"array/zarr.json"` or `"array/c/0/1"`.
///
/// Keys never start with `/` and never contain a trailing `/`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoreKey(String);

impl StoreKey {
    /// Create a new store key.
    ///
    /// # Errors
    /// Returns [`StoreKeyError`] if `key` starts with `/`.
    pub fn new(key: impl Into<String>) -> Result<Self, StoreKeyError> {
        let key = key.into();
        if key.starts_with('/') {
            Err(StoreKeyError(key))
        } else {
            Ok(Self(key))
        }
    }

    /// Return the key as a `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An invalid [`StoreKey`].
#[derive(Debug, Error)]
#[error("invalid store key {_0}")]
pub struct StoreKeyError(String);

/// An opaque key prefix, e.g. `"array/c/"`. Always ends in `/` or is empty (root).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorePrefix(String);

impl StorePrefix {
    /// Create a new store prefix, appending a trailing `/` if required.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }
        Self(prefix)
    }

    /// The root prefix (the whole store).
    #[must_use]
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Return the prefix as a `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A value that may or may not exist in a store.
pub type MaybeBytes = Option<Bytes>;

/// A list of store keys, returned in sorted order.
pub type StoreKeys = Vec<StoreKey>;

/// Errors that can occur when interacting with a store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error from the underlying store.
    #[error("I/O error: {0}")]
    IOError(#[from] Arc<std::io::Error>),
    /// An invalid byte range was requested.
    #[error(transparent)]
    InvalidByteRange(#[from] InvalidByteRangeError),
    /// The store was opened in read-only mode.
    #[error("store is read-only")]
    ReadOnly,
    /// A store-specific error not covered by the other variants.
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::IOError(Arc::new(err))
    }
}

/// The access mode a store was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Read-only. `set`/`delete` return [`StorageError::ReadOnly`].
    Read,
    /// Write-only; an existing array at the same path is overwritten.
    Write,
    /// Read-write; an existing array is opened and may be appended to.
    ReadWrite,
}

/// Readable storage operations.
pub trait ReadableStorageTraits: Send + Sync {
    /// Retrieve the complete value of `key`, or `None` if it does not exist.
    ///
    /// # Errors
    /// Returns [`StorageError`] on an underlying store failure. A missing key is
    /// *not* an error: it is represented by `Ok(None)`.
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        self.get_partial(key, ByteRange::FromStart(0, None))
    }

    /// Retrieve one byte range of `key`, or `None` if the key does not exist.
    ///
    /// # Errors
    /// Returns [`StorageError`] on an underlying store failure or an out-of-range
    /// byte range.
    fn get_partial(
        &self,
        key: &StoreKey,
        byte_range: ByteRange,
    ) -> Result<MaybeBytes, StorageError> {
        let values = self.get_partial_many(key, &[byte_range])?;
        Ok(values.map(|mut v| v.remove(0)))
    }

    /// Retrieve several byte ranges of `key` at once, or `None` if the key does not exist.
    ///
    /// # Errors
    /// Returns [`StorageError`] on an underlying store failure or an out-of-range
    /// byte range.
    fn get_partial_many(
        &self,
        key: &StoreKey,
        byte_ranges: &[ByteRange],
    ) -> Result<Option<Vec<Bytes>>, StorageError>;

    /// Return the size in bytes of `key`, or `None` if it does not exist.
    ///
    /// # Errors
    /// Returns [`StorageError`] on an underlying store failure.
    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError>;

    /// Whether this store can serve [`get_partial`](ReadableStorageTraits::get_partial)
    /// without reading the complete value.
    fn supports_partial_reads(&self) -> bool {
        false
    }
}

/// Writable storage operations.
pub trait WritableStorageTraits: Send + Sync {
    /// Overwrite the complete value of `key`.
    ///
    /// # Errors
    /// Returns [`StorageError`] on an underlying store failure, including
    /// [`StorageError::ReadOnly`] if the store was opened for reading only.
    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError>;

    /// Idempotently delete `key`. It is not an error if `key` does not exist.
    ///
    /// # Errors
    /// Returns [`StorageError`] on an underlying store failure.
    fn delete(&self, key: &StoreKey) -> Result<(), StorageError>;

    /// Whether this store can update part of a value in place without a full rewrite.
    fn supports_partial_writes(&self) -> bool {
        false
    }
}

/// Listable storage operations.
pub trait ListableStorageTraits: Send + Sync {
    /// List all keys with the given `prefix`, in sorted order.
    ///
    /// # Errors
    /// Returns [`StorageError`] on an underlying store failure.
    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError>;

    /// List every key in the store, in sorted order.
    ///
    /// # Errors
    /// Returns [`StorageError`] on an underlying store failure.
    fn list(&self) -> Result<StoreKeys, StorageError> {
        self.list_prefix(&StorePrefix::root())
    }
}

/// A store supporting read, write, and list operations.
pub trait ReadableWritableListableStorageTraits:
    ReadableStorageTraits + WritableStorageTraits + ListableStorageTraits
{
}

impl<T: ReadableStorageTraits + WritableStorageTraits + ListableStorageTraits>
    ReadableWritableListableStorageTraits for T
{
}

/// A shared, dynamically dispatched store handle.
pub type ReadableWritableListableStorage = Arc<dyn ReadableWritableListableStorageTraits>;
