//! Byte ranges for partial store reads.

use std::ops::Range;

/// A byte offset.
pub type ByteOffset = u64;

/// A byte length.
pub type ByteLength = u64;

/// A byte range used to request part of a value from a store.
///
/// Ranges are always expressed relative to the *start* of a value, even when they
/// were specified as a suffix. [`ByteRange::start`] and [`ByteRange::end`] resolve a
/// range against the total length of the value being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// A range from an offset, with an optional fixed length. `None` means "to the end".
    FromStart(ByteOffset, Option<ByteLength>),
    /// A range of the last `ByteLength` bytes.
    Suffix(ByteLength),
}

impl ByteRange {
    /// Return the start offset of the range, given the total `length` of the value.
    #[must_use]
    pub fn start(&self, length: ByteLength) -> ByteOffset {
        match self {
            Self::FromStart(offset, _) => *offset,
            Self::Suffix(suffix_length) => length.saturating_sub(*suffix_length),
        }
    }

    /// Return the (exclusive) end offset of the range, given the total `length` of the value.
    #[must_use]
    pub fn end(&self, length: ByteLength) -> ByteOffset {
        match self {
            Self::FromStart(offset, Some(len)) => (offset + len).min(length),
            Self::FromStart(_, None) => length,
            Self::Suffix(_) => length,
        }
    }

    /// Return the length of the range in bytes, given the total `length` of the value.
    #[must_use]
    pub fn length(&self, length: ByteLength) -> ByteLength {
        self.end(length) - self.start(length)
    }

    /// Convert to a `Range<usize>` against a concrete buffer length.
    ///
    /// # Panics
    /// Panics if `length` does not fit in a `usize`.
    #[must_use]
    pub fn to_range_usize(&self, length: ByteLength) -> Range<usize> {
        usize::try_from(self.start(length)).unwrap()..usize::try_from(self.end(length)).unwrap()
    }
}

/// An error indicating a [`ByteRange`] exceeds the length of the value it was read against.
#[derive(Debug, Clone, thiserror::Error)]
#[error("byte range {byte_range:?} is invalid for a value with length {length}")]
pub struct InvalidByteRangeError {
    byte_range: ByteRange,
    length: ByteLength,
}

impl InvalidByteRangeError {
    /// Create a new error.
    #[must_use]
    pub fn new(byte_range: ByteRange, length: ByteLength) -> Self {
        Self { byte_range, length }
    }
}

/// Extract a sequence of byte ranges from a byte slice.
///
/// # Errors
/// Returns [`InvalidByteRangeError`] if any range exceeds `bytes.len()`.
pub fn extract_byte_ranges(
    bytes: &[u8],
    byte_ranges: &[ByteRange],
) -> Result<Vec<Vec<u8>>, InvalidByteRangeError> {
    let length = bytes.len() as ByteLength;
    byte_ranges
        .iter()
        .map(|byte_range| {
            let range = byte_range.to_range_usize(length);
            if range.end > bytes.len() {
                Err(InvalidByteRangeError::new(*byte_range, length))
            } else {
                Ok(bytes[range].to_vec())
            }
        })
        .collect()
}
