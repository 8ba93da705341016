//! Whole-array integration scenarios, mirroring the literal walkthroughs used to validate this
//! engine's sharding and partial-write behavior.

use std::sync::{Arc, Mutex};

use zarrs::{ArrayBuilder, ArraySubset, ChunkKeyEncoding};
use zarrs_chunk_key_encoding::Separator;
use zarrs_data_type::{DataType, FillValue};
use zarrs_storage::byte_range::ByteRange;
use zarrs_storage::{
    Bytes, ListableStorageTraits, MemoryStore, ReadableStorageTraits, StorageError, StoreKey,
    StoreKeys, StorePrefix, WritableStorageTraits,
};

/// Wraps a [`MemoryStore`], reporting [`ReadableStorageTraits::supports_partial_reads`] and
/// counting calls to `get_partial_many` so a test can assert exactly how many byte-range reads a
/// partial decode issued.
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    partial_reads: Mutex<u32>,
}

impl CountingStore {
    fn partial_read_count(&self) -> u32 {
        *self.partial_reads.lock().unwrap()
    }
}

impl ReadableStorageTraits for CountingStore {
    fn get_partial_many(
        &self,
        key: &StoreKey,
        byte_ranges: &[ByteRange],
    ) -> Result<Option<Vec<Bytes>>, StorageError> {
        *self.partial_reads.lock().unwrap() += 1;
        self.inner.get_partial_many(key, byte_ranges)
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        self.inner.size_key(key)
    }

    fn supports_partial_reads(&self) -> bool {
        true
    }
}

impl WritableStorageTraits for CountingStore {
    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError> {
        self.inner.set(key, value)
    }

    fn delete(&self, key: &StoreKey) -> Result<(), StorageError> {
        self.inner.delete(key)
    }
}

impl ListableStorageTraits for CountingStore {
    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        self.inner.list_prefix(prefix)
    }

    fn list(&self) -> Result<StoreKeys, StorageError> {
        self.inner.list()
    }
}

fn f64_bytes(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

fn point(coords: &[u64], value: f64) -> (ArraySubset, Vec<u8>) {
    let subset = ArraySubset::new(coords.to_vec(), vec![1; coords.len()]).unwrap();
    (subset, value.to_ne_bytes().to_vec())
}

/// shape=(20,3), inner chunk shape=(3,2), shard (outer chunk) shape=(6,4), fill=0.0 f64, no
/// compression. After a region write and three scattered point writes, the shard objects land
/// at the expected keys, one shard's embedded index decodes to the expected offset/length table,
/// and every written value reads back correctly after the store round-trips through re-open.
#[test]
fn sharded_float_array_write_and_reopen() {
    let storage = Arc::new(MemoryStore::new());
    let array = ArrayBuilder::new(
        vec![20, 3],
        vec![6, 4],
        DataType::Float64,
        FillValue::from_f64(0.0, DataType::Float64),
    )
    .chunk_key_encoding(ChunkKeyEncoding::V2(Separator::Dot))
    .with_sharding(vec![3, 2])
    .build(storage.clone(), "")
    .unwrap();

    // z[:10, :] = 42
    let region = ArraySubset::new(vec![0, 0], vec![10, 3]).unwrap();
    let data = f64_bytes(&vec![42.0; 30]);
    array.store_array_subset(&region, &data).unwrap();

    // z[15,1] = 389 ; z[19,2] = 1 ; z[0,1] = -4.2 (applied in this order, last writer wins)
    for (coords, value) in [([15, 1], 389.0), ([19, 2], 1.0), ([0, 1], -4.2)] {
        let (subset, bytes) = point(&coords, value);
        array.store_array_subset(&subset, &bytes).unwrap();
    }

    let mut keys: Vec<String> = storage
        .list_prefix(&StorePrefix::root())
        .unwrap()
        .iter()
        .map(|k| k.as_str().to_string())
        .collect();
    keys.sort();
    assert_eq!(keys, vec!["0.0", "1.0", "2.0", "3.0", "zarr.json"]);

    // Shard "0.0" covers outer rows 0-5, cols 0-2 (clipped from 4): a 2x2 inner grid, every
    // sub-chunk fully within the first write's rows 0-9, so none is fill-only.
    let shard0 = storage
        .get(&zarrs_storage::StoreKey::new("0.0").unwrap())
        .unwrap()
        .unwrap();
    let entry = |i: usize| {
        let off = u64::from_le_bytes(shard0[i * 16..i * 16 + 8].try_into().unwrap());
        let len = u64::from_le_bytes(shard0[i * 16 + 8..i * 16 + 16].try_into().unwrap());
        (off, len)
    };
    let index_table: Vec<(u64, u64)> = (0..4).map(entry).collect();
    assert_eq!(
        index_table,
        vec![(0, 48), (48, 48), (96, 48), (144, 48)]
    );

    let read_scalar = |coords: &[u64]| -> f64 {
        let subset = ArraySubset::new(coords.to_vec(), vec![1; coords.len()]).unwrap();
        let bytes = array.retrieve_array_subset(&subset).unwrap();
        f64::from_ne_bytes(bytes.try_into().unwrap())
    };
    assert_eq!(read_scalar(&[15, 1]), 389.0);
    assert_eq!(read_scalar(&[19, 2]), 1.0);
    assert_eq!(read_scalar(&[0, 1]), -4.2);
    assert_eq!(read_scalar(&[0, 0]), 42.0);

    // Re-opening must observe the same values.
    let reopened = zarrs::Array::open(storage, "").unwrap();
    let read_reopened = |coords: &[u64]| -> f64 {
        let subset = ArraySubset::new(coords.to_vec(), vec![1; coords.len()]).unwrap();
        let bytes = reopened.retrieve_array_subset(&subset).unwrap();
        f64::from_ne_bytes(bytes.try_into().unwrap())
    };
    assert_eq!(read_reopened(&[15, 1]), 389.0);
    assert_eq!(read_reopened(&[19, 2]), 1.0);
    assert_eq!(read_reopened(&[0, 1]), -4.2);
}

/// shape=(9,9), chunks=(5,5), uint16, fill=0. Writing a 3x3 block at [1:4, 3:6] must leave the
/// rest of the array at the fill value and the block itself at 1.
#[test]
fn partial_block_write_leaves_the_rest_at_fill_value() {
    let storage = Arc::new(MemoryStore::new());
    let array = zarrs::Array::create(
        storage,
        "arr",
        vec![9, 9],
        vec![5, 5],
        DataType::UInt16,
        FillValue::zero(DataType::UInt16),
    )
    .unwrap();

    let block = ArraySubset::new(vec![1, 3], vec![3, 3]).unwrap();
    let ones: Vec<u8> = std::iter::repeat(1u16.to_ne_bytes())
        .take(9)
        .flatten()
        .collect();
    array.store_array_subset(&block, &ones).unwrap();

    let whole = array
        .retrieve_array_subset(&ArraySubset::full(vec![9, 9]))
        .unwrap();
    let values: Vec<u16> = whole
        .chunks_exact(2)
        .map(|c| u16::from_ne_bytes(c.try_into().unwrap()))
        .collect();

    for row in 0..9u64 {
        for col in 0..9u64 {
            let v = values[(row * 9 + col) as usize];
            let expected = if (1..4).contains(&row) && (3..6).contains(&col) {
                1
            } else {
                0
            };
            assert_eq!(v, expected, "mismatch at ({row}, {col})");
        }
    }
}

/// A NaN fill value serializes to the JSON string `"NaN"` and round-trips through a full
/// create/close/reopen cycle as a value that satisfies `is_nan`.
#[test]
fn nan_fill_value_survives_reopen_as_a_json_string() {
    let storage = Arc::new(MemoryStore::new());
    let array = zarrs::Array::create(
        storage.clone(),
        "arr",
        vec![4],
        vec![2],
        DataType::Float32,
        FillValue::from_f64(f64::NAN, DataType::Float32),
    )
    .unwrap();
    drop(array);

    let doc = storage
        .get(&zarrs_storage::StoreKey::new("arr/zarr.json").unwrap())
        .unwrap()
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&doc).unwrap();
    assert_eq!(parsed["fill_value"], serde_json::json!("NaN"));

    let reopened = zarrs::Array::open(storage, "arr").unwrap();
    assert!(reopened.fill_value().is_nan(DataType::Float32));
}

/// Non-overlapping writes commute: applying two disjoint region writes in either order produces
/// the same final array contents.
#[test]
fn non_overlapping_writes_commute() {
    let run = |first_then_second: bool| -> Vec<u8> {
        let storage = Arc::new(MemoryStore::new());
        let array = zarrs::Array::create(
            storage,
            "arr",
            vec![4, 4],
            vec![2, 2],
            DataType::Int32,
            FillValue::zero(DataType::Int32),
        )
        .unwrap();

        let left = ArraySubset::new(vec![0, 0], vec![4, 2]).unwrap();
        let right = ArraySubset::new(vec![0, 2], vec![4, 2]).unwrap();
        let left_data: Vec<u8> = (0..8i32).flat_map(i32::to_ne_bytes).collect();
        let right_data: Vec<u8> = (100..108i32).flat_map(i32::to_ne_bytes).collect();

        if first_then_second {
            array.store_array_subset(&left, &left_data).unwrap();
            array.store_array_subset(&right, &right_data).unwrap();
        } else {
            array.store_array_subset(&right, &right_data).unwrap();
            array.store_array_subset(&left, &left_data).unwrap();
        }
        array
            .retrieve_array_subset(&ArraySubset::full(vec![4, 4]))
            .unwrap()
    };

    assert_eq!(run(true), run(false));
}

/// shape=(6,4), shard (outer chunk) shape=(6,4) — one shard for the whole array — inner chunk
/// shape=(3,2), a 2x2 grid of sub-chunks. Reading a subset that touches only the first inner
/// sub-chunk must issue exactly two byte-range reads against a store that supports partial
/// reads (the shard's index, then that one sub-chunk's bytes), never a full-shard read.
#[test]
fn touching_one_inner_subchunk_issues_two_byte_range_reads() {
    let storage = Arc::new(CountingStore::default());
    let array = ArrayBuilder::new(vec![6, 4], vec![6, 4], DataType::Float64, FillValue::from_f64(0.0, DataType::Float64))
        .with_sharding(vec![3, 2])
        .build(storage.clone(), "")
        .unwrap();

    let whole = ArraySubset::full(vec![6, 4]);
    let data = f64_bytes(&(0..24).map(|i| i as f64).collect::<Vec<_>>());
    array.store_array_subset(&whole, &data).unwrap();

    let before = storage.partial_read_count();
    let first_subchunk = ArraySubset::new(vec![0, 0], vec![3, 2]).unwrap();
    let read = array.retrieve_array_subset(&first_subchunk).unwrap();
    let after = storage.partial_read_count();

    assert_eq!(after - before, 2, "expected exactly two byte-range reads, one for the index and one for the touched sub-chunk");
    let values: Vec<f64> = read
        .chunks_exact(8)
        .map(|c| f64::from_ne_bytes(c.try_into().unwrap()))
        .collect();
    assert_eq!(values, vec![0.0, 1.0, 4.0, 5.0, 8.0, 9.0]);
}
