//! Helpers for slicing and filling raw, row-major (C-order), native-endian chunk buffers.
//!
//! The typed multidimensional buffer and its allocator are out of scope for this implementation
//! (owned by the caller's tensor library); codecs only ever see and produce `Vec<u8>` laid out
//! row-major for a known `(shape, element_size)`.

use zarrs_chunk_grid::ArraySubset;
use zarrs_data_type::FillValue;

/// Row-major strides (in elements, not bytes) for `shape`.
#[must_use]
pub fn row_major_strides(shape: &[u64]) -> Vec<u64> {
    let mut strides = vec![1u64; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

/// Extract the elements of `subset` from a row-major buffer of `array_shape`, each element
/// `element_size` bytes wide, in row-major order of `subset` itself.
#[must_use]
pub fn extract_subset(
    buffer: &[u8],
    array_shape: &[u64],
    element_size: usize,
    subset: &ArraySubset,
) -> Vec<u8> {
    let strides = row_major_strides(array_shape);
    let mut out = Vec::with_capacity(subset.num_elements() as usize * element_size);
    for point in subset.iter_indices() {
        let offset: u64 = point.iter().zip(&strides).map(|(p, s)| p * s).sum();
        let start = offset as usize * element_size;
        out.extend_from_slice(&buffer[start..start + element_size]);
    }
    out
}

/// Insert `data` (row-major over `subset`, as produced by [`extract_subset`]) into a row-major
/// buffer of `array_shape`.
///
/// # Panics
/// Panics if `data` does not hold exactly `subset.num_elements() * element_size` bytes.
pub fn insert_subset(
    buffer: &mut [u8],
    array_shape: &[u64],
    element_size: usize,
    subset: &ArraySubset,
    data: &[u8],
) {
    assert_eq!(data.len(), subset.num_elements() as usize * element_size);
    let strides = row_major_strides(array_shape);
    for (i, point) in subset.iter_indices().enumerate() {
        let offset: u64 = point.iter().zip(&strides).map(|(p, s)| p * s).sum();
        let start = offset as usize * element_size;
        let src = i * element_size;
        buffer[start..start + element_size].copy_from_slice(&data[src..src + element_size]);
    }
}

/// Build a buffer of `num_elements` repetitions of `fill_value`.
#[must_use]
pub fn fill_buffer(num_elements: u64, fill_value: &FillValue) -> Vec<u8> {
    fill_value
        .bytes()
        .iter()
        .copied()
        .cycle()
        .take(num_elements as usize * fill_value.bytes().len())
        .collect()
}

/// Whether every element of `buffer` (a dense row-major buffer, no subset involved) equals
/// `fill_value`.
#[must_use]
pub fn is_all_fill(buffer: &[u8], fill_value: &FillValue) -> bool {
    let width = fill_value.bytes().len();
    if width == 0 {
        return true;
    }
    buffer.chunks_exact(width).all(|elem| elem == fill_value.bytes())
}

/// Permute the axes of a row-major buffer of `shape` according to `order`: axis `d` of the
/// output is axis `order[d]` of the input. Used by the transpose codec.
///
/// # Panics
/// Panics if `order` is not a permutation of `0..shape.len()`.
#[must_use]
pub fn permute_axes(buffer: &[u8], shape: &[u64], element_size: usize, order: &[usize]) -> Vec<u8> {
    debug_assert_eq!(order.len(), shape.len());
    let ndim = shape.len();
    let new_shape: Vec<u64> = order.iter().map(|&i| shape[i]).collect();
    let orig_strides = row_major_strides(shape);
    let new_strides = row_major_strides(&new_shape);
    let total: u64 = new_shape.iter().product();
    let mut out = vec![0u8; buffer.len()];
    let mut new_index = vec![0u64; ndim];
    for linear in 0..total {
        let mut rem = linear;
        for d in 0..ndim {
            if new_strides[d] == 0 {
                new_index[d] = 0;
            } else {
                new_index[d] = rem / new_strides[d];
                rem %= new_strides[d];
            }
        }
        let mut orig_offset = 0u64;
        for d in 0..ndim {
            orig_offset += new_index[d] * orig_strides[order[d]];
        }
        let src = orig_offset as usize * element_size;
        let dst = linear as usize * element_size;
        out[dst..dst + element_size].copy_from_slice(&buffer[src..src + element_size]);
    }
    out
}

/// The inverse permutation of `order`, i.e. `inverse_permutation(order)[order[d]] == d`.
#[must_use]
pub fn inverse_permutation(order: &[usize]) -> Vec<usize> {
    let mut inverse = vec![0usize; order.len()];
    for (d, &o) in order.iter().enumerate() {
        inverse[o] = d;
    }
    inverse
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_and_insert_round_trip() {
        let shape = vec![3, 3];
        let buffer: Vec<u8> = (0..9).collect();
        let subset = ArraySubset::new(vec![1, 1], vec![2, 2]).unwrap();
        let extracted = extract_subset(&buffer, &shape, 1, &subset);
        assert_eq!(extracted, vec![4, 5, 7, 8]);

        let mut target = vec![0u8; 9];
        insert_subset(&mut target, &shape, 1, &subset, &extracted);
        assert_eq!(target, vec![0, 0, 0, 0, 4, 5, 0, 7, 8]);
    }

    #[test]
    fn fill_buffer_repeats_pattern() {
        let fv = FillValue::new(vec![1, 2]);
        assert_eq!(fill_buffer(3, &fv), vec![1, 2, 1, 2, 1, 2]);
    }

    #[test]
    fn is_all_fill_detects_mismatch() {
        let fv = FillValue::new(vec![0]);
        assert!(is_all_fill(&[0, 0, 0], &fv));
        assert!(!is_all_fill(&[0, 1, 0], &fv));
    }

    #[test]
    fn permute_axes_transposes_2d() {
        let shape = vec![2, 3];
        let buffer: Vec<u8> = (0..6).collect();
        let transposed = permute_axes(&buffer, &shape, 1, &[1, 0]);
        // original rows [0,1,2] [3,4,5] -> transposed rows [0,3] [1,4] [2,5]
        assert_eq!(transposed, vec![0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn inverse_permutation_round_trips() {
        let order = vec![2, 0, 1];
        let inverse = inverse_permutation(&order);
        let shape = vec![2, 3, 4];
        let buffer: Vec<u8> = (0..24).collect();
        let forward = permute_axes(&buffer, &shape, 1, &order);
        let new_shape: Vec<u64> = order.iter().map(|&i| shape[i]).collect();
        let back = permute_axes(&forward, &new_shape, 1, &inverse);
        assert_eq!(back, buffer);
    }
}
