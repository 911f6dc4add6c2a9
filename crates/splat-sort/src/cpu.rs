//! Host-side mirror of the GPU radix sort
//!
//! Runs the same block histogram, digit-major scan and stable scatter the
//! shaders do. Used to check the algorithm and for small offline sorts.

use crate::{RADIX_BITS, RADIX_PASSES, RADIX_SIZE, SORT_BLOCK_SIZE};

/// Block count the key producer would have written into the dispatch args
pub fn block_count(num_keys: usize) -> usize {
    num_keys.div_ceil(SORT_BLOCK_SIZE as usize)
}

fn digit(key: u32, shift: u32) -> usize {
    ((key >> shift) & (RADIX_SIZE - 1)) as usize
}

/// One histogram -> scan -> scatter pass at bit offset `shift`
fn radix_pass(src_keys: &[u32], src_indices: &[u32], dst_keys: &mut [u32], dst_indices: &mut [u32], shift: u32) {
    let num_blocks = block_count(src_keys.len());
    let block = SORT_BLOCK_SIZE as usize;
    let radix = RADIX_SIZE as usize;

    // Digit-major: histogram[digit * num_blocks + block]
    let mut histogram = vec![0u32; radix * num_blocks];
    for (b, chunk) in src_keys.chunks(block).enumerate() {
        for &key in chunk {
            histogram[digit(key, shift) * num_blocks + b] += 1;
        }
    }

    let mut running = 0u32;
    for entry in histogram.iter_mut() {
        let count = *entry;
        *entry = running;
        running += count;
    }

    for (b, chunk) in src_keys.chunks(block).enumerate() {
        let mut offsets: Vec<u32> = (0..radix).map(|d| histogram[d * num_blocks + b]).collect();
        for (i, &key) in chunk.iter().enumerate() {
            let d = digit(key, shift);
            let dst = offsets[d] as usize;
            offsets[d] += 1;
            dst_keys[dst] = key;
            dst_indices[dst] = src_indices[b * block + i];
        }
    }
}

/// Sort `keys` ascending, carrying `indices` along; stable for equal keys
///
/// # Panics
/// Panics if the slices differ in length.
pub fn radix_sort(keys: &mut [u32], indices: &mut [u32]) {
    assert_eq!(keys.len(), indices.len(), "keys and indices must pair up");

    let mut scratch_keys = vec![0u32; keys.len()];
    let mut scratch_indices = vec![0u32; indices.len()];

    for pass in 0..RADIX_PASSES {
        let shift = pass as u32 * RADIX_BITS;
        if pass % 2 == 0 {
            radix_pass(keys, indices, &mut scratch_keys, &mut scratch_indices, shift);
        } else {
            radix_pass(&scratch_keys, &scratch_indices, keys, indices, shift);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Small LCG so the tests stay dependency free and deterministic
    fn lcg_keys(n: usize, mut state: u64) -> Vec<u32> {
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                (state >> 32) as u32
            })
            .collect()
    }

    fn check_against_stable_sort(keys: Vec<u32>) {
        let mut expected: Vec<(u32, u32)> = keys.iter().copied().zip(0..).collect();
        expected.sort_by_key(|&(k, _)| k);

        let mut sorted_keys = keys.clone();
        let mut sorted_indices: Vec<u32> = (0..keys.len() as u32).collect();
        radix_sort(&mut sorted_keys, &mut sorted_indices);

        let actual: Vec<(u32, u32)> = sorted_keys.into_iter().zip(sorted_indices).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_empty_and_single() {
        check_against_stable_sort(vec![]);
        check_against_stable_sort(vec![42]);
    }

    #[test]
    fn test_random_multi_block() {
        // Crosses several block boundaries with a partial last block
        check_against_stable_sort(lcg_keys(3 * SORT_BLOCK_SIZE as usize + 17, 7));
    }

    #[test]
    fn test_stable_for_duplicates() {
        let keys: Vec<u32> = (0..2000).map(|i| (i % 5) as u32 * 0x0101_0101).collect();
        check_against_stable_sort(keys);
    }

    #[test]
    fn test_extreme_keys() {
        check_against_stable_sort(vec![u32::MAX, 0, u32::MAX, 1, 0x8000_0000, 0]);
    }

    #[test]
    fn test_block_count() {
        assert_eq!(block_count(0), 0);
        assert_eq!(block_count(1), 1);
        assert_eq!(block_count(512), 1);
        assert_eq!(block_count(513), 2);
    }

    #[test]
    fn test_depth_keys_sort_back_to_front() {
        let depths = [1.0f32, 10.0, 0.5, 3.0];
        let mut keys: Vec<u32> = depths.iter().map(|d| u32::MAX - d.to_bits()).collect();
        let mut indices: Vec<u32> = (0..depths.len() as u32).collect();
        radix_sort(&mut keys, &mut indices);
        // Farthest first
        assert_eq!(indices, vec![1, 3, 0, 2]);
    }
}
