use rand::{rngs::StdRng, Rng, SeedableRng};

use super::*;

fn random_block(rng: &mut StdRng, max_bits: u32) -> [u64; BLOCK_SIZE] {
    let mut block = [0u64; BLOCK_SIZE];
    for v in block.iter_mut() {
        *v = rng.gen::<u64>() & crate::bitstreams::low_mask(max_bits);
    }
    block
}

#[test]
fn test_pack_unpack_every_width() {
    let mut rng = StdRng::seed_from_u64(42);

    for width in 0..=64u32 {
        let mut block = random_block(&mut rng, width);
        if width > 0 {
            // Force the top bit so the minimal width is exactly `width`.
            block[17] |= 1u64 << (width - 1);
        }
        let bit_width = bits_needed(&block);
        assert_eq!(bit_width as u32, width);

        let mut out = Vec::new();
        let written = pack(&block, bit_width, &mut out);
        assert_eq!(written, packed_len(bit_width));
        assert_eq!(out.len(), 8 * width as usize);

        let mut decoded = [u64::MAX; BLOCK_SIZE];
        let consumed = unpack(&out, bit_width, &mut decoded);
        assert_eq!(consumed, written);
        assert_eq!(decoded, block);
    }
}

#[test]
fn test_zero_block_takes_no_space() {
    let block = [0u64; BLOCK_SIZE];
    assert_eq!(bits_needed(&block), 0);

    let mut out = Vec::new();
    assert_eq!(pack(&block, 0, &mut out), 0);
    assert!(out.is_empty());

    let mut decoded = [7u64; BLOCK_SIZE];
    assert_eq!(unpack(&out, 0, &mut decoded), 0);
    assert_eq!(decoded, [0u64; BLOCK_SIZE]);
}

#[test]
fn test_bit_width_is_minimal() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..200 {
        let bits = rng.gen_range(1..=64u32);
        let block = random_block(&mut rng, bits);
        let width = bits_needed(&block);
        if width == 0 {
            assert!(block.iter().all(|&v| v == 0));
            continue;
        }
        assert!(block.iter().all(|&v| width == 64 || v < (1u64 << width)));
        assert!(block.iter().any(|&v| v >= (1u64 << (width - 1))));
    }
}

#[test]
fn test_pack_blocks_leaves_tail() {
    let values: Vec<u64> = (0..150).map(|i| i * 3).collect();
    let mut out = Vec::new();
    let tail = pack_blocks(&values, &mut out);

    assert_eq!(tail, &values[128..]);
    assert_eq!(out[0], bits_needed(&values[0..64]));
    assert_eq!(out[1], bits_needed(&values[64..128]));
    assert_eq!(out.len(), packed_blocks_len(&out[..2]));
}

#[test]
#[should_panic]
fn test_width_out_of_range() {
    packed_len(65);
}
