//! Fixed-width bit packing of blocks of [`BLOCK_SIZE`] values.
//!
//! A block is stored using exactly `bit_width` bits per value, where `bit_width` is the
//! smallest width able to represent the largest value of the block. A width of zero denotes an
//! all-zero block and occupies no bytes at all.

use crate::bitstreams::{BitReader, BitWriter};

/// Number of values in a packed block.
pub const BLOCK_SIZE: usize = 64;

/// Largest legal bit width.
pub const MAX_BIT_WIDTH: u8 = 64;

/// Returns the minimal number of bits required to represent every value of `values`.
#[inline(always)]
pub fn bits_needed(values: &[u64]) -> u8 {
    let max = values.iter().fold(0u64, |acc, &v| acc | v);
    (u64::BITS - max.leading_zeros()) as u8
}

/// Number of bytes taken by a block packed with `bit_width` bits per value.
#[inline(always)]
pub fn packed_len(bit_width: u8) -> usize {
    assert_bit_width(bit_width);
    BLOCK_SIZE * bit_width as usize / 8
}

#[inline(always)]
fn assert_bit_width(bit_width: u8) {
    assert!(
        bit_width <= MAX_BIT_WIDTH,
        "Bit width {} is outside of [0, {}]",
        bit_width,
        MAX_BIT_WIDTH
    );
}

/// Appends `values` to `out` using `bit_width` bits each and returns the number of bytes written.
///
/// # Arguments
///
/// * `values` - The block to pack
/// * `bit_width` - Bits per value; must be able to hold every value of the block
/// * `out` - The buffer receiving the packed bytes
///
/// # Panics
///
/// Panics if `bit_width` is larger than 64.
pub fn pack(values: &[u64; BLOCK_SIZE], bit_width: u8, out: &mut Vec<u8>) -> usize {
    assert_bit_width(bit_width);
    debug_assert!(bits_needed(values) <= bit_width, "Block does not fit in {} bits", bit_width);

    if bit_width == 0 {
        return 0;
    }

    let mut writer = BitWriter::new(out);
    for &value in values.iter() {
        writer.push_bits(value, bit_width as u32);
    }

    writer.finish()
}

/// Decodes one block packed with `bit_width` bits per value into `block`.
///
/// Returns the number of bytes consumed from `bytes`, always [`packed_len`]`(bit_width)`.
///
/// # Panics
///
/// Panics if `bit_width` is larger than 64.
pub fn unpack(bytes: &[u8], bit_width: u8, block: &mut [u64; BLOCK_SIZE]) -> usize {
    assert_bit_width(bit_width);

    if bit_width == 0 {
        block.fill(0);
        return 0;
    }

    let len = packed_len(bit_width);
    let mut reader = BitReader::new(&bytes[..len]);
    for value in block.iter_mut() {
        *value = reader.read_int(bit_width as u32);
    }

    len
}

/// Packs a whole sequence: one header byte per full block, the packed blocks, and the remaining
/// tail returned to the caller as a slice.
///
/// Returns the tail values (`values.len() % BLOCK_SIZE` of them) which the caller encodes with a
/// variable-length scheme.
pub fn pack_blocks<'v>(values: &'v [u64], out: &mut Vec<u8>) -> &'v [u64] {
    let full_blocks = values.len() / BLOCK_SIZE;
    let header_start = out.len();
    out.resize(header_start + full_blocks, 0);

    let mut block = [0u64; BLOCK_SIZE];
    for (block_id, chunk) in values.chunks_exact(BLOCK_SIZE).enumerate() {
        block.copy_from_slice(chunk);
        let bit_width = bits_needed(&block);
        out[header_start + block_id] = bit_width;
        pack(&block, bit_width, out);
    }

    &values[full_blocks * BLOCK_SIZE..]
}

/// Number of bytes occupied by the header and packed blocks of a sequence whose header is
/// `header`.
#[inline(always)]
pub fn packed_blocks_len(header: &[u8]) -> usize {
    header.len() + header.iter().map(|&w| packed_len(w)).sum::<usize>()
}

#[cfg(test)]
mod tests;
