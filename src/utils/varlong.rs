//! Variable-length integer coding: seven payload bits per byte, the high bit set on every byte
//! but the last one of a value.

use crate::error::{AdjacencyError, Result};

const PAYLOAD_MASK: u64 = 0x7F;
const CONTINUATION: u8 = 0x80;

/// Largest number of bytes a single `u64` can take.
pub const MAX_VLONG_LEN: usize = 10;

/// Appends `value` to `out`, returning the number of bytes written.
#[inline(always)]
pub fn write_vlong(mut value: u64, out: &mut Vec<u8>) -> usize {
    let mut written = 1;
    while value > PAYLOAD_MASK {
        out.push((value & PAYLOAD_MASK) as u8 | CONTINUATION);
        value >>= 7;
        written += 1;
    }
    out.push(value as u8);
    written
}

/// Reads one value starting at `*pos`, advancing `*pos` past it.
#[inline(always)]
pub fn read_vlong(bytes: &[u8], pos: &mut usize) -> u64 {
    let mut value = 0u64;
    let mut shift = 0;
    loop {
        let b = bytes[*pos];
        *pos += 1;
        value |= ((b as u64) & PAYLOAD_MASK) << shift;
        if b & CONTINUATION == 0 {
            return value;
        }
        shift += 7;
    }
}

/// Number of bytes `value` takes once encoded.
#[inline(always)]
pub fn vlong_len(value: u64) -> usize {
    let bits = (u64::BITS - value.leading_zeros()).max(1) as usize;
    (bits + 6) / 7
}

/// Encodes every value of `values`, returning the number of bytes appended.
pub fn encode_vlongs(values: &[u64], out: &mut Vec<u8>) -> usize {
    values.iter().map(|&v| write_vlong(v, out)).sum()
}

/// Decodes `into.len()` values, returning the number of bytes consumed.
pub fn decode_vlongs(bytes: &[u8], into: &mut [u64]) -> usize {
    let mut pos = 0;
    for v in into.iter_mut() {
        *v = read_vlong(bytes, &mut pos);
    }
    pos
}

/// Decodes `into.len()` deltas and turns them into absolute values by a running sum starting
/// at `previous`. Returns the number of bytes consumed.
pub fn decode_prefix_sum(bytes: &[u8], previous: u64, into: &mut [u64]) -> usize {
    let mut pos = 0;
    let mut value = previous;
    for v in into.iter_mut() {
        value = value.wrapping_add(read_vlong(bytes, &mut pos));
        *v = value;
    }
    pos
}

/// Byte length of the first `count` encoded values of `bytes`, without decoding them.
pub fn skip_vlongs(bytes: &[u8], count: usize) -> usize {
    let mut remaining = count;
    let mut pos = 0;
    while remaining > 0 {
        if bytes[pos] & CONTINUATION == 0 {
            remaining -= 1;
        }
        pos += 1;
    }
    pos
}

/// Like [`skip_vlongs`], but returns `None` if `bytes` ends before `count` values or holds a value
/// longer than [`MAX_VLONG_LEN`] bytes.
pub fn checked_skip_vlongs(bytes: &[u8], count: usize) -> Option<usize> {
    let mut pos = 0;
    for _ in 0..count {
        let len = bytes
            .get(pos..)?
            .iter()
            .take(MAX_VLONG_LEN)
            .position(|&b| b & CONTINUATION == 0)?
            + 1;
        pos += len;
    }
    Some(pos)
}

/// Replaces sorted `values` with their gaps: the first value stays absolute, every following one
/// becomes the difference from its predecessor.
///
/// # Arguments
///
/// * `node` - The node owning the list, only used to report errors
/// * `values` - The ascending list to transform in place, left untouched if it is not ascending
pub fn delta_encode(node: u64, values: &mut [u64]) -> Result<()> {
    if let Some(position) = values.windows(2).position(|w| w[1] < w[0]) {
        return Err(AdjacencyError::UnsortedTargets {
            node,
            position: position + 1,
        });
    }

    let mut previous = 0u64;
    for v in values.iter_mut() {
        let current = *v;
        *v = current - previous;
        previous = current;
    }
    Ok(())
}
