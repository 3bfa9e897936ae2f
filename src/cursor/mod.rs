//! Lazy, block-at-a-time decompression of neighbor lists and property channels.

use crate::{
    adjacency::{AdjacencyProperties, CompressedAdjacencyList},
    compression::RecordLayout,
    error::{AdjacencyError, Result},
    packing::{unpack, BLOCK_SIZE},
    utils::varlong::{decode_prefix_sum, decode_vlongs},
};

/// Returned by [`AdjacencyCursor::skip_until`], [`AdjacencyCursor::advance`] and
/// [`AdjacencyCursor::peek`] once the list is exhausted.
pub const NOT_FOUND: u64 = u64::MAX;

/// Decodes one record block after block.
///
/// A record is a header of bit widths, the packed blocks they describe and a varlong tail. The
/// tail is read at most [`BLOCK_SIZE`] values at a time, so a header-less record is simply decoded
/// as a sequence of tail chunks.
#[derive(Clone, Debug, Default)]
pub(crate) struct BlockDecoder<'a> {
    header: &'a [u8],
    body: &'a [u8],
    pos: usize,
    length: usize,
    delta: bool,
    block_id: usize,
    decoded: usize,
    last_value: u64,
}

impl<'a> BlockDecoder<'a> {
    /// # Arguments
    ///
    /// * `record` - The bytes of the record, possibly followed by unrelated bytes
    /// * `header_len` - Number of header bytes, one per packed block
    /// * `length` - Number of values in the record
    /// * `delta` - Whether values are gaps to be summed up
    pub(crate) fn new(record: &'a [u8], header_len: usize, length: usize, delta: bool) -> Self {
        BlockDecoder {
            header: &record[..header_len],
            body: &record[header_len..],
            pos: 0,
            length,
            delta,
            block_id: 0,
            decoded: 0,
            last_value: 0,
        }
    }

    /// Decodes the next block into `block` and returns the number of values it holds, zero once
    /// the record is exhausted.
    pub(crate) fn next_block(&mut self, block: &mut [u64; BLOCK_SIZE]) -> usize {
        let remaining = self.length - self.decoded;
        if remaining == 0 {
            return 0;
        }

        let len = if self.block_id < self.header.len() {
            let bit_width = self.header[self.block_id];
            self.pos += unpack(&self.body[self.pos..], bit_width, block);
            self.block_id += 1;
            if self.delta {
                let mut value = self.last_value;
                for v in block.iter_mut() {
                    value = value.wrapping_add(*v);
                    *v = value;
                }
            }
            BLOCK_SIZE
        } else {
            let len = remaining.min(BLOCK_SIZE);
            let values = &mut block[..len];
            self.pos += if self.delta {
                decode_prefix_sum(&self.body[self.pos..], self.last_value, values)
            } else {
                decode_vlongs(&self.body[self.pos..], values)
            };
            len
        };

        self.last_value = block[len - 1];
        self.decoded += len;
        len
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorState {
    Uninitialized,
    BlockReady,
    Exhausted,
}

/// A reusable cursor over the neighbors of one node at a time.
///
/// The cursor holds a single decoded block; the next one is decoded only when the current one
/// has been fully consumed. Calling [`AdjacencyCursor::init`] again moves it to another node
/// without reallocating. A cursor must not be shared between threads.
#[derive(Debug)]
pub struct AdjacencyCursor<'a> {
    list: &'a CompressedAdjacencyList,
    decoder: BlockDecoder<'a>,
    block: Box<[u64; BLOCK_SIZE]>,
    block_len: usize,
    idx: usize,
    position: usize,
    degree: usize,
    state: CursorState,
}

impl<'a> AdjacencyCursor<'a> {
    /// Returns a cursor over `list` which has to be initialized before use.
    pub fn new(list: &'a CompressedAdjacencyList) -> Self {
        AdjacencyCursor {
            list,
            decoder: BlockDecoder::default(),
            block: Box::new([0; BLOCK_SIZE]),
            block_len: 0,
            idx: 0,
            position: 0,
            degree: 0,
            state: CursorState::Uninitialized,
        }
    }

    /// Points the cursor at another list; it has to be initialized again.
    pub(crate) fn bind(&mut self, list: &'a CompressedAdjacencyList) {
        self.list = list;
        self.state = CursorState::Uninitialized;
    }

    /// Positions the cursor at the first neighbor of `node` and decodes the first block.
    pub fn init(&mut self, node: u64) {
        let degree = self.list.degree(node) as usize;

        self.degree = degree;
        self.position = 0;
        self.idx = 0;

        match self.list.record(node) {
            Some((record, layout)) => {
                self.decoder = BlockDecoder::new(record, layout.header_len(degree), degree, true);
                self.block_len = self.decoder.next_block(&mut self.block);
                self.state = CursorState::BlockReady;
            }
            None => {
                self.decoder = BlockDecoder::default();
                self.block_len = 0;
                self.state = CursorState::Exhausted;
            }
        }
    }

    #[inline(always)]
    pub fn state(&self) -> CursorState {
        self.state
    }

    #[inline(always)]
    fn assert_initialized(&self) {
        assert!(
            self.state != CursorState::Uninitialized,
            "Cursor used before being initialized"
        );
    }

    /// Number of neighbors of the current node.
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.assert_initialized();
        self.degree
    }

    /// Number of neighbors not consumed yet.
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.assert_initialized();
        self.degree - self.position
    }

    #[inline(always)]
    pub fn has_next(&self) -> bool {
        self.assert_initialized();
        self.position < self.degree
    }

    /// Returns the next neighbor without consuming it, or [`NOT_FOUND`].
    #[inline(always)]
    pub fn peek(&self) -> u64 {
        if self.has_next() {
            self.block[self.idx]
        } else {
            NOT_FOUND
        }
    }

    /// Consumes the next neighbor. Must only be called if [`AdjacencyCursor::has_next`] holds.
    #[inline(always)]
    fn consume(&mut self) -> u64 {
        let value = self.block[self.idx];
        self.idx += 1;
        self.position += 1;

        if self.position == self.degree {
            self.state = CursorState::Exhausted;
        } else if self.idx == self.block_len {
            self.block_len = self.decoder.next_block(&mut self.block);
            self.idx = 0;
        }

        value
    }

    /// Consumes neighbors up to and including the first one strictly greater than `target`,
    /// which is returned. Returns [`NOT_FOUND`] if there is none.
    pub fn skip_until(&mut self, target: u64) -> u64 {
        while self.has_next() {
            let value = self.consume();
            if value > target {
                return value;
            }
        }
        NOT_FOUND
    }

    /// Consumes neighbors up to and including the first one greater than or equal to `target`,
    /// which is returned. Returns [`NOT_FOUND`] if there is none.
    pub fn advance(&mut self, target: u64) -> u64 {
        while self.has_next() {
            let value = self.consume();
            if value >= target {
                return value;
            }
        }
        NOT_FOUND
    }

    /// Seeking by a number of positions is not supported by block-decoded lists.
    pub fn advance_by_offset(&mut self, _offset: usize) -> Result<u64> {
        Err(AdjacencyError::NotImplemented("advance by offset on a block cursor"))
    }

    /// Copying the decoding state of a cursor is not supported.
    pub fn shallow_copy(&self, _destination: Option<AdjacencyCursor<'a>>) -> Result<AdjacencyCursor<'a>> {
        Err(AdjacencyError::NotImplemented("shallow copy of a block cursor"))
    }
}

impl<'a> Iterator for AdjacencyCursor<'a> {
    type Item = u64;

    #[inline(always)]
    fn next(&mut self) -> Option<u64> {
        if self.has_next() {
            Some(self.consume())
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.degree - self.position;
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for AdjacencyCursor<'a> {}

/// A reusable cursor over one property channel of one node at a time.
#[derive(Debug)]
pub struct PropertyCursor<'a> {
    properties: &'a AdjacencyProperties,
    values: PropertyValues<'a>,
    block: Box<[u64; BLOCK_SIZE]>,
    block_len: usize,
    idx: usize,
    position: usize,
    degree: usize,
    initialized: bool,
}

#[derive(Debug)]
enum PropertyValues<'a> {
    Packed(BlockDecoder<'a>),
    Raw(&'a [u8]),
}

impl<'a> PropertyCursor<'a> {
    pub fn new(properties: &'a AdjacencyProperties) -> Self {
        PropertyCursor {
            properties,
            values: PropertyValues::Raw(&[]),
            block: Box::new([0; BLOCK_SIZE]),
            block_len: 0,
            idx: 0,
            position: 0,
            degree: 0,
            initialized: false,
        }
    }

    /// Positions the cursor at the first value of `channel` for `node`.
    ///
    /// # Panics
    ///
    /// Panics if `channel` is not a channel of the underlying properties.
    pub fn init(&mut self, node: u64, channel: usize) {
        assert!(
            channel < self.properties.channel_count(),
            "Property channel {} out of range, {} channels stored",
            channel,
            self.properties.channel_count()
        );

        self.initialized = true;
        self.position = 0;
        self.idx = 0;
        self.block_len = 0;
        self.degree = self.properties.degree(node) as usize;

        self.values = match self.properties.channel_record(node, channel) {
            Some((record, RecordLayout::Packed)) => {
                let header_len = RecordLayout::Packed.header_len(self.degree);
                let mut decoder = BlockDecoder::new(record, header_len, self.degree, false);
                self.block_len = decoder.next_block(&mut self.block);
                PropertyValues::Packed(decoder)
            }
            Some((record, RecordLayout::DeltaVarLong)) => PropertyValues::Raw(record),
            None => PropertyValues::Raw(&[]),
        };
    }

    #[inline(always)]
    pub fn has_next(&self) -> bool {
        assert!(self.initialized, "Property cursor used before being initialized");
        self.position < self.degree
    }

    #[inline(always)]
    pub fn remaining(&self) -> usize {
        assert!(self.initialized, "Property cursor used before being initialized");
        self.degree - self.position
    }
}

impl<'a> Iterator for PropertyCursor<'a> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if !self.has_next() {
            return None;
        }

        let bits = match &mut self.values {
            PropertyValues::Raw(bytes) => {
                let start = self.position * 8;
                let mut word = [0u8; 8];
                word.copy_from_slice(&bytes[start..start + 8]);
                u64::from_le_bytes(word)
            }
            PropertyValues::Packed(decoder) => {
                if self.idx == self.block_len {
                    self.block_len = decoder.next_block(&mut self.block);
                    self.idx = 0;
                }
                let bits = self.block[self.idx];
                self.idx += 1;
                bits
            }
        };
        self.position += 1;

        Some(f64::from_bits(bits))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.degree - self.position;
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for PropertyCursor<'a> {}

#[cfg(test)]
mod tests;
