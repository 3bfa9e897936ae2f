/// Returns a mask covering the `len` lowest bits.
#[inline(always)]
pub fn low_mask(len: u32) -> u64 {
    if len >= 64 {
        u64::MAX
    } else {
        (1u64 << len) - 1
    }
}

/// A little-endian bit writer appending to a byte buffer.
///
/// Bits are accumulated in a 64-bit word starting from its least significant bit and flushed
/// eight bytes at a time, so consecutive values are concatenated without any padding.
pub struct BitWriter<'a> {
    os: &'a mut Vec<u8>,
    current: u64,
    filled: u32,
    pub written_bits: usize,
}

impl<'a> BitWriter<'a> {
    pub fn new(os: &'a mut Vec<u8>) -> Self {
        BitWriter {
            os,
            current: 0,
            filled: 0,
            written_bits: 0,
        }
    }

    #[inline(always)]
    fn flush_word(&mut self) {
        self.os.extend_from_slice(&self.current.to_le_bytes());
    }

    /// Appends the `len` lowest bits of `x`, returning `len`.
    ///
    /// # Arguments
    ///
    /// * `x` - The value to write; bits above `len` are ignored
    /// * `len` - The number of bits to write, at most 64
    #[inline(always)]
    pub fn push_bits(&mut self, x: u64, len: u32) -> u32 {
        assert!(len <= 64, "Cannot write {} bits to an integer", len);

        if len == 0 {
            return 0;
        }

        let x = x & low_mask(len);
        self.current |= x << self.filled;
        self.written_bits += len as usize;

        if self.filled + len < 64 {
            self.filled += len;
            return len;
        }

        self.flush_word();
        let spill = self.filled + len - 64;
        self.current = if spill == 0 { 0 } else { x >> (len - spill) };
        self.filled = spill;

        len
    }

    /// Writes out the bits still buffered, padding the last byte with zeros.
    ///
    /// Returns the total number of bytes appended by this writer.
    pub fn finish(mut self) -> usize {
        let pending = (self.filled as usize + 7) / 8;
        let bytes = self.current.to_le_bytes();
        self.os.extend_from_slice(&bytes[..pending]);
        self.filled = 0;

        (self.written_bits + 7) / 8
    }
}

/// The counterpart of [`BitWriter`], reading from a borrowed byte slice.
#[derive(Clone, Debug)]
pub struct BitReader<'a> {
    is: &'a [u8],
    position: usize,
    current: u64,
    fill: u32,
    pub read_bits: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(is: &'a [u8]) -> Self {
        BitReader {
            is,
            position: 0,
            current: 0,
            fill: 0,
            read_bits: 0,
        }
    }

    /// Loads up to eight bytes, returning the word and the number of valid bits in it.
    /// Reading past the end of the input yields zero bits.
    #[inline(always)]
    fn refill(&mut self) -> (u64, u32) {
        let available = self.is.len().saturating_sub(self.position).min(8);
        let mut word = [0u8; 8];
        word[..available].copy_from_slice(&self.is[self.position..self.position + available]);
        self.position += available;

        (u64::from_le_bytes(word), if available == 0 { 64 } else { available as u32 * 8 })
    }

    /// Reads the next `len` bits as an unsigned integer.
    #[inline(always)]
    pub fn read_int(&mut self, len: u32) -> u64 {
        assert!(len <= 64, "Cannot read {} bits into an integer", len);

        if len == 0 {
            return 0;
        }

        self.read_bits += len as usize;

        if len <= self.fill {
            let value = self.current & low_mask(len);
            self.current = if len == 64 { 0 } else { self.current >> len };
            self.fill -= len;
            return value;
        }

        let low = self.current;
        let low_bits = self.fill;
        let need = len - low_bits;

        let (word, word_bits) = self.refill();
        let value = low | ((word & low_mask(need)) << low_bits);

        self.current = if need == 64 { 0 } else { word >> need };
        self.fill = word_bits.saturating_sub(need);

        value
    }

    /// Number of whole bytes consumed so far.
    #[inline(always)]
    pub fn consumed_bytes(&self) -> usize {
        (self.read_bits + 7) / 8
    }
}
