use super::{Compress, CompressorCore};
use crate::{
    directory::DirectoryPartition,
    error::Result,
    packing::pack_blocks,
    utils::varlong::{delta_encode, encode_vlongs},
};

/// Appends the packed record of `values` to `out`: the block header, the packed blocks, then the
/// tail as varlongs. Returns the number of bytes written.
pub fn encode_packed(values: &[u64], out: &mut Vec<u8>) -> usize {
    let start = out.len();
    let tail = pack_blocks(values, out);
    encode_vlongs(tail, out);
    out.len() - start
}

/// Appends every property channel, one packed record per channel, without delta encoding.
///
/// # Arguments
///
/// * `properties` - One vector per channel, holding at least `degree` values each
/// * `degree` - Number of values taken from each channel
/// * `scratch` - Reused buffer receiving the raw bits of a channel
/// * `out` - The buffer receiving the records
pub fn encode_packed_properties(
    properties: &[Vec<f64>],
    degree: usize,
    scratch: &mut Vec<u64>,
    out: &mut Vec<u8>,
) -> usize {
    let start = out.len();
    for channel in properties {
        scratch.clear();
        scratch.extend(channel[..degree].iter().map(|v| v.to_bits()));
        encode_packed(scratch, out);
    }
    out.len() - start
}

/// Stores every list in the packed layout, regardless of its degree.
#[derive(Debug)]
pub struct PackedCompressor {
    core: CompressorCore,
}

impl PackedCompressor {
    pub(crate) fn new(core: CompressorCore) -> Self {
        PackedCompressor { core }
    }
}

impl Compress for PackedCompressor {
    fn compress(
        &mut self,
        directory: &mut DirectoryPartition<'_>,
        node: u64,
        targets: &mut [u64],
        properties: &[Vec<f64>],
        degree: usize,
    ) -> Result<usize> {
        self.core.validate(directory, node, targets, properties, degree)?;

        let targets = &mut targets[..degree];
        delta_encode(node, targets)?;

        self.core.buffer.clear();
        encode_packed(targets, &mut self.core.buffer);

        self.core.property_buffer.clear();
        if self.core.property_count() > 0 {
            encode_packed_properties(
                properties,
                degree,
                &mut self.core.scratch,
                &mut self.core.property_buffer,
            );
        }

        self.core.commit(directory, node, degree)
    }

    fn close(mut self) {
        self.core.close();
    }
}
