use super::{Compress, CompressorCore};
use crate::{
    directory::DirectoryPartition,
    error::Result,
    utils::varlong::{delta_encode, encode_vlongs},
};

/// Size of one raw property value.
pub const PROPERTY_WIDTH: usize = std::mem::size_of::<u64>();

/// Appends the raw little-endian bits of every property channel, channel after channel.
pub fn encode_raw_properties(properties: &[Vec<f64>], degree: usize, out: &mut Vec<u8>) -> usize {
    let start = out.len();
    out.reserve(properties.len() * degree * PROPERTY_WIDTH);
    for channel in properties {
        for value in &channel[..degree] {
            out.extend_from_slice(&value.to_bits().to_le_bytes());
        }
    }
    out.len() - start
}

/// Stores every list as a sequence of delta varlongs.
#[derive(Debug)]
pub struct DeltaVarLongCompressor {
    core: CompressorCore,
}

impl DeltaVarLongCompressor {
    pub(crate) fn new(core: CompressorCore) -> Self {
        DeltaVarLongCompressor { core }
    }
}

impl Compress for DeltaVarLongCompressor {
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
        encode_vlongs(targets, &mut self.core.buffer);

        self.core.property_buffer.clear();
        encode_raw_properties(properties, degree, &mut self.core.property_buffer);

        self.core.commit(directory, node, degree)
    }

    fn close(mut self) {
        self.core.close();
    }
}
