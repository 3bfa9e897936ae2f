use tracing::trace;

use super::{Compress, DeltaVarLongCompressor, LayoutRule, PackedCompressor, RecordLayout};
use crate::{directory::DirectoryPartition, error::Result};

/// Packs long lists and stores short ones as delta varlongs.
///
/// The choice only depends on the degree, through the same [`LayoutRule`] readers use.
#[derive(Debug)]
pub struct MixedCompressor {
    rule: LayoutRule,
    packed: PackedCompressor,
    varlong: DeltaVarLongCompressor,
}

impl MixedCompressor {
    pub(crate) fn new(rule: LayoutRule, packed: PackedCompressor, varlong: DeltaVarLongCompressor) -> Self {
        MixedCompressor { rule, packed, varlong }
    }
}

impl Compress for MixedCompressor {
    fn compress(
        &mut self,
        directory: &mut DirectoryPartition<'_>,
        node: u64,
        targets: &mut [u64],
        properties: &[Vec<f64>],
        degree: usize,
    ) -> Result<usize> {
        match self.rule.layout(degree) {
            RecordLayout::Packed => {
                trace!(node, degree, "packing adjacency list");
                self.packed.compress(directory, node, targets, properties, degree)
            }
            RecordLayout::DeltaVarLong => self.varlong.compress(directory, node, targets, properties, degree),
        }
    }

    fn close(self) {
        self.packed.close();
        self.varlong.close();
    }
}
