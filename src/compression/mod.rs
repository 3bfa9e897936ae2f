//! Per-node compressors writing into the shared arenas and the node's directory slot.
//!
//! Two record formats exist. A [`RecordLayout::Packed`] record starts with one header byte per
//! full block of [`BLOCK_SIZE`] values holding the block's bit width, followed by the bit-packed
//! blocks and by the remaining values as delta varlongs. A [`RecordLayout::DeltaVarLong`] record
//! is the same thing with an empty header: every value is a delta varlong. Which layout a node
//! uses follows from its degree and the [`LayoutRule`] of the list, so readers never need a tag.

pub mod mixed;
pub mod packed;
pub mod varlong;

use std::{
    fmt,
    str::FromStr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use serde::{Deserialize, Serialize};

use crate::{
    arena::{ArenaAllocator, ArenaAddress, ArenaBuilder},
    directory::DirectoryPartition,
    error::{AdjacencyError, Result},
    packing::BLOCK_SIZE,
};

pub use self::{mixed::MixedCompressor, packed::PackedCompressor, varlong::DeltaVarLongCompressor};

/// Default multiple of [`BLOCK_SIZE`] above which the mixed strategy packs a list.
pub const DEFAULT_PACKED_THRESHOLD: usize = 8;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompressionStrategy {
    Packed,
    DeltaVarLong,
    #[default]
    Mixed,
}

impl FromStr for CompressionStrategy {
    type Err = AdjacencyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "PACKED" => Ok(CompressionStrategy::Packed),
            "VARLONG" | "DELTA_VARLONG" | "VLONG" => Ok(CompressionStrategy::DeltaVarLong),
            "MIXED" => Ok(CompressionStrategy::Mixed),
            other => Err(AdjacencyError::Config(format!("Unknown compression strategy {}", other))),
        }
    }
}

impl fmt::Display for CompressionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionStrategy::Packed => write!(f, "packed"),
            CompressionStrategy::DeltaVarLong => write!(f, "varlong"),
            CompressionStrategy::Mixed => write!(f, "mixed"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordLayout {
    Packed,
    DeltaVarLong,
}

impl RecordLayout {
    /// Number of header bytes of a record holding `degree` values.
    #[inline(always)]
    pub fn header_len(self, degree: usize) -> usize {
        match self {
            RecordLayout::Packed => degree / BLOCK_SIZE,
            RecordLayout::DeltaVarLong => 0,
        }
    }
}

/// Decides the record layout of a node from its degree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutRule {
    strategy: CompressionStrategy,
    packed_threshold: usize,
}

impl LayoutRule {
    /// # Arguments
    ///
    /// * `strategy` - The strategy the compressors were created with
    /// * `packed_threshold` - Multiple of [`BLOCK_SIZE`]; with the mixed strategy, lists longer
    ///   than `BLOCK_SIZE * packed_threshold` are packed. Saturates, so a multiplier too large to
    ///   scale never packs.
    pub fn new(strategy: CompressionStrategy, packed_threshold: usize) -> Self {
        LayoutRule {
            strategy,
            packed_threshold: BLOCK_SIZE.saturating_mul(packed_threshold),
        }
    }

    #[inline(always)]
    pub fn strategy(&self) -> CompressionStrategy {
        self.strategy
    }

    /// Largest degree the mixed strategy still stores as delta varlongs.
    #[inline(always)]
    pub fn packed_threshold(&self) -> usize {
        self.packed_threshold
    }

    #[inline(always)]
    pub fn layout(&self, degree: usize) -> RecordLayout {
        match self.strategy {
            CompressionStrategy::Packed => RecordLayout::Packed,
            CompressionStrategy::DeltaVarLong => RecordLayout::DeltaVarLong,
            CompressionStrategy::Mixed if degree > self.packed_threshold => RecordLayout::Packed,
            CompressionStrategy::Mixed => RecordLayout::DeltaVarLong,
        }
    }
}

/// Compresses the neighbor list of one node at a time.
pub trait Compress {
    /// Compresses the first `degree` entries of `targets` (and of every property channel) for
    /// `node`, stores them in the arenas and records them in `directory`.
    ///
    /// `targets` must be sorted ascending and is overwritten with its delta encoding.
    /// Returns the number of adjacency bytes written.
    fn compress(
        &mut self,
        directory: &mut DirectoryPartition<'_>,
        node: u64,
        targets: &mut [u64],
        properties: &[Vec<f64>],
        degree: usize,
    ) -> Result<usize>;

    /// Releases the compressor, handing its arena pages back.
    fn close(self);
}

/// Arena allocators, scratch buffers and the relationship counter owned by one compressor.
#[derive(Debug)]
pub(crate) struct CompressorCore {
    adjacency: ArenaAllocator,
    properties: ArenaAllocator,
    property_count: usize,
    relationship_counter: Arc<AtomicU64>,
    pub(crate) buffer: Vec<u8>,
    pub(crate) property_buffer: Vec<u8>,
    pub(crate) scratch: Vec<u64>,
}

impl CompressorCore {
    pub(crate) fn new(
        adjacency_arena: &Arc<ArenaBuilder>,
        property_arena: &Arc<ArenaBuilder>,
        property_count: usize,
        relationship_counter: Arc<AtomicU64>,
    ) -> Self {
        CompressorCore {
            adjacency: adjacency_arena.allocator(),
            properties: property_arena.allocator(),
            property_count,
            relationship_counter,
            buffer: Vec::new(),
            property_buffer: Vec::new(),
            scratch: Vec::with_capacity(BLOCK_SIZE),
        }
    }

    #[inline(always)]
    pub(crate) fn property_count(&self) -> usize {
        self.property_count
    }

    /// Checks the shape of the input before anything is written.
    pub(crate) fn validate(
        &self,
        directory: &DirectoryPartition<'_>,
        node: u64,
        targets: &[u64],
        properties: &[Vec<f64>],
        degree: usize,
    ) -> Result<()> {
        directory.check(node)?;

        if degree > targets.len() || degree > u32::MAX as usize {
            return Err(AdjacencyError::DegreeMismatch {
                node,
                degree,
                available: targets.len(),
            });
        }
        if properties.len() != self.property_count {
            return Err(AdjacencyError::PropertyChannelMismatch {
                expected: self.property_count,
                actual: properties.len(),
            });
        }
        for (channel, values) in properties.iter().enumerate() {
            if values.len() < degree {
                return Err(AdjacencyError::PropertyLengthMismatch {
                    node,
                    channel,
                    len: values.len(),
                    degree,
                });
            }
        }

        Ok(())
    }

    /// Moves the encoded buffers into the arenas and publishes them in the directory.
    pub(crate) fn commit(
        &mut self,
        directory: &mut DirectoryPartition<'_>,
        node: u64,
        degree: usize,
    ) -> Result<usize> {
        if degree == 0 {
            directory.set(node, 0, ArenaAddress::default(), ArenaAddress::default())?;
            return Ok(0);
        }

        let adjacency_offset = self.adjacency.insert(&self.buffer)?;
        let property_offset = if self.property_count > 0 {
            self.properties.insert(&self.property_buffer)?
        } else {
            ArenaAddress::default()
        };

        directory.set(node, degree as u32, adjacency_offset, property_offset)?;
        self.relationship_counter.fetch_add(degree as u64, Ordering::Relaxed);

        Ok(self.buffer.len())
    }

    pub(crate) fn close(&mut self) {
        self.adjacency.seal();
        self.properties.seal();
    }
}

/// The compressor handed out by the factory, one variant per strategy.
#[derive(Debug)]
pub enum AdjacencyCompressor {
    Packed(PackedCompressor),
    DeltaVarLong(DeltaVarLongCompressor),
    Mixed(MixedCompressor),
}

impl Compress for AdjacencyCompressor {
    #[inline(always)]
    fn compress(
        &mut self,
        directory: &mut DirectoryPartition<'_>,
        node: u64,
        targets: &mut [u64],
        properties: &[Vec<f64>],
        degree: usize,
    ) -> Result<usize> {
        match self {
            AdjacencyCompressor::Packed(c) => c.compress(directory, node, targets, properties, degree),
            AdjacencyCompressor::DeltaVarLong(c) => c.compress(directory, node, targets, properties, degree),
            AdjacencyCompressor::Mixed(c) => c.compress(directory, node, targets, properties, degree),
        }
    }

    fn close(self) {
        match self {
            AdjacencyCompressor::Packed(c) => c.close(),
            AdjacencyCompressor::DeltaVarLong(c) => c.close(),
            AdjacencyCompressor::Mixed(c) => c.close(),
        }
    }
}
