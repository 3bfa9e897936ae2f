//! Coordination of a build: one directory, two arenas and a relationship counter shared by any
//! number of independent compressors.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tracing::{debug, info};

use crate::{
    adjacency::{AdjacencyListsWithProperties, AdjacencyProperties, CompressedAdjacencyList},
    arena::ArenaBuilder,
    compression::{
        AdjacencyCompressor, CompressionStrategy, CompressorCore, DeltaVarLongCompressor, LayoutRule,
        MixedCompressor, PackedCompressor,
    },
    directory::{AdjacencyDirectory, DirectoryPartition},
    error::Result,
    properties::CompressionConfig,
};

/// Hands out compressors and assembles what they wrote.
///
/// Typical use: create one compressor per worker with
/// [`CompressorFactory::create_compressor`], split the directory with
/// [`CompressorFactory::directory_partitions`], compress every node of each partition with its
/// worker's compressor, close the compressors and finally call [`CompressorFactory::build`].
#[derive(Debug)]
pub struct CompressorFactory {
    config: CompressionConfig,
    rule: LayoutRule,
    directory: AdjacencyDirectory,
    adjacency_arena: Arc<ArenaBuilder>,
    property_arena: Arc<ArenaBuilder>,
    relationship_counter: Arc<AtomicU64>,
}

impl CompressorFactory {
    /// Creates a factory for `node_count` nodes.
    pub fn new(config: CompressionConfig, node_count: usize) -> Result<Self> {
        config.validate()?;

        let rule = LayoutRule::new(config.strategy, config.packed_threshold);
        let page_size = config.arena_page_size;

        Ok(CompressorFactory {
            directory: AdjacencyDirectory::new(node_count)?,
            adjacency_arena: Arc::new(ArenaBuilder::new(page_size)),
            property_arena: Arc::new(ArenaBuilder::new(page_size)),
            relationship_counter: Arc::new(AtomicU64::new(0)),
            config,
            rule,
        })
    }

    /// Discards everything written so far and sizes the directory for `node_count` nodes.
    ///
    /// Compressors created before this call keep writing into the discarded arenas.
    pub fn init(&mut self, node_count: usize) -> Result<()> {
        let page_size = self.config.arena_page_size;

        self.directory = AdjacencyDirectory::new(node_count)?;
        self.adjacency_arena = Arc::new(ArenaBuilder::new(page_size));
        self.property_arena = Arc::new(ArenaBuilder::new(page_size));
        self.relationship_counter = Arc::new(AtomicU64::new(0));

        debug!(node_count, "compressor factory initialized");
        Ok(())
    }

    #[inline(always)]
    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    #[inline(always)]
    pub fn node_count(&self) -> usize {
        self.directory.node_count()
    }

    /// Returns a new compressor writing into the shared arenas. Each worker needs its own.
    pub fn create_compressor(&self) -> AdjacencyCompressor {
        match self.config.strategy {
            CompressionStrategy::Packed => AdjacencyCompressor::Packed(PackedCompressor::new(self.core())),
            CompressionStrategy::DeltaVarLong => {
                AdjacencyCompressor::DeltaVarLong(DeltaVarLongCompressor::new(self.core()))
            }
            CompressionStrategy::Mixed => AdjacencyCompressor::Mixed(MixedCompressor::new(
                self.rule,
                PackedCompressor::new(self.core()),
                DeltaVarLongCompressor::new(self.core()),
            )),
        }
    }

    fn core(&self) -> CompressorCore {
        CompressorCore::new(
            &self.adjacency_arena,
            &self.property_arena,
            self.config.property_count,
            Arc::clone(&self.relationship_counter),
        )
    }

    /// The running total of relationships compressed by every compressor of this factory.
    pub fn relationship_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.relationship_counter)
    }

    /// Splits the directory into at most `count` disjoint node ranges, one per worker.
    pub fn directory_partitions(&mut self, count: usize) -> Vec<DirectoryPartition<'_>> {
        self.directory.partitions(count)
    }

    /// A single partition spanning every node, for single threaded builds.
    pub fn directory_partition(&mut self) -> DirectoryPartition<'_> {
        self.directory.whole()
    }

    /// Freezes the arenas and the directory.
    ///
    /// Every compressor has to be closed or dropped beforehand, otherwise the pages it still
    /// holds are reported through [`crate::AdjacencyError::UnsealedArena`].
    pub fn build(self) -> Result<AdjacencyListsWithProperties> {
        let adjacency_arena = self.adjacency_arena.freeze()?;
        let property_arena = self.property_arena.freeze()?;
        let relationship_count = self.relationship_counter.load(Ordering::Acquire);

        let directory = Arc::new(self.directory);
        let adjacency = CompressedAdjacencyList::new(Arc::clone(&directory), adjacency_arena, self.rule);
        let properties = (self.config.property_count > 0).then(|| {
            AdjacencyProperties::new(directory, property_arena, self.rule, self.config.property_count)
        });

        let lists = AdjacencyListsWithProperties::new(adjacency, properties, relationship_count);
        info!(
            nodes = lists.adjacency().node_count(),
            relationships = relationship_count,
            bytes = lists.memory_usage(),
            strategy = %self.config.strategy,
            "adjacency lists built"
        );

        Ok(lists)
    }
}
