pub mod adjacency;
pub mod aggregation;
pub mod arena;
pub mod ascii_graph;
pub mod bitstreams;
pub mod builder;
pub mod compression;
pub mod cursor;
pub mod directory;
pub mod error;
pub mod factory;
pub mod packing;
pub mod properties;
pub mod utils;

pub use adjacency::{AdjacencyListsWithProperties, AdjacencyProperties, CompressedAdjacencyList, CompressionStats};
pub use aggregation::Aggregation;
pub use builder::{BatchSource, ParallelBuilder, RelationshipBatch};
pub use compression::{AdjacencyCompressor, Compress, CompressionStrategy};
pub use cursor::{AdjacencyCursor, PropertyCursor, NOT_FOUND};
pub use error::{AdjacencyError, Result};
pub use factory::CompressorFactory;
pub use properties::CompressionConfig;

/// Read access shared by compressed and uncompressed adjacency structures.
pub trait ImmutableAdjacency {
    fn node_count(&self) -> usize;
    fn relationship_count(&self) -> u64;
    fn degree(&self, node: u64) -> u32;
    /// The targets of `node`, ascending.
    fn successors(&self, node: u64) -> Box<[u64]>;
}
