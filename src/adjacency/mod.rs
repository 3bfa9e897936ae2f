//! The immutable structure produced by a build: compressed neighbor lists, their optional
//! property channels, and the directory shared by both.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    arena::Arena,
    compression::{CompressionStrategy, LayoutRule, RecordLayout},
    cursor::{AdjacencyCursor, PropertyCursor},
    directory::AdjacencyDirectory,
    error::{AdjacencyError, Result},
    packing::{packed_blocks_len, BLOCK_SIZE, MAX_BIT_WIDTH},
    utils::varlong::{checked_skip_vlongs, skip_vlongs},
    ImmutableAdjacency,
};

/// Compressed neighbor lists of every node. Read-only, shareable across threads.
#[derive(Clone, Debug)]
pub struct CompressedAdjacencyList {
    directory: Arc<AdjacencyDirectory>,
    arena: Arena,
    rule: LayoutRule,
}

impl CompressedAdjacencyList {
    pub(crate) fn new(directory: Arc<AdjacencyDirectory>, arena: Arena, rule: LayoutRule) -> Self {
        CompressedAdjacencyList { directory, arena, rule }
    }

    #[inline(always)]
    pub fn node_count(&self) -> usize {
        self.directory.node_count()
    }

    /// Returns the number of neighbors of `node`, zero for nodes out of range.
    #[inline(always)]
    pub fn degree(&self, node: u64) -> u32 {
        self.directory.degree(node)
    }

    #[inline(always)]
    pub fn rule(&self) -> LayoutRule {
        self.rule
    }

    /// The layout the list of `node` is stored with.
    #[inline(always)]
    pub fn layout(&self, node: u64) -> RecordLayout {
        self.rule.layout(self.degree(node) as usize)
    }

    pub fn directory(&self) -> &AdjacencyDirectory {
        &self.directory
    }

    /// The bytes starting at the record of `node`, `None` for nodes without neighbors.
    #[inline(always)]
    pub(crate) fn record(&self, node: u64) -> Option<(&[u8], RecordLayout)> {
        let degree = self.degree(node) as usize;
        if degree == 0 {
            return None;
        }

        let bytes = self.arena.bytes_at(self.directory.adjacency_offset(node));
        Some((bytes, self.rule.layout(degree)))
    }

    /// Returns a new cursor positioned at the first neighbor of `node`.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let mut cursor = list.adjacency_cursor(5);
    /// while let Some(target) = cursor.next() {
    ///     println!("Successor: {}", target);
    /// }
    /// ```
    pub fn adjacency_cursor(&self, node: u64) -> AdjacencyCursor<'_> {
        let mut cursor = AdjacencyCursor::new(self);
        cursor.init(node);
        cursor
    }

    /// Repositions `cursor` at the first neighbor of `node`, keeping its block buffer.
    pub fn adjacency_cursor_reuse<'a>(&'a self, mut cursor: AdjacencyCursor<'a>, node: u64) -> AdjacencyCursor<'a> {
        cursor.bind(self);
        cursor.init(node);
        cursor
    }

    /// Returns a cursor that has to be initialized with [`AdjacencyCursor::init`] before use.
    pub fn raw_adjacency_cursor(&self) -> AdjacencyCursor<'_> {
        AdjacencyCursor::new(self)
    }

    /// Bytes held by the compressed records.
    pub fn arena_bytes(&self) -> usize {
        self.arena.size_in_bytes()
    }

    /// Approximate heap footprint: records plus directory arrays.
    pub fn memory_usage(&self) -> usize {
        self.arena_bytes() + directory_bytes(&self.directory)
    }
}

fn directory_bytes(directory: &AdjacencyDirectory) -> usize {
    directory.node_count() * (std::mem::size_of::<u32>() + 2 * std::mem::size_of::<u64>())
}

impl ImmutableAdjacency for CompressedAdjacencyList {
    #[inline(always)]
    fn node_count(&self) -> usize {
        self.directory.node_count()
    }

    fn relationship_count(&self) -> u64 {
        self.directory.relationship_count()
    }

    #[inline(always)]
    fn degree(&self, node: u64) -> u32 {
        self.directory.degree(node)
    }

    fn successors(&self, node: u64) -> Box<[u64]> {
        self.adjacency_cursor(node).collect()
    }
}

/// Compressed property channels of every relationship, aligned with the neighbor lists.
#[derive(Clone, Debug)]
pub struct AdjacencyProperties {
    directory: Arc<AdjacencyDirectory>,
    arena: Arena,
    rule: LayoutRule,
    channel_count: usize,
}

impl AdjacencyProperties {
    pub(crate) fn new(directory: Arc<AdjacencyDirectory>, arena: Arena, rule: LayoutRule, channel_count: usize) -> Self {
        AdjacencyProperties {
            directory,
            arena,
            rule,
            channel_count,
        }
    }

    #[inline(always)]
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    #[inline(always)]
    pub fn degree(&self, node: u64) -> u32 {
        self.directory.degree(node)
    }

    /// The bytes starting at `channel` of the property record of `node`.
    pub(crate) fn channel_record(&self, node: u64, channel: usize) -> Option<(&[u8], RecordLayout)> {
        let degree = self.degree(node) as usize;
        if degree == 0 {
            return None;
        }

        let bytes = self.arena.bytes_at(self.directory.property_offset(node));
        let layout = self.rule.layout(degree);

        let start = match layout {
            RecordLayout::DeltaVarLong => channel * degree * std::mem::size_of::<u64>(),
            RecordLayout::Packed => {
                let header_len = layout.header_len(degree);
                let mut start = 0;
                for _ in 0..channel {
                    start += packed_blocks_len(&bytes[start..start + header_len]);
                    start += skip_vlongs(&bytes[start..], degree % BLOCK_SIZE);
                }
                start
            }
        };

        Some((&bytes[start..], layout))
    }

    /// Returns a cursor over the values of `channel` for the relationships of `node`.
    pub fn property_cursor(&self, node: u64, channel: usize) -> PropertyCursor<'_> {
        let mut cursor = PropertyCursor::new(self);
        cursor.init(node, channel);
        cursor
    }

    /// Repositions `cursor`, which must have been created by this structure, at `node`.
    pub fn property_cursor_reuse<'a>(&'a self, mut cursor: PropertyCursor<'a>, node: u64, channel: usize) -> PropertyCursor<'a> {
        cursor.init(node, channel);
        cursor
    }

    pub fn raw_property_cursor(&self) -> PropertyCursor<'_> {
        PropertyCursor::new(self)
    }

    pub fn memory_usage(&self) -> usize {
        self.arena.size_in_bytes()
    }
}

/// Summary of a built structure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompressionStats {
    pub node_count: usize,
    pub relationship_count: u64,
    pub strategy: CompressionStrategy,
    /// Largest degree still stored as delta varlongs by the mixed strategy.
    pub packed_degree_threshold: usize,
    pub packed_nodes: usize,
    pub varlong_nodes: usize,
    pub adjacency_bytes: usize,
    pub property_bytes: usize,
    pub directory_bytes: usize,
    pub bits_per_relationship: f64,
}

/// Everything a build produces.
#[derive(Clone, Debug)]
pub struct AdjacencyListsWithProperties {
    adjacency: CompressedAdjacencyList,
    properties: Option<AdjacencyProperties>,
    relationship_count: u64,
}

#[derive(Serialize)]
struct ExportRef<'a> {
    rule: LayoutRule,
    relationship_count: u64,
    channel_count: usize,
    directory: &'a AdjacencyDirectory,
    adjacency: &'a Arena,
    properties: Option<&'a Arena>,
}

#[derive(Deserialize)]
struct ExportOwned {
    rule: LayoutRule,
    relationship_count: u64,
    channel_count: usize,
    directory: AdjacencyDirectory,
    adjacency: Arena,
    properties: Option<Arena>,
}

/// Byte length of a record of `count` values led by `header_len` packed blocks, `None` if the
/// record does not fit in `bytes`.
fn checked_record_len(bytes: &[u8], header_len: usize, count: usize) -> Option<usize> {
    let header = bytes.get(..header_len)?;
    if header.iter().any(|&w| w > MAX_BIT_WIDTH) {
        return None;
    }

    let blocks = packed_blocks_len(header);
    let tail = checked_skip_vlongs(bytes.get(blocks..)?, count - header_len * BLOCK_SIZE)?;
    Some(blocks + tail)
}

impl ExportOwned {
    /// Checks that the directory agrees with itself and with the relationship count, and that
    /// every record it points to lies inside its arena.
    fn check(&self) -> Result<()> {
        let corrupted = |reason: String| Err(AdjacencyError::Serialization(reason));

        if self.properties.is_some() != (self.channel_count > 0) {
            return corrupted(format!(
                "blob declares {} property channels but {} a property arena",
                self.channel_count,
                if self.properties.is_some() { "has" } else { "lacks" }
            ));
        }
        if !self.directory.is_aligned() {
            return corrupted("directory arrays differ in length".to_owned());
        }
        let total = self.directory.relationship_count();
        if total != self.relationship_count {
            return corrupted(format!(
                "blob declares {} relationships but its degrees add up to {}",
                self.relationship_count, total
            ));
        }

        for node in 0..self.directory.node_count() as u64 {
            let degree = self.directory.degree(node) as usize;
            if degree == 0 {
                continue;
            }
            let layout = self.rule.layout(degree);
            let header_len = layout.header_len(degree);

            let adjacency_fits = self
                .adjacency
                .try_bytes_at(self.directory.adjacency_offset(node))
                .and_then(|bytes| checked_record_len(bytes, header_len, degree))
                .is_some();
            if !adjacency_fits {
                return corrupted(format!("adjacency record of node {} overruns its arena", node));
            }

            if let Some(arena) = &self.properties {
                let properties_fit = arena
                    .try_bytes_at(self.directory.property_offset(node))
                    .map_or(false, |bytes| match layout {
                        RecordLayout::Packed => (0..self.channel_count)
                            .try_fold(0usize, |start, _| {
                                Some(start + checked_record_len(bytes.get(start..)?, header_len, degree)?)
                            })
                            .is_some(),
                        RecordLayout::DeltaVarLong => self
                            .channel_count
                            .checked_mul(degree * std::mem::size_of::<u64>())
                            .map_or(false, |len| len <= bytes.len()),
                    });
                if !properties_fit {
                    return corrupted(format!("property record of node {} overruns its arena", node));
                }
            }
        }

        Ok(())
    }
}

impl AdjacencyListsWithProperties {
    pub(crate) fn new(
        adjacency: CompressedAdjacencyList,
        properties: Option<AdjacencyProperties>,
        relationship_count: u64,
    ) -> Self {
        AdjacencyListsWithProperties {
            adjacency,
            properties,
            relationship_count,
        }
    }

    #[inline(always)]
    pub fn adjacency(&self) -> &CompressedAdjacencyList {
        &self.adjacency
    }

    #[inline(always)]
    pub fn properties(&self) -> Option<&AdjacencyProperties> {
        self.properties.as_ref()
    }

    /// Total number of relationships compressed, as counted by the compressors.
    #[inline(always)]
    pub fn relationship_count(&self) -> u64 {
        self.relationship_count
    }

    pub fn memory_usage(&self) -> usize {
        self.adjacency.memory_usage() + self.properties.as_ref().map_or(0, |p| p.memory_usage())
    }

    pub fn stats(&self) -> CompressionStats {
        let rule = self.adjacency.rule();
        let directory = self.adjacency.directory();

        let mut packed_nodes = 0;
        let mut varlong_nodes = 0;
        for &degree in directory.degrees().iter().filter(|&&d| d > 0) {
            match rule.layout(degree as usize) {
                RecordLayout::Packed => packed_nodes += 1,
                RecordLayout::DeltaVarLong => varlong_nodes += 1,
            }
        }

        let adjacency_bytes = self.adjacency.arena_bytes();
        let bits_per_relationship = if self.relationship_count == 0 {
            0.0
        } else {
            (adjacency_bytes * 8) as f64 / self.relationship_count as f64
        };

        CompressionStats {
            node_count: directory.node_count(),
            relationship_count: self.relationship_count,
            strategy: rule.strategy(),
            packed_degree_threshold: rule.packed_threshold(),
            packed_nodes,
            varlong_nodes,
            adjacency_bytes,
            property_bytes: self.properties.as_ref().map_or(0, |p| p.memory_usage()),
            directory_bytes: directory_bytes(directory),
            bits_per_relationship,
        }
    }

    /// Serializes the whole structure into an opaque blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let export = ExportRef {
            rule: self.adjacency.rule,
            relationship_count: self.relationship_count,
            channel_count: self.properties.as_ref().map_or(0, |p| p.channel_count),
            directory: &self.adjacency.directory,
            adjacency: &self.adjacency.arena,
            properties: self.properties.as_ref().map(|p| &p.arena),
        };

        Ok(bincode::serialize(&export)?)
    }

    /// Restores a structure serialized with [`AdjacencyListsWithProperties::to_bytes`].
    ///
    /// Fails with [`AdjacencyError::Serialization`] if the blob does not decode, or decodes into
    /// a directory pointing outside of the stored records.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let export: ExportOwned = bincode::deserialize(bytes)?;
        export.check()?;

        let directory = Arc::new(export.directory);
        let properties = export.properties.map(|arena| {
            AdjacencyProperties::new(Arc::clone(&directory), arena, export.rule, export.channel_count)
        });

        Ok(AdjacencyListsWithProperties {
            adjacency: CompressedAdjacencyList::new(directory, export.adjacency, export.rule),
            properties,
            relationship_count: export.relationship_count,
        })
    }
}

impl ImmutableAdjacency for AdjacencyListsWithProperties {
    #[inline(always)]
    fn node_count(&self) -> usize {
        self.adjacency.node_count()
    }

    #[inline(always)]
    fn relationship_count(&self) -> u64 {
        self.relationship_count
    }

    #[inline(always)]
    fn degree(&self, node: u64) -> u32 {
        self.adjacency.degree(node)
    }

    fn successors(&self, node: u64) -> Box<[u64]> {
        self.adjacency.adjacency_cursor(node).collect()
    }
}
