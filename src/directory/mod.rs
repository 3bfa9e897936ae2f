use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::{
    arena::ArenaAddress,
    error::{AdjacencyError, Result},
};

/// The node-indexed index into the compressed arenas: one degree, one adjacency address and one
/// property address per node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyDirectory {
    degrees: Vec<u32>,
    adjacency_offsets: Vec<ArenaAddress>,
    property_offsets: Vec<ArenaAddress>,
}

fn zeroed<T: Clone + Default>(len: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| AdjacencyError::CapacityExhausted { requested: len * std::mem::size_of::<T>() })?;
    v.resize(len, T::default());
    Ok(v)
}

impl AdjacencyDirectory {
    /// Allocates a zeroed directory for `node_count` nodes.
    pub fn new(node_count: usize) -> Result<Self> {
        Ok(AdjacencyDirectory {
            degrees: zeroed(node_count)?,
            adjacency_offsets: zeroed(node_count)?,
            property_offsets: zeroed(node_count)?,
        })
    }

    #[inline(always)]
    pub fn node_count(&self) -> usize {
        self.degrees.len()
    }

    /// Returns the degree of `node`, or zero if the node is out of range.
    #[inline(always)]
    pub fn degree(&self, node: u64) -> u32 {
        self.degrees.get(node as usize).copied().unwrap_or(0)
    }

    #[inline(always)]
    pub fn adjacency_offset(&self, node: u64) -> ArenaAddress {
        self.adjacency_offsets[node as usize]
    }

    #[inline(always)]
    pub fn property_offset(&self, node: u64) -> ArenaAddress {
        self.property_offsets[node as usize]
    }

    pub fn degrees(&self) -> &[u32] {
        &self.degrees
    }

    /// Sum of all degrees.
    pub fn relationship_count(&self) -> u64 {
        self.degrees.iter().map(|&d| d as u64).sum()
    }

    /// Whether the degree and offset arrays all cover the same nodes. Always holds for a
    /// directory built here, not necessarily for a deserialized one.
    pub fn is_aligned(&self) -> bool {
        self.adjacency_offsets.len() == self.degrees.len() && self.property_offsets.len() == self.degrees.len()
    }

    /// Returns a single partition covering every node.
    pub fn whole(&mut self) -> DirectoryPartition<'_> {
        DirectoryPartition {
            start: 0,
            degrees: &mut self.degrees,
            adjacency_offsets: &mut self.adjacency_offsets,
            property_offsets: &mut self.property_offsets,
        }
    }

    /// Splits the directory into at most `count` disjoint partitions of consecutive nodes.
    ///
    /// Every node belongs to exactly one partition, so each partition can be handed to a
    /// different worker without any synchronization. An empty directory has no partitions.
    pub fn partitions(&mut self, count: usize) -> Vec<DirectoryPartition<'_>> {
        let node_count = self.node_count();
        let chunk = ((node_count + count.max(1) - 1) / count.max(1)).max(1);

        self.degrees
            .chunks_mut(chunk)
            .zip(self.adjacency_offsets.chunks_mut(chunk))
            .zip(self.property_offsets.chunks_mut(chunk))
            .enumerate()
            .map(|(i, ((degrees, adjacency_offsets), property_offsets))| DirectoryPartition {
                start: (i * chunk) as u64,
                degrees,
                adjacency_offsets,
                property_offsets,
            })
            .collect()
    }
}

/// Exclusive write access to the directory entries of a contiguous range of nodes.
#[derive(Debug)]
pub struct DirectoryPartition<'a> {
    start: u64,
    degrees: &'a mut [u32],
    adjacency_offsets: &'a mut [ArenaAddress],
    property_offsets: &'a mut [ArenaAddress],
}

impl<'a> DirectoryPartition<'a> {
    #[inline(always)]
    pub fn start(&self) -> u64 {
        self.start
    }

    #[inline(always)]
    pub fn end(&self) -> u64 {
        self.start + self.degrees.len() as u64
    }

    /// The nodes owned by this partition.
    #[inline(always)]
    pub fn nodes(&self) -> Range<u64> {
        self.start..self.end()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.degrees.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.degrees.is_empty()
    }

    /// Fails unless `node` belongs to this partition.
    #[inline(always)]
    pub fn check(&self, node: u64) -> Result<usize> {
        if node < self.start || node >= self.end() {
            return Err(AdjacencyError::NodeOutOfPartition {
                node,
                start: self.start,
                end: self.end(),
            });
        }
        Ok((node - self.start) as usize)
    }

    /// Records where the compressed lists of `node` live.
    pub fn set(
        &mut self,
        node: u64,
        degree: u32,
        adjacency_offset: ArenaAddress,
        property_offset: ArenaAddress,
    ) -> Result<()> {
        let idx = self.check(node)?;
        self.degrees[idx] = degree;
        self.adjacency_offsets[idx] = adjacency_offset;
        self.property_offsets[idx] = property_offset;
        Ok(())
    }

    pub fn degree(&self, node: u64) -> Result<u32> {
        Ok(self.degrees[self.check(node)?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partitions_are_disjoint_and_complete() {
        let mut directory = AdjacencyDirectory::new(10).unwrap();
        let partitions = directory.partitions(3);

        let ranges: Vec<_> = partitions.iter().map(|p| p.nodes()).collect();
        assert_eq!(ranges, vec![0..4, 4..8, 8..10]);
    }

    #[test]
    fn test_more_partitions_than_nodes() {
        let mut directory = AdjacencyDirectory::new(2).unwrap();
        assert_eq!(directory.partitions(8).len(), 2);

        let mut empty = AdjacencyDirectory::new(0).unwrap();
        assert!(empty.partitions(4).is_empty());
        assert!(empty.whole().is_empty());
    }

    #[test]
    fn test_writes_land_in_directory() {
        let mut directory = AdjacencyDirectory::new(6).unwrap();
        {
            let mut partitions = directory.partitions(2);
            partitions[1].set(4, 3, ArenaAddress::new(1, 8), ArenaAddress::new(0, 2)).unwrap();
            partitions[0].set(0, 9, ArenaAddress::new(0, 0), ArenaAddress::default()).unwrap();
        }

        assert_eq!(directory.degree(4), 3);
        assert_eq!(directory.adjacency_offset(4), ArenaAddress::new(1, 8));
        assert_eq!(directory.property_offset(4), ArenaAddress::new(0, 2));
        assert_eq!(directory.degree(0), 9);
        assert_eq!(directory.degree(100), 0);
        assert_eq!(directory.relationship_count(), 12);
    }

    #[test]
    fn test_write_outside_partition() {
        let mut directory = AdjacencyDirectory::new(6).unwrap();
        let mut partitions = directory.partitions(2);

        match partitions[0].set(5, 1, ArenaAddress::default(), ArenaAddress::default()) {
            Err(AdjacencyError::NodeOutOfPartition { node, start, end }) => {
                assert_eq!((node, start, end), (5, 0, 3));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }
}
