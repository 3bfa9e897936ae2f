use std::{fmt::Debug, fs, path::Path, str::FromStr};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    builder::{BatchSource, RelationshipBatch},
    error::{AdjacencyError, Result},
    ImmutableAdjacency,
};

/// An uncompressed graph read from text, one line per node:
/// `node<TAB>succ<TAB>succ...`. A successor may carry a weight, as in `succ:weight`.
///
/// Successor lists are kept in file order, duplicates included.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AsciiGraph<T> {
    n: usize,
    m: usize,
    successors: Vec<T>,
    weights: Option<Vec<f64>>,
    offsets: Vec<usize>,
}

impl<T> AsciiGraph<T>
where
    T: num_traits::PrimInt + Serialize + DeserializeOwned + Debug,
{
    #[inline(always)]
    pub fn num_nodes(&self) -> usize {
        self.n
    }

    #[inline(always)]
    pub fn num_arcs(&self) -> usize {
        self.m
    }

    /// Whether the successors carry weights.
    #[inline(always)]
    pub fn is_weighted(&self) -> bool {
        self.weights.is_some()
    }

    /// Returns the successors of `x`, empty if `x` is out of range.
    ///
    /// # Arguments
    ///
    /// * `x` - The node number (from *0* to *n - 1*)
    #[inline(always)]
    pub fn successors_of(&self, x: usize) -> &[T] {
        if x >= self.n {
            return &[];
        }
        &self.successors[self.offsets[x]..self.offsets[x + 1]]
    }

    /// Returns the weights of the successors of `x`, if the graph is weighted.
    #[inline(always)]
    pub fn weights_of(&self, x: usize) -> Option<&[f64]> {
        let weights = self.weights.as_ref()?;
        if x >= self.n {
            return Some(&[]);
        }
        Some(&weights[self.offsets[x]..self.offsets[x + 1]])
    }
}

impl<T> ImmutableAdjacency for AsciiGraph<T>
where
    T: num_traits::PrimInt + Serialize + DeserializeOwned + Debug,
{
    #[inline(always)]
    fn node_count(&self) -> usize {
        self.n
    }

    #[inline(always)]
    fn relationship_count(&self) -> u64 {
        self.m as u64
    }

    #[inline(always)]
    fn degree(&self, node: u64) -> u32 {
        self.successors_of(node as usize).len() as u32
    }

    /// Returns the successors of `node` sorted ascending, the way a compressed list yields them.
    fn successors(&self, node: u64) -> Box<[u64]> {
        let mut successors: Vec<u64> = self
            .successors_of(node as usize)
            .iter()
            .filter_map(|s| s.to_u64())
            .collect();
        successors.sort_unstable();
        successors.into_boxed_slice()
    }
}

impl<T> BatchSource for AsciiGraph<T>
where
    T: num_traits::PrimInt + Serialize + DeserializeOwned + Debug + Sync,
{
    #[inline(always)]
    fn node_count(&self) -> usize {
        self.n
    }

    fn property_count(&self) -> usize {
        usize::from(self.is_weighted())
    }

    fn fill_batch(&self, node: u64, batch: &mut RelationshipBatch) -> Result<()> {
        let successors = self.successors_of(node as usize);
        batch.targets.extend(successors.iter().filter_map(|s| s.to_u64()));
        if let (Some(weights), Some(channel)) = (self.weights_of(node as usize), batch.properties.first_mut()) {
            channel.extend_from_slice(weights);
        }
        Ok(())
    }
}

pub struct AsciiGraphBuilder<T> {
    num_nodes: usize,
    num_edges: usize,
    lists: Vec<Vec<(T, Option<f64>)>>,
}

impl<T> Default for AsciiGraphBuilder<T> {
    fn default() -> Self {
        Self {
            num_nodes: 0,
            num_edges: 0,
            lists: Vec::default(),
        }
    }
}

fn parse_token<V: FromStr>(line: usize, token: &str) -> Result<V> {
    token.trim().parse().map_err(|_| AdjacencyError::Parse {
        line,
        token: token.to_owned(),
    })
}

impl<T> AsciiGraphBuilder<T>
where
    T: num_traits::PrimInt + FromStr + Serialize + DeserializeOwned + Debug,
{
    pub fn new() -> AsciiGraphBuilder<T> {
        Self::default()
    }

    /// Loads an ASCII file containing, for each line, the node followed by the list of its
    /// successors.
    ///
    /// # Arguments
    ///
    /// * `path` - The path of the ASCII graph
    pub fn load_ascii<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        self.parse_ascii(&data)
    }

    /// Parses the ASCII representation of a graph. Lines may come in any order; nodes without a
    /// line, and successors never listed as a node, have no successors.
    pub fn parse_ascii(mut self, data: &str) -> Result<Self> {
        for (line_no, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let mut tokens = line.split('\t');
            let node: usize = parse_token(line_no + 1, tokens.next().unwrap_or_default())?;

            let mut successors = Vec::new();
            for token in tokens.filter(|t| !t.trim().is_empty()) {
                let successor = match token.split_once(':') {
                    Some((succ, weight)) => (
                        parse_token::<T>(line_no + 1, succ)?,
                        Some(parse_token::<f64>(line_no + 1, weight)?),
                    ),
                    None => (parse_token::<T>(line_no + 1, token)?, None),
                };

                let succ_id = successor.0.to_usize().ok_or_else(|| AdjacencyError::Parse {
                    line: line_no + 1,
                    token: token.to_owned(),
                })?;
                self.num_nodes = self.num_nodes.max(succ_id + 1);
                successors.push(successor);
            }

            self.num_nodes = self.num_nodes.max(node + 1);
            if self.lists.len() <= node {
                self.lists.resize_with(node + 1, Vec::new);
            }
            self.num_edges += successors.len();
            self.lists[node].extend(successors);
        }

        Ok(self)
    }

    /// Constructs the AsciiGraph object.
    ///
    /// The graph is weighted as soon as one successor carries a weight; the others weigh 1.
    pub fn build(self) -> AsciiGraph<T> {
        let weighted = self.lists.iter().flatten().any(|(_, w)| w.is_some());

        let mut offsets = Vec::with_capacity(self.num_nodes + 1);
        let mut successors = Vec::with_capacity(self.num_edges);
        let mut weights = Vec::with_capacity(if weighted { self.num_edges } else { 0 });

        offsets.push(0);
        for node in 0..self.num_nodes {
            if let Some(list) = self.lists.get(node) {
                for &(succ, weight) in list {
                    successors.push(succ);
                    if weighted {
                        weights.push(weight.unwrap_or(1.0));
                    }
                }
            }
            offsets.push(successors.len());
        }

        AsciiGraph {
            n: self.num_nodes,
            m: self.num_edges,
            successors,
            weights: weighted.then_some(weights),
            offsets,
        }
    }
}
