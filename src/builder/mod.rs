//! Parallel construction of compressed adjacency lists from any source of per-node batches.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use rayon::{prelude::*, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use crate::{
    adjacency::AdjacencyListsWithProperties,
    aggregation::prepare,
    compression::{AdjacencyCompressor, Compress, CompressionStrategy},
    directory::DirectoryPartition,
    error::{AdjacencyError, Result},
    factory::CompressorFactory,
    properties::CompressionConfig,
};

/// The relationships of one node, in any order, before aggregation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RelationshipBatch {
    pub targets: Vec<u64>,
    /// One vector per property channel, each as long as `targets`.
    pub properties: Vec<Vec<f64>>,
}

impl RelationshipBatch {
    pub fn new(property_count: usize) -> Self {
        RelationshipBatch {
            targets: Vec::new(),
            properties: vec![Vec::new(); property_count],
        }
    }

    /// Empties the batch, keeping its channels and their capacity.
    pub fn clear(&mut self) {
        self.targets.clear();
        for channel in self.properties.iter_mut() {
            channel.clear();
        }
    }

    /// Appends one relationship.
    #[inline(always)]
    pub fn push(&mut self, target: u64, properties: &[f64]) {
        self.targets.push(target);
        for (channel, &value) in self.properties.iter_mut().zip(properties) {
            channel.push(value);
        }
    }
}

/// Provides the relationships of every node. Queried concurrently, one node at a time.
pub trait BatchSource: Sync {
    fn node_count(&self) -> usize;

    fn property_count(&self) -> usize {
        0
    }

    /// Appends the relationships of `node` to `batch`, which is empty on entry.
    fn fill_batch(&self, node: u64, batch: &mut RelationshipBatch) -> Result<()>;
}

type ProgressFn = Arc<dyn Fn(usize) + Send + Sync>;

/// Builds compressed adjacency lists with a fixed number of workers, each owning a disjoint range
/// of nodes and its own compressor.
#[derive(Clone)]
pub struct ParallelBuilder {
    config: CompressionConfig,
    termination: Arc<AtomicBool>,
    progress: Option<ProgressFn>,
}

impl fmt::Debug for ParallelBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelBuilder")
            .field("config", &self.config)
            .field("terminated", &self.termination.load(Ordering::Relaxed))
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Default for ParallelBuilder {
    fn default() -> Self {
        ParallelBuilder::new(CompressionConfig::default())
    }
}

impl ParallelBuilder {
    pub fn new(config: CompressionConfig) -> Self {
        ParallelBuilder {
            config,
            termination: Arc::new(AtomicBool::new(false)),
            progress: None,
        }
    }

    /// Sets the number of workers.
    ///
    /// # Arguments
    ///
    /// * `concurrency` - The number of workers, at least 1.
    pub fn set_concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;

        self
    }

    /// Sets the compression strategy.
    ///
    /// # Arguments
    ///
    /// * `strategy` - The strategy every worker compresses with.
    pub fn set_strategy(mut self, strategy: CompressionStrategy) -> Self {
        self.config.strategy = strategy;

        self
    }

    /// Sets the flag polled between two nodes; once raised, the build stops and is discarded.
    ///
    /// # Arguments
    ///
    /// * `termination` - The flag shared with whoever may cancel the build.
    pub fn set_termination_flag(mut self, termination: Arc<AtomicBool>) -> Self {
        self.termination = termination;

        self
    }

    /// Sets a callback receiving the number of nodes of each finished partition.
    pub fn set_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(progress));

        self
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Compresses every node of `source`.
    ///
    /// Fails with [`AdjacencyError::Terminated`] if the termination flag is raised before the end;
    /// nothing built so far is returned in that case.
    pub fn build<S: BatchSource>(&self, source: &S) -> Result<AdjacencyListsWithProperties> {
        let mut config = self.config.clone();
        if config.property_count != 0 && config.property_count != source.property_count() {
            return Err(AdjacencyError::PropertyChannelMismatch {
                expected: config.property_count,
                actual: source.property_count(),
            });
        }
        config.property_count = source.property_count();
        config.validate()?;

        let concurrency = config.concurrency;
        let pool = ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .build()
            .map_err(|e| AdjacencyError::Config(e.to_string()))?;

        let mut factory = CompressorFactory::new(config, source.node_count())?;
        let compressors: Vec<_> = (0..concurrency).map(|_| factory.create_compressor()).collect();
        let partitions = factory.directory_partitions(concurrency);

        let result = pool.install(|| {
            partitions
                .into_par_iter()
                .zip(compressors.into_par_iter())
                .try_for_each(|(mut partition, compressor)| self.compress_partition(source, &mut partition, compressor))
        });

        if let Err(e) = result {
            if matches!(e, AdjacencyError::Terminated) {
                warn!("build terminated, discarding partial adjacency lists");
            }
            return Err(e);
        }

        let lists = factory.build()?;
        info!(
            nodes = source.node_count(),
            relationships = lists.relationship_count(),
            bytes = lists.memory_usage(),
            workers = concurrency,
            "parallel build finished"
        );

        Ok(lists)
    }

    fn compress_partition<S: BatchSource>(
        &self,
        source: &S,
        partition: &mut DirectoryPartition<'_>,
        mut compressor: AdjacencyCompressor,
    ) -> Result<()> {
        debug!(start = partition.start(), end = partition.end(), "compressing partition");

        let mut batch = RelationshipBatch::new(source.property_count());
        let result = partition.nodes().try_for_each(|node| {
            if self.termination.load(Ordering::Relaxed) {
                return Err(AdjacencyError::Terminated);
            }

            batch.clear();
            source.fill_batch(node, &mut batch)?;

            let degree = prepare(
                node,
                &mut batch.targets,
                &mut batch.properties,
                self.config.aggregation,
                &self.config.property_aggregations,
            )?;
            compressor.compress(partition, node, &mut batch.targets, &batch.properties, degree)?;

            Ok(())
        });
        compressor.close();
        result?;

        if let Some(progress) = &self.progress {
            progress(partition.len());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
