use std::sync::atomic::AtomicUsize;

use super::*;
use crate::{aggregation::Aggregation, ImmutableAdjacency};

/// Node `n` points to every multiple of `n + 1` below 2000, twice, in descending order.
struct Multiples {
    nodes: usize,
    weighted: bool,
}

impl BatchSource for Multiples {
    fn node_count(&self) -> usize {
        self.nodes
    }

    fn property_count(&self) -> usize {
        usize::from(self.weighted)
    }

    fn fill_batch(&self, node: u64, batch: &mut RelationshipBatch) -> Result<()> {
        for target in (0..2000u64).step_by(node as usize + 1).collect::<Vec<_>>().into_iter().rev() {
            batch.push(target, &[1.0]);
            batch.push(target, &[target as f64]);
        }
        Ok(())
    }
}

fn multiples(node: u64) -> Vec<u64> {
    (0..2000).step_by(node as usize + 1).collect()
}

#[test]
fn test_parallel_build_matches_source() {
    let source = Multiples { nodes: 100, weighted: false };
    for strategy in [CompressionStrategy::Packed, CompressionStrategy::DeltaVarLong, CompressionStrategy::Mixed] {
        let lists = ParallelBuilder::default()
            .set_concurrency(3)
            .set_strategy(strategy)
            .build(&source)
            .unwrap();

        assert_eq!(lists.node_count(), 100);
        for node in 0..100 {
            let expected: Vec<u64> = multiples(node).into_iter().flat_map(|t| [t, t]).collect();
            assert_eq!(lists.successors(node).into_vec(), expected, "strategy {} node {}", strategy, node);
        }
        assert!(lists.properties().is_none());
    }
}

#[test]
fn test_parallel_build_aggregates() {
    let source = Multiples { nodes: 20, weighted: true };
    let config = CompressionConfig {
        aggregation: Aggregation::Sum,
        concurrency: 2,
        ..Default::default()
    };
    let lists = ParallelBuilder::new(config).build(&source).unwrap();
    let properties = lists.properties().unwrap();

    for node in 0..20 {
        let expected = multiples(node);
        assert_eq!(lists.degree(node) as usize, expected.len());
        assert_eq!(lists.successors(node).into_vec(), expected);

        let sums: Vec<f64> = properties.property_cursor(node, 0).collect();
        let expected_sums: Vec<f64> = expected.iter().map(|&t| t as f64 + 1.0).collect();
        assert_eq!(sums, expected_sums);
    }
}

#[test]
fn test_progress_reports_every_node() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);

    let source = Multiples { nodes: 57, weighted: false };
    ParallelBuilder::default()
        .set_concurrency(4)
        .set_progress(move |nodes| {
            counter.fetch_add(nodes, Ordering::Relaxed);
        })
        .build(&source)
        .unwrap();

    assert_eq!(seen.load(Ordering::Relaxed), 57);
}

#[test]
fn test_termination_discards_build() {
    let flag = Arc::new(AtomicBool::new(true));
    let source = Multiples { nodes: 10, weighted: false };

    let result = ParallelBuilder::default()
        .set_concurrency(2)
        .set_termination_flag(Arc::clone(&flag))
        .build(&source);
    assert!(matches!(result, Err(AdjacencyError::Terminated)));

    flag.store(false, Ordering::Relaxed);
    let builder = ParallelBuilder::default().set_concurrency(2).set_termination_flag(flag);
    assert!(builder.build(&source).is_ok());
}

#[test]
fn test_channel_count_must_match() {
    let source = Multiples { nodes: 3, weighted: true };
    let config = CompressionConfig {
        property_count: 2,
        concurrency: 1,
        ..Default::default()
    };

    assert!(matches!(
        ParallelBuilder::new(config).build(&source),
        Err(AdjacencyError::PropertyChannelMismatch { expected: 2, actual: 1 })
    ));
}

#[test]
fn test_empty_source() {
    let source = Multiples { nodes: 0, weighted: false };
    let lists = ParallelBuilder::default().set_concurrency(2).build(&source).unwrap();

    assert_eq!(lists.node_count(), 0);
    assert_eq!(lists.relationship_count(), 0);
}
