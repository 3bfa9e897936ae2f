use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use packed_csr::compression::RecordLayout;
use packed_csr::{
    AdjacencyError, AdjacencyListsWithProperties, Aggregation, BatchSource, CompressionConfig, CompressionStrategy,
    ImmutableAdjacency, ParallelBuilder, RelationshipBatch, Result,
};

/// One node per entry; every relationship carries a weight of 1.
struct Weighted(Vec<Vec<u64>>);

impl BatchSource for Weighted {
    fn node_count(&self) -> usize {
        self.0.len()
    }

    fn property_count(&self) -> usize {
        1
    }

    fn fill_batch(&self, node: u64, batch: &mut RelationshipBatch) -> Result<()> {
        for &target in &self.0[node as usize] {
            batch.push(target, &[1.0]);
        }
        Ok(())
    }
}

fn build(source: &Weighted, aggregation: Aggregation) -> AdjacencyListsWithProperties {
    let config = CompressionConfig {
        aggregation,
        concurrency: 1,
        ..Default::default()
    };
    ParallelBuilder::new(config).build(source).unwrap()
}

#[test]
fn test_duplicates_kept_without_aggregation() {
    let lists = build(&Weighted(vec![vec![5, 5, 9, 20, 21]]), Aggregation::None);
    let adjacency = lists.adjacency();

    assert_eq!(adjacency.layout(0), RecordLayout::DeltaVarLong);
    assert_eq!(adjacency.degree(0), 5);
    assert_eq!(adjacency.adjacency_cursor(0).collect::<Vec<_>>(), vec![5, 5, 9, 20, 21]);
}

#[test]
fn test_duplicates_summed() {
    let lists = build(&Weighted(vec![vec![5, 5, 9, 20, 21]]), Aggregation::Sum);

    assert_eq!(lists.degree(0), 4);
    assert_eq!(&*lists.successors(0), &[5, 9, 20, 21]);
    assert_eq!(
        lists.properties().unwrap().property_cursor(0, 0).collect::<Vec<_>>(),
        vec![2.0, 1.0, 1.0, 1.0]
    );
}

#[test]
fn test_threshold_boundary() {
    let at: Vec<u64> = (0..512).map(|i| i * 3 + 1).collect();
    let above: Vec<u64> = (0..513).map(|i| i * 3 + 1).collect();
    let lists = build(&Weighted(vec![at.clone(), above.clone()]), Aggregation::None);
    let adjacency = lists.adjacency();

    assert_eq!(adjacency.layout(0), RecordLayout::DeltaVarLong);
    assert_eq!(adjacency.layout(1), RecordLayout::Packed);
    assert_eq!(adjacency.adjacency_cursor(0).collect::<Vec<_>>(), at);
    assert_eq!(adjacency.adjacency_cursor(1).collect::<Vec<_>>(), above);
    assert_eq!(lists.properties().unwrap().property_cursor(1, 0).len(), 513);
}

#[test]
fn test_termination_flag_raised_mid_build() {
    let flag = Arc::new(AtomicBool::new(false));
    let raiser = Arc::clone(&flag);
    let source = Weighted((0..10_000).map(|n| vec![n, n + 1]).collect());

    let result = ParallelBuilder::default()
        .set_concurrency(4)
        .set_termination_flag(Arc::clone(&flag))
        .set_progress(move |_| raiser.store(true, Ordering::Relaxed))
        .build(&source);

    // The first finished partition raises the flag; unless all of them were already done, the
    // build is discarded.
    match result {
        Err(AdjacencyError::Terminated) => {}
        Ok(lists) => assert_eq!(lists.relationship_count(), 20_000),
        Err(e) => panic!("unexpected error {}", e),
    }
    assert!(flag.load(Ordering::Relaxed));
}

#[test]
fn test_export_blob() {
    let source = Weighted((0..300).map(|n| (0..n).map(|i| i * 7).collect()).collect());
    let lists = build(&source, Aggregation::None);

    let restored = AdjacencyListsWithProperties::from_bytes(&lists.to_bytes().unwrap()).unwrap();
    assert_eq!(restored.node_count(), 300);
    for node in 0..300 {
        assert_eq!(restored.successors(node), lists.successors(node));
        assert_eq!(
            restored.properties().unwrap().property_cursor(node, 0).sum::<f64>(),
            node as f64
        );
    }
}
