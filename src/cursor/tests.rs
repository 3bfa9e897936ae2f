use super::*;
use crate::{
    adjacency::AdjacencyListsWithProperties,
    compression::{Compress, CompressionStrategy},
    factory::CompressorFactory,
    properties::CompressionConfig,
};

fn build(strategy: CompressionStrategy, lists: &[Vec<u64>]) -> AdjacencyListsWithProperties {
    let config = CompressionConfig {
        strategy,
        concurrency: 1,
        ..Default::default()
    };
    let mut factory = CompressorFactory::new(config, lists.len()).unwrap();
    let mut compressor = factory.create_compressor();
    {
        let mut partition = factory.directory_partition();
        for (node, list) in lists.iter().enumerate() {
            let mut targets = list.clone();
            compressor
                .compress(&mut partition, node as u64, &mut targets, &[], list.len())
                .unwrap();
        }
    }
    compressor.close();
    factory.build().unwrap()
}

fn spread(len: u64) -> Vec<u64> {
    (0..len).map(|i| i * i * 1_000_003 + (i % 7)).collect()
}

#[test]
fn test_next_and_peek() {
    let lists = build(CompressionStrategy::Mixed, &[vec![5, 5, 9, 20, 21]]);
    let mut cursor = lists.adjacency().adjacency_cursor(0);

    assert_eq!(cursor.state(), CursorState::BlockReady);
    assert_eq!(cursor.size(), 5);
    assert_eq!(cursor.peek(), 5);
    assert_eq!(cursor.next(), Some(5));
    assert_eq!(cursor.peek(), 5);
    assert_eq!(cursor.remaining(), 4);
    assert_eq!(cursor.by_ref().collect::<Vec<_>>(), vec![5, 9, 20, 21]);

    assert!(!cursor.has_next());
    assert_eq!(cursor.state(), CursorState::Exhausted);
    assert_eq!(cursor.peek(), NOT_FOUND);
    assert_eq!(cursor.next(), None);
}

#[test]
fn test_every_strategy_decodes_every_block() {
    let list = spread(1000);
    for strategy in [CompressionStrategy::Packed, CompressionStrategy::DeltaVarLong, CompressionStrategy::Mixed] {
        let lists = build(strategy, &[list.clone()]);
        let cursor = lists.adjacency().adjacency_cursor(0);
        assert_eq!(cursor.len(), 1000);
        assert_eq!(cursor.collect::<Vec<_>>(), list, "strategy {}", strategy);
    }
}

#[test]
fn test_large_ids() {
    let list = vec![0, 1, u64::MAX / 2, u64::MAX - 2, u64::MAX - 1];
    let mut long = spread(64);
    long.push(u64::MAX - 1);

    for strategy in [CompressionStrategy::Packed, CompressionStrategy::DeltaVarLong] {
        let lists = build(strategy, &[list.clone(), long.clone()]);
        assert_eq!(lists.adjacency().adjacency_cursor(0).collect::<Vec<_>>(), list);
        assert_eq!(lists.adjacency().adjacency_cursor(1).collect::<Vec<_>>(), long);
    }
}

#[test]
fn test_skip_until_and_advance() {
    let list: Vec<u64> = (0..200).map(|i| i * 3).collect();
    let lists = build(CompressionStrategy::Packed, &[list]);
    let mut cursor = lists.adjacency().adjacency_cursor(0);

    assert_eq!(cursor.skip_until(10), 12);
    assert_eq!(cursor.advance(12), 15);
    assert_eq!(cursor.advance(15), 18);
    assert_eq!(cursor.skip_until(300), 303);
    assert_eq!(cursor.peek(), 306);
    assert_eq!(cursor.advance(597), 597);
    assert!(!cursor.has_next());
    assert_eq!(cursor.advance(0), NOT_FOUND);

    let mut cursor = lists.adjacency().adjacency_cursor(0);
    assert_eq!(cursor.skip_until(597), NOT_FOUND);
    assert_eq!(cursor.remaining(), 0);
}

#[test]
fn test_cursor_reuse() {
    let lists = build(
        CompressionStrategy::Mixed,
        &[spread(100), Vec::new(), vec![3, 4], spread(700)],
    );
    let adjacency = lists.adjacency();

    let mut cursor = adjacency.raw_adjacency_cursor();
    assert_eq!(cursor.state(), CursorState::Uninitialized);

    for (node, expected) in [(3, spread(700)), (0, spread(100)), (1, Vec::new()), (2, vec![3, 4])] {
        cursor = adjacency.adjacency_cursor_reuse(cursor, node);
        assert_eq!(cursor.size(), expected.len());
        assert_eq!(cursor.by_ref().collect::<Vec<_>>(), expected);
    }

    // A partially consumed cursor starts over.
    cursor.init(3);
    cursor.skip_until(1_000_000_000);
    cursor.init(3);
    assert_eq!(cursor.next(), Some(0));
}

#[test]
fn test_empty_and_missing_nodes() {
    let lists = build(CompressionStrategy::Packed, &[Vec::new()]);
    for node in [0, 42] {
        let mut cursor = lists.adjacency().adjacency_cursor(node);
        assert_eq!(cursor.state(), CursorState::Exhausted);
        assert_eq!(cursor.size(), 0);
        assert!(!cursor.has_next());
        assert_eq!(cursor.peek(), NOT_FOUND);
        assert_eq!(cursor.skip_until(0), NOT_FOUND);
    }
}

#[test]
#[should_panic(expected = "Cursor used before being initialized")]
fn test_uninitialized_cursor() {
    let lists = build(CompressionStrategy::Packed, &[vec![1]]);
    let cursor = lists.adjacency().raw_adjacency_cursor();
    cursor.has_next();
}

#[test]
fn test_unsupported_operations() {
    let lists = build(CompressionStrategy::Packed, &[vec![1, 2, 3]]);
    let mut cursor = lists.adjacency().adjacency_cursor(0);

    assert!(matches!(cursor.advance_by_offset(2), Err(AdjacencyError::NotImplemented(_))));
    assert!(matches!(cursor.shallow_copy(None), Err(AdjacencyError::NotImplemented(_))));
    assert_eq!(cursor.next(), Some(1));
}

#[test]
fn test_block_decoder_chunks_tail() {
    let values: Vec<u64> = (0..150).collect();
    let mut gaps = values.clone();
    crate::utils::varlong::delta_encode(0, &mut gaps).unwrap();
    let mut bytes = Vec::new();
    crate::utils::varlong::encode_vlongs(&gaps, &mut bytes);

    let mut decoder = BlockDecoder::new(&bytes, 0, values.len(), true);
    let mut block = [0u64; BLOCK_SIZE];
    let mut decoded = Vec::new();
    let mut sizes = Vec::new();
    loop {
        let len = decoder.next_block(&mut block);
        if len == 0 {
            break;
        }
        sizes.push(len);
        decoded.extend_from_slice(&block[..len]);
    }

    assert_eq!(sizes, vec![64, 64, 22]);
    assert_eq!(decoded, values);
}
