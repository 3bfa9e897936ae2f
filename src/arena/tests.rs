use std::{sync::Arc, thread};

use super::*;

#[test]
fn test_address_packing() {
    let address = ArenaAddress::new(7, 1234);
    assert_eq!(address.page(), 7);
    assert_eq!(address.offset(), 1234);
    assert_eq!(address.raw(), (7u64 << 32) | 1234);
}

#[test]
fn test_records_spill_to_new_pages() {
    let builder = Arc::new(ArenaBuilder::new(16));
    let mut allocator = builder.allocator();

    let a = allocator.insert(&[1; 10]).unwrap();
    let b = allocator.insert(&[2; 6]).unwrap();
    let c = allocator.insert(&[3; 4]).unwrap();
    // Larger than a page: gets its own page.
    let d = allocator.insert(&[4; 40]).unwrap();
    let e = allocator.insert(&[5; 1]).unwrap();
    drop(allocator);

    assert_eq!((a.page(), a.offset()), (0, 0));
    assert_eq!((b.page(), b.offset()), (0, 10));
    assert_eq!((c.page(), c.offset()), (1, 0));
    assert_eq!((d.page(), d.offset()), (2, 0));
    assert_eq!((e.page(), e.offset()), (3, 0));

    let arena = builder.freeze().unwrap();
    assert_eq!(arena.page_count(), 4);
    assert_eq!(arena.size_in_bytes(), 61);
    assert_eq!(&arena.bytes_at(b)[..6], &[2; 6]);
    assert_eq!(arena.bytes_at(d), &[4; 40][..]);
    assert_eq!(arena.bytes_at(e), &[5]);
}

#[test]
fn test_freeze_detects_live_allocator() {
    let builder = Arc::new(ArenaBuilder::new(64));
    let mut first = builder.allocator();
    let mut second = builder.allocator();
    first.insert(&[1, 2, 3]).unwrap();
    second.insert(&[4, 5, 6]).unwrap();
    drop(second);

    match builder.freeze() {
        Err(AdjacencyError::UnsealedArena(page)) => assert_eq!(page, 0),
        other => panic!("unexpected result {:?}", other),
    }
    drop(first);
}

#[test]
fn test_concurrent_allocators() {
    let builder = Arc::new(ArenaBuilder::new(128));

    let handles: Vec<_> = (0..8u8)
        .map(|t| {
            let mut allocator = builder.allocator();
            thread::spawn(move || {
                (0..200u8)
                    .map(|i| {
                        let record = [t, i, t ^ i];
                        (record, allocator.insert(&record).unwrap())
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let written: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    let arena = builder.freeze().unwrap();
    for (record, address) in written {
        assert_eq!(&arena.bytes_at(address)[..3], &record);
    }
    assert_eq!(arena.size_in_bytes(), 8 * 200 * 3);
}
