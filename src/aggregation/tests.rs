use super::*;

#[test]
fn test_names() {
    for aggregation in [
        Aggregation::Default,
        Aggregation::None,
        Aggregation::Single,
        Aggregation::Sum,
        Aggregation::Min,
        Aggregation::Max,
        Aggregation::Count,
    ] {
        assert_eq!(aggregation.to_string().parse::<Aggregation>().unwrap(), aggregation);
    }
    assert_eq!("sum".parse::<Aggregation>().unwrap(), Aggregation::Sum);
    assert_eq!(Aggregation::parse_list(" max, count ,").unwrap(), vec![Aggregation::Max, Aggregation::Count]);
    assert!(Aggregation::parse_list("sum,avg").is_err());
    assert_eq!(Aggregation::Default.resolve(), Aggregation::None);
}

#[test]
fn test_none_keeps_parallel_relationships() {
    let mut targets = vec![5, 5, 9, 20, 21];
    let degree = prepare(0, &mut targets, &mut [], Aggregation::None, &[]).unwrap();

    assert_eq!(degree, 5);
    assert_eq!(targets, vec![5, 5, 9, 20, 21]);
}

#[test]
fn test_sum_collapses_duplicates() {
    let mut targets = vec![5, 5, 9, 20, 21];
    let mut properties = vec![vec![1.0; 5]];
    let degree = prepare(0, &mut targets, &mut properties, Aggregation::Sum, &[]).unwrap();

    assert_eq!(degree, 4);
    assert_eq!(targets, vec![5, 9, 20, 21]);
    assert_eq!(properties, vec![vec![2.0, 1.0, 1.0, 1.0]]);
}

#[test]
fn test_sorting_carries_properties() {
    let mut targets = vec![7, 3, 7, 1, 3];
    let mut properties = vec![vec![10.0, 20.0, 30.0, 40.0, 50.0]];
    let degree = prepare(0, &mut targets, &mut properties, Aggregation::None, &[]).unwrap();

    assert_eq!(degree, 5);
    assert_eq!(targets, vec![1, 3, 3, 7, 7]);
    assert_eq!(properties[0], vec![40.0, 20.0, 50.0, 10.0, 30.0]);
}

#[test]
fn test_channel_aggregations() {
    let mut targets = vec![2, 1, 2, 2];
    let mut properties = vec![
        vec![4.0, 1.0, -3.0, 8.0],
        vec![4.0, 1.0, -3.0, 8.0],
        vec![4.0, 1.0, -3.0, 8.0],
        vec![4.0, 1.0, -3.0, 8.0],
        vec![4.0, 1.0, -3.0, 8.0],
    ];
    let channels = [
        Aggregation::Min,
        Aggregation::Max,
        Aggregation::Single,
        Aggregation::Count,
        Aggregation::Default,
    ];
    let degree = prepare(3, &mut targets, &mut properties, Aggregation::Sum, &channels).unwrap();

    assert_eq!(degree, 2);
    assert_eq!(targets, vec![1, 2]);
    assert_eq!(properties[0], vec![1.0, -3.0]);
    assert_eq!(properties[1], vec![1.0, 8.0]);
    assert_eq!(properties[2], vec![1.0, 4.0]);
    assert_eq!(properties[3], vec![1.0, 3.0]);
    // Falls back to the topology aggregation.
    assert_eq!(properties[4], vec![1.0, 9.0]);
}

#[test]
fn test_single_without_properties() {
    let mut targets = vec![3, 3, 3, 0];
    let degree = prepare(0, &mut targets, &mut [], Aggregation::Single, &[]).unwrap();

    assert_eq!(degree, 2);
    assert_eq!(targets, vec![0, 3]);
}

#[test]
fn test_channel_length_mismatch() {
    let mut targets = vec![1, 2];
    let mut properties = vec![vec![1.0, 2.0], vec![1.0]];

    match prepare(4, &mut targets, &mut properties, Aggregation::Sum, &[]) {
        Err(AdjacencyError::PropertyLengthMismatch { node, channel, len, degree }) => {
            assert_eq!((node, channel, len, degree), (4, 1, 1, 2));
        }
        other => panic!("unexpected result {:?}", other),
    }
}
