//! Tests for the stratified train/evaluation split

use churnlens::pipeline::*;
use std::collections::HashSet;

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_stratified_70_30_preserves_churn_rate() {
    let labels = labels_with_rate(1000, 270);
    let split = stratified_split(&labels, &SplitConfig::default()).unwrap();

    let train: Vec<u8> = split.train.iter().map(|&i| labels[i]).collect();
    let test: Vec<u8> = split.test.iter().map(|&i| labels[i]).collect();

    assert_eq!(train.len(), 700);
    assert_eq!(test.len(), 300);
    assert!(
        (positive_rate(&train) - 0.27).abs() <= 0.01,
        "Training rate {} outside 27% ± 1%",
        positive_rate(&train)
    );
    assert!(
        (positive_rate(&test) - 0.27).abs() <= 0.01,
        "Evaluation rate {} outside 27% ± 1%",
        positive_rate(&test)
    );
}

#[test]
fn test_partitions_are_disjoint_and_cover_all_rows() {
    let labels = labels_with_rate(333, 91);
    let split = stratified_split(&labels, &SplitConfig { test_size: 0.25, seed: 3 }).unwrap();

    let train: HashSet<usize> = split.train.iter().copied().collect();
    let test: HashSet<usize> = split.test.iter().copied().collect();
    assert!(train.is_disjoint(&test));
    assert_eq!(train.len() + test.len(), 333);
    assert!(split.train.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_same_seed_same_split() {
    let labels = labels_with_rate(500, 120);
    let config = SplitConfig { test_size: 0.3, seed: 17 };

    let a = stratified_split(&labels, &config).unwrap();
    let b = stratified_split(&labels, &config).unwrap();
    assert_eq!(a, b);

    let c = stratified_split(&labels, &SplitConfig { seed: 18, ..config }).unwrap();
    assert_ne!(a.test, c.test, "A different seed should shuffle differently");
}

#[test]
fn test_invalid_test_size_rejected() {
    let labels = labels_with_rate(10, 3);
    for test_size in [0.0, 1.0, -0.2, 1.5] {
        let err = stratified_split(&labels, &SplitConfig { test_size, seed: 1 }).unwrap_err();
        assert!(err.is_configuration(), "test_size {} should be rejected", test_size);
    }
}

#[test]
fn test_tiny_dataset_empty_partition_rejected() {
    let labels = vec![0u8, 1];
    let err = stratified_split(&labels, &SplitConfig { test_size: 0.2, seed: 1 }).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_partition_selects_rows() {
    let table = FeatureTable::new(
        vec!["x".to_string()],
        (0..10).map(|i| vec![i as f64]).collect(),
        labels_with_rate(10, 5),
    )
    .unwrap();
    let split = stratified_split(&table.labels, &SplitConfig::default()).unwrap();

    let (train, test) = partition(&table, &split);
    assert_eq!(train.n_samples() + test.n_samples(), 10);
    for (row, &idx) in test.rows.iter().zip(&split.test) {
        assert_eq!(row[0], idx as f64);
    }
}
