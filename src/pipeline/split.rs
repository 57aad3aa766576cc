//! Stratified train/evaluation split
//!
//! Each class is shuffled independently with a seeded ChaCha RNG and the
//! first `round(class_size * test_size)` indices go to evaluation, so the
//! class proportions of both partitions match the full set within rounding.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::error::{ConfigurationError, Result};
use super::table::FeatureTable;

/// Split configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of records held out for evaluation
    pub test_size: f64,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.3,
            seed: 42,
        }
    }
}

impl SplitConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ConfigurationError::InvalidTestSize(self.test_size).into());
        }
        Ok(())
    }
}

/// Row indices of each partition, ascending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Stratified split of a 0/1 label vector.
///
/// Both partitions must end up non-empty.
pub fn stratified_split(labels: &[u8], config: &SplitConfig) -> Result<SplitIndices> {
    config.validate()?;

    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for class in [0u8, 1u8] {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == class)
            .map(|(i, _)| i)
            .collect();
        if members.is_empty() {
            continue;
        }

        // Per-class stream so one class's size never shifts the other's shuffle
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(class as u64));
        members.shuffle(&mut rng);

        let n_test = (members.len() as f64 * config.test_size).round() as usize;
        let (held_out, kept) = members.split_at(n_test.min(members.len()));
        test.extend_from_slice(held_out);
        train.extend_from_slice(kept);
    }

    train.sort_unstable();
    test.sort_unstable();

    if train.is_empty() {
        return Err(ConfigurationError::EmptyPartition {
            partition: "training".to_string(),
        }
        .into());
    }
    if test.is_empty() {
        return Err(ConfigurationError::EmptyPartition {
            partition: "evaluation".to_string(),
        }
        .into());
    }

    Ok(SplitIndices { train, test })
}

/// Split an already encoded table with precomputed indices
pub fn partition(table: &FeatureTable, split: &SplitIndices) -> (FeatureTable, FeatureTable) {
    (table.select(&split.train), table.select(&split.test))
}

/// Fraction of positive labels
pub fn positive_rate(labels: &[u8]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    labels.iter().filter(|&&l| l == 1).count() as f64 / labels.len() as f64
}
