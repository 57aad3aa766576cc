//! Random forest churn classifier
//!
//! Bagged CART trees with per-node feature sampling. Each tree draws its
//! bootstrap sample and its candidate features from its own ChaCha stream
//! seeded with `seed + tree_index`, so a fitted forest depends only on the
//! training table and the configuration.

mod tree;

pub use tree::{DecisionTree, TreeNode, TreeParams};

use indicatif::ProgressBar;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::error::{ConfigurationError, DataIntegrityError, ModelFitError, Result};
use super::table::FeatureTable;

/// Number of features considered at each split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// Square root of the feature count
    #[default]
    Sqrt,
    Log2,
    All,
    Count(usize),
}

impl MaxFeatures {
    /// Resolve to a concrete count in `1..=n_features`
    pub fn resolve(&self, n_features: usize) -> usize {
        let n = n_features as f64;
        let count = match self {
            MaxFeatures::Sqrt => n.sqrt().floor() as usize,
            MaxFeatures::Log2 => n.log2().floor() as usize,
            MaxFeatures::All => n_features,
            MaxFeatures::Count(c) => *c,
        };
        count.clamp(1, n_features.max(1))
    }
}

impl std::fmt::Display for MaxFeatures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaxFeatures::Sqrt => write!(f, "sqrt"),
            MaxFeatures::Log2 => write!(f, "log2"),
            MaxFeatures::All => write!(f, "all"),
            MaxFeatures::Count(c) => write!(f, "{}", c),
        }
    }
}

/// Forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_trees: usize,
    /// `None` grows trees until the leaf limits stop them
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 300,
            max_depth: Some(12),
            min_samples_split: 10,
            min_samples_leaf: 4,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestConfig {
    /// Reject parameter values no tree can be grown with
    pub fn validate(&self) -> Result<()> {
        let invalid = |name: &str, reason: &str| -> Result<()> {
            Err(ConfigurationError::InvalidForestParameter {
                name: name.to_string(),
                reason: reason.to_string(),
            }
            .into())
        };

        if self.n_trees == 0 {
            return invalid("n_trees", "must be at least 1");
        }
        if self.max_depth == Some(0) {
            return invalid("max_depth", "must be at least 1");
        }
        if self.min_samples_split < 2 {
            return invalid("min_samples_split", "must be at least 2");
        }
        if self.min_samples_leaf == 0 {
            return invalid("min_samples_leaf", "must be at least 1");
        }
        if self.max_features == MaxFeatures::Count(0) {
            return invalid("max_features", "must be at least 1");
        }
        Ok(())
    }

    /// One-line rendering attached to fit errors
    pub fn describe(&self) -> String {
        let depth = self
            .max_depth
            .map_or_else(|| "none".to_string(), |d| d.to_string());
        format!(
            "n_trees={}, max_depth={}, min_samples_split={}, min_samples_leaf={}, max_features={}, bootstrap={}, seed={}",
            self.n_trees,
            depth,
            self.min_samples_split,
            self.min_samples_leaf,
            self.max_features,
            self.bootstrap,
            self.seed
        )
    }
}

/// Predicted labels and class-1 probabilities for a table
#[derive(Debug, Clone, PartialEq)]
pub struct Predictions {
    pub labels: Vec<u8>,
    pub probabilities: Vec<f64>,
}

/// Fitted random forest
#[derive(Debug, Clone)]
pub struct ChurnForest {
    config: ForestConfig,
    feature_names: Vec<String>,
    trees: Vec<DecisionTree>,
    importances: Vec<f64>,
}

impl ChurnForest {
    pub fn fit(table: &FeatureTable, config: &ForestConfig) -> Result<Self> {
        Self::fit_with_progress(table, config, None)
    }

    /// Fit the forest, advancing `progress` once per grown tree
    pub fn fit_with_progress(
        table: &FeatureTable,
        config: &ForestConfig,
        progress: Option<&ProgressBar>,
    ) -> Result<Self> {
        config.validate()?;
        check_training_table(table, config)?;

        let n = table.n_samples();
        let params = TreeParams {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            max_features: config.max_features.resolve(table.n_features()),
        };

        let mut trees = Vec::with_capacity(config.n_trees);
        for tree_idx in 0..config.n_trees {
            let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(tree_idx as u64));
            let sample: Vec<usize> = if config.bootstrap {
                (0..n).map(|_| rng.gen_range(0..n)).collect()
            } else {
                (0..n).collect()
            };
            trees.push(DecisionTree::fit(table, sample, &params, &mut rng));

            if let Some(pb) = progress {
                pb.inc(1);
            }
        }

        let importances = aggregate_importances(&trees, table.n_features()).ok_or_else(|| {
            ModelFitError::NoInformativeSplit {
                config: config.describe(),
            }
        })?;

        Ok(Self {
            config: config.clone(),
            feature_names: table.feature_names.clone(),
            trees,
            importances,
        })
    }

    /// Mean of the per-tree leaf probabilities for class 1
    pub fn predict_probability(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.feature_names.len() {
            return Err(DataIntegrityError::FeatureCount {
                expected: self.feature_names.len(),
                found: features.len(),
            }
            .into());
        }
        let total: f64 = self
            .trees
            .iter()
            .map(|t| t.predict_probability(features))
            .sum();
        Ok(total / self.trees.len() as f64)
    }

    /// Predicted label: 1 when the class-1 probability exceeds one half
    pub fn predict(&self, features: &[f64]) -> Result<u8> {
        Ok(u8::from(self.predict_probability(features)? > 0.5))
    }

    /// Predict every row of a table encoded with the same feature layout
    pub fn predict_table(&self, table: &FeatureTable) -> Result<Predictions> {
        if table.feature_names != self.feature_names {
            return Err(DataIntegrityError::FeatureCount {
                expected: self.feature_names.len(),
                found: table.n_features(),
            }
            .into());
        }

        let probabilities = table
            .rows
            .iter()
            .map(|row| self.predict_probability(row))
            .collect::<Result<Vec<f64>>>()?;
        let labels = probabilities.iter().map(|&p| u8::from(p > 0.5)).collect();

        Ok(Predictions {
            labels,
            probabilities,
        })
    }

    /// (feature name, importance) in feature order; scores sum to 1
    pub fn feature_importances(&self) -> Vec<(String, f64)> {
        self.feature_names
            .iter()
            .cloned()
            .zip(self.importances.iter().copied())
            .collect()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }
}

/// Ensure the training table can support a fit at all
fn check_training_table(table: &FeatureTable, config: &ForestConfig) -> Result<()> {
    if table.is_empty() {
        return Err(ConfigurationError::EmptyPartition {
            partition: "training".to_string(),
        }
        .into());
    }

    let first = table.labels[0];
    if table.labels.iter().all(|&l| l == first) {
        return Err(ConfigurationError::SingleClass {
            partition: "training".to_string(),
            label: first,
        }
        .into());
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        if let Some(col_idx) = row.iter().position(|v| !v.is_finite()) {
            return Err(ModelFitError::NonFiniteInput {
                feature: table.feature_names[col_idx].clone(),
                row: row_idx,
                config: config.describe(),
            }
            .into());
        }
    }
    Ok(())
}

/// Normalize each tree's impurity decrease to 1, average over trees, and
/// renormalize. Trees without any split contribute nothing.
///
/// Returns `None` when no tree split at all.
fn aggregate_importances(trees: &[DecisionTree], n_features: usize) -> Option<Vec<f64>> {
    let mut combined = vec![0.0; n_features];
    for tree in trees {
        let total: f64 = tree.importances().iter().sum();
        if total > 0.0 {
            for (acc, imp) in combined.iter_mut().zip(tree.importances()) {
                *acc += imp / total;
            }
        }
    }

    let total: f64 = combined.iter().sum();
    if total <= 0.0 {
        return None;
    }
    for value in combined.iter_mut() {
        *value /= total;
    }
    Some(combined)
}
