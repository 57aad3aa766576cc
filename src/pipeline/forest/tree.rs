//! CART classification tree with Gini impurity splits

use rand::seq::index::sample;
use rand_chacha::ChaCha8Rng;

use crate::pipeline::table::FeatureTable;

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Number of features sampled as split candidates at each node
    pub max_features: usize,
}

/// Tree node
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Leaf {
        samples: usize,
        positives: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        samples: usize,
        impurity: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }

    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

/// Calculate Gini impurity for a set of samples
///
/// For binary classification: Gini = 2 * p * (1 - p)
/// where p is the proportion of positive class.
pub(crate) fn gini_impurity(positives: f64, negatives: f64) -> f64 {
    let total = positives + negatives;
    if total == 0.0 {
        return 0.0;
    }
    let p = positives / total;
    2.0 * p * (1.0 - p)
}

/// Best threshold found for one feature
#[derive(Debug, Clone, Copy, PartialEq)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Find the threshold on one feature that maximizes Gini reduction.
///
/// `pairs` holds (value, label) sorted by value. Splits leave at least
/// `min_samples_leaf` samples on each side and never separate equal values.
fn find_best_threshold(pairs: &[(f64, u8)], min_samples_leaf: usize) -> Option<(f64, f64)> {
    let n = pairs.len();
    if n < 2 * min_samples_leaf.max(1) {
        return None;
    }

    let total_pos = pairs.iter().filter(|(_, l)| *l == 1).count() as f64;
    let total_neg = n as f64 - total_pos;
    let parent_gini = gini_impurity(total_pos, total_neg);

    let mut best_gain = 0.0;
    let mut best: Option<(f64, f64)> = None;

    let mut left_pos = 0.0f64;
    let mut left_neg = 0.0f64;

    for i in 0..n - 1 {
        if pairs[i].1 == 1 {
            left_pos += 1.0;
        } else {
            left_neg += 1.0;
        }

        let left_count = i + 1;
        let right_count = n - left_count;
        if left_count < min_samples_leaf || right_count < min_samples_leaf {
            continue;
        }

        // Never split between equal values
        let (lo, hi) = (pairs[i].0, pairs[i + 1].0);
        if hi <= lo {
            continue;
        }

        let right_pos = total_pos - left_pos;
        let right_neg = total_neg - left_neg;

        let left_prop = left_count as f64 / n as f64;
        let right_prop = right_count as f64 / n as f64;
        let weighted_child_gini = left_prop * gini_impurity(left_pos, left_neg)
            + right_prop * gini_impurity(right_pos, right_neg);

        let gain = parent_gini - weighted_child_gini;
        if gain > best_gain {
            best_gain = gain;
            let mid = lo + (hi - lo) / 2.0;
            let threshold = if mid < hi { mid } else { lo };
            best = Some((threshold, gain));
        }
    }

    best
}

struct TreeBuilder<'a> {
    table: &'a FeatureTable,
    params: &'a TreeParams,
    importances: Vec<f64>,
}

impl TreeBuilder<'_> {
    fn grow(&mut self, indices: Vec<usize>, depth: usize, rng: &mut ChaCha8Rng) -> TreeNode {
        let n = indices.len();
        let positives = indices
            .iter()
            .filter(|&&i| self.table.labels[i] == 1)
            .count();
        let impurity = gini_impurity(positives as f64, (n - positives) as f64);

        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        if depth_reached
            || n < self.params.min_samples_split
            || n < 2 * self.params.min_samples_leaf
            || impurity <= 0.0
        {
            return TreeNode::Leaf {
                samples: n,
                positives,
            };
        }

        let Some(best) = self.best_split(&indices, rng) else {
            return TreeNode::Leaf {
                samples: n,
                positives,
            };
        };

        // Impurity decrease weighted by node size
        self.importances[best.feature] += n as f64 * best.gain;

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.table.rows[i][best.feature] <= best.threshold);

        let left = self.grow(left_idx, depth + 1, rng);
        let right = self.grow(right_idx, depth + 1, rng);

        TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            samples: n,
            impurity,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn best_split(&self, indices: &[usize], rng: &mut ChaCha8Rng) -> Option<SplitCandidate> {
        let n_features = self.table.n_features();
        let amount = self.params.max_features.clamp(1, n_features.max(1)).min(n_features);

        let mut best: Option<SplitCandidate> = None;
        for feature in sample(rng, n_features, amount).into_iter() {
            let mut pairs: Vec<(f64, u8)> = indices
                .iter()
                .map(|&i| (self.table.rows[i][feature], self.table.labels[i]))
                .collect();
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            if let Some((threshold, gain)) =
                find_best_threshold(&pairs, self.params.min_samples_leaf)
            {
                if best.map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }
        best
    }
}

/// A fitted classification tree
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    root: TreeNode,
    /// Unnormalized weighted impurity decrease per feature
    importances: Vec<f64>,
}

impl DecisionTree {
    /// Grow a tree on the rows listed in `sample` (duplicates allowed)
    pub fn fit(
        table: &FeatureTable,
        sample: Vec<usize>,
        params: &TreeParams,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let mut builder = TreeBuilder {
            table,
            params,
            importances: vec![0.0; table.n_features()],
        };
        let root = builder.grow(sample, 0, rng);
        Self {
            root,
            importances: builder.importances,
        }
    }

    /// Positive-class fraction of the leaf reached by `features`
    pub fn predict_probability(&self, features: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { samples, positives } => {
                    return if *samples == 0 {
                        0.0
                    } else {
                        *positives as f64 / *samples as f64
                    };
                }
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if features[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    pub fn importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    pub fn n_leaves(&self) -> usize {
        self.root.n_leaves()
    }
}
