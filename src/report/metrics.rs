//! Evaluation metrics for the churn classifier

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::pipeline::error::{DataIntegrityError, Result};
use crate::pipeline::target::BinaryMapping;

/// Precision, recall, F1 and support of one class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Averages of the per-class metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// One entry of the importance ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Evaluation of a fitted model on the evaluation partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    /// Counts indexed `[true][predicted]`
    pub confusion_matrix: [[usize; 2]; 2],
    /// Keyed by class name (e.g. "No", "Yes")
    pub per_class: BTreeMap<String, ClassMetrics>,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    /// Area under the ROC curve; absent when only one class is present
    pub roc_auc: Option<f64>,
    /// Sorted descending, ties in original feature order
    pub feature_importances: Vec<FeatureImportance>,
}

impl EvaluationReport {
    pub fn n_samples(&self) -> usize {
        self.confusion_matrix.iter().flatten().sum()
    }

    /// The `n` most important features
    pub fn top_features(&self, n: usize) -> &[FeatureImportance] {
        &self.feature_importances[..n.min(self.feature_importances.len())]
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Harmonic mean of precision and recall; 0 when both are 0
pub fn f1_score(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

fn check_len(what: &str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(DataIntegrityError::LengthMismatch {
            what: what.to_string(),
            expected,
            found,
        }
        .into());
    }
    Ok(())
}

/// 2x2 confusion matrix indexed `[true][predicted]`
pub fn confusion_matrix(y_true: &[u8], y_pred: &[u8]) -> Result<[[usize; 2]; 2]> {
    check_len("predictions", y_true.len(), y_pred.len())?;
    let mut matrix = [[0usize; 2]; 2];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        matrix[usize::from(t != 0)][usize::from(p != 0)] += 1;
    }
    Ok(matrix)
}

/// Fraction of exact label matches; 0 for an empty input
pub fn accuracy(y_true: &[u8], y_pred: &[u8]) -> Result<f64> {
    check_len("predictions", y_true.len(), y_pred.len())?;
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(ratio(correct, y_true.len()))
}

/// Per-class metrics from a confusion matrix, for class 0 and class 1
pub fn class_metrics(matrix: &[[usize; 2]; 2]) -> [ClassMetrics; 2] {
    [0usize, 1].map(|class| {
        let tp = matrix[class][class];
        let support = matrix[class][0] + matrix[class][1];
        let predicted = matrix[0][class] + matrix[1][class];
        let precision = ratio(tp, predicted);
        let recall = ratio(tp, support);
        ClassMetrics {
            precision,
            recall,
            f1: f1_score(precision, recall),
            support,
        }
    })
}

/// Area under the ROC curve via the Mann-Whitney U statistic.
///
/// Tied scores share their average rank. Returns `None` unless both
/// classes are present.
pub fn roc_auc(y_true: &[u8], scores: &[f64]) -> Result<Option<f64>> {
    check_len("probabilities", y_true.len(), scores.len())?;

    let total_pos = y_true.iter().filter(|&&t| t != 0).count() as f64;
    let total_neg = y_true.len() as f64 - total_pos;
    if total_pos == 0.0 || total_neg == 0.0 {
        return Ok(None);
    }

    let mut pairs: Vec<(f64, u8)> = scores.iter().copied().zip(y_true.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n = pairs.len();
    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j < n && pairs[j].0 == pairs[i].0 {
            j += 1;
        }
        // Ranks i+1..=j share their mean
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        let positives_in_group = pairs[i..j].iter().filter(|(_, t)| *t != 0).count();
        rank_sum_pos += avg_rank * positives_in_group as f64;
        i = j;
    }

    let u = rank_sum_pos - total_pos * (total_pos + 1.0) / 2.0;
    Ok(Some((u / (total_pos * total_neg)).clamp(0.0, 1.0)))
}

/// Sort importances descending; equal scores keep their input order
pub fn rank_importances(importances: &[(String, f64)]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = importances
        .iter()
        .map(|(feature, importance)| FeatureImportance {
            feature: feature.clone(),
            importance: *importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked
}

/// Build the evaluation report.
///
/// Pure function of its inputs: true labels, predicted labels and class-1
/// probabilities of the evaluation partition, plus the model's importances.
pub fn evaluate(
    y_true: &[u8],
    y_pred: &[u8],
    probabilities: &[f64],
    importances: &[(String, f64)],
    mapping: &BinaryMapping,
) -> Result<EvaluationReport> {
    let matrix = confusion_matrix(y_true, y_pred)?;
    let accuracy = accuracy(y_true, y_pred)?;
    let roc_auc = roc_auc(y_true, probabilities)?;

    let classes = class_metrics(&matrix);
    let total = y_true.len();

    let macro_avg = AverageMetrics {
        precision: classes.iter().map(|c| c.precision).sum::<f64>() / 2.0,
        recall: classes.iter().map(|c| c.recall).sum::<f64>() / 2.0,
        f1: classes.iter().map(|c| c.f1).sum::<f64>() / 2.0,
    };
    let weighted = |f: fn(&ClassMetrics) -> f64| -> f64 {
        if total == 0 {
            0.0
        } else {
            classes.iter().map(|c| f(c) * c.support as f64).sum::<f64>() / total as f64
        }
    };
    let weighted_avg = AverageMetrics {
        precision: weighted(|c| c.precision),
        recall: weighted(|c| c.recall),
        f1: weighted(|c| c.f1),
    };

    let per_class = classes
        .iter()
        .enumerate()
        .map(|(class, metrics)| (mapping.class_name(class as u8).to_string(), *metrics))
        .collect();

    Ok(EvaluationReport {
        accuracy,
        confusion_matrix: matrix,
        per_class,
        macro_avg,
        weighted_avg,
        roc_auc,
        feature_importances: rank_importances(importances),
    })
}
