//! Standardization of continuous columns

use serde::Serialize;

use super::error::{ConfigurationError, Result};
use super::table::FeatureTable;

/// Relative tolerance below which a standard deviation counts as zero
const ZERO_VARIANCE_TOLERANCE: f64 = 1e-12;

/// Mean and standard deviation of one column, from the training partition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub feature: String,
    pub mean: f64,
    /// Population standard deviation; 1.0 when the column has zero variance
    pub std: f64,
    /// True when the training column had zero variance
    pub constant: bool,
}

/// Fitted scaler state for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandardScaler {
    stats: Vec<ColumnStats>,
}

impl StandardScaler {
    /// Compute per-column statistics on a training table.
    ///
    /// Every name in `columns` must be a feature of the table.
    pub fn fit(table: &FeatureTable, columns: &[String]) -> Result<Self> {
        let n = table.n_samples();
        let mut stats = Vec::with_capacity(columns.len());

        for name in columns {
            let idx = table
                .feature_index(name)
                .ok_or_else(|| ConfigurationError::UnknownColumn {
                    column: name.clone(),
                })?;

            let (mean, variance) = if n == 0 {
                (0.0, 0.0)
            } else {
                let values = table.column(idx);
                let mean = values.iter().sum::<f64>() / n as f64;
                let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
                (mean, variance)
            };

            // Zero variance: keep the values centered, do not divide
            let std = variance.sqrt();
            let constant = std <= ZERO_VARIANCE_TOLERANCE * mean.abs().max(1.0);
            let std = if constant { 1.0 } else { std };

            stats.push(ColumnStats {
                feature: name.clone(),
                mean,
                std,
                constant,
            });
        }

        Ok(Self { stats })
    }

    /// Apply `(x - mean) / std` in place with the fitted statistics
    pub fn transform(&self, table: &mut FeatureTable) -> Result<()> {
        for stat in &self.stats {
            let idx = table
                .feature_index(&stat.feature)
                .ok_or_else(|| ConfigurationError::UnknownColumn {
                    column: stat.feature.clone(),
                })?;
            for row in table.rows.iter_mut() {
                row[idx] = (row[idx] - stat.mean) / stat.std;
            }
        }
        Ok(())
    }

    pub fn stats(&self) -> &[ColumnStats] {
        &self.stats
    }
}
