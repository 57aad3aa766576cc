//! Encoded feature table: one row per record, one column per derived feature

use polars::prelude::*;

use super::error::{DataIntegrityError, Result};

/// Row-major numeric feature matrix with its label vector
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<u8>,
}

impl FeatureTable {
    /// Build a table, checking that every row and the labels agree in size
    pub fn new(feature_names: Vec<String>, rows: Vec<Vec<f64>>, labels: Vec<u8>) -> Result<Self> {
        if rows.len() != labels.len() {
            return Err(DataIntegrityError::LengthMismatch {
                what: "labels".to_string(),
                expected: rows.len(),
                found: labels.len(),
            }
            .into());
        }
        if let Some(row) = rows.iter().find(|r| r.len() != feature_names.len()) {
            return Err(DataIntegrityError::FeatureCount {
                expected: feature_names.len(),
                found: row.len(),
            }
            .into());
        }
        Ok(Self {
            feature_names,
            rows,
            labels,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a feature column by name
    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.feature_names.iter().position(|n| n == name)
    }

    /// Values of one feature column
    pub fn column(&self, idx: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[idx]).collect()
    }

    /// New table holding the given rows, in the given order
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// Convert to a DataFrame with the label appended as the last column
    pub fn to_dataframe(&self, label_column: &str) -> Result<DataFrame> {
        let mut columns: Vec<Column> = self
            .feature_names
            .iter()
            .enumerate()
            .map(|(idx, name)| Column::new(name.as_str().into(), self.column(idx)))
            .collect();

        let labels: Vec<u32> = self.labels.iter().map(|&l| l as u32).collect();
        columns.push(Column::new(label_column.into(), labels));

        Ok(DataFrame::new(columns)?)
    }
}
