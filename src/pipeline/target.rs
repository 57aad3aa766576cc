//! Label analysis and binary value mapping
//!
//! This module maps yes/no style values (the churn label and binary
//! attributes) to 0/1 with a fixed, explicit mapping. Values outside the
//! mapping are errors, never defaults.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::{DataIntegrityError, Result};

/// Tolerance for floating point comparison when checking binary 0/1 values
const TOLERANCE: f64 = 1e-9;

/// Mapping of a two-valued column to 0/1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryMapping {
    /// Value that maps to 1
    pub positive: String,
    /// Value that maps to 0
    pub negative: String,
}

impl Default for BinaryMapping {
    fn default() -> Self {
        Self::new("Yes", "No")
    }
}

impl BinaryMapping {
    /// Create a new mapping
    pub fn new(positive: &str, negative: &str) -> Self {
        Self {
            positive: positive.to_string(),
            negative: negative.to_string(),
        }
    }

    /// Map a raw value, `None` when it is neither side of the mapping
    pub fn encode(&self, value: &str) -> Option<u8> {
        if value == self.positive {
            Some(1)
        } else if value == self.negative {
            Some(0)
        } else {
            None
        }
    }

    /// Display name for a 0/1 class
    pub fn class_name(&self, class: u8) -> &str {
        if class == 1 {
            &self.positive
        } else {
            &self.negative
        }
    }
}

/// Result of analyzing a label column
#[derive(Debug, Clone, PartialEq)]
pub enum LabelAnalysis {
    /// Label column is already numeric 0/1, no mapping needed
    AlreadyBinary,
    /// Label column needs mapping - contains these unique values
    NeedsMapping { unique_values: Vec<String> },
}

/// Analyze a label column to determine if it needs value mapping
pub fn analyze_label_column(df: &DataFrame, label: &str) -> Result<LabelAnalysis> {
    let label_col = df
        .column(label)
        .map_err(|_| DataIntegrityError::MissingColumn {
            column: label.to_string(),
        })?;

    let dtype = label_col.dtype();
    if dtype.is_primitive_numeric() || matches!(dtype, DataType::Boolean) {
        let float_col = label_col.cast(&DataType::Float64)?;
        let unique = float_col.unique()?;
        let unique_values: Vec<f64> = unique.f64()?.into_iter().flatten().collect();

        let is_binary = unique_values
            .iter()
            .all(|&v| v.abs() < TOLERANCE || (v - 1.0).abs() < TOLERANCE);

        if is_binary {
            return Ok(LabelAnalysis::AlreadyBinary);
        }
    }

    let mut unique_values: Vec<String> = column_to_string_vec(label_col)?
        .into_iter()
        .flatten()
        .collect();
    unique_values.sort();
    unique_values.dedup();

    Ok(LabelAnalysis::NeedsMapping { unique_values })
}

/// Encode the label column to 0/1.
///
/// Numeric 0/1 labels are used directly; anything else goes through
/// `mapping`. A null or unmapped value aborts with the offending row.
pub fn encode_labels(df: &DataFrame, label: &str, mapping: &BinaryMapping) -> Result<Vec<u8>> {
    let label_col = df
        .column(label)
        .map_err(|_| DataIntegrityError::MissingColumn {
            column: label.to_string(),
        })?;

    if analyze_label_column(df, label)? == LabelAnalysis::AlreadyBinary {
        let float_col = label_col.cast(&DataType::Float64)?;
        return float_col
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| match v {
                Some(v) if (v - 1.0).abs() < TOLERANCE => Ok(1),
                Some(_) => Ok(0),
                None => Err(DataIntegrityError::NullValue {
                    column: label.to_string(),
                    row,
                }
                .into()),
            })
            .collect();
    }

    column_to_string_vec(label_col)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| encode_binary_value(label, row, v.as_deref(), mapping))
        .collect()
}

/// Map one raw binary value, reporting the column/row on failure
pub(crate) fn encode_binary_value(
    column: &str,
    row: usize,
    value: Option<&str>,
    mapping: &BinaryMapping,
) -> Result<u8> {
    let value = value.ok_or_else(|| DataIntegrityError::NullValue {
        column: column.to_string(),
        row,
    })?;

    mapping.encode(value).ok_or_else(|| {
        DataIntegrityError::UnexpectedBinaryValue {
            column: column.to_string(),
            row,
            value: value.to_string(),
            negative: mapping.negative.clone(),
            positive: mapping.positive.clone(),
        }
        .into()
    })
}

/// Convert a column to a Vec of Option<String> for category handling
pub(crate) fn column_to_string_vec(col: &Column) -> Result<Vec<Option<String>>> {
    let values: Vec<Option<String>> = match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect(),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            let cast = col.cast(&DataType::Int64)?;
            cast.i64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            let cast = col.cast(&DataType::UInt64)?;
            cast.u64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::Float32 | DataType::Float64 => {
            let cast = col.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| v.map(|n| format!("{}", n)))
                .collect()
        }
        DataType::Boolean => col
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| b.to_string()))
            .collect(),
        _ => {
            let cast = col.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.map(|s| s.to_string()))
                .collect()
        }
    };

    Ok(values)
}

/// Count (negatives, positives) in an encoded label vector
pub fn count_classes(labels: &[u8]) -> (usize, usize) {
    let positives = labels.iter().filter(|&&l| l == 1).count();
    (labels.len() - positives, positives)
}
