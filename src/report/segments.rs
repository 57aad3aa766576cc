//! Churn rates per customer segment and an overall dataset profile
//!
//! Computed on the normalized frame (raw categories, unscaled values), so
//! the numbers read in the units a business user expects.

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::Serialize;

use crate::pipeline::error::{DataIntegrityError, Result};
use crate::pipeline::schema::FeatureSchema;
use crate::pipeline::target::{column_to_string_vec, encode_labels};

/// Categorical columns broken down by default, when present
pub const DEFAULT_SEGMENT_COLUMNS: [&str; 4] = ["Contract", "InternetService", "PaymentMethod", "gender"];

/// Tenure bin edges in months
pub const TENURE_BINS: [f64; 7] = [0.0, 12.0, 24.0, 36.0, 48.0, 60.0, 72.0];

/// Monthly charge bin edges; the last bin is open-ended
pub const MONTHLY_CHARGE_BINS: [f64; 8] = [0.0, 20.0, 40.0, 60.0, 80.0, 100.0, 120.0, f64::INFINITY];

/// Churn statistics of one segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentRate {
    pub segment: String,
    pub customers: usize,
    pub churned: usize,
    pub churn_rate: f64,
}

impl SegmentRate {
    fn new(segment: String, customers: usize, churned: usize) -> Self {
        let churn_rate = if customers == 0 {
            0.0
        } else {
            churned as f64 / customers as f64
        };
        Self {
            segment,
            customers,
            churned,
            churn_rate,
        }
    }
}

/// Churn rates for all segments of one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentTable {
    pub column: String,
    pub rates: Vec<SegmentRate>,
}

/// Headline numbers of a dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub customers: usize,
    pub churned: usize,
    pub churn_rate: f64,
    pub mean_monthly_charge: Option<f64>,
    pub mean_tenure: Option<f64>,
}

/// Profile plus per-segment churn tables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentReport {
    pub profile: DatasetProfile,
    pub segments: Vec<SegmentTable>,
}

fn numeric_column(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
    let col = df
        .column(column)
        .map_err(|_| DataIntegrityError::MissingColumn {
            column: column.to_string(),
        })?;
    let cast = col.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

fn column_mean(df: &DataFrame, column: &str) -> Result<Option<f64>> {
    if df.column(column).is_err() {
        return Ok(None);
    }
    let values: Vec<f64> = numeric_column(df, column)?.into_iter().flatten().collect();
    if values.is_empty() {
        return Ok(None);
    }
    Ok(Some(values.iter().sum::<f64>() / values.len() as f64))
}

/// Customers, churn rate and mean charge/tenure of a normalized frame
pub fn dataset_profile(df: &DataFrame, schema: &FeatureSchema) -> Result<DatasetProfile> {
    let labels = encode_labels(df, &schema.label_column, &schema.label_mapping)?;
    let churned = labels.iter().filter(|&&l| l == 1).count();
    let segment = SegmentRate::new(String::new(), labels.len(), churned);

    Ok(DatasetProfile {
        customers: segment.customers,
        churned: segment.churned,
        churn_rate: segment.churn_rate,
        mean_monthly_charge: column_mean(df, "MonthlyCharges")?,
        mean_tenure: column_mean(df, "tenure")?,
    })
}

/// Churn rate per distinct value of a column, sorted by value
pub fn churn_rate_by_category(
    df: &DataFrame,
    column: &str,
    schema: &FeatureSchema,
) -> Result<SegmentTable> {
    let labels = encode_labels(df, &schema.label_column, &schema.label_mapping)?;
    let col = df
        .column(column)
        .map_err(|_| DataIntegrityError::MissingColumn {
            column: column.to_string(),
        })?;

    let mut counts: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for (value, label) in column_to_string_vec(col)?.into_iter().zip(&labels) {
        let key = value.unwrap_or_else(|| "(missing)".to_string());
        let entry = counts.entry(key).or_default();
        entry.0 += 1;
        entry.1 += usize::from(*label);
    }

    Ok(SegmentTable {
        column: column.to_string(),
        rates: counts
            .into_iter()
            .map(|(segment, (customers, churned))| SegmentRate::new(segment, customers, churned))
            .collect(),
    })
}

fn format_edge(edge: f64) -> String {
    if edge.is_infinite() {
        "inf".to_string()
    } else {
        format!("{}", edge)
    }
}

/// Churn rate per right-closed bin `(lo, hi]` of a numeric column.
///
/// Values outside every bin (or missing) are not counted. Empty bins are
/// kept so every table has the same rows.
pub fn churn_rate_by_bins(
    df: &DataFrame,
    column: &str,
    edges: &[f64],
    schema: &FeatureSchema,
) -> Result<SegmentTable> {
    let labels = encode_labels(df, &schema.label_column, &schema.label_mapping)?;
    let values = numeric_column(df, column)?;

    let n_bins = edges.len().saturating_sub(1);
    let mut counts = vec![(0usize, 0usize); n_bins];
    for (value, label) in values.into_iter().zip(&labels) {
        let Some(v) = value else { continue };
        if let Some(bin) = edges.windows(2).position(|w| v > w[0] && v <= w[1]) {
            counts[bin].0 += 1;
            counts[bin].1 += usize::from(*label);
        }
    }

    let rates = edges
        .windows(2)
        .zip(counts)
        .map(|(w, (customers, churned))| {
            let segment = format!("({}, {}]", format_edge(w[0]), format_edge(w[1]));
            SegmentRate::new(segment, customers, churned)
        })
        .collect();

    Ok(SegmentTable {
        column: column.to_string(),
        rates,
    })
}

/// Profile plus the default segment tables for every column present
pub fn segment_report(df: &DataFrame, schema: &FeatureSchema) -> Result<SegmentReport> {
    let profile = dataset_profile(df, schema)?;
    let present = |name: &str| df.column(name).is_ok();

    let mut segments = Vec::new();
    for column in DEFAULT_SEGMENT_COLUMNS.iter().filter(|c| present(c)) {
        segments.push(churn_rate_by_category(df, column, schema)?);
    }
    if present("tenure") {
        segments.push(churn_rate_by_bins(df, "tenure", &TENURE_BINS, schema)?);
    }
    if present("MonthlyCharges") {
        segments.push(churn_rate_by_bins(df, "MonthlyCharges", &MONTHLY_CHARGE_BINS, schema)?);
    }

    Ok(SegmentReport { profile, segments })
}
