//! Run artifacts: JSON report, prediction and feature CSVs, zip bundle

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use polars::prelude::*;
use serde::Serialize;

use super::metrics::EvaluationReport;
use super::segments::SegmentReport;
use crate::pipeline::{ColumnStats, PipelineConfig, PipelineOutput};

/// Fixed advice attached to every exported report
pub const RECOMMENDATION: &str = "Customers with month-to-month contracts and high monthly charges are more likely to churn. Offer discounts or switch them to annual plans.";

pub const REPORT_FILE: &str = "report.json";
pub const PREDICTIONS_FILE: &str = "predictions.csv";
pub const ENCODED_FEATURES_FILE: &str = "encoded_features.csv";
pub const SEGMENTS_FILE: &str = "segments.json";
pub const BUNDLE_FILE: &str = "churn_report.zip";

/// Metadata section of the report
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub timestamp: String,
    pub churnlens_version: String,
    pub input_file: String,
    pub config: PipelineConfig,
}

/// Data counts of the run
#[derive(Debug, Clone, Serialize)]
pub struct DataSummary {
    pub retained_records: usize,
    pub dropped_records: usize,
    pub train_records: usize,
    pub test_records: usize,
    pub features: Vec<String>,
}

/// The exported report: evaluation metrics at the top level plus context
#[derive(Debug, Clone, Serialize)]
pub struct ChurnReport {
    pub metadata: ReportMetadata,
    #[serde(flatten)]
    pub evaluation: EvaluationReport,
    pub data: DataSummary,
    pub scaling: Vec<ColumnStats>,
    pub recommendation: String,
}

impl ChurnReport {
    pub fn new(output: &PipelineOutput, config: &PipelineConfig, input_file: &str) -> Self {
        let prepared = &output.prepared;
        Self {
            metadata: ReportMetadata {
                timestamp: Utc::now().to_rfc3339(),
                churnlens_version: env!("CARGO_PKG_VERSION").to_string(),
                input_file: input_file.to_string(),
                config: config.clone(),
            },
            evaluation: output.report.clone(),
            data: DataSummary {
                retained_records: prepared.normalized.height(),
                dropped_records: prepared.normalized.dropped.len(),
                train_records: prepared.train.n_samples(),
                test_records: prepared.test.n_samples(),
                features: prepared.encoder.feature_names().to_vec(),
            },
            scaling: prepared.scaler.stats().to_vec(),
            recommendation: RECOMMENDATION.to_string(),
        }
    }
}

fn write_json<T: Serialize>(value: &T, output_path: &Path, what: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {} to JSON", what))?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write {} to {}", what, output_path.display()))?;

    Ok(())
}

fn write_csv(df: &mut DataFrame, output_path: &Path) -> Result<()> {
    let mut file = File::create(output_path)
        .with_context(|| format!("Failed to create CSV file: {}", output_path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .with_context(|| format!("Failed to write CSV file: {}", output_path.display()))?;
    Ok(())
}

/// Export the churn report to a JSON file
pub fn export_churn_report(report: &ChurnReport, output_path: &Path) -> Result<()> {
    write_json(report, output_path, "churn report")
}

/// Export segment churn rates to a JSON file
pub fn export_segments(report: &SegmentReport, output_path: &Path) -> Result<()> {
    write_json(report, output_path, "segment report")
}

/// Export one row per evaluation record: source row, true and predicted
/// label, class-1 probability
pub fn export_predictions(output: &PipelineOutput, output_path: &Path) -> Result<()> {
    let prepared = &output.prepared;
    let rows: Vec<u64> = prepared.split.test.iter().map(|&i| i as u64).collect();
    let actual: Vec<u32> = prepared.test.labels.iter().map(|&l| u32::from(l)).collect();
    let predicted: Vec<u32> = output
        .predictions
        .labels
        .iter()
        .map(|&l| u32::from(l))
        .collect();

    let mut df = DataFrame::new(vec![
        Column::new("row".into(), rows),
        Column::new("actual".into(), actual),
        Column::new("predicted".into(), predicted),
        Column::new("probability".into(), output.predictions.probabilities.clone()),
    ])
    .context("Failed to assemble predictions frame")?;

    write_csv(&mut df, output_path)
}

/// Export the encoded (and scaled) evaluation partition
pub fn export_encoded_features(output: &PipelineOutput, output_path: &Path) -> Result<()> {
    let prepared = &output.prepared;
    let mut df = prepared
        .test
        .to_dataframe(prepared.encoder.label_column())
        .context("Failed to assemble encoded feature frame")?;
    write_csv(&mut df, output_path)
}

/// Write all artifacts of a run into `output_dir`, returning their paths
pub fn export_run_artifacts(
    output: &PipelineOutput,
    report: &ChurnReport,
    segments: &SegmentReport,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let report_path = output_dir.join(REPORT_FILE);
    let predictions_path = output_dir.join(PREDICTIONS_FILE);
    let features_path = output_dir.join(ENCODED_FEATURES_FILE);
    let segments_path = output_dir.join(SEGMENTS_FILE);

    export_churn_report(report, &report_path)?;
    export_predictions(output, &predictions_path)?;
    export_encoded_features(output, &features_path)?;
    export_segments(segments, &segments_path)?;

    Ok(vec![report_path, predictions_path, features_path, segments_path])
}

/// Package artifacts into a single zip file and remove the originals
pub fn package_run_artifacts(paths: &[PathBuf], zip_path: &Path) -> Result<()> {
    use std::io::{Read, Write};
    use ::zip::write::SimpleFileOptions;
    use ::zip::ZipWriter;

    let zip_file = File::create(zip_path)
        .with_context(|| format!("Failed to create zip file: {}", zip_path.display()))?;

    let mut zip = ZipWriter::new(zip_file);
    let options = SimpleFileOptions::default()
        .compression_method(::zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for path in paths {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Invalid artifact path: {}", path.display()))?;
        zip.start_file(filename, options)
            .with_context(|| format!("Failed to add {} to zip", filename))?;
        let mut content = Vec::new();
        File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?
            .read_to_end(&mut content)?;
        zip.write_all(&content)?;
    }

    zip.finish().context("Failed to finalize zip file")?;

    for path in paths {
        std::fs::remove_file(path).ok();
    }

    Ok(())
}
