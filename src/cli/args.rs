//! Command-line argument definitions using clap

use clap::Parser;
use std::path::{Path, PathBuf};

use crate::pipeline::NominalEncoding;

/// churnlens - Train and evaluate a random forest churn model on customer records
#[derive(Parser, Debug)]
#[command(name = "churnlens")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input file path (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory for report.json, predictions.csv, encoded_features.csv and segments.json.
    /// Defaults to '<input stem>_churn' next to the input file.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// JSON pipeline configuration (schema, split, forest).
    /// Flags given on the command line override values from this file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the resolved configuration (defaults, file and flags) to this JSON file
    #[arg(long)]
    pub save_config: Option<PathBuf>,

    /// Fraction of records held out for evaluation (strictly between 0 and 1)
    #[arg(long, value_parser = validate_test_size)]
    pub test_size: Option<f64>,

    /// Seed for the stratified split and the forest
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of trees in the forest
    #[arg(long, value_parser = validate_positive)]
    pub trees: Option<usize>,

    /// Maximum tree depth
    #[arg(long, value_parser = validate_positive)]
    pub max_depth: Option<usize>,

    /// Minimum samples required to split a node (at least 2)
    #[arg(long, value_parser = validate_min_samples_split)]
    pub min_samples_split: Option<usize>,

    /// Minimum samples required at a leaf
    #[arg(long, value_parser = validate_positive)]
    pub min_samples_leaf: Option<usize>,

    /// Encoding for undeclared nominal columns.
    /// Options: "onehot" (indicator columns, reference dropped) or "label" (integer codes)
    #[arg(long)]
    pub nominal_encoding: Option<NominalEncoding>,

    /// Run independent pipelines for each of these seeds (comma-separated), in parallel
    #[arg(long, value_delimiter = ',')]
    pub seeds: Vec<u64>,

    /// Number of top feature importances to display
    #[arg(long, default_value = "15")]
    pub top: usize,

    /// Package all artifacts into a single zip file
    #[arg(long, default_value = "false")]
    pub bundle: bool,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

impl Cli {
    /// Output directory, derived from the input path when not given
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            let parent = self.input.parent().unwrap_or_else(|| Path::new("."));
            let stem = self
                .input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("output");
            parent.join(format!("{}_churn", stem))
        })
    }
}

/// Validator for test_size parameter
fn validate_test_size(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!(
            "test_size must be strictly between 0.0 and 1.0, got {}",
            value
        ))
    }
}

fn validate_positive(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid positive integer", s))?;
    if value == 0 {
        Err("value must be at least 1".to_string())
    } else {
        Ok(value)
    }
}

fn validate_min_samples_split(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid positive integer", s))?;
    if value < 2 {
        Err(format!("min_samples_split must be at least 2, got {}", value))
    } else {
        Ok(value)
    }
}
