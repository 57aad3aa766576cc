//! One pipeline run: normalize, split, encode, scale, fit, evaluate.
//!
//! Every run owns its encoder, scaler and forest. Nothing is shared between
//! runs, so independent runs (different seeds) can execute in parallel.

use std::time::{Duration, Instant};

use indicatif::ProgressBar;
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::encoder::FeatureEncoder;
use super::error::{ConfigurationError, Result};
use super::forest::{ChurnForest, ForestConfig, Predictions};
use super::normalize::{normalize, NormalizedFrame};
use super::scaler::StandardScaler;
use super::schema::FeatureSchema;
use super::split::{stratified_split, SplitConfig, SplitIndices};
use super::table::FeatureTable;
use super::target::encode_labels;
use crate::report::metrics::{evaluate, EvaluationReport};

/// Full configuration of a pipeline run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub schema: FeatureSchema,
    pub split: SplitConfig,
    pub forest: ForestConfig,
}

impl PipelineConfig {
    /// Same configuration with both the split and forest seeds replaced
    pub fn with_seed(&self, seed: u64) -> Self {
        let mut config = self.clone();
        config.split.seed = seed;
        config.forest.seed = seed;
        config
    }
}

/// Wall-clock time spent in each stage
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageTimings {
    pub normalize: Duration,
    pub encode: Duration,
    pub scale: Duration,
    pub fit: Duration,
    pub evaluate: Duration,
}

/// Features ready for fitting: both partitions encoded and scaled
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub normalized: NormalizedFrame,
    pub split: SplitIndices,
    pub encoder: FeatureEncoder,
    pub scaler: StandardScaler,
    pub train: FeatureTable,
    pub test: FeatureTable,
}

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub prepared: PreparedData,
    pub forest: ChurnForest,
    pub predictions: Predictions,
    pub report: EvaluationReport,
    pub timings: StageTimings,
}

fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        indices.iter().map(|&i| i as IdxSize).collect(),
    );
    Ok(df.take(&idx)?)
}

/// Normalize, split and encode/scale both partitions.
///
/// The encoder and scaler only ever see training rows.
pub fn prepare(df: &DataFrame, config: &PipelineConfig) -> Result<PreparedData> {
    let mut timings = StageTimings::default();
    prepare_with_timings(df, config, &mut timings)
}

/// [`prepare`], recording the normalize, encode and scale times
pub fn prepare_with_timings(
    df: &DataFrame,
    config: &PipelineConfig,
    timings: &mut StageTimings,
) -> Result<PreparedData> {
    config.split.validate()?;
    config.forest.validate()?;

    let start = Instant::now();
    let normalized = normalize(df, &config.schema)?;
    let labels = encode_labels(
        &normalized.frame,
        &config.schema.label_column,
        &config.schema.label_mapping,
    )?;
    let split = stratified_split(&labels, &config.split)?;
    check_two_classes(&labels, &split.train)?;
    timings.normalize = start.elapsed();

    let start = Instant::now();
    let train_df = take_rows(&normalized.frame, &split.train)?;
    let test_df = take_rows(&normalized.frame, &split.test)?;
    let encoder = FeatureEncoder::fit(&train_df, &config.schema)?;
    let mut train = encoder.transform(&train_df)?;
    let mut test = encoder.transform(&test_df)?;
    timings.encode = start.elapsed();

    let start = Instant::now();
    let scaler = StandardScaler::fit(&train, &config.schema.continuous)?;
    scaler.transform(&mut train)?;
    scaler.transform(&mut test)?;
    timings.scale = start.elapsed();

    Ok(PreparedData {
        normalized,
        split,
        encoder,
        scaler,
        train,
        test,
    })
}

/// The training partition must hold both classes
fn check_two_classes(labels: &[u8], train: &[usize]) -> Result<()> {
    let first = labels[train[0]];
    if train.iter().all(|&i| labels[i] == first) {
        return Err(ConfigurationError::SingleClass {
            partition: "training".to_string(),
            label: first,
        }
        .into());
    }
    Ok(())
}

/// Run the whole pipeline on a raw frame
pub fn run_pipeline(df: &DataFrame, config: &PipelineConfig) -> Result<PipelineOutput> {
    run_pipeline_with_progress(df, config, None)
}

/// Run the whole pipeline, advancing `progress` once per grown tree
pub fn run_pipeline_with_progress(
    df: &DataFrame,
    config: &PipelineConfig,
    progress: Option<&ProgressBar>,
) -> Result<PipelineOutput> {
    let mut timings = StageTimings::default();
    let prepared = prepare_with_timings(df, config, &mut timings)?;

    let start = Instant::now();
    let forest = ChurnForest::fit_with_progress(&prepared.train, &config.forest, progress)?;
    timings.fit = start.elapsed();

    let start = Instant::now();
    let (predictions, report) = evaluate_forest(&forest, &prepared)?;
    timings.evaluate = start.elapsed();

    Ok(PipelineOutput {
        prepared,
        forest,
        predictions,
        report,
        timings,
    })
}

/// Predict the evaluation partition and build the report
pub fn evaluate_forest(
    forest: &ChurnForest,
    prepared: &PreparedData,
) -> Result<(Predictions, EvaluationReport)> {
    let predictions = forest.predict_table(&prepared.test)?;
    let report = evaluate(
        &prepared.test.labels,
        &predictions.labels,
        &predictions.probabilities,
        &forest.feature_importances(),
        prepared.encoder.label_mapping(),
    )?;
    Ok((predictions, report))
}

/// Run isolated pipelines for several seeds in parallel.
///
/// Each seed replaces both the split and forest seeds. Results come back
/// in the order of `seeds`.
pub fn run_pipeline_seeds(
    df: &DataFrame,
    config: &PipelineConfig,
    seeds: &[u64],
) -> Vec<(u64, Result<PipelineOutput>)> {
    seeds
        .par_iter()
        .map(|&seed| (seed, run_pipeline(df, &config.with_seed(seed))))
        .collect()
}
