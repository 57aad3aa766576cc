//! Error types for the churn pipeline.
//!
//! Every failure surfaced by the core falls into one of three classes:
//! data integrity problems in the input records, invalid configuration
//! (including degenerate training data), and failures of the fitting
//! procedure itself. None of them are retried or defaulted.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Result alias used throughout the pipeline.
pub type Result<T> = std::result::Result<T, ChurnError>;

/// Top-level pipeline error.
#[derive(Debug, Error)]
pub enum ChurnError {
    #[error("data integrity error: {0}")]
    DataIntegrity(#[from] DataIntegrityError),

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("model fit error: {0}")]
    ModelFit(#[from] ModelFitError),

    /// Underlying frame operation failed (cast, filter, take).
    #[error("frame operation failed: {0}")]
    Frame(#[from] PolarsError),
}

impl ChurnError {
    /// True for errors caused by the input records rather than the setup.
    pub fn is_data_integrity(&self) -> bool {
        matches!(self, ChurnError::DataIntegrity(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, ChurnError::Configuration(_))
    }

    pub fn is_model_fit(&self) -> bool {
        matches!(self, ChurnError::ModelFit(_))
    }
}

/// Unresolvable or unexpected values in the input records.
#[derive(Debug, Error, PartialEq)]
pub enum DataIntegrityError {
    /// A column required downstream is absent from the source.
    #[error("required column '{column}' not found in dataset")]
    MissingColumn { column: String },

    /// A numeric field could not be coerced.
    #[error("column '{column}', row {row}: cannot resolve '{value}' as a number")]
    UnresolvableValue {
        column: String,
        row: usize,
        value: String,
    },

    /// A null reached a stage that needs a concrete value.
    #[error("column '{column}', row {row}: value is missing")]
    NullValue { column: String, row: usize },

    /// A nominal category never observed while fitting the encoder.
    #[error("column '{column}', row {row}: category '{value}' was not seen during fitting")]
    UnknownCategory {
        column: String,
        row: usize,
        value: String,
    },

    /// A binary column holding something other than its two mapped values.
    #[error("column '{column}', row {row}: '{value}' is not one of '{negative}'/'{positive}'")]
    UnexpectedBinaryValue {
        column: String,
        row: usize,
        value: String,
        negative: String,
        positive: String,
    },

    /// An ordered category absent from the declared rank list.
    #[error("column '{column}', row {row}: '{value}' is not in the declared rank list")]
    UnrankedCategory {
        column: String,
        row: usize,
        value: String,
    },

    /// A feature vector of the wrong width was presented to a fitted model.
    #[error("expected {expected} features, found {found}")]
    FeatureCount { expected: usize, found: usize },

    /// Parallel inputs (labels, predictions, rows) disagree in length.
    #[error("{what}: expected {expected} entries, found {found}")]
    LengthMismatch {
        what: String,
        expected: usize,
        found: usize,
    },
}

/// Invalid pipeline configuration or degenerate training data.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("test size must be strictly between 0 and 1, got {0}")]
    InvalidTestSize(f64),

    #[error("column '{column}' referenced in configuration is not in the dataset")]
    UnknownColumn { column: String },

    #[error("column '{column}' is declared more than once")]
    DuplicateColumn { column: String },

    #[error("ordinal column '{column}' has an empty rank list")]
    EmptyRankList { column: String },

    #[error("ordinal column '{column}' lists rank '{value}' more than once")]
    DuplicateRank { column: String, value: String },

    /// Two source columns expand to the same feature name.
    #[error("feature name '{name}' is produced by both '{first}' and '{second}'")]
    DuplicateFeatureName {
        name: String,
        first: String,
        second: String,
    },

    #[error("reference category '{reference}' for column '{column}' was not observed during fitting")]
    InvalidReference { column: String, reference: String },

    #[error("invalid forest parameter {name}: {reason}")]
    InvalidForestParameter { name: String, reason: String },

    /// Only one class is present where a decision boundary must be learned.
    #[error("{partition} partition contains a single class (label {label}); cannot fit a classifier")]
    SingleClass { partition: String, label: u8 },

    #[error("{partition} partition is empty")]
    EmptyPartition { partition: String },
}

/// Failure of the tree-ensemble fitting procedure.
#[derive(Debug, Error, PartialEq)]
pub enum ModelFitError {
    #[error("non-finite value in feature '{feature}' at row {row} [config: {config}]")]
    NonFiniteInput {
        feature: String,
        row: usize,
        config: String,
    },

    /// No tree in the ensemble found a split that reduces impurity.
    #[error("no tree found an impurity-reducing split [config: {config}]")]
    NoInformativeSplit { config: String },
}
