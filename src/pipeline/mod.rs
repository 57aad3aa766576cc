//! Pipeline module - normalization, encoding, scaling, splitting and the forest

pub mod encoder;
pub mod error;
pub mod forest;
pub mod loader;
pub mod normalize;
pub mod run;
pub mod scaler;
pub mod schema;
pub mod split;
pub mod table;
pub mod target;

pub use encoder::{ColumnEncoding, FeatureEncoder, FittedColumn};
pub use error::{ChurnError, ConfigurationError, DataIntegrityError, ModelFitError, Result};
pub use forest::{ChurnForest, ForestConfig, MaxFeatures, Predictions};
pub use loader::*;
pub use normalize::{normalize, parse_charge, DroppedRecord, NormalizedFrame};
pub use run::*;
pub use scaler::{ColumnStats, StandardScaler};
pub use schema::*;
pub use split::{partition, positive_rate, stratified_split, SplitConfig, SplitIndices};
pub use table::FeatureTable;
pub use target::{analyze_label_column, count_classes, encode_labels, BinaryMapping, LabelAnalysis};
