//! Report module - evaluation metrics, segment breakdowns and exports

pub mod export;
pub mod metrics;
pub mod segments;
pub mod summary;

pub use export::*;
pub use metrics::*;
pub use segments::*;
pub use summary::*;
