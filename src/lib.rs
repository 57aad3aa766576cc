//! churnlens: Telecom Churn Prediction Library
//!
//! Prepares customer snapshots for modeling (charge normalization,
//! categorical encoding, standardization, stratified split), fits a
//! random forest churn classifier and reports its evaluation metrics.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
