//! Shared test utilities and fixture generators
#![allow(dead_code)]

use churnlens::pipeline::{ForestConfig, MaxFeatures, PipelineConfig, SplitConfig};
use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use tempfile::TempDir;

const INTERNET: [&str; 3] = ["DSL", "Fiber optic", "No"];
const CONTRACTS: [&str; 3] = ["Month-to-month", "One year", "Two year"];
const PAYMENT: [&str; 4] = [
    "Bank transfer (automatic)",
    "Credit card (automatic)",
    "Electronic check",
    "Mailed check",
];

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Synthetic Telco-style customer records.
///
/// Churn is more likely for month-to-month contracts, fiber customers and
/// short tenures. Customers with zero tenure get a blank TotalCharges,
/// as in the public Telco dataset.
pub fn create_telco_dataframe(n: usize, seed: u64) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut ids = Vec::with_capacity(n);
    let mut gender = Vec::with_capacity(n);
    let mut senior = Vec::with_capacity(n);
    let mut partner = Vec::with_capacity(n);
    let mut dependents = Vec::with_capacity(n);
    let mut tenure = Vec::with_capacity(n);
    let mut phone = Vec::with_capacity(n);
    let mut internet = Vec::with_capacity(n);
    let mut contract = Vec::with_capacity(n);
    let mut paperless = Vec::with_capacity(n);
    let mut payment = Vec::with_capacity(n);
    let mut monthly = Vec::with_capacity(n);
    let mut total = Vec::with_capacity(n);
    let mut churn = Vec::with_capacity(n);

    for i in 0..n {
        let t: i64 = rng.gen_range(0..=72);
        let inet = INTERNET[rng.gen_range(0..INTERNET.len())];
        let ctr = CONTRACTS[rng.gen_range(0..CONTRACTS.len())];
        let base = match inet {
            "Fiber optic" => 80.0,
            "DSL" => 50.0,
            _ => 20.0,
        };
        let charge: f64 = base + rng.gen_range(0.0..30.0);

        let mut logit = -1.5 - 0.04 * t as f64;
        if ctr == "Month-to-month" {
            logit += 2.0;
        }
        if inet == "Fiber optic" {
            logit += 1.0;
        }
        let p = 1.0 / (1.0 + (-logit).exp());

        ids.push(format!("{:04}-CUST", i));
        gender.push(if rng.gen_bool(0.5) { "Male" } else { "Female" });
        senior.push(i64::from(rng.gen_bool(0.16)));
        partner.push(yes_no(rng.gen_bool(0.5)));
        dependents.push(yes_no(rng.gen_bool(0.3)));
        tenure.push(t);
        phone.push(yes_no(rng.gen_bool(0.9)));
        internet.push(inet);
        contract.push(ctr);
        paperless.push(yes_no(rng.gen_bool(0.6)));
        payment.push(PAYMENT[rng.gen_range(0..PAYMENT.len())]);
        monthly.push((charge * 100.0).round() / 100.0);
        total.push(if t == 0 {
            " ".to_string()
        } else {
            format!("{:.2}", charge * t as f64)
        });
        churn.push(yes_no(rng.gen_bool(p)));
    }

    df! {
        "customerID" => ids,
        "gender" => gender,
        "SeniorCitizen" => senior,
        "Partner" => partner,
        "Dependents" => dependents,
        "tenure" => tenure,
        "PhoneService" => phone,
        "InternetService" => internet,
        "Contract" => contract,
        "PaperlessBilling" => paperless,
        "PaymentMethod" => payment,
        "MonthlyCharges" => monthly,
        "TotalCharges" => total,
        "Churn" => churn,
    }
    .unwrap()
}

/// A handful of hand-written records, one with a blank TotalCharges
pub fn create_small_telco_dataframe() -> DataFrame {
    df! {
        "customerID" => ["7590-VHVEG", "5575-GNVDE", "3668-QPYBK", "4472-LVYGI", "9237-HQITU", "9305-CDSKC"],
        "gender" => ["Female", "Male", "Male", "Female", "Female", "Female"],
        "SeniorCitizen" => [0i64, 0, 0, 0, 0, 0],
        "Partner" => ["Yes", "No", "No", "No", "No", "No"],
        "Dependents" => ["No", "No", "No", "No", "No", "No"],
        "tenure" => [1i64, 34, 2, 0, 2, 8],
        "PhoneService" => ["No", "Yes", "Yes", "No", "Yes", "Yes"],
        "InternetService" => ["DSL", "DSL", "DSL", "DSL", "Fiber optic", "Fiber optic"],
        "Contract" => ["Month-to-month", "One year", "Month-to-month", "Two year", "Month-to-month", "Month-to-month"],
        "PaperlessBilling" => ["Yes", "No", "Yes", "No", "Yes", "Yes"],
        "MonthlyCharges" => [29.85f64, 56.95, 53.85, 52.55, 70.70, 99.65],
        "TotalCharges" => ["29.85", "1889.5", "108.15", " ", "151.65", "820.5"],
        "Churn" => ["No", "No", "Yes", "No", "Yes", "Yes"],
    }
    .unwrap()
}

/// Label vector with exactly `positives` ones, interleaved
pub fn labels_with_rate(n: usize, positives: usize) -> Vec<u8> {
    let mut labels = vec![0u8; n];
    let step = n as f64 / positives.max(1) as f64;
    for k in 0..positives {
        labels[(k as f64 * step) as usize] = 1;
    }
    labels
}

/// Small forest settings so integration tests stay fast
pub fn small_forest_config(n_trees: usize) -> ForestConfig {
    ForestConfig {
        n_trees,
        max_depth: Some(6),
        min_samples_split: 4,
        min_samples_leaf: 2,
        max_features: MaxFeatures::Sqrt,
        bootstrap: true,
        seed: 42,
    }
}

/// Telco defaults with a small forest
pub fn telco_test_config(n_trees: usize) -> PipelineConfig {
    PipelineConfig {
        split: SplitConfig::default(),
        forest: small_forest_config(n_trees),
        ..PipelineConfig::default()
    }
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("telco.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("telco.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}

/// Assert that a DataFrame does NOT contain specific columns
pub fn assert_missing_columns(df: &DataFrame, unexpected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in unexpected_cols {
        assert!(
            !actual_cols.contains(&col.to_string()),
            "Unexpected column still present: '{}'",
            col
        );
    }
}
