//! Unit tests for dataset loader

use churnlens::pipeline::{get_column_names, load_dataset_with_stats};
use polars::prelude::*;
use std::io::Write;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

#[test]
fn test_load_csv_file() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    writeln!(file, "customerID,tenure,Churn").unwrap();
    writeln!(file, "7590-VHVEG,1,No").unwrap();
    writeln!(file, "3668-QPYBK,2,Yes").unwrap();
    drop(file);

    let (df, rows, cols, mem_mb) = load_dataset_with_stats(&csv_path, 100).unwrap();

    assert_eq!(rows, 2, "Should have 2 data rows");
    assert_eq!(cols, 3, "Should have 3 columns");
    assert_eq!(df.get_column_names(), &["customerID", "tenure", "Churn"]);
    assert!(mem_mb >= 0.0, "Memory estimate should be non-negative");
}

#[test]
fn test_load_parquet_file() {
    let mut df = common::create_small_telco_dataframe();
    let (_temp_dir, parquet_path) = common::create_temp_parquet(&mut df);

    let (loaded_df, rows, cols, _mem) = load_dataset_with_stats(&parquet_path, 100).unwrap();

    assert_eq!(rows, 6);
    assert_eq!(cols, 13);
    common::assert_has_columns(&loaded_df, &["customerID", "TotalCharges", "Churn"]);
}

#[test]
fn test_blank_total_charges_loaded_as_text() {
    let mut df = common::create_small_telco_dataframe();
    let (_temp_dir, csv_path) = common::create_temp_csv(&mut df);

    let (loaded, _, _, _) = load_dataset_with_stats(&csv_path, 100).unwrap();
    assert_eq!(
        loaded.column("TotalCharges").unwrap().dtype(),
        &DataType::String,
        "A blank charge keeps the whole column textual"
    );
}

#[test]
fn test_get_column_names_csv() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    writeln!(file, "gender,Contract,Churn").unwrap();
    writeln!(file, "Male,One year,No").unwrap();
    drop(file);

    let columns = get_column_names(&csv_path).unwrap();

    assert_eq!(columns, vec!["gender", "Contract", "Churn"]);
}

#[test]
fn test_get_column_names_parquet() {
    let mut df = common::create_small_telco_dataframe();
    let (_temp_dir, parquet_path) = common::create_temp_parquet(&mut df);

    let columns = get_column_names(&parquet_path).unwrap();

    assert_eq!(columns.len(), 13);
    assert!(columns.contains(&"InternetService".to_string()));
    assert!(columns.contains(&"Churn".to_string()));
}

#[test]
fn test_unsupported_format() {
    let temp_dir = TempDir::new().unwrap();
    let bad_path = temp_dir.path().join("telco.xlsx");
    std::fs::File::create(&bad_path).unwrap();

    let result = load_dataset_with_stats(&bad_path, 100);

    assert!(result.is_err(), "Unsupported format should return error");
    let err_msg = result.unwrap_err().to_string();
    assert!(
        err_msg.contains("Unsupported"),
        "Error message should mention unsupported format: {}",
        err_msg
    );
}

#[test]
fn test_nonexistent_file() {
    let path = std::path::Path::new("/nonexistent/path/to/telco.csv");

    let result = load_dataset_with_stats(path, 100);

    assert!(result.is_err(), "Nonexistent file should return error");
}

#[test]
fn test_csv_with_missing_values() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("missing.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    writeln!(file, "tenure,MonthlyCharges,Churn").unwrap();
    writeln!(file, "1,,No").unwrap();
    writeln!(file, ",20.5,").unwrap();
    writeln!(file, "4,30.0,Yes").unwrap();
    drop(file);

    let (df, rows, cols, _) = load_dataset_with_stats(&csv_path, 100).unwrap();

    assert_eq!(rows, 3);
    assert_eq!(cols, 3);

    let null_counts: Vec<usize> = df.get_columns().iter().map(|c| c.null_count()).collect();
    assert_eq!(null_counts, vec![1, 1, 1]);
}

#[test]
fn test_memory_estimate_for_generated_dataset() {
    let mut df = common::create_telco_dataframe(1000, 3);
    let (_temp_dir, parquet_path) = common::create_temp_parquet(&mut df);

    let (_, rows, cols, mem_mb) = load_dataset_with_stats(&parquet_path, 100).unwrap();

    assert_eq!(rows, 1000);
    assert_eq!(cols, 14);
    assert!(mem_mb > 0.0);
}
