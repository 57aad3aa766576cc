//! Tests for feature encoding fitted on the training partition

use churnlens::pipeline::*;
use polars::prelude::*;

#[path = "common/mod.rs"]
mod common;

use common::*;

fn contract_ranks() -> Vec<String> {
    vec![
        "Month-to-month".to_string(),
        "One year".to_string(),
        "Two year".to_string(),
    ]
}

#[test]
fn test_one_hot_with_reference_yields_two_indicators() {
    let df = df! {
        "InternetService" => ["DSL", "Fiber optic", "No", "Fiber optic", "DSL"],
        "TotalCharges" => [50.0f64, 90.0, 20.0, 95.0, 55.0],
        "Churn" => ["No", "Yes", "No", "Yes", "No"],
    }
    .unwrap();
    let mut schema = FeatureSchema::new("Churn", "TotalCharges");
    schema.nominal.push(NominalColumn {
        name: "InternetService".to_string(),
        encoding: NominalEncoding::OneHot,
        reference: Some("DSL".to_string()),
    });

    let encoder = FeatureEncoder::fit(&df, &schema).unwrap();
    let indicators: Vec<&String> = encoder
        .feature_names()
        .iter()
        .filter(|n| n.starts_with("InternetService"))
        .collect();
    assert_eq!(
        indicators,
        vec!["InternetService_Fiber optic", "InternetService_No"]
    );

    let table = encoder.transform(&df).unwrap();
    let fiber = table.feature_index("InternetService_Fiber optic").unwrap();
    let none = table.feature_index("InternetService_No").unwrap();
    assert_eq!(table.column(fiber), vec![0.0, 1.0, 0.0, 1.0, 0.0]);
    assert_eq!(table.column(none), vec![0.0, 0.0, 1.0, 0.0, 0.0]);
}

#[test]
fn test_ordinal_contract_codes() {
    let df = df! {
        "Contract" => ["Two year", "Month-to-month", "One year", "Two year"],
        "TotalCharges" => [1.0f64, 2.0, 3.0, 4.0],
        "Churn" => ["No", "Yes", "No", "No"],
    }
    .unwrap();
    let mut schema = FeatureSchema::new("Churn", "TotalCharges");
    schema.ordinal.push(OrdinalColumn {
        name: "Contract".to_string(),
        ranks: contract_ranks(),
    });

    let encoder = FeatureEncoder::fit(&df, &schema).unwrap();
    let table = encoder.transform(&df).unwrap();
    let idx = table.feature_index("Contract").unwrap();
    assert_eq!(table.column(idx), vec![2.0, 0.0, 1.0, 2.0]);
}

#[test]
fn test_unseen_category_in_evaluation_rows_fails_loudly() {
    let train = df! {
        "PaymentMethod" => ["Mailed check", "Electronic check", "Mailed check"],
        "TotalCharges" => [10.0f64, 20.0, 30.0],
        "Churn" => ["No", "Yes", "No"],
    }
    .unwrap();
    let test = df! {
        "PaymentMethod" => ["Mailed check", "Credit card (automatic)"],
        "TotalCharges" => [15.0f64, 25.0],
        "Churn" => ["No", "Yes"],
    }
    .unwrap();

    let schema = FeatureSchema::new("Churn", "TotalCharges");
    let encoder = FeatureEncoder::fit(&train, &schema).unwrap();

    let err = encoder.transform(&test).unwrap_err();
    assert!(err.is_data_integrity(), "Unseen category must not encode as 0");
    assert!(err.to_string().contains("Credit card (automatic)"));
}

#[test]
fn test_unseen_category_with_label_encoding_also_fails() {
    let train = df! {
        "InternetService" => ["DSL", "No"],
        "TotalCharges" => [10.0f64, 20.0],
        "Churn" => ["No", "Yes"],
    }
    .unwrap();
    let test = df! {
        "InternetService" => ["Fiber optic"],
        "TotalCharges" => [15.0f64],
        "Churn" => ["No"],
    }
    .unwrap();

    let mut schema = FeatureSchema::new("Churn", "TotalCharges");
    schema.default_nominal = NominalEncoding::Label;
    let encoder = FeatureEncoder::fit(&train, &schema).unwrap();
    assert!(encoder.transform(&test).unwrap_err().is_data_integrity());
}

#[test]
fn test_telco_schema_feature_layout() {
    let df = create_telco_dataframe(300, 5);
    let schema = FeatureSchema::telco();
    let normalized = normalize(&df, &schema).unwrap();

    let encoder = FeatureEncoder::fit(&normalized.frame, &schema).unwrap();
    let names = encoder.feature_names();

    assert!(names.contains(&"gender".to_string()));
    assert!(names.contains(&"Contract".to_string()));
    assert!(names.contains(&"SeniorCitizen".to_string()));
    // First sorted category is the reference
    assert!(!names.contains(&"InternetService_DSL".to_string()));
    assert!(names.contains(&"InternetService_Fiber optic".to_string()));
    assert!(!names.contains(&"PaymentMethod_Bank transfer (automatic)".to_string()));
    assert_eq!(
        names.iter().filter(|n| n.starts_with("PaymentMethod_")).count(),
        3
    );
    assert!(!names.iter().any(|n| n == "Churn" || n == "customerID"));

    let table = encoder.transform(&normalized.frame).unwrap();
    assert_eq!(table.n_samples(), normalized.height());
    assert_eq!(table.n_features(), names.len());
    assert!(table.rows.iter().flatten().all(|v| v.is_finite()));
}

#[test]
fn test_label_encoding_switch_keeps_one_column_per_attribute() {
    let df = create_telco_dataframe(200, 8);
    let mut schema = FeatureSchema::telco();
    schema.default_nominal = NominalEncoding::Label;
    let normalized = normalize(&df, &schema).unwrap();

    let encoder = FeatureEncoder::fit(&normalized.frame, &schema).unwrap();
    assert!(encoder.feature_names().contains(&"PaymentMethod".to_string()));
    assert_eq!(encoder.feature_names().len(), 12);
}

#[test]
fn test_encoder_fitted_on_training_rows_only() {
    let df = create_telco_dataframe(500, 21);
    let config = telco_test_config(5);
    let prepared = prepare(&df, &config).unwrap();

    // Categories come from the training rows, in sorted order
    let payment = prepared.normalized.frame.column("PaymentMethod").unwrap().str().unwrap().clone();
    let mut train_categories: Vec<String> = prepared
        .split
        .train
        .iter()
        .filter_map(|&i| payment.get(i).map(|s| s.to_string()))
        .collect();
    train_categories.sort();
    train_categories.dedup();

    let fitted = prepared
        .encoder
        .columns()
        .iter()
        .find(|c| c.name == "PaymentMethod")
        .unwrap();
    match &fitted.encoding {
        ColumnEncoding::OneHot {
            categories,
            reference,
        } => {
            assert_eq!(categories, &train_categories);
            assert_eq!(reference, &train_categories[0]);
        }
        other => panic!("Expected one-hot encoding, got {:?}", other),
    }
    assert_eq!(
        prepared.train.feature_names,
        prepared.test.feature_names,
        "Both partitions share the fitted layout"
    );
}
