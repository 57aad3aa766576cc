//! Feature encoding: categorical attributes to numeric columns
//!
//! The encoder is fitted once, on the training partition, and is immutable
//! afterwards. Applying it to a category it never saw is an error; there is
//! no fallback code for unknown values.

use std::collections::HashMap;

use polars::prelude::*;

use super::error::{ConfigurationError, DataIntegrityError, Result};
use super::normalize::parse_charge;
use super::schema::{check_unique_ranks, ColumnRole, FeatureSchema, NominalEncoding};
use super::table::FeatureTable;
use super::target::{column_to_string_vec, encode_binary_value, encode_labels, BinaryMapping};

/// Fitted encoding of one source column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnEncoding {
    /// Two accepted values mapped to 0/1
    Binary(BinaryMapping),
    /// Code = position in the declared rank list
    Ordinal(Vec<String>),
    /// Code = position in the sorted category list observed at fit time
    Label { categories: Vec<String> },
    /// One indicator per observed category except `reference`
    OneHot {
        categories: Vec<String>,
        reference: String,
    },
    /// Numeric value used as-is (scaling happens later)
    Numeric,
}

/// A source column with its fitted encoding
#[derive(Debug, Clone, PartialEq)]
pub struct FittedColumn {
    pub name: String,
    pub encoding: ColumnEncoding,
}

impl FittedColumn {
    /// Names of the feature columns this source column produces
    pub fn output_names(&self) -> Vec<String> {
        match &self.encoding {
            ColumnEncoding::OneHot {
                categories,
                reference,
            } => categories
                .iter()
                .filter(|c| *c != reference)
                .map(|c| format!("{}_{}", self.name, c))
                .collect(),
            _ => vec![self.name.clone()],
        }
    }
}

/// Fitted encoder state for one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureEncoder {
    label_column: String,
    label_mapping: BinaryMapping,
    columns: Vec<FittedColumn>,
    feature_names: Vec<String>,
}

impl FeatureEncoder {
    /// Fit the per-column mappings on a (training) frame
    pub fn fit(df: &DataFrame, schema: &FeatureSchema) -> Result<Self> {
        let mut columns = Vec::new();

        for (name, role) in schema.resolve(df) {
            let encoding = match role {
                ColumnRole::Binary(mapping) => ColumnEncoding::Binary(mapping),
                ColumnRole::Ordinal(ranks) => {
                    if ranks.is_empty() {
                        return Err(ConfigurationError::EmptyRankList { column: name }.into());
                    }
                    check_unique_ranks(&name, &ranks)?;
                    ColumnEncoding::Ordinal(ranks)
                }
                ColumnRole::Nominal {
                    encoding,
                    reference,
                } => {
                    let categories = observed_categories(df.column(&name)?, &name)?;
                    match encoding {
                        NominalEncoding::Label => ColumnEncoding::Label { categories },
                        NominalEncoding::OneHot => {
                            let reference = match reference {
                                Some(r) if categories.contains(&r) => r,
                                Some(r) => {
                                    return Err(ConfigurationError::InvalidReference {
                                        column: name,
                                        reference: r,
                                    }
                                    .into())
                                }
                                None => categories.first().cloned().unwrap_or_default(),
                            };
                            ColumnEncoding::OneHot {
                                categories,
                                reference,
                            }
                        }
                    }
                }
                ColumnRole::Continuous | ColumnRole::Passthrough => ColumnEncoding::Numeric,
            };
            columns.push(FittedColumn { name, encoding });
        }

        let feature_names = unique_feature_names(&columns)?;

        Ok(Self {
            label_column: schema.label_column.clone(),
            label_mapping: schema.label_mapping.clone(),
            columns,
            feature_names,
        })
    }

    /// Encode a frame with the fitted mappings
    pub fn transform(&self, df: &DataFrame) -> Result<FeatureTable> {
        let labels = encode_labels(df, &self.label_column, &self.label_mapping)?;
        let n_rows = df.height();
        let mut rows: Vec<Vec<f64>> = vec![Vec::with_capacity(self.feature_names.len()); n_rows];

        for fitted in &self.columns {
            let col = df
                .column(&fitted.name)
                .map_err(|_| DataIntegrityError::MissingColumn {
                    column: fitted.name.clone(),
                })?;

            for encoded in encode_column(fitted, col)? {
                for (row, value) in rows.iter_mut().zip(encoded) {
                    row.push(value);
                }
            }
        }

        FeatureTable::new(self.feature_names.clone(), rows, labels)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn columns(&self) -> &[FittedColumn] {
        &self.columns
    }

    pub fn label_mapping(&self) -> &BinaryMapping {
        &self.label_mapping
    }

    pub fn label_column(&self) -> &str {
        &self.label_column
    }
}

/// Output names of all fitted columns, rejecting a name produced twice
fn unique_feature_names(columns: &[FittedColumn]) -> Result<Vec<String>> {
    let mut owners: HashMap<String, &str> = HashMap::new();
    let mut names = Vec::new();
    for fitted in columns {
        for name in fitted.output_names() {
            if let Some(first) = owners.insert(name.clone(), &fitted.name) {
                return Err(ConfigurationError::DuplicateFeatureName {
                    name,
                    first: first.to_string(),
                    second: fitted.name.clone(),
                }
                .into());
            }
            names.push(name);
        }
    }
    Ok(names)
}

/// Sorted distinct categories of a column; nulls are rejected
fn observed_categories(col: &Column, name: &str) -> Result<Vec<String>> {
    let mut categories = Vec::new();
    for (row, value) in column_to_string_vec(col)?.into_iter().enumerate() {
        match value {
            Some(v) => categories.push(v),
            None => {
                return Err(DataIntegrityError::NullValue {
                    column: name.to_string(),
                    row,
                }
                .into())
            }
        }
    }
    categories.sort();
    categories.dedup();
    Ok(categories)
}

/// Encode one source column into one or more feature columns
fn encode_column(fitted: &FittedColumn, col: &Column) -> Result<Vec<Vec<f64>>> {
    let name = fitted.name.as_str();

    match &fitted.encoding {
        ColumnEncoding::Numeric => Ok(vec![numeric_values(col, name)?]),
        ColumnEncoding::Binary(mapping) => {
            let values = column_to_string_vec(col)?
                .iter()
                .enumerate()
                .map(|(row, v)| encode_binary_value(name, row, v.as_deref(), mapping).map(f64::from))
                .collect::<Result<Vec<f64>>>()?;
            Ok(vec![values])
        }
        ColumnEncoding::Ordinal(ranks) => {
            let lookup = index_lookup(ranks);
            let values = column_to_string_vec(col)?
                .iter()
                .enumerate()
                .map(|(row, v)| -> Result<f64> {
                    let v = require_value(name, row, v.as_deref())?;
                    lookup.get(v).map(|&code| code as f64).ok_or_else(|| {
                        DataIntegrityError::UnrankedCategory {
                            column: name.to_string(),
                            row,
                            value: v.to_string(),
                        }
                        .into()
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            Ok(vec![values])
        }
        ColumnEncoding::Label { categories } => {
            let codes = category_codes(col, name, categories)?;
            Ok(vec![codes.into_iter().map(|c| c as f64).collect()])
        }
        ColumnEncoding::OneHot {
            categories,
            reference,
        } => {
            let codes = category_codes(col, name, categories)?;
            let indicators = categories
                .iter()
                .enumerate()
                .filter(|(_, c)| *c != reference)
                .map(|(idx, _)| {
                    codes
                        .iter()
                        .map(|&code| if code == idx { 1.0 } else { 0.0 })
                        .collect()
                })
                .collect();
            Ok(indicators)
        }
    }
}

fn index_lookup(values: &[String]) -> HashMap<&str, usize> {
    values
        .iter()
        .enumerate()
        .map(|(idx, v)| (v.as_str(), idx))
        .collect()
}

fn require_value<'a>(column: &str, row: usize, value: Option<&'a str>) -> Result<&'a str> {
    value.ok_or_else(|| {
        DataIntegrityError::NullValue {
            column: column.to_string(),
            row,
        }
        .into()
    })
}

/// Position of each value in the fitted category list
fn category_codes(col: &Column, name: &str, categories: &[String]) -> Result<Vec<usize>> {
    let lookup = index_lookup(categories);
    column_to_string_vec(col)?
        .iter()
        .enumerate()
        .map(|(row, v)| -> Result<usize> {
            let v = require_value(name, row, v.as_deref())?;
            lookup.get(v).copied().ok_or_else(|| {
                DataIntegrityError::UnknownCategory {
                    column: name.to_string(),
                    row,
                    value: v.to_string(),
                }
                .into()
            })
        })
        .collect()
}

/// Numeric values of a column; text is parsed, nulls and non-finite
/// values are rejected
fn numeric_values(col: &Column, name: &str) -> Result<Vec<f64>> {
    if matches!(col.dtype(), DataType::String) {
        return col
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| -> Result<f64> {
                let raw = require_value(name, row, v)?;
                parse_charge(raw).ok_or_else(|| {
                    DataIntegrityError::UnresolvableValue {
                        column: name.to_string(),
                        row,
                        value: raw.to_string(),
                    }
                    .into()
                })
            })
            .collect();
    }

    let cast = col.cast(&DataType::Float64)?;
    let values = cast
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| -> Result<f64> {
            match v {
                Some(v) if v.is_finite() => Ok(v),
                Some(v) => Err(DataIntegrityError::UnresolvableValue {
                    column: name.to_string(),
                    row,
                    value: v.to_string(),
                }
                .into()),
                None => Err(DataIntegrityError::NullValue {
                    column: name.to_string(),
                    row,
                }
                .into()),
            }
        })
        .collect::<Result<Vec<f64>>>()?;
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::schema::{NominalColumn, OrdinalColumn};

    fn internet_schema(encoding: NominalEncoding) -> FeatureSchema {
        let mut schema = FeatureSchema::new("Churn", "TotalCharges");
        schema.nominal.push(NominalColumn {
            name: "InternetService".to_string(),
            encoding,
            reference: Some("DSL".to_string()),
        });
        schema
    }

    fn internet_frame() -> DataFrame {
        df! {
            "InternetService" => ["Fiber optic", "DSL", "No", "DSL"],
            "TotalCharges" => [100.0f64, 50.0, 20.0, 60.0],
            "Churn" => ["Yes", "No", "No", "Yes"],
        }
        .unwrap()
    }

    #[test]
    fn test_one_hot_drops_reference() {
        let df = internet_frame();
        let encoder = FeatureEncoder::fit(&df, &internet_schema(NominalEncoding::OneHot)).unwrap();
        assert_eq!(
            encoder.feature_names(),
            &[
                "InternetService_Fiber optic".to_string(),
                "InternetService_No".to_string(),
                "TotalCharges".to_string(),
            ]
        );

        let table = encoder.transform(&df).unwrap();
        assert_eq!(table.rows[0], vec![1.0, 0.0, 100.0]);
        assert_eq!(table.rows[1], vec![0.0, 0.0, 50.0]);
        assert_eq!(table.rows[2], vec![0.0, 1.0, 20.0]);
        assert_eq!(table.labels, vec![1, 0, 0, 1]);
    }

    #[test]
    fn test_label_encoding_sorted_codes() {
        let df = internet_frame();
        let encoder = FeatureEncoder::fit(&df, &internet_schema(NominalEncoding::Label)).unwrap();
        let table = encoder.transform(&df).unwrap();
        // DSL=0, Fiber optic=1, No=2
        assert_eq!(table.column(0), vec![1.0, 0.0, 2.0, 0.0]);
    }

    #[test]
    fn test_ordinal_ranks() {
        let mut schema = FeatureSchema::new("Churn", "TotalCharges");
        schema.ordinal.push(OrdinalColumn {
            name: "Contract".to_string(),
            ranks: vec![
                "Month-to-month".to_string(),
                "One year".to_string(),
                "Two year".to_string(),
            ],
        });
        let df = df! {
            "Contract" => ["Two year", "Month-to-month", "One year"],
            "TotalCharges" => [1.0f64, 2.0, 3.0],
            "Churn" => ["No", "Yes", "No"],
        }
        .unwrap();

        let encoder = FeatureEncoder::fit(&df, &schema).unwrap();
        let table = encoder.transform(&df).unwrap();
        assert_eq!(table.column(0), vec![2.0, 0.0, 1.0]);
    }

    #[test]
    fn test_unranked_category_rejected() {
        let mut schema = FeatureSchema::new("Churn", "TotalCharges");
        schema.ordinal.push(OrdinalColumn {
            name: "Contract".to_string(),
            ranks: vec!["Month-to-month".to_string()],
        });
        let df = df! {
            "Contract" => ["Month-to-month", "Decade"],
            "TotalCharges" => [1.0f64, 2.0],
            "Churn" => ["No", "Yes"],
        }
        .unwrap();

        let encoder = FeatureEncoder::fit(&df, &schema).unwrap();
        let err = encoder.transform(&df).unwrap_err();
        assert!(err.is_data_integrity());
        assert!(err.to_string().contains("Decade"));
    }

    #[test]
    fn test_unknown_category_rejected() {
        let encoder =
            FeatureEncoder::fit(&internet_frame(), &internet_schema(NominalEncoding::Label)).unwrap();
        let unseen = df! {
            "InternetService" => ["DSL", "Satellite"],
            "TotalCharges" => [1.0f64, 2.0],
            "Churn" => ["No", "No"],
        }
        .unwrap();

        let err = encoder.transform(&unseen).unwrap_err();
        assert!(matches!(
            err,
            crate::pipeline::ChurnError::DataIntegrity(DataIntegrityError::UnknownCategory { ref value, row: 1, .. })
                if value == "Satellite"
        ));
    }

    #[test]
    fn test_invalid_reference_rejected() {
        let mut schema = internet_schema(NominalEncoding::OneHot);
        schema.nominal[0].reference = Some("Cable".to_string());
        let err = FeatureEncoder::fit(&internet_frame(), &schema).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_binary_unexpected_value() {
        let mut schema = FeatureSchema::new("Churn", "TotalCharges");
        schema.binary.push(crate::pipeline::schema::BinaryColumn::yes_no("Partner"));
        let df = df! {
            "Partner" => ["Yes", "Sometimes"],
            "TotalCharges" => [1.0f64, 2.0],
            "Churn" => ["No", "Yes"],
        }
        .unwrap();
        let encoder = FeatureEncoder::fit(&df, &schema).unwrap();
        let err = encoder.transform(&df).unwrap_err();
        assert!(err.to_string().contains("Sometimes"));
    }

    #[test]
    fn test_label_not_a_feature() {
        let encoder =
            FeatureEncoder::fit(&internet_frame(), &internet_schema(NominalEncoding::OneHot)).unwrap();
        assert!(!encoder.feature_names().iter().any(|n| n.starts_with("Churn")));
    }

    #[test]
    fn test_non_finite_numeric_rejected() {
        let mut schema = FeatureSchema::new("Churn", "TotalCharges");
        schema.continuous.push("tenure".to_string());
        let train = df! {
            "tenure" => [1.0f64, 2.0, 3.0],
            "TotalCharges" => [1.0f64, 2.0, 3.0],
            "Churn" => ["No", "Yes", "No"],
        }
        .unwrap();
        let eval = df! {
            "tenure" => [1.0f64, f64::NAN],
            "TotalCharges" => [1.0f64, 2.0],
            "Churn" => ["No", "Yes"],
        }
        .unwrap();

        let encoder = FeatureEncoder::fit(&train, &schema).unwrap();
        let err = encoder.transform(&eval).unwrap_err();
        assert!(matches!(
            err,
            crate::pipeline::ChurnError::DataIntegrity(DataIntegrityError::UnresolvableValue { ref column, row: 1, .. })
                if column == "tenure"
        ));
    }

    #[test]
    fn test_colliding_one_hot_names_rejected() {
        let mut schema = FeatureSchema::new("Churn", "TotalCharges");
        for name in ["A", "A_b"] {
            schema.nominal.push(NominalColumn {
                name: name.to_string(),
                encoding: NominalEncoding::OneHot,
                reference: None,
            });
        }
        // "A" + "b_c" and "A_b" + "c" both expand to "A_b_c"
        let df = df! {
            "A" => ["a", "b_c"],
            "A_b" => ["a", "c"],
            "TotalCharges" => [1.0f64, 2.0],
            "Churn" => ["No", "Yes"],
        }
        .unwrap();

        let err = FeatureEncoder::fit(&df, &schema).unwrap_err();
        assert!(matches!(
            err,
            crate::pipeline::ChurnError::Configuration(ConfigurationError::DuplicateFeatureName { ref name, .. })
                if name == "A_b_c"
        ));
    }

    #[test]
    fn test_duplicate_rank_rejected_at_fit() {
        let mut schema = FeatureSchema::new("Churn", "TotalCharges");
        schema.ordinal.push(OrdinalColumn {
            name: "Contract".to_string(),
            ranks: vec!["A".to_string(), "B".to_string(), "A".to_string()],
        });
        let df = df! {
            "Contract" => ["A", "B"],
            "TotalCharges" => [1.0f64, 2.0],
            "Churn" => ["No", "Yes"],
        }
        .unwrap();

        let err = FeatureEncoder::fit(&df, &schema).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("'A'"));
    }

    #[test]
    fn test_numeric_text_column_parsed() {
        let mut schema = FeatureSchema::new("Churn", "TotalCharges");
        schema.continuous.push("tenure".to_string());
        let df = df! {
            "tenure" => ["1", "x"],
            "TotalCharges" => [1.0f64, 2.0],
            "Churn" => ["No", "Yes"],
        }
        .unwrap();
        let encoder = FeatureEncoder::fit(&df, &schema).unwrap();
        let err = encoder.transform(&df).unwrap_err();
        assert!(matches!(
            err,
            crate::pipeline::ChurnError::DataIntegrity(DataIntegrityError::UnresolvableValue { row: 1, .. })
        ));
    }
}
