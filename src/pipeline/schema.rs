//! Column schema: which attribute plays which role in the pipeline.
//!
//! The schema declares the identifier, the label, the cumulative-charge
//! column and the encoding class of each attribute. Attributes that are not
//! declared fall back by dtype: text columns are nominal (encoded with
//! `default_nominal`), numeric columns are passed through unchanged.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::{ConfigurationError, DataIntegrityError, Result};
use super::target::BinaryMapping;

/// Encoding strategy for nominal (unordered) categorical columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NominalEncoding {
    /// Indicator columns `<column>_<category>`, reference category dropped
    #[default]
    OneHot,
    /// Dense integer code per category, in sorted category order
    Label,
}

impl fmt::Display for NominalEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NominalEncoding::OneHot => write!(f, "onehot"),
            NominalEncoding::Label => write!(f, "label"),
        }
    }
}

impl FromStr for NominalEncoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "onehot" | "one-hot" | "one_hot" => Ok(NominalEncoding::OneHot),
            "label" => Ok(NominalEncoding::Label),
            _ => Err(format!(
                "Unknown nominal encoding: '{}'. Use 'onehot' or 'label'.",
                s
            )),
        }
    }
}

/// A yes/no style column with its two accepted values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryColumn {
    pub name: String,
    #[serde(default)]
    pub mapping: BinaryMapping,
}

impl BinaryColumn {
    pub fn yes_no(name: &str) -> Self {
        Self {
            name: name.to_string(),
            mapping: BinaryMapping::default(),
        }
    }
}

/// An ordered categorical column; position in `ranks` is the code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdinalColumn {
    pub name: String,
    pub ranks: Vec<String>,
}

/// Explicit strategy for a nominal column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NominalColumn {
    pub name: String,
    #[serde(default)]
    pub encoding: NominalEncoding,
    /// Category dropped by one-hot expansion (first sorted category when unset)
    #[serde(default)]
    pub reference: Option<String>,
}

/// Role of a single feature column after resolution against a frame
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnRole {
    Binary(BinaryMapping),
    Ordinal(Vec<String>),
    Nominal {
        encoding: NominalEncoding,
        reference: Option<String>,
    },
    /// Scaled numeric column
    Continuous,
    /// Numeric column used as-is (e.g. an already 0/1 flag)
    Passthrough,
}

/// Declared column roles for a churn dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    /// Unique customer identifier, removed before encoding
    #[serde(default)]
    pub id_column: Option<String>,
    pub label_column: String,
    #[serde(default)]
    pub label_mapping: BinaryMapping,
    /// Cumulative charge column; rows where it cannot be resolved are dropped
    pub charge_column: String,
    #[serde(default)]
    pub binary: Vec<BinaryColumn>,
    #[serde(default)]
    pub ordinal: Vec<OrdinalColumn>,
    #[serde(default)]
    pub nominal: Vec<NominalColumn>,
    #[serde(default)]
    pub continuous: Vec<String>,
    #[serde(default)]
    pub default_nominal: NominalEncoding,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::telco()
    }
}

impl FeatureSchema {
    /// Schema for the Telco customer churn dataset
    pub fn telco() -> Self {
        Self {
            id_column: Some("customerID".to_string()),
            label_column: "Churn".to_string(),
            label_mapping: BinaryMapping::default(),
            charge_column: "TotalCharges".to_string(),
            binary: vec![
                BinaryColumn {
                    name: "gender".to_string(),
                    mapping: BinaryMapping::new("Male", "Female"),
                },
                BinaryColumn::yes_no("Partner"),
                BinaryColumn::yes_no("Dependents"),
                BinaryColumn::yes_no("PhoneService"),
                BinaryColumn::yes_no("PaperlessBilling"),
            ],
            ordinal: vec![OrdinalColumn {
                name: "Contract".to_string(),
                ranks: vec![
                    "Month-to-month".to_string(),
                    "One year".to_string(),
                    "Two year".to_string(),
                ],
            }],
            nominal: Vec::new(),
            continuous: vec![
                "tenure".to_string(),
                "MonthlyCharges".to_string(),
                "TotalCharges".to_string(),
            ],
            default_nominal: NominalEncoding::OneHot,
        }
    }

    /// Minimal schema: only label and cumulative charge declared
    pub fn new(label_column: &str, charge_column: &str) -> Self {
        Self {
            id_column: None,
            label_column: label_column.to_string(),
            label_mapping: BinaryMapping::default(),
            charge_column: charge_column.to_string(),
            binary: Vec::new(),
            ordinal: Vec::new(),
            nominal: Vec::new(),
            continuous: Vec::new(),
            default_nominal: NominalEncoding::OneHot,
        }
    }

    /// Check the schema against the columns present in a source.
    ///
    /// Missing label or charge columns are data integrity failures (the
    /// source is unusable); any other declared column that is absent is a
    /// configuration failure.
    pub fn validate_columns(&self, columns: &[String]) -> Result<()> {
        let present: HashSet<&str> = columns.iter().map(|c| c.as_str()).collect();

        for required in [&self.label_column, &self.charge_column] {
            if !present.contains(required.as_str()) {
                return Err(DataIntegrityError::MissingColumn {
                    column: required.clone(),
                }
                .into());
            }
        }

        if let Some(id) = &self.id_column {
            if !present.contains(id.as_str()) {
                return Err(ConfigurationError::UnknownColumn { column: id.clone() }.into());
            }
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for name in self.declared_feature_columns() {
            if !present.contains(name) {
                return Err(ConfigurationError::UnknownColumn {
                    column: name.to_string(),
                }
                .into());
            }
            if !seen.insert(name)
                || name == self.label_column
                || Some(name) == self.id_column.as_deref()
            {
                return Err(ConfigurationError::DuplicateColumn {
                    column: name.to_string(),
                }
                .into());
            }
        }

        for ordinal in &self.ordinal {
            if ordinal.ranks.is_empty() {
                return Err(ConfigurationError::EmptyRankList {
                    column: ordinal.name.clone(),
                }
                .into());
            }
            check_unique_ranks(&ordinal.name, &ordinal.ranks)?;
        }

        Ok(())
    }

    fn declared_feature_columns(&self) -> impl Iterator<Item = &str> {
        self.binary
            .iter()
            .map(|c| c.name.as_str())
            .chain(self.ordinal.iter().map(|c| c.name.as_str()))
            .chain(self.nominal.iter().map(|c| c.name.as_str()))
            .chain(self.continuous.iter().map(|c| c.as_str()))
    }

    /// Role of a feature column, given its dtype for undeclared columns
    pub fn role_of(&self, name: &str, dtype: &DataType) -> ColumnRole {
        if let Some(binary) = self.binary.iter().find(|c| c.name == name) {
            return ColumnRole::Binary(binary.mapping.clone());
        }
        if let Some(ordinal) = self.ordinal.iter().find(|c| c.name == name) {
            return ColumnRole::Ordinal(ordinal.ranks.clone());
        }
        if let Some(nominal) = self.nominal.iter().find(|c| c.name == name) {
            return ColumnRole::Nominal {
                encoding: nominal.encoding,
                reference: nominal.reference.clone(),
            };
        }
        if self.continuous.iter().any(|c| c == name) {
            return ColumnRole::Continuous;
        }
        if dtype.is_primitive_numeric() || matches!(dtype, DataType::Boolean) {
            ColumnRole::Passthrough
        } else {
            ColumnRole::Nominal {
                encoding: self.default_nominal,
                reference: None,
            }
        }
    }

    /// Feature columns of a frame with their roles, in frame order.
    ///
    /// The identifier and label columns are never returned.
    pub fn resolve(&self, df: &DataFrame) -> Vec<(String, ColumnRole)> {
        df.get_columns()
            .iter()
            .filter(|col| {
                col.name().as_str() != self.label_column
                    && Some(col.name().as_str()) != self.id_column.as_deref()
            })
            .map(|col| {
                let name = col.name().to_string();
                let role = self.role_of(&name, col.dtype());
                (name, role)
            })
            .collect()
    }
}

/// Each rank may appear once; a repeated rank would make its code ambiguous
pub(crate) fn check_unique_ranks(column: &str, ranks: &[String]) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    match ranks.iter().find(|r| !seen.insert(r.as_str())) {
        Some(dup) => Err(ConfigurationError::DuplicateRank {
            column: column.to_string(),
            value: dup.clone(),
        }
        .into()),
        None => Ok(()),
    }
}
