//! Schema normalization: numeric coercion of the cumulative charge,
//! removal of unresolvable records and of the customer identifier.

use polars::prelude::*;

use super::error::Result;
use super::schema::FeatureSchema;

/// A record excluded because its cumulative charge could not be resolved
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedRecord {
    /// Row index in the raw source
    pub row: usize,
    /// Raw value as found (empty for nulls)
    pub raw_value: String,
}

/// Output of the normalizer
#[derive(Debug, Clone)]
pub struct NormalizedFrame {
    /// Retained records with a Float64 cumulative charge and no identifier
    pub frame: DataFrame,
    pub dropped: Vec<DroppedRecord>,
}

impl NormalizedFrame {
    pub fn height(&self) -> usize {
        self.frame.height()
    }
}

/// Parse a raw charge value; blanks and parse failures are both unresolvable
pub fn parse_charge(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerce a column to optional floats, treating nulls, blanks, unparseable
/// strings and non-finite numbers as unresolvable
fn coerce_numeric(col: &Column) -> Result<Vec<(Option<f64>, String)>> {
    let values = match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| match v {
                Some(s) => (parse_charge(s), s.to_string()),
                None => (None, String::new()),
            })
            .collect(),
        _ => {
            let cast = col.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| match v {
                    Some(x) if x.is_finite() => (Some(x), x.to_string()),
                    Some(x) => (None, x.to_string()),
                    None => (None, String::new()),
                })
                .collect()
        }
    };
    Ok(values)
}

/// Normalize raw records against the schema.
///
/// Validates that the columns the schema needs are present, coerces the
/// cumulative charge to Float64, drops every record whose charge cannot be
/// resolved (no imputation) and removes the identifier column.
pub fn normalize(df: &DataFrame, schema: &FeatureSchema) -> Result<NormalizedFrame> {
    let column_names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    schema.validate_columns(&column_names)?;

    let charge_col = df.column(&schema.charge_column)?;
    let coerced = coerce_numeric(charge_col)?;

    let dropped: Vec<DroppedRecord> = coerced
        .iter()
        .enumerate()
        .filter(|(_, (value, _))| value.is_none())
        .map(|(row, (_, raw))| DroppedRecord {
            row,
            raw_value: raw.clone(),
        })
        .collect();

    let keep: Vec<bool> = coerced.iter().map(|(v, _)| v.is_some()).collect();
    let charges: Vec<f64> = coerced.iter().filter_map(|(v, _)| *v).collect();

    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    let mut frame = df.filter(&mask)?;
    frame.with_column(Column::new(schema.charge_column.as_str().into(), charges))?;

    if let Some(id) = &schema.id_column {
        frame = frame.drop(id)?;
    }

    Ok(NormalizedFrame { frame, dropped })
}
