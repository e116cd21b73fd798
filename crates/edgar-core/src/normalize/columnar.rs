//! Columnar-to-row pivot for submission histories.

use super::type_name;
use crate::error::{Error, Result};
use serde_json::{Map, Value};

/// Submission columns encoded upstream as 0/1.
pub const FILING_FLAG_FIELDS: &[&str] = &["isXBRL", "isInlineXBRL"];

const BRIEF_FILING_FIELDS: &[&str] = &["accessionNumber", "filingDate", "form", "primaryDocument"];

/// Turn `N` aligned arrays of length `L` into `L` records.
///
/// Fields named in `flag_fields` have numeric 0/1 values converted to
/// booleans. Unequal column lengths or a non-array column fail the whole
/// pivot; nothing is truncated.
pub fn pivot(columns: &Map<String, Value>, flag_fields: &[&str]) -> Result<Vec<Map<String, Value>>> {
    let mut arrays: Vec<(&str, &Vec<Value>)> = Vec::with_capacity(columns.len());
    for (name, column) in columns {
        match column {
            Value::Array(values) => arrays.push((name.as_str(), values)),
            other => {
                return Err(Error::integrity(format!(
                    "Column '{}' is {}, expected array",
                    name,
                    type_name(other)
                )))
            }
        }
    }

    let Some(&(first_name, first)) = arrays.first() else {
        return Ok(Vec::new());
    };
    let len = first.len();
    if let Some((name, values)) = arrays.iter().find(|(_, v)| v.len() != len) {
        return Err(Error::integrity(format!(
            "Column '{}' has {} entries but '{}' has {}",
            name,
            values.len(),
            first_name,
            len
        )));
    }

    let rows = (0..len)
        .map(|i| {
            arrays
                .iter()
                .map(|(name, values)| {
                    let value = &values[i];
                    let value = if flag_fields.contains(name) {
                        coerce_flag(value)
                    } else {
                        value.clone()
                    };
                    (name.to_string(), value)
                })
                .collect::<Map<String, Value>>()
        })
        .collect();
    Ok(rows)
}

fn coerce_flag(value: &Value) -> Value {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(0) => Value::Bool(false),
            Some(1) => Value::Bool(true),
            _ => value.clone(),
        },
        other => other.clone(),
    }
}

pub fn project_brief_filings(rows: Vec<Map<String, Value>>) -> Vec<Map<String, Value>> {
    rows.into_iter()
        .map(|row| {
            BRIEF_FILING_FIELDS
                .iter()
                .filter_map(|field| row.get(*field).map(|v| (field.to_string(), v.clone())))
                .collect()
        })
        .collect()
}
