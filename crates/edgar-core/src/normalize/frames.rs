//! Frame ranking: one fact per entity for a calendrical period.

use super::{expect_object, type_name};
use crate::cik::Cik;
use crate::error::{Error, Result};
use crate::query::OutputMode;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashSet;

pub const DEFAULT_TOP_N: usize = 20;

#[derive(Debug, Clone)]
pub struct FrameOptions {
    pub ciks: Option<HashSet<Cik>>,
    pub top_n: usize,
    pub mode: OutputMode,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            ciks: None,
            top_n: DEFAULT_TOP_N,
            mode: OutputMode::Full,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRanking {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ccp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uom: Option<String>,
    /// Entities in the frame after the CIK restriction, before truncation.
    pub matched: usize,
    pub data: Vec<Value>,
}

/// Missing, null and non-numeric values rank below every number.
fn rank_value(fact: &Value) -> Option<f64> {
    fact.get("val").and_then(Value::as_f64)
}

fn by_value_desc(a: &Value, b: &Value) -> Ordering {
    match (rank_value(a), rank_value(b)) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn fact_cik(fact: &Value) -> Option<Cik> {
    match fact.get("cik")? {
        Value::Number(n) => n.as_u64().and_then(|n| Cik::from_number(n).ok()),
        Value::String(s) => Cik::parse(s).ok(),
        _ => None,
    }
}

fn brief(fact: &Value) -> Value {
    let mut row = Map::new();
    if let Some(cik) = fact_cik(fact) {
        row.insert("cik".into(), Value::String(cik.to_string()));
    }
    for field in ["entityName", "val", "end"] {
        if let Some(v) = fact.get(field) {
            row.insert(field.into(), v.clone());
        }
    }
    Value::Object(row)
}

pub fn rank_frame(payload: &Value, options: &FrameOptions) -> Result<FrameRanking> {
    let root = expect_object(payload, "frame payload")?;

    let data: &[Value] = match root.get("data") {
        None | Some(Value::Null) => &[],
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(Error::integrity(format!(
                "Frame data is {}, expected array",
                type_name(other)
            )))
        }
    };

    let mut facts: Vec<&Value> = data
        .iter()
        .filter(|fact| match &options.ciks {
            Some(allowed) => fact_cik(fact).map_or(false, |cik| allowed.contains(&cik)),
            None => true,
        })
        .collect();
    let matched = facts.len();

    // stable sort keeps upstream order among equal values
    facts.sort_by(|a, b| by_value_desc(a, b));
    facts.truncate(options.top_n);

    let data = facts
        .into_iter()
        .map(|fact| match options.mode {
            OutputMode::Brief => brief(fact),
            OutputMode::Full => fact.clone(),
        })
        .collect();

    let text = |key: &str| root.get(key).and_then(Value::as_str).map(String::from);
    Ok(FrameRanking {
        ccp: text("ccp"),
        label: text("label"),
        uom: text("uom"),
        matched,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(vals: Vec<Value>) -> Value {
        let data: Vec<Value> = vals
            .into_iter()
            .enumerate()
            .map(|(i, val)| {
                json!({
                    "accn": format!("acc-{}", i),
                    "cik": 1000 + i,
                    "entityName": format!("Entity {}", i),
                    "loc": "US-CA",
                    "end": "2023-12-31",
                    "val": val,
                })
            })
            .collect();
        json!({ "ccp": "CY2023Q4I", "uom": "USD", "label": "Assets", "data": data })
    }

    #[test]
    fn test_top_n_descending_nulls_last() {
        let payload = frame(vec![json!(5), json!(30), json!(10), Value::Null]);
        let opts = FrameOptions { top_n: 2, ..Default::default() };
        let ranking = rank_frame(&payload, &opts).unwrap();
        let vals: Vec<_> = ranking.data.iter().map(|f| f["val"].clone()).collect();
        assert_eq!(vals, vec![json!(30), json!(10)]);
        assert_eq!(ranking.matched, 4);
    }

    #[test]
    fn test_non_numeric_ranks_last() {
        let payload = frame(vec![json!("n/a"), json!(-4), json!(2)]);
        let ranking = rank_frame(&payload, &FrameOptions::default()).unwrap();
        let vals: Vec<_> = ranking.data.iter().map(|f| f["val"].clone()).collect();
        assert_eq!(vals, vec![json!(2), json!(-4), json!("n/a")]);
    }

    #[test]
    fn test_cik_restriction_and_brief_mode() {
        let payload = frame(vec![json!(1), json!(2), json!(3)]);
        let opts = FrameOptions {
            ciks: Some(["1000", "0000001002"].iter().map(|c| Cik::parse(c).unwrap()).collect()),
            top_n: 10,
            mode: OutputMode::Brief,
        };
        let ranking = rank_frame(&payload, &opts).unwrap();
        assert_eq!(ranking.matched, 2);
        assert_eq!(ranking.data[0]["cik"], "0000001002");
        assert_eq!(ranking.data[1]["cik"], "0000001000");
        let keys: Vec<_> = ranking.data[0].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 4);
        assert!(ranking.data[0].get("accn").is_none());
    }

    #[test]
    fn test_empty_and_malformed_frames() {
        let ranking = rank_frame(&json!({}), &FrameOptions::default()).unwrap();
        assert!(ranking.data.is_empty());
        assert!(rank_frame(&json!({ "data": {} }), &FrameOptions::default()).is_err());
        assert!(rank_frame(&json!("frame"), &FrameOptions::default()).is_err());
    }
}
