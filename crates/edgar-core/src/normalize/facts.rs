//! Company-wide fact aggregation.

use super::{expect_object, units::flatten_units};
use crate::error::Result;
use crate::query::QueryOptions;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyFactsSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cik: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    /// taxonomy → tag → `{label, units}`
    pub facts: Map<String, Value>,
    pub tag_count: usize,
}

impl CompanyFactsSummary {
    pub fn is_empty(&self) -> bool {
        self.tag_count == 0
    }
}

/// Walk taxonomy → tag → unit, applying the allow-lists and the per-unit
/// reduction. Tags with no surviving units and taxonomies with no
/// surviving tags are omitted.
pub fn aggregate_company_facts(payload: &Value, options: &QueryOptions) -> Result<CompanyFactsSummary> {
    let root = expect_object(payload, "company facts payload")?;

    let mut facts = Map::new();
    let mut tag_count = 0;

    if let Some(Value::Object(taxonomies)) = root.get("facts") {
        for (taxonomy, tags) in taxonomies {
            if !options.allows_taxonomy(taxonomy) {
                continue;
            }
            let Value::Object(tags) = tags else { continue };

            let mut kept_tags = Map::new();
            for (tag, concept) in tags {
                if !options.allows_tag(tag) {
                    continue;
                }
                let units = flatten_units(concept.get("units"), options);
                if units.is_empty() {
                    continue;
                }
                let mut entry = Map::new();
                if let Some(label) = concept.get("label").filter(|l| !l.is_null()) {
                    entry.insert("label".into(), label.clone());
                }
                entry.insert("units".into(), Value::Object(units));
                kept_tags.insert(tag.clone(), Value::Object(entry));
            }

            if !kept_tags.is_empty() {
                tag_count += kept_tags.len();
                facts.insert(taxonomy.clone(), Value::Object(kept_tags));
            }
        }
    }

    Ok(CompanyFactsSummary {
        cik: root.get("cik").cloned(),
        entity_name: root.get("entityName").and_then(Value::as_str).map(String::from),
        facts,
        tag_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "cik": 320193,
            "entityName": "Apple Inc.",
            "facts": {
                "dei": {
                    "EntityCommonStockSharesOutstanding": {
                        "label": "Shares Outstanding",
                        "units": { "shares": [{ "end": "2024-01-01", "val": 15 }] }
                    }
                },
                "us-gaap": {
                    "Assets": {
                        "label": "Assets",
                        "units": { "USD": [
                            { "end": "2022-09-24", "val": 352755 },
                            { "end": "2023-09-30", "val": 352583 }
                        ] }
                    },
                    "Liabilities": {
                        "label": "Liabilities",
                        "units": { "USD": [{ "end": "2019-09-28", "val": 248028 }] }
                    },
                    "Broken": { "label": "No units here" }
                }
            }
        })
    }

    #[test]
    fn test_aggregate_applies_allow_lists() {
        let mut opts = QueryOptions::default().with_tags(["Assets", "EntityCommonStockSharesOutstanding"]);
        opts.taxonomies = Some(["us-gaap".to_string()].into_iter().collect());

        let summary = aggregate_company_facts(&payload(), &opts).unwrap();
        assert_eq!(summary.tag_count, 1);
        assert!(summary.facts.get("dei").is_none());
        assert!(summary.facts["us-gaap"].get("Assets").is_some());
        assert_eq!(summary.entity_name.as_deref(), Some("Apple Inc."));
    }

    #[test]
    fn test_aggregate_latest_only_and_omits_empty() {
        let opts = QueryOptions::default()
            .with_latest_only(true)
            .with_date_range(crate::query::DateRange::new(Some("2020-01-01"), None).unwrap());

        let summary = aggregate_company_facts(&payload(), &opts).unwrap();
        let gaap = summary.facts["us-gaap"].as_object().unwrap();
        assert!(gaap.get("Liabilities").is_none());
        assert!(gaap.get("Broken").is_none());
        let usd = gaap["Assets"]["units"]["USD"].as_array().unwrap();
        assert_eq!(usd.len(), 1);
        assert_eq!(usd[0]["end"], "2023-09-30");
    }

    #[test]
    fn test_aggregate_empty_payloads() {
        let summary = aggregate_company_facts(&json!({}), &QueryOptions::default()).unwrap();
        assert!(summary.is_empty());

        let err = aggregate_company_facts(&json!([1, 2]), &QueryOptions::default()).unwrap_err();
        assert!(matches!(err, Error::DataIntegrity(_)));
    }
}
