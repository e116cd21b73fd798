//! get-company-concept

use super::{cik_arg, fact_filter_fields, required_str, str_arg, taxonomy_arg};
use crate::registry::{FieldType, InputSchema, Tool, ToolContext};
use async_trait::async_trait;
use edgar_core::normalize::{expect_object, flatten_units};
use edgar_core::{QueryOptions, Result, UpstreamPath};
use serde_json::{json, Value};

pub struct GetCompanyConcept;

#[async_trait]
impl Tool for GetCompanyConcept {
    fn name(&self) -> &str {
        "get-company-concept"
    }

    fn description(&self) -> &str {
        "All XBRL disclosures for one company and one concept (taxonomy + tag), grouped by unit. \
         Supports a date window, unit allow-list and latest-only reduction."
    }

    fn input_schema(&self) -> InputSchema {
        fact_filter_fields(
            InputSchema::new()
                .required("cik", FieldType::String, "Company CIK, 1-10 digits (e.g. 320193)")
                .required("taxonomy", FieldType::String, "Taxonomy: us-gaap, ifrs-full, dei or srt")
                .required("tag", FieldType::String, "XBRL tag (e.g. AccountsPayableCurrent, Assets)"),
        )
        .optional("unit", FieldType::String, "Single unit, also sent upstream as a filter")
    }

    async fn execute(&self, ctx: &ToolContext, args: &Value) -> Result<Value> {
        let options = QueryOptions::from_args(args)?;
        let cik = cik_arg(args)?;
        let taxonomy = taxonomy_arg(args)?;
        let tag = required_str(args, "tag")?.to_string();

        let path = UpstreamPath::CompanyConcept {
            cik: cik.clone(),
            taxonomy,
            tag: tag.clone(),
            unit: str_arg(args, "unit").map(String::from),
        };
        let payload = ctx.fetch(&path).await?;
        let root = expect_object(&payload, "company concept payload")?;

        let units = flatten_units(root.get("units"), &options);
        let result = json!({
            "cik": cik,
            "entityName": root.get("entityName"),
            "taxonomy": taxonomy.as_str(),
            "tag": tag,
            "label": root.get("label"),
            "description": root.get("description"),
            "unitCount": units.len(),
            "units": units,
        });

        ctx.guard().check(&result, &options)?.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use crate::tools::testing::{context, context_with_limits, FakeUpstream};
    use edgar_core::ErrorKind;

    const PATH: &str = "/api/xbrl/companyconcept/CIK0000320193/us-gaap/Assets.json";

    fn concept() -> Value {
        json!({
            "cik": 320193,
            "taxonomy": "us-gaap",
            "tag": "Assets",
            "label": "Assets",
            "entityName": "Apple Inc.",
            "units": {
                "USD": [
                    { "end": "2021-09-25", "val": 351002, "accn": "a" },
                    { "end": "2022-09-24", "val": 352755, "accn": "b" },
                    { "end": "2023-09-30", "val": 352583, "accn": "c" }
                ],
                "EUR": "not-an-array"
            }
        })
    }

    #[tokio::test]
    async fn test_latest_only_per_unit() {
        let ctx = context(FakeUpstream::default().with(PATH, concept()));
        let args = json!({ "cik": "320193", "taxonomy": "us-gaap", "tag": "Assets", "latestOnly": true });

        let out = GetCompanyConcept.execute(&ctx, &args).await.unwrap();
        assert_eq!(out["cik"], "0000320193");
        assert_eq!(out["unitCount"], 1);
        let usd = out["units"]["USD"].as_array().unwrap();
        assert_eq!(usd.len(), 1);
        assert_eq!(usd[0]["accn"], "c");
    }

    #[tokio::test]
    async fn test_date_window_inclusive() {
        let ctx = context(FakeUpstream::default().with(PATH, concept()));
        let args = json!({
            "cik": "320193", "taxonomy": "us-gaap", "tag": "Assets",
            "startDate": "2021-09-25", "endDate": "2022-09-24"
        });
        let out = GetCompanyConcept.execute(&ctx, &args).await.unwrap();
        assert_eq!(out["units"]["USD"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_upstream_failure_and_bad_taxonomy() {
        let ctx = context(FakeUpstream::default());
        let args = json!({ "cik": "320193", "taxonomy": "us-gaap", "tag": "Assets" });
        let err = GetCompanyConcept.execute(&ctx, &args).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);

        let args = json!({ "cik": "320193", "taxonomy": "gaap", "tag": "Assets" });
        let err = GetCompanyConcept.execute(&ctx, &args).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadInput);
    }

    #[tokio::test]
    async fn test_oversized_result_becomes_advisory() {
        let limits = Limits { max_response_bytes: 100, ..Limits::default() };
        let ctx = context_with_limits(FakeUpstream::default().with(PATH, concept()), limits);
        let args = json!({ "cik": "320193", "taxonomy": "us-gaap", "tag": "Assets" });

        let out = GetCompanyConcept.execute(&ctx, &args).await.unwrap();
        assert_eq!(out["kind"], "PayloadTooLarge");
        assert!(out.get("units").is_none());
    }
}
