//! get-xbrl-frames

use super::{cik_list, mode_field, required_str, str_arg, taxonomy_arg};
use crate::registry::{FieldType, InputSchema, Tool, ToolContext};
use async_trait::async_trait;
use edgar_core::normalize::{rank_frame, FrameOptions};
use edgar_core::{Error, Period, QueryOptions, Result, UpstreamPath};
use serde_json::{json, Value};

pub struct GetXbrlFrames;

fn small_int<T: TryFrom<u64>>(args: &Value, name: &str) -> Result<Option<T>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| T::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| Error::bad_input(format!("'{}' is out of range", name))),
    }
}

#[async_trait]
impl Tool for GetXbrlFrames {
    fn name(&self) -> &str {
        "get-xbrl-frames"
    }

    fn description(&self) -> &str {
        "One fact per reporting entity for a concept and calendar period, ranked by value \
         (highest first). Optionally restricted to a set of CIKs and truncated to topN."
    }

    fn input_schema(&self) -> InputSchema {
        mode_field(
            InputSchema::new()
                .required("taxonomy", FieldType::String, "Taxonomy: us-gaap, ifrs-full, dei or srt")
                .required("tag", FieldType::String, "XBRL tag (e.g. Assets)")
                .required("unit", FieldType::String, "Unit (e.g. USD, USD-per-shares, pure)")
                .required("year", FieldType::Integer, "Calendar year, 1900-2100")
                .optional("quarter", FieldType::Integer, "Quarter 1-4; omit for the annual frame")
                .optional("instant", FieldType::Boolean, "Point-in-time facts (default: true when a quarter is given)")
                .optional("ciks", FieldType::String, "Comma-separated CIKs to keep")
                .optional("topN", FieldType::Integer, "Number of entities to return"),
        )
    }

    async fn execute(&self, ctx: &ToolContext, args: &Value) -> Result<Value> {
        let options = QueryOptions::from_args(args)?;
        let taxonomy = taxonomy_arg(args)?;
        let tag = required_str(args, "tag")?.to_string();
        let unit = required_str(args, "unit")?.to_string();

        let year: u16 = small_int(args, "year")?.ok_or_else(|| Error::bad_input("'year' is required"))?;
        let quarter: Option<u8> = small_int(args, "quarter")?;
        let instant = args
            .get("instant")
            .and_then(Value::as_bool)
            .unwrap_or(quarter.is_some());
        let period = Period::new(year, quarter, instant)?;

        let frame_options = FrameOptions {
            ciks: str_arg(args, "ciks")
                .map(cik_list)
                .transpose()?
                .map(|ciks| ciks.into_iter().collect()),
            top_n: small_int::<usize>(args, "topN")?
                .unwrap_or(ctx.limits.default_top_n)
                .max(1),
            mode: options.mode,
        };

        let path = UpstreamPath::Frames {
            taxonomy,
            tag: tag.clone(),
            unit: unit.clone(),
            period,
        };
        let payload = ctx.fetch(&path).await?;
        let ranking = rank_frame(&payload, &frame_options)?;

        let result = json!({
            "taxonomy": taxonomy.as_str(),
            "tag": tag,
            "unit": unit,
            "period": period.to_string(),
            "label": ranking.label,
            "matched": ranking.matched,
            "returned": ranking.data.len(),
            "data": ranking.data,
        });
        ctx.guard().check(&result, &options)?.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{context, FakeUpstream};
    use edgar_core::ErrorKind;

    fn frame() -> Value {
        json!({
            "taxonomy": "us-gaap", "tag": "Assets", "ccp": "CY2023Q4I", "uom": "USD", "label": "Assets",
            "data": [
                { "accn": "a", "cik": 1, "entityName": "One", "end": "2023-12-31", "val": 5 },
                { "accn": "b", "cik": 2, "entityName": "Two", "end": "2023-12-31", "val": 30 },
                { "accn": "c", "cik": 3, "entityName": "Three", "end": "2023-12-31", "val": 10 },
                { "accn": "d", "cik": 4, "entityName": "Four", "end": "2023-12-31", "val": null }
            ]
        })
    }

    #[tokio::test]
    async fn test_builds_period_and_ranks() {
        let upstream = FakeUpstream::default().with("/api/xbrl/frames/us-gaap/Assets/USD/CY2023Q4I.json", frame());
        let ctx = context(upstream);
        let args = json!({ "taxonomy": "us-gaap", "tag": "Assets", "unit": "USD", "year": 2023, "quarter": 4, "topN": 2 });

        let out = GetXbrlFrames.execute(&ctx, &args).await.unwrap();
        assert_eq!(out["period"], "CY2023Q4I");
        let vals: Vec<&Value> = out["data"].as_array().unwrap().iter().map(|f| &f["val"]).collect();
        assert_eq!(vals, vec![&json!(30), &json!(10)]);
        assert_eq!(out["matched"], 4);
    }

    #[tokio::test]
    async fn test_annual_duration_frame_with_cik_filter() {
        let upstream = FakeUpstream::default().with("/api/xbrl/frames/us-gaap/Assets/USD/CY2023.json", frame());
        let ctx = context(upstream);
        let args = json!({
            "taxonomy": "us-gaap", "tag": "Assets", "unit": "USD", "year": 2023,
            "ciks": "1,0000000003", "mode": "brief"
        });

        let out = GetXbrlFrames.execute(&ctx, &args).await.unwrap();
        let data = out["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["cik"], "0000000003");
        assert!(data[0].get("accn").is_none());
    }

    #[tokio::test]
    async fn test_rejects_bad_period() {
        let ctx = context(FakeUpstream::default());
        for args in [
            json!({ "taxonomy": "us-gaap", "tag": "Assets", "unit": "USD", "year": 1850 }),
            json!({ "taxonomy": "us-gaap", "tag": "Assets", "unit": "USD", "year": 2023, "quarter": 5 }),
            json!({ "taxonomy": "us-gaap", "tag": "Assets", "unit": "USD", "year": 99999 }),
        ] {
            let err = GetXbrlFrames.execute(&ctx, &args).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BadInput);
        }
    }
}
