//! Derived financial statements and ratios.
//!
//! Four tools over [`FinancialSnapshot`]: single-company statements and
//! metrics, plus side-by-side comparisons that fetch every company
//! concurrently and report per-company failures inline.

use super::{cik_arg, cik_list, required_str, str_arg};
use crate::registry::{FieldType, InputSchema, RegistryBuilder, Tool, ToolContext, ToolError};
use async_trait::async_trait;
use edgar_core::financials::{parse_statements, METRIC_NAMES};
use edgar_core::{Cik, Error, FinancialSnapshot, ReportPeriod, Result, UpstreamPath};
use futures::future::join_all;
use serde_json::{json, Map, Value};

const MAX_COMPARE: usize = 10;

pub fn register_all(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .tool(GetCompanyFinancials)
        .tool(GetCompanyMetrics)
        .tool(CompareFinancials)
        .tool(CompareMetrics)
}

struct Loaded {
    cik: Cik,
    entity_name: Option<String>,
    snapshot: FinancialSnapshot,
}

async fn load(ctx: &ToolContext, cik: Cik, period: ReportPeriod) -> Result<Loaded> {
    let payload = ctx.fetch(&UpstreamPath::CompanyFacts { cik: cik.clone() }).await?;
    let snapshot = FinancialSnapshot::from_company_facts(&payload, period)?;
    Ok(Loaded {
        cik,
        entity_name: payload.get("entityName").and_then(Value::as_str).map(String::from),
        snapshot,
    })
}

fn period_arg(args: &Value) -> Result<ReportPeriod> {
    str_arg(args, "period").map_or(Ok(ReportPeriod::Latest), str::parse)
}

fn metric_names(args: &Value) -> Result<Option<Vec<String>>> {
    let Some(raw) = str_arg(args, "metrics") else {
        return Ok(None);
    };
    let names: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from)
        .collect();
    if let Some(bad) = names.iter().find(|n| !METRIC_NAMES.contains(&n.as_str())) {
        return Err(Error::bad_input(format!(
            "Unknown metric '{}' (expected {})",
            bad,
            METRIC_NAMES.join(", ")
        )));
    }
    Ok(Some(names))
}

fn companies_arg(args: &Value) -> Result<Vec<Cik>> {
    let ciks = cik_list(required_str(args, "companies")?)?;
    if !(2..=MAX_COMPARE).contains(&ciks.len()) {
        return Err(Error::bad_input(format!("Compare between 2 and {} companies", MAX_COMPARE)));
    }
    Ok(ciks)
}

fn header(loaded: &Loaded, period: ReportPeriod) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert("cik".into(), json!(loaded.cik));
    out.insert("entityName".into(), json!(loaded.entity_name));
    out.insert("period".into(), json!(period.to_string()));
    out.insert("asOf".into(), json!(loaded.snapshot.as_of()));
    out
}

fn failure(cik: &Cik, err: Error) -> Value {
    json!({ "cik": cik, "error": ToolError::from(err) })
}

/// Fetch all companies concurrently; each entry is either data or an inline error.
async fn for_each_company<F>(ctx: &ToolContext, ciks: Vec<Cik>, period: ReportPeriod, render: F) -> Vec<Value>
where
    F: Fn(&Loaded) -> Value,
{
    let loads = ciks.iter().map(|cik| load(ctx, cik.clone(), period));
    join_all(loads)
        .await
        .into_iter()
        .zip(&ciks)
        .map(|(result, cik)| match result {
            Ok(loaded) => render(&loaded),
            Err(e) => failure(cik, e),
        })
        .collect()
}

pub struct GetCompanyFinancials;

#[async_trait]
impl Tool for GetCompanyFinancials {
    fn name(&self) -> &str {
        "get-company-financials"
    }

    fn description(&self) -> &str {
        "Income statement, balance sheet and cash-flow figures for one company, derived from its \
         us-gaap facts, with optional ratios."
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new()
            .required("cik", FieldType::String, "Company CIK, 1-10 digits")
            .optional("period", FieldType::String, "'latest' (default), a fiscal year (2023) or quarter (2023-Q2)")
            .optional("statements", FieldType::String, "'all' or a comma list of income, balance, cashflow")
            .optional("includeMetrics", FieldType::Boolean, "Include derived ratios (default true)")
            .optional("fields", FieldType::String, "Comma list of top-level fields to keep")
    }

    async fn execute(&self, ctx: &ToolContext, args: &Value) -> Result<Value> {
        let period = period_arg(args)?;
        let statements = parse_statements(str_arg(args, "statements"))?;
        let include_metrics = args.get("includeMetrics").and_then(Value::as_bool).unwrap_or(true);

        let loaded = load(ctx, cik_arg(args)?, period).await?;
        let mut out = header(&loaded, period);
        out.insert("statements".into(), Value::Object(loaded.snapshot.statements(&statements)));
        if include_metrics {
            out.insert("metrics".into(), Value::Object(loaded.snapshot.metrics().select(None)));
        }

        if let Some(fields) = str_arg(args, "fields") {
            let keep: Vec<&str> = fields.split(',').map(str::trim).collect();
            out.retain(|k, _| keep.contains(&k.as_str()));
        }
        Ok(Value::Object(out))
    }
}

pub struct GetCompanyMetrics;

#[async_trait]
impl Tool for GetCompanyMetrics {
    fn name(&self) -> &str {
        "get-company-metrics"
    }

    fn description(&self) -> &str {
        "Financial ratios for one company: grossMargin, netMargin, roe, roa (percent), \
         currentRatio, debtToEquity."
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new()
            .required("cik", FieldType::String, "Company CIK, 1-10 digits")
            .optional("period", FieldType::String, "'latest' (default), a fiscal year or quarter")
            .optional("metrics", FieldType::String, "Comma list of metric names to return")
    }

    async fn execute(&self, ctx: &ToolContext, args: &Value) -> Result<Value> {
        let period = period_arg(args)?;
        let names = metric_names(args)?;
        let loaded = load(ctx, cik_arg(args)?, period).await?;

        let mut out = header(&loaded, period);
        out.insert(
            "metrics".into(),
            Value::Object(loaded.snapshot.metrics().select(names.as_deref())),
        );
        Ok(Value::Object(out))
    }
}

pub struct CompareFinancials;

#[async_trait]
impl Tool for CompareFinancials {
    fn name(&self) -> &str {
        "compare-financials"
    }

    fn description(&self) -> &str {
        "Side-by-side statements for several companies. Companies that fail to load are \
         reported inline with an error."
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new()
            .required("companies", FieldType::String, "Comma-separated CIKs (2-10)")
            .optional("period", FieldType::String, "'latest' (default), a fiscal year or quarter")
            .optional("statements", FieldType::String, "'all' or a comma list of income, balance, cashflow")
    }

    async fn execute(&self, ctx: &ToolContext, args: &Value) -> Result<Value> {
        let ciks = companies_arg(args)?;
        let period = period_arg(args)?;
        let statements = parse_statements(str_arg(args, "statements"))?;

        let companies = for_each_company(ctx, ciks, period, |loaded| {
            let mut out = header(loaded, period);
            out.insert("statements".into(), Value::Object(loaded.snapshot.statements(&statements)));
            Value::Object(out)
        })
        .await;
        Ok(json!({ "period": period.to_string(), "companies": companies }))
    }
}

pub struct CompareMetrics;

#[async_trait]
impl Tool for CompareMetrics {
    fn name(&self) -> &str {
        "compare-metrics"
    }

    fn description(&self) -> &str {
        "Side-by-side financial ratios for several companies."
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new()
            .required("companies", FieldType::String, "Comma-separated CIKs (2-10)")
            .optional("period", FieldType::String, "'latest' (default), a fiscal year or quarter")
            .optional("metrics", FieldType::String, "Comma list of metric names to return")
    }

    async fn execute(&self, ctx: &ToolContext, args: &Value) -> Result<Value> {
        let ciks = companies_arg(args)?;
        let period = period_arg(args)?;
        let names = metric_names(args)?;

        let companies = for_each_company(ctx, ciks, period, |loaded| {
            let mut out = header(loaded, period);
            out.insert(
                "metrics".into(),
                Value::Object(loaded.snapshot.metrics().select(names.as_deref())),
            );
            Value::Object(out)
        })
        .await;
        Ok(json!({ "period": period.to_string(), "companies": companies }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{context, FakeUpstream};
    use edgar_core::ErrorKind;

    fn facts(name: &str, revenue: f64, net_income: f64) -> Value {
        let usd = |val: f64| json!({ "units": { "USD": [{ "end": "2023-12-31", "fy": 2023, "fp": "FY", "val": val }] } });
        json!({
            "entityName": name,
            "facts": { "us-gaap": {
                "Revenues": usd(revenue),
                "NetIncomeLoss": usd(net_income),
                "StockholdersEquity": usd(net_income * 4.0)
            }}
        })
    }

    fn upstream() -> FakeUpstream {
        FakeUpstream::default()
            .with("/api/xbrl/companyfacts/CIK0000000001.json", facts("One", 100.0, 10.0))
            .with("/api/xbrl/companyfacts/CIK0000000002.json", facts("Two", 200.0, 50.0))
    }

    #[tokio::test]
    async fn test_financials_with_field_projection() {
        let ctx = context(upstream());
        let out = GetCompanyFinancials
            .execute(&ctx, &json!({ "cik": "1", "statements": "income" }))
            .await
            .unwrap();
        assert_eq!(out["entityName"], "One");
        assert_eq!(out["asOf"], "2023-12-31");
        assert_eq!(out["statements"]["income"]["revenue"], json!(100.0));
        assert!(out["statements"].get("balance").is_none());
        assert_eq!(out["metrics"]["netMargin"], json!(10.0));

        let out = GetCompanyFinancials
            .execute(&ctx, &json!({ "cik": "1", "fields": "cik,metrics" }))
            .await
            .unwrap();
        let keys: Vec<&String> = out.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 2);
    }

    #[tokio::test]
    async fn test_metrics_allow_list() {
        let ctx = context(upstream());
        let out = GetCompanyMetrics
            .execute(&ctx, &json!({ "cik": "2", "metrics": "roe" }))
            .await
            .unwrap();
        assert_eq!(out["metrics"], json!({ "roe": 25.0 }));

        let err = GetCompanyMetrics
            .execute(&ctx, &json!({ "cik": "2", "metrics": "ebitda" }))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadInput);
    }

    #[tokio::test]
    async fn test_compare_reports_failures_inline() {
        let ctx = context(upstream());
        let out = CompareMetrics
            .execute(&ctx, &json!({ "companies": "1,2,3" }))
            .await
            .unwrap();
        let companies = out["companies"].as_array().unwrap();
        assert_eq!(companies.len(), 3);
        assert_eq!(companies[0]["entityName"], "One");
        assert_eq!(companies[1]["metrics"]["netMargin"], json!(25.0));
        assert_eq!(companies[2]["cik"], "0000000003");
        assert_eq!(companies[2]["error"]["kind"], "UpstreamUnavailable");
    }

    #[tokio::test]
    async fn test_compare_needs_two_companies() {
        let ctx = context(upstream());
        let err = CompareFinancials
            .execute(&ctx, &json!({ "companies": "1" }))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadInput);

        let out = CompareFinancials
            .execute(&ctx, &json!({ "companies": "1,2", "statements": "income" }))
            .await
            .unwrap();
        assert_eq!(out["companies"][1]["statements"]["income"]["netIncome"], json!(50.0));
    }
}
