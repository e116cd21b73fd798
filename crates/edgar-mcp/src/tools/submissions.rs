//! get-company-submissions
//!
//! Submission histories arrive columnar under `filings.recent`; historical
//! pages listed in `filings.files` are columnar at the root. Both are
//! pivoted to rows and paged rather than size-guarded.

use super::{cik_arg, date_window_fields, mode_field, str_arg};
use crate::config::Limits;
use crate::registry::{FieldType, InputSchema, Tool, ToolContext};
use async_trait::async_trait;
use edgar_core::normalize::{expect_object, pivot, project_brief_filings, FILING_FLAG_FIELDS};
use edgar_core::{paginate, Error, OutputMode, Page, QueryOptions, Result, UpstreamPath};
use serde_json::{json, Map, Value};

pub struct GetCompanySubmissions;

pub(crate) type FilingRow = Map<String, Value>;

/// Rows from `filings.recent` of a submissions document.
pub(crate) fn recent_filings(payload: &Value) -> Result<Vec<FilingRow>> {
    let root = expect_object(payload, "submissions payload")?;
    match root.get("filings").and_then(|f| f.get("recent")) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(recent) => pivot(expect_object(recent, "filings.recent")?, FILING_FLAG_FIELDS),
    }
}

/// Rows of a historical submissions page.
pub(crate) fn file_filings(payload: &Value) -> Result<Vec<FilingRow>> {
    pivot(expect_object(payload, "submissions file")?, FILING_FLAG_FIELDS)
}

/// Names of the historical pages listed under `filings.files`.
pub(crate) fn history_files(payload: &Value) -> Vec<String> {
    payload
        .get("filings")
        .and_then(|f| f.get("files"))
        .and_then(Value::as_array)
        .map(|files| {
            files
                .iter()
                .filter_map(|f| f.get("name").and_then(Value::as_str))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// Entity fields kept alongside the filing rows.
pub(crate) fn entity_summary(payload: &Value) -> Map<String, Value> {
    ["cik", "name", "sic", "sicDescription", "tickers", "exchanges", "fiscalYearEnd"]
        .iter()
        .filter_map(|k| payload.get(*k).map(|v| (k.to_string(), v.clone())))
        .collect()
}

/// Filter by filing date and form, then page.
pub(crate) fn page_filings(
    rows: Vec<FilingRow>,
    options: &QueryOptions,
    form: Option<&str>,
    limits: &Limits,
) -> Page<FilingRow> {
    let rows: Vec<FilingRow> = rows
        .into_iter()
        .filter(|row| {
            options.date_range.is_unbounded()
                || row
                    .get("filingDate")
                    .and_then(Value::as_str)
                    .map_or(false, |d| options.date_range.contains(d))
        })
        .filter(|row| {
            form.map_or(true, |form| {
                row.get("form")
                    .and_then(Value::as_str)
                    .map_or(false, |f| f.eq_ignore_ascii_case(form))
            })
        })
        .collect();

    let mut page = paginate(
        &rows,
        options.page.unwrap_or(1),
        options.page_size.unwrap_or(limits.default_page_size),
    );
    if options.mode == OutputMode::Brief {
        page.items = project_brief_filings(page.items);
    }
    page
}

#[async_trait]
impl Tool for GetCompanySubmissions {
    fn name(&self) -> &str {
        "get-company-submissions"
    }

    fn description(&self) -> &str {
        "A company's filing history as paginated rows (newest first). Pass 'file' with a name \
         from the returned 'files' list to page through older filings."
    }

    fn input_schema(&self) -> InputSchema {
        mode_field(date_window_fields(
            InputSchema::new()
                .required("cik", FieldType::String, "Company CIK, 1-10 digits")
                .optional("page", FieldType::Integer, "Page number, starting at 1")
                .optional("pageSize", FieldType::Integer, "Rows per page, 1-100")
                .optional("form", FieldType::String, "Only filings of this form type (e.g. 10-K)")
                .optional("file", FieldType::String, "Historical submissions page, e.g. CIK0000320193-submissions-001.json"),
        ))
    }

    async fn execute(&self, ctx: &ToolContext, args: &Value) -> Result<Value> {
        let options = QueryOptions::from_args(args)?;
        let cik = cik_arg(args)?;
        let form = str_arg(args, "form");

        if let Some(file) = str_arg(args, "file") {
            if !file.starts_with(&format!("CIK{}", cik)) {
                return Err(Error::bad_input(format!("'{}' does not belong to CIK {}", file, cik)));
            }
            let payload = ctx.fetch(&UpstreamPath::submissions_file(file)?).await?;
            let page = page_filings(file_filings(&payload)?, &options, form, &ctx.limits);
            return Ok(json!({ "cik": cik, "file": file, "filings": page }));
        }

        let payload = ctx.fetch(&UpstreamPath::Submissions { cik }).await?;
        let page = page_filings(recent_filings(&payload)?, &options, form, &ctx.limits);

        let mut result = entity_summary(&payload);
        result.insert("files".into(), json!(history_files(&payload)));
        result.insert("filings".into(), serde_json::to_value(page)?);
        Ok(Value::Object(result))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::tools::testing::{context, FakeUpstream};
    use edgar_core::ErrorKind;

    pub(crate) const PATH: &str = "/submissions/CIK0000320193.json";

    pub(crate) fn submissions(n: usize) -> Value {
        let forms: Vec<&str> = (0..n).map(|i| if i % 3 == 0 { "10-K" } else { "8-K" }).collect();
        let dates: Vec<String> = (0..n).map(|i| format!("2023-{:02}-01", 12 - (i % 12))).collect();
        json!({
            "cik": "320193",
            "name": "Apple Inc.",
            "tickers": ["AAPL"],
            "filings": {
                "recent": {
                    "accessionNumber": (0..n).map(|i| format!("0000320193-23-{:06}", i)).collect::<Vec<_>>(),
                    "filingDate": dates,
                    "form": forms,
                    "primaryDocument": (0..n).map(|i| format!("doc{}.htm", i)).collect::<Vec<_>>(),
                    "isXBRL": (0..n).map(|i| i % 2).collect::<Vec<_>>(),
                    "isInlineXBRL": vec![1; n],
                    "size": vec![1; n]
                },
                "files": [{ "name": "CIK0000320193-submissions-001.json", "filingCount": 1200 }]
            }
        })
    }

    #[tokio::test]
    async fn test_pages_57_rows() {
        let ctx = context(FakeUpstream::default().with(PATH, submissions(57)));

        let out = GetCompanySubmissions.execute(&ctx, &json!({ "cik": "320193" })).await.unwrap();
        assert_eq!(out["name"], "Apple Inc.");
        assert_eq!(out["files"], json!(["CIK0000320193-submissions-001.json"]));
        assert_eq!(out["filings"]["total"], 57);
        assert_eq!(out["filings"]["totalPages"], 3);
        assert_eq!(out["filings"]["items"].as_array().unwrap().len(), 20);

        let first = &out["filings"]["items"][0];
        assert_eq!(first["isXBRL"], false);
        assert_eq!(first["isInlineXBRL"], true);
        assert_eq!(first["size"], 1);

        let out = GetCompanySubmissions
            .execute(&ctx, &json!({ "cik": "320193", "page": 3 }))
            .await
            .unwrap();
        assert_eq!(out["filings"]["items"].as_array().unwrap().len(), 17);

        let out = GetCompanySubmissions
            .execute(&ctx, &json!({ "cik": "320193", "page": 4 }))
            .await
            .unwrap();
        assert!(out["filings"]["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_brief_mode_and_form_filter() {
        let ctx = context(FakeUpstream::default().with(PATH, submissions(9)));
        let args = json!({ "cik": "320193", "form": "10-k", "mode": "brief" });

        let out = GetCompanySubmissions.execute(&ctx, &args).await.unwrap();
        let items = out["filings"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 3);
        let keys: Vec<&String> = items[0].as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 4);
        assert!(items[0].get("isXBRL").is_none());
    }

    #[tokio::test]
    async fn test_misaligned_columns_fail() {
        let mut payload = submissions(5);
        payload["filings"]["recent"]["form"] = json!(["10-K"]);
        let ctx = context(FakeUpstream::default().with(PATH, payload));

        let err = GetCompanySubmissions.execute(&ctx, &json!({ "cik": "320193" })).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataIntegrity);
    }

    #[tokio::test]
    async fn test_history_file_must_match_cik() {
        let ctx = context(FakeUpstream::default());
        let args = json!({ "cik": "320193", "file": "CIK0000789019-submissions-001.json" });
        let err = GetCompanySubmissions.execute(&ctx, &args).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadInput);
    }
}
