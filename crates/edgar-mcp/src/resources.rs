//! Resource templates
//!
//! `sec://submissions/{cik}{/path}` browses a company's submissions like a
//! directory: no path lists the children, `recent` pages the recent filings,
//! and any other name proxies the historical page of that name.
//! `sec://xbrl/facts/{cik}` returns aggregated company facts filtered by
//! the URI query string.

use crate::registry::{Resource, ResourceTemplate, ResourceUri, ToolContext};
use crate::tools::facts::company_facts;
use crate::tools::submissions::{entity_summary, file_filings, history_files, page_filings, recent_filings};
use async_trait::async_trait;
use edgar_core::{Cik, Error, QueryOptions, Result, UpstreamPath};
use serde_json::{json, Value};

/// Reserved child name for the paged recent filings.
pub const RECENT: &str = "recent";

fn cik_param(uri: &ResourceUri) -> Result<Cik> {
    Cik::parse(
        uri.param("cik")
            .ok_or_else(|| Error::bad_input("Missing CIK in resource URI"))?,
    )
}

pub struct SubmissionsResource {
    template: ResourceTemplate,
}

impl SubmissionsResource {
    pub fn new() -> Self {
        Self {
            template: ResourceTemplate::new(
                "sec://submissions/{cik}{/path}",
                "company-submissions",
                "Company filing history. No path lists the children; 'recent' pages recent filings \
                 (?page=&pageSize=&mode=); other names return that historical submissions file.",
            ),
        }
    }
}

impl Default for SubmissionsResource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Resource for SubmissionsResource {
    fn template(&self) -> &ResourceTemplate {
        &self.template
    }

    async fn read(&self, ctx: &ToolContext, uri: &ResourceUri) -> Result<Value> {
        let cik = cik_param(uri)?;
        let options = QueryOptions::from_pairs(uri.query_pairs())?;

        match uri.param("path") {
            None => {
                let payload = ctx.fetch(&UpstreamPath::Submissions { cik: cik.clone() }).await?;
                let mut children = vec![RECENT.to_string()];
                children.extend(history_files(&payload));
                let mut listing = entity_summary(&payload);
                listing.insert("cik".into(), json!(cik));
                listing.insert("children".into(), json!(children));
                Ok(Value::Object(listing))
            }
            Some(RECENT) => {
                let payload = ctx.fetch(&UpstreamPath::Submissions { cik: cik.clone() }).await?;
                let page = page_filings(recent_filings(&payload)?, &options, None, &ctx.limits);
                Ok(json!({ "cik": cik, "filings": page }))
            }
            Some(name) => {
                if !name.starts_with(&format!("CIK{}", cik)) {
                    return Err(Error::not_found(format!("No submissions file '{}' for CIK {}", name, cik)));
                }
                let payload = ctx.fetch(&UpstreamPath::submissions_file(name)?).await?;
                // validate shape before handing it back
                file_filings(&payload)?;
                ctx.guard().check(&payload, &options)?.into_value()
            }
        }
    }
}

pub struct CompanyFactsResource {
    template: ResourceTemplate,
}

impl CompanyFactsResource {
    pub fn new() -> Self {
        Self {
            template: ResourceTemplate::new(
                "sec://xbrl/facts/{cik}",
                "company-facts",
                "All XBRL facts for a company. Accepts tags, taxonomies, units, startDate, endDate \
                 and latestOnly as query parameters.",
            ),
        }
    }
}

impl Default for CompanyFactsResource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Resource for CompanyFactsResource {
    fn template(&self) -> &ResourceTemplate {
        &self.template
    }

    async fn read(&self, ctx: &ToolContext, uri: &ResourceUri) -> Result<Value> {
        let options = QueryOptions::from_pairs(uri.query_pairs())?;
        company_facts(ctx, cik_param(uri)?, &options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::tools::submissions::tests::{submissions, PATH};
    use crate::tools::testing::{context, FakeUpstream};
    use edgar_core::ErrorKind;

    fn registry() -> Registry {
        Registry::builder()
            .resource(SubmissionsResource::new())
            .resource(CompanyFactsResource::new())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_listing_children() {
        let ctx = context(FakeUpstream::default().with(PATH, submissions(3)));
        let out = registry().read_resource("sec://submissions/320193", &ctx).await.unwrap();
        assert_eq!(out["children"], json!(["recent", "CIK0000320193-submissions-001.json"]));
        assert_eq!(out["cik"], "0000320193");
    }

    #[tokio::test]
    async fn test_recent_is_paginated() {
        let ctx = context(FakeUpstream::default().with(PATH, submissions(57)));
        let out = registry()
            .read_resource("sec://submissions/320193/recent?page=3&pageSize=20", &ctx)
            .await
            .unwrap();
        assert_eq!(out["filings"]["items"].as_array().unwrap().len(), 17);
        assert_eq!(out["filings"]["totalPages"], 3);
    }

    #[tokio::test]
    async fn test_history_file_proxy() {
        let file = json!({
            "accessionNumber": ["a", "b"],
            "filingDate": ["2001-01-01", "2001-02-01"],
            "isXBRL": [0, 0]
        });
        let upstream = FakeUpstream::default()
            .with("/submissions/CIK0000320193-submissions-001.json", file.clone());
        let ctx = context(upstream);
        let out = registry()
            .read_resource("sec://submissions/320193/CIK0000320193-submissions-001.json", &ctx)
            .await
            .unwrap();
        assert_eq!(out, file);

        let err = registry()
            .read_resource("sec://submissions/320193/../secrets.json", &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_facts_query_string() {
        let upstream = FakeUpstream::default().with(
            "/api/xbrl/companyfacts/CIK0000000042.json",
            json!({ "entityName": "X", "facts": { "us-gaap": {
                "Assets": { "units": { "USD": [{ "end": "2023-01-01", "val": 1 }] } },
                "Other": { "units": { "USD": [{ "end": "2023-01-01", "val": 2 }] } }
            }}}),
        );
        let ctx = context(upstream);
        let out = registry()
            .read_resource("sec://xbrl/facts/42?tags=Assets", &ctx)
            .await
            .unwrap();
        assert_eq!(out["tagCount"], 1);

        let err = registry()
            .read_resource("sec://xbrl/facts/42?latestOnly=maybe", &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadInput);

        let err = registry().read_resource("sec://xbrl/facts/abc", &ctx).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadInput);
    }
}
