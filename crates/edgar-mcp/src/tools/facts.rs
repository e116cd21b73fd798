//! get-company-facts

use super::{cik_arg, fact_filter_fields};
use crate::registry::{FieldType, InputSchema, Tool, ToolContext};
use async_trait::async_trait;
use edgar_core::normalize::aggregate_company_facts;
use edgar_core::{Cik, QueryOptions, Result, UpstreamPath};
use serde_json::Value;

pub struct GetCompanyFacts;

/// Shared with the `sec://xbrl/facts/{cik}` resource.
pub(crate) async fn company_facts(ctx: &ToolContext, cik: Cik, options: &QueryOptions) -> Result<Value> {
    let payload = ctx.fetch(&UpstreamPath::CompanyFacts { cik }).await?;
    let summary = aggregate_company_facts(&payload, options)?;
    ctx.guard().check(&summary, options)?.into_value()
}

#[async_trait]
impl Tool for GetCompanyFacts {
    fn name(&self) -> &str {
        "get-company-facts"
    }

    fn description(&self) -> &str {
        "Every XBRL fact a company has disclosed, grouped by taxonomy, tag and unit. \
         Narrow with tags (or 'core'), taxonomies, units, a date window or latestOnly; \
         oversized results return an advisory instead of data."
    }

    fn input_schema(&self) -> InputSchema {
        fact_filter_fields(
            InputSchema::new()
                .required("cik", FieldType::String, "Company CIK, 1-10 digits")
                .optional("tags", FieldType::String, "Comma-separated tag allow-list; 'core' selects the primary statement tags")
                .optional("taxonomies", FieldType::String, "Comma-separated taxonomy allow-list"),
        )
    }

    async fn execute(&self, ctx: &ToolContext, args: &Value) -> Result<Value> {
        let options = QueryOptions::from_args(args)?;
        company_facts(ctx, cik_arg(args)?, &options).await
    }
}
