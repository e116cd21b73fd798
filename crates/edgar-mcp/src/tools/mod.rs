//! Built-in Tools
//!
//! All tools are registered at startup; the derived-financials group is
//! behind `ENABLE_FINANCIAL_TOOLS`.

pub mod concept;
pub mod facts;
pub mod financials;
pub mod frames;
pub mod submissions;

use crate::registry::{FieldType, InputSchema, Registry, RegistryBuilder};
use crate::resources::{CompanyFactsResource, SubmissionsResource};
use edgar_core::{Cik, Error, Result, Taxonomy};
use serde_json::Value;
use tracing::info;

/// Register every tool and resource.
pub fn build_registry(enable_financial_tools: bool) -> Result<Registry> {
    let mut builder = RegistryBuilder::new()
        .tool(concept::GetCompanyConcept)
        .tool(frames::GetXbrlFrames)
        .tool(facts::GetCompanyFacts)
        .tool(submissions::GetCompanySubmissions)
        .resource(SubmissionsResource::new())
        .resource(CompanyFactsResource::new());

    if enable_financial_tools {
        info!("Registering derived financial tools");
        builder = financials::register_all(builder);
    }
    builder.build()
}

/// Trimmed, non-empty string argument.
pub(crate) fn str_arg<'a>(args: &'a Value, name: &str) -> Option<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub(crate) fn required_str<'a>(args: &'a Value, name: &str) -> Result<&'a str> {
    str_arg(args, name).ok_or_else(|| Error::bad_input(format!("'{}' must not be empty", name)))
}

pub(crate) fn cik_arg(args: &Value) -> Result<Cik> {
    Cik::parse(required_str(args, "cik")?)
}

pub(crate) fn taxonomy_arg(args: &Value) -> Result<Taxonomy> {
    required_str(args, "taxonomy")?.parse()
}

/// Comma list of CIKs, each canonicalized.
pub(crate) fn cik_list(raw: &str) -> Result<Vec<Cik>> {
    let mut ciks = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let cik = Cik::parse(part)?;
        if !ciks.contains(&cik) {
            ciks.push(cik);
        }
    }
    Ok(ciks)
}

pub(crate) fn date_window_fields(schema: InputSchema) -> InputSchema {
    schema
        .optional("startDate", FieldType::String, "Earliest period end date, inclusive (YYYY-MM-DD)")
        .optional("endDate", FieldType::String, "Latest period end date, inclusive (YYYY-MM-DD)")
}

pub(crate) fn fact_filter_fields(schema: InputSchema) -> InputSchema {
    date_window_fields(schema)
        .optional("units", FieldType::String, "Comma-separated unit allow-list (e.g. USD, USD-per-shares, pure)")
        .optional("latestOnly", FieldType::Boolean, "Keep only the most recent fact per unit")
}

pub(crate) fn mode_field(schema: InputSchema) -> InputSchema {
    schema.optional("mode", FieldType::String, "Output size: 'brief' or 'full' (default)")
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory upstream shared by tool and resource tests.

    use crate::config::Limits;
    use crate::events::EventPublisher;
    use crate::registry::ToolContext;
    use async_trait::async_trait;
    use edgar_core::{Error, Result, Upstream, UpstreamPath};
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    pub struct FakeUpstream {
        responses: HashMap<String, Value>,
        pub requests: Mutex<Vec<String>>,
    }

    impl FakeUpstream {
        pub fn with(mut self, path: &str, body: Value) -> Self {
            self.responses.insert(path.to_string(), body);
            self
        }
    }

    #[async_trait]
    impl Upstream for FakeUpstream {
        async fn fetch_json(&self, path: &UpstreamPath) -> Result<Value> {
            let rendered = path.render();
            self.requests.lock().unwrap().push(rendered.clone());
            self.responses
                .get(&rendered)
                .cloned()
                .ok_or_else(|| Error::upstream(format!("HTTP 404 for {}", rendered)))
        }
    }

    pub fn context(upstream: FakeUpstream) -> ToolContext {
        context_with_limits(upstream, Limits::default())
    }

    pub fn context_with_limits(upstream: FakeUpstream, limits: Limits) -> ToolContext {
        ToolContext {
            upstream: Arc::new(upstream),
            limits,
            events: EventPublisher::disabled(),
            session_id: "test".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_contents() {
        let registry = build_registry(true).unwrap();
        let names: Vec<String> = registry.describe().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec![
                "get-company-concept",
                "get-xbrl-frames",
                "get-company-facts",
                "get-company-submissions",
                "get-company-financials",
                "get-company-metrics",
                "compare-financials",
                "compare-metrics",
            ]
        );
        assert_eq!(registry.resource_templates().len(), 2);

        let registry = build_registry(false).unwrap();
        assert!(!registry.contains("get-company-metrics"));
    }

    #[test]
    fn test_cik_list_dedupes_and_pads() {
        let ciks = cik_list("320193, 0000320193,789019").unwrap();
        assert_eq!(ciks.len(), 2);
        assert_eq!(ciks[1].as_str(), "0000789019");
        assert!(cik_list("320193,abc").is_err());
    }

    #[test]
    fn test_str_arg_trims() {
        let args = json!({ "a": "  x ", "b": "   ", "c": 1 });
        assert_eq!(str_arg(&args, "a"), Some("x"));
        assert_eq!(str_arg(&args, "b"), None);
        assert_eq!(str_arg(&args, "c"), None);
        assert!(required_str(&args, "b").is_err());
    }
}
