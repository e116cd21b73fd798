//! Response Normalizer
//!
//! Reshapes raw upstream JSON into bounded, row-oriented structures.
//! Each submodule handles one upstream shape and matches on
//! [`serde_json::Value`] variants explicitly, so an unexpected shape becomes
//! a [`DataIntegrity`](crate::Error::DataIntegrity) error instead of a panic.
//!
//! - `columnar`: struct-of-arrays → rows (submissions)
//! - `units`: per-unit date/latest reduction (company concept)
//! - `facts`: taxonomy → tag → unit aggregation (company facts)
//! - `frames`: entity ranking for a calendrical frame

pub mod columnar;
pub mod facts;
pub mod frames;
pub mod units;

use crate::error::{Error, Result};
use serde_json::{Map, Value};

pub use columnar::{pivot, project_brief_filings, FILING_FLAG_FIELDS};
pub use facts::{aggregate_company_facts, CompanyFactsSummary};
pub use frames::{rank_frame, FrameOptions, FrameRanking, DEFAULT_TOP_N};
pub use units::{filter_facts, flatten_units};

/// Require the payload root (or a nested node) to be an object.
pub fn expect_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::integrity(format!(
            "Expected {} to be an object, found {}",
            what,
            type_name(other)
        ))),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
