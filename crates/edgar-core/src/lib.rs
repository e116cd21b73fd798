//! Core types and utilities for the EDGAR MCP server
//!
//! # Modules
//!
//! - `cik`: Central Index Key parsing and padding
//! - `error`: Error types, failure taxonomy and Result alias
//! - `financials`: Derived statements and ratios from company facts
//! - `guard`: Response size ceiling and pagination
//! - `normalize`: Reshaping of raw upstream JSON
//! - `path`: Upstream path construction (taxonomy, period, tag)
//! - `query`: Per-call query options
//! - `upstream`: HTTP client for data.sec.gov

pub mod cik;
pub mod error;
pub mod financials;
pub mod guard;
pub mod normalize;
pub mod path;
pub mod query;
pub mod upstream;

// Re-exports
pub use cik::Cik;
pub use error::{Error, ErrorKind, Result};
pub use financials::{FinancialSnapshot, Metrics, ReportPeriod, Statement};
pub use guard::{paginate, Advisory, Guarded, Page, SizeGuard, Suggestion};
pub use path::{Period, Taxonomy, UpstreamPath, CORE_TAGS};
pub use query::{DateRange, OutputMode, QueryOptions};
pub use upstream::{Contact, EdgarClient, Upstream, EDGAR_BASE_URL};
