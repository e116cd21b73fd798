//! Size-Guard / Pagination
//!
//! Normalized payloads are measured as compact JSON. Anything over the
//! ceiling is replaced by an [`Advisory`] listing ways to narrow the query;
//! partial data is never returned. Submission listings are paged instead.

use crate::error::{ErrorKind, Result};
use crate::query::QueryOptions;
use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_MAX_BYTES: usize = 256 * 1024;
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// One concrete way to shrink a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suggestion {
    AddTagFilter,
    EnableLatestOnly,
    ShrinkDateWindow,
    ReducePageSize,
}

impl Suggestion {
    pub fn text(&self) -> &'static str {
        match self {
            Suggestion::AddTagFilter => {
                "Add a tags filter (comma-separated XBRL tags, or 'core' for the primary statements)"
            }
            Suggestion::EnableLatestOnly => "Set latestOnly=true to keep only the most recent fact per unit",
            Suggestion::ShrinkDateWindow => "Narrow the startDate/endDate window",
            Suggestion::ReducePageSize => "Request a smaller pageSize",
        }
    }

    /// Suggestions the caller has not already applied.
    pub fn for_options(options: &QueryOptions) -> Vec<Suggestion> {
        let mut out = Vec::new();
        if options.tags.is_none() {
            out.push(Suggestion::AddTagFilter);
        }
        if !options.latest_only {
            out.push(Suggestion::EnableLatestOnly);
        }
        if options.page_size.map_or(false, |size| size > 10) {
            out.push(Suggestion::ReducePageSize);
        }
        if options.date_range.start().is_none() || options.date_range.end().is_none() || out.is_empty() {
            out.push(Suggestion::ShrinkDateWindow);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Advisory {
    pub kind: ErrorKind,
    pub message: String,
    pub size_bytes: usize,
    pub max_bytes: usize,
    pub suggestions: Vec<String>,
}

/// Outcome of [`SizeGuard::check`].
#[derive(Debug, Clone, PartialEq)]
pub enum Guarded {
    Payload(Value),
    Advisory(Advisory),
}

impl Guarded {
    pub fn is_advisory(&self) -> bool {
        matches!(self, Guarded::Advisory(_))
    }

    pub fn into_value(self) -> Result<Value> {
        match self {
            Guarded::Payload(value) => Ok(value),
            Guarded::Advisory(advisory) => Ok(serde_json::to_value(advisory)?),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SizeGuard {
    max_bytes: usize,
}

impl Default for SizeGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BYTES)
    }
}

impl SizeGuard {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn check<T: Serialize>(&self, payload: &T, options: &QueryOptions) -> Result<Guarded> {
        let bytes = serde_json::to_vec(payload)?;
        if bytes.len() <= self.max_bytes {
            return Ok(Guarded::Payload(serde_json::to_value(payload)?));
        }

        tracing::debug!(size = bytes.len(), max = self.max_bytes, "Payload over ceiling, returning advisory");
        Ok(Guarded::Advisory(Advisory {
            kind: ErrorKind::PayloadTooLarge,
            message: format!(
                "Response would be {} bytes, above the {} byte limit. Narrow the query and retry.",
                bytes.len(),
                self.max_bytes
            ),
            size_bytes: bytes.len(),
            max_bytes: self.max_bytes,
            suggestions: Suggestion::for_options(options)
                .iter()
                .map(|s| s.text().to_string())
                .collect(),
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: usize,
    pub total_pages: usize,
}

/// Slice `[(page-1)*size, page*size)` clamped to the data; pages past the
/// end are empty rather than an error.
pub fn paginate<T: Clone>(items: &[T], page: u32, page_size: u32) -> Page<T> {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let total = items.len();
    let size = page_size as usize;
    let total_pages = total.div_ceil(size);

    let start = (page as usize - 1).saturating_mul(size).min(total);
    let end = start.saturating_add(size).min(total);

    Page {
        items: items[start..end].to_vec(),
        page,
        page_size,
        total,
        total_pages,
    }
}
