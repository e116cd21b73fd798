//! Query Options
//!
//! Immutable per-call configuration: date window, allow-lists, latest-only
//! reduction, pagination and output mode.

use crate::error::{Error, Result};
use crate::path::CORE_TAGS;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Brief,
    #[default]
    Full,
}

/// Inclusive `[start, end]` window over ISO-8601 dates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DateRange {
    start: Option<String>,
    end: Option<String>,
}

impl DateRange {
    pub fn new(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        let start = start.map(validate_date).transpose()?;
        let end = end.map(validate_date).transpose()?;
        if let (Some(s), Some(e)) = (&start, &end) {
            if s > e {
                return Err(Error::bad_input(format!("startDate {} is after endDate {}", s, e)));
            }
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Option<&str> {
        self.start.as_deref()
    }

    pub fn end(&self) -> Option<&str> {
        self.end.as_deref()
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// ISO dates order correctly as text, so no parsing happens here.
    pub fn contains(&self, date: &str) -> bool {
        self.start.as_deref().map_or(true, |s| date >= s)
            && self.end.as_deref().map_or(true, |e| date <= e)
    }
}

fn validate_date(raw: &str) -> Result<String> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| Error::bad_input(format!("Invalid date '{}', expected YYYY-MM-DD", raw)))?;
    Ok(raw.to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub date_range: DateRange,
    pub units: Option<BTreeSet<String>>,
    pub tags: Option<BTreeSet<String>>,
    pub taxonomies: Option<BTreeSet<String>>,
    pub latest_only: bool,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub mode: OutputMode,
}

/// Wire shape of the options as they arrive in tool arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuery {
    start_date: Option<String>,
    end_date: Option<String>,
    units: Option<String>,
    unit: Option<String>,
    tags: Option<String>,
    taxonomies: Option<String>,
    latest_only: Option<bool>,
    page: Option<u32>,
    page_size: Option<u32>,
    mode: Option<OutputMode>,
}

impl QueryOptions {
    /// Extract options from a tool-argument object; unknown keys are ignored.
    pub fn from_args(args: &Value) -> Result<Self> {
        let raw: RawQuery = serde_json::from_value(args.clone())
            .map_err(|e| Error::bad_input(format!("Invalid query options: {}", e)))?;
        raw.into_options()
    }

    /// Extract options from URI query pairs (all values arrive as text).
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut raw = RawQuery::default();
        for (key, value) in pairs {
            match key {
                "startDate" => raw.start_date = Some(value.to_string()),
                "endDate" => raw.end_date = Some(value.to_string()),
                "units" => raw.units = Some(value.to_string()),
                "unit" => raw.unit = Some(value.to_string()),
                "tags" => raw.tags = Some(value.to_string()),
                "taxonomies" => raw.taxonomies = Some(value.to_string()),
                "latestOnly" => raw.latest_only = Some(parse_flag(key, value)?),
                "page" => raw.page = Some(parse_number(key, value)?),
                "pageSize" => raw.page_size = Some(parse_number(key, value)?),
                "mode" => {
                    raw.mode = Some(match value {
                        "brief" => OutputMode::Brief,
                        "full" => OutputMode::Full,
                        other => {
                            return Err(Error::bad_input(format!("Unknown mode '{}'", other)))
                        }
                    })
                }
                _ => {}
            }
        }
        raw.into_options()
    }

    pub fn validate(&self) -> Result<()> {
        if self.page == Some(0) {
            return Err(Error::bad_input("page must be >= 1"));
        }
        if let Some(size) = self.page_size {
            if !(1..=MAX_PAGE_SIZE).contains(&size) {
                return Err(Error::bad_input(format!("pageSize must be 1-{}", MAX_PAGE_SIZE)));
            }
        }
        Ok(())
    }

    pub fn with_latest_only(mut self, latest_only: bool) -> Self {
        self.latest_only = latest_only;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = range;
        self
    }

    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self
    }

    pub fn allows_unit(&self, unit: &str) -> bool {
        self.units.as_ref().map_or(true, |set| set.contains(unit))
    }

    pub fn allows_tag(&self, tag: &str) -> bool {
        self.tags.as_ref().map_or(true, |set| set.contains(tag))
    }

    pub fn allows_taxonomy(&self, taxonomy: &str) -> bool {
        self.taxonomies.as_ref().map_or(true, |set| set.contains(taxonomy))
    }
}

impl RawQuery {
    fn into_options(self) -> Result<QueryOptions> {
        let mut units = split_list(self.units.as_deref());
        if let Some(unit) = self.unit.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            units.get_or_insert_with(BTreeSet::new).insert(unit.to_string());
        }

        let tags = split_list(self.tags.as_deref()).map(|set| {
            if set.contains("core") {
                let mut expanded: BTreeSet<String> =
                    set.into_iter().filter(|t| t != "core").collect();
                expanded.extend(CORE_TAGS.iter().map(|t| t.to_string()));
                expanded
            } else {
                set
            }
        });

        let options = QueryOptions {
            date_range: DateRange::new(self.start_date.as_deref(), self.end_date.as_deref())?,
            units,
            tags,
            taxonomies: split_list(self.taxonomies.as_deref()),
            latest_only: self.latest_only.unwrap_or(false),
            page: self.page,
            page_size: self.page_size,
            mode: self.mode.unwrap_or_default(),
        };
        options.validate()?;
        Ok(options)
    }
}

fn split_list(raw: Option<&str>) -> Option<BTreeSet<String>> {
    let set: BTreeSet<String> = raw?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    (!set.is_empty()).then_some(set)
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(Error::bad_input(format!("{} must be true or false", key))),
    }
}

fn parse_number(key: &str, value: &str) -> Result<u32> {
    value
        .parse()
        .map_err(|_| Error::bad_input(format!("{} must be a positive integer", key)))
}
