//! Request Builder
//!
//! Maps a logical query onto exactly one upstream resource path. Everything
//! here is pure: validation happens when the parts are constructed
//! ([`Cik::parse`], [`Taxonomy::from_str`], [`Period::new`]), after which
//! [`UpstreamPath::render`] cannot fail.

use crate::cik::Cik;
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Standards bodies whose vocabularies the upstream exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Taxonomy {
    UsGaap,
    IfrsFull,
    Dei,
    Srt,
}

impl Taxonomy {
    pub const ALL: [Taxonomy; 4] = [Taxonomy::UsGaap, Taxonomy::IfrsFull, Taxonomy::Dei, Taxonomy::Srt];

    pub fn as_str(&self) -> &'static str {
        match self {
            Taxonomy::UsGaap => "us-gaap",
            Taxonomy::IfrsFull => "ifrs-full",
            Taxonomy::Dei => "dei",
            Taxonomy::Srt => "srt",
        }
    }
}

impl FromStr for Taxonomy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "us-gaap" => Ok(Taxonomy::UsGaap),
            "ifrs-full" => Ok(Taxonomy::IfrsFull),
            "dei" => Ok(Taxonomy::Dei),
            "srt" => Ok(Taxonomy::Srt),
            other => {
                let known: Vec<&str> = Taxonomy::ALL.iter().map(Taxonomy::as_str).collect();
                Err(Error::bad_input(format!(
                    "Unknown taxonomy '{}' (expected one of {})",
                    other,
                    known.join(", ")
                )))
            }
        }
    }
}

impl fmt::Display for Taxonomy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Curated tags covering the primary statements.
pub const CORE_TAGS: &[&str] = &[
    "Revenues",
    "RevenueFromContractWithCustomerExcludingAssessedTax",
    "CostOfRevenue",
    "GrossProfit",
    "OperatingExpenses",
    "OperatingIncomeLoss",
    "NetIncomeLoss",
    "EarningsPerShareBasic",
    "EarningsPerShareDiluted",
    "Assets",
    "AssetsCurrent",
    "Liabilities",
    "LiabilitiesCurrent",
    "StockholdersEquity",
    "CashAndCashEquivalentsAtCarryingValue",
    "NetCashProvidedByUsedInOperatingActivities",
    "PaymentsToAcquirePropertyPlantAndEquipment",
];

/// Calendrical frame period, rendered as `CY<year>[Q<quarter>][I]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    year: u16,
    quarter: Option<u8>,
    instant: bool,
}

impl Period {
    pub const MIN_YEAR: u16 = 1900;
    pub const MAX_YEAR: u16 = 2100;

    pub fn new(year: u16, quarter: Option<u8>, instant: bool) -> Result<Self> {
        if !(Self::MIN_YEAR..=Self::MAX_YEAR).contains(&year) {
            return Err(Error::bad_input(format!(
                "Year {} outside {}-{}",
                year,
                Self::MIN_YEAR,
                Self::MAX_YEAR
            )));
        }
        if let Some(q) = quarter {
            if !(1..=4).contains(&q) {
                return Err(Error::bad_input(format!("Quarter {} outside 1-4", q)));
            }
        }
        Ok(Self { year, quarter, instant })
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CY{}", self.year)?;
        if let Some(q) = self.quarter {
            write!(f, "Q{}", q)?;
        }
        if self.instant {
            f.write_str("I")?;
        }
        Ok(())
    }
}

/// One upstream resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamPath {
    Submissions {
        cik: Cik,
    },
    /// Historical submissions page listed under `filings.files`.
    SubmissionsFile {
        name: String,
    },
    CompanyFacts {
        cik: Cik,
    },
    CompanyConcept {
        cik: Cik,
        taxonomy: Taxonomy,
        tag: String,
        unit: Option<String>,
    },
    Frames {
        taxonomy: Taxonomy,
        tag: String,
        unit: String,
        period: Period,
    },
}

impl UpstreamPath {
    /// Validates a historical submissions file name before it becomes a path.
    pub fn submissions_file(name: &str) -> Result<Self> {
        let name = name.trim();
        let valid = name.ends_with(".json")
            && name.len() > ".json".len()
            && !name.contains('/')
            && !name.contains('\\')
            && !name.contains("..");
        if !valid {
            return Err(Error::bad_input(format!("Invalid submissions file name '{}'", name)));
        }
        Ok(UpstreamPath::SubmissionsFile { name: name.to_string() })
    }

    pub fn render(&self) -> String {
        match self {
            UpstreamPath::Submissions { cik } => format!("/submissions/CIK{}.json", cik),
            UpstreamPath::SubmissionsFile { name } => {
                format!("/submissions/{}", urlencoding::encode(name))
            }
            UpstreamPath::CompanyFacts { cik } => format!("/api/xbrl/companyfacts/CIK{}.json", cik),
            UpstreamPath::CompanyConcept { cik, taxonomy, tag, unit } => {
                let mut path = format!(
                    "/api/xbrl/companyconcept/CIK{}/{}/{}.json",
                    cik,
                    taxonomy,
                    urlencoding::encode(tag)
                );
                if let Some(unit) = unit {
                    path.push_str("?unit=");
                    path.push_str(unit);
                }
                path
            }
            UpstreamPath::Frames { taxonomy, tag, unit, period } => format!(
                "/api/xbrl/frames/{}/{}/{}/{}.json",
                taxonomy,
                urlencoding::encode(tag),
                urlencoding::encode(unit),
                period
            ),
        }
    }
}

impl fmt::Display for UpstreamPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
