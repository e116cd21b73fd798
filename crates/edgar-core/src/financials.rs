//! Derived financial statements and ratios
//!
//! Picks one value per mapped `us-gaap` tag out of a company-facts payload
//! and groups them into income, balance-sheet and cash-flow statements.

use crate::error::{Error, Result};
use crate::normalize::expect_object;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Statement {
    Income,
    Balance,
    CashFlow,
}

impl Statement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Statement::Income => "income",
            Statement::Balance => "balance",
            Statement::CashFlow => "cashflow",
        }
    }
}

struct FieldMapping {
    tag: &'static str,
    field: &'static str,
    statement: Statement,
    unit: &'static str,
}

const fn map(tag: &'static str, field: &'static str, statement: Statement, unit: &'static str) -> FieldMapping {
    FieldMapping { tag, field, statement, unit }
}

/// Earlier entries win when two tags feed the same field.
const FIELD_MAPPING: &[FieldMapping] = &[
    map("RevenueFromContractWithCustomerExcludingAssessedTax", "revenue", Statement::Income, "USD"),
    map("Revenues", "revenue", Statement::Income, "USD"),
    map("CostOfRevenue", "costOfRevenue", Statement::Income, "USD"),
    map("GrossProfit", "grossProfit", Statement::Income, "USD"),
    map("OperatingExpenses", "operatingExpenses", Statement::Income, "USD"),
    map("OperatingIncomeLoss", "operatingIncome", Statement::Income, "USD"),
    map("NetIncomeLoss", "netIncome", Statement::Income, "USD"),
    map("EarningsPerShareBasic", "epsBasic", Statement::Income, "USD/shares"),
    map("EarningsPerShareDiluted", "epsDiluted", Statement::Income, "USD/shares"),
    map("Assets", "totalAssets", Statement::Balance, "USD"),
    map("AssetsCurrent", "currentAssets", Statement::Balance, "USD"),
    map("CashAndCashEquivalentsAtCarryingValue", "cash", Statement::Balance, "USD"),
    map("Liabilities", "totalLiabilities", Statement::Balance, "USD"),
    map("LiabilitiesCurrent", "currentLiabilities", Statement::Balance, "USD"),
    map("StockholdersEquity", "shareholdersEquity", Statement::Balance, "USD"),
    map("NetCashProvidedByUsedInOperatingActivities", "operatingCashFlow", Statement::CashFlow, "USD"),
    map("PaymentsToAcquirePropertyPlantAndEquipment", "capitalExpenditures", Statement::CashFlow, "USD"),
];

/// Which reporting period to read values from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportPeriod {
    #[default]
    Latest,
    /// Fiscal-year filing (`fp == "FY"`).
    FiscalYear(i64),
    /// Quarterly filing, 1-3; Q4 figures only exist in the annual report.
    FiscalQuarter(i64, u8),
}

impl FromStr for ReportPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("latest") {
            return Ok(ReportPeriod::Latest);
        }
        let bad = || Error::bad_input(format!("Invalid period '{}', expected latest, YYYY or YYYY-Q1..Q4", s));
        let (year, quarter) = match s.split_once("-Q").or_else(|| s.split_once("-q")) {
            Some((y, q)) => (y, Some(q.parse::<u8>().map_err(|_| bad())?)),
            None => (s, None),
        };
        let year: i64 = year.parse().map_err(|_| bad())?;
        if !(1900..=2100).contains(&year) {
            return Err(bad());
        }
        match quarter {
            None | Some(4) => Ok(ReportPeriod::FiscalYear(year)),
            Some(q @ 1..=3) => Ok(ReportPeriod::FiscalQuarter(year, q)),
            Some(_) => Err(bad()),
        }
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportPeriod::Latest => f.write_str("latest"),
            ReportPeriod::FiscalYear(y) => write!(f, "{}", y),
            ReportPeriod::FiscalQuarter(y, q) => write!(f, "{}-Q{}", y, q),
        }
    }
}

impl ReportPeriod {
    fn matches(&self, fact: &Value) -> bool {
        let fy = fact.get("fy").and_then(Value::as_i64);
        let fp = fact.get("fp").and_then(Value::as_str);
        match self {
            ReportPeriod::Latest => true,
            ReportPeriod::FiscalYear(y) => fy == Some(*y) && fp == Some("FY"),
            ReportPeriod::FiscalQuarter(y, q) => {
                fy == Some(*y) && fp.map_or(false, |fp| fp == format!("Q{}", q))
            }
        }
    }
}

/// Latest value per mapped field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialSnapshot {
    values: BTreeMap<&'static str, f64>,
    as_of: Option<String>,
}

impl FinancialSnapshot {
    pub fn from_company_facts(payload: &Value, period: ReportPeriod) -> Result<Self> {
        let root = expect_object(payload, "company facts payload")?;
        let gaap = root.get("facts").and_then(|f| f.get("us-gaap"));

        let mut snapshot = FinancialSnapshot::default();
        let Some(gaap) = gaap else {
            return Ok(snapshot);
        };

        for mapping in FIELD_MAPPING {
            if snapshot.values.contains_key(mapping.field) {
                continue;
            }
            let facts = gaap
                .get(mapping.tag)
                .and_then(|c| c.get("units"))
                .and_then(|u| u.get(mapping.unit))
                .and_then(Value::as_array);
            let Some(facts) = facts else { continue };

            let mut best: Option<(&str, f64)> = None;
            for fact in facts.iter().filter(|f| period.matches(f)) {
                let (Some(end), Some(val)) = (
                    fact.get("end").and_then(Value::as_str),
                    fact.get("val").and_then(Value::as_f64),
                ) else {
                    continue;
                };
                if best.map_or(true, |(b, _)| end > b) {
                    best = Some((end, val));
                }
            }

            if let Some((end, val)) = best {
                snapshot.values.insert(mapping.field, val);
                if snapshot.as_of.as_deref().map_or(true, |a| end > a) {
                    snapshot.as_of = Some(end.to_string());
                }
            }
        }
        Ok(snapshot)
    }

    pub fn get(&self, field: &str) -> Option<f64> {
        self.values.get(field).copied()
    }

    pub fn as_of(&self) -> Option<&str> {
        self.as_of.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Statement objects keyed by statement name; missing values are null.
    pub fn statements(&self, selection: &[Statement]) -> Map<String, Value> {
        let mut out = Map::new();
        for statement in selection {
            let mut fields = Map::new();
            for mapping in FIELD_MAPPING.iter().filter(|m| m.statement == *statement) {
                fields
                    .entry(mapping.field)
                    .or_insert_with(|| self.get(mapping.field).map_or(Value::Null, |v| json!(v)));
            }
            out.insert(statement.as_str().to_string(), Value::Object(fields));
        }
        out
    }

    pub fn metrics(&self) -> Metrics {
        Metrics::compute(self)
    }
}

/// Parse `all` or a comma list of statement names.
pub fn parse_statements(raw: Option<&str>) -> Result<Vec<Statement>> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).unwrap_or("all");
    let mut selected = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let statements: &[Statement] = match part.to_ascii_lowercase().as_str() {
            "all" => &[Statement::Income, Statement::Balance, Statement::CashFlow],
            "income" => &[Statement::Income],
            "balance" => &[Statement::Balance],
            "cashflow" => &[Statement::CashFlow],
            other => return Err(Error::bad_input(format!("Unknown statement '{}'", other))),
        };
        for s in statements {
            if !selected.contains(s) {
                selected.push(*s);
            }
        }
    }
    selected.sort();
    Ok(selected)
}

pub const METRIC_NAMES: &[&str] = &["grossMargin", "netMargin", "roe", "roa", "currentRatio", "debtToEquity"];

/// Ratios derived from a snapshot. Margins and returns are percentages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gross_margin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_margin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roe: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roa: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt_to_equity: Option<f64>,
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

impl Metrics {
    pub fn compute(s: &FinancialSnapshot) -> Self {
        let revenue = s.get("revenue");
        let gross_profit = s
            .get("grossProfit")
            .or_else(|| Some(revenue? - s.get("costOfRevenue")?));
        let net_income = s.get("netIncome");
        let equity = s.get("shareholdersEquity");

        Self {
            gross_margin: ratio(gross_profit, revenue).map(|r| r * 100.0),
            net_margin: ratio(net_income, revenue).map(|r| r * 100.0),
            roe: ratio(net_income, equity).map(|r| r * 100.0),
            roa: ratio(net_income, s.get("totalAssets")).map(|r| r * 100.0),
            current_ratio: ratio(s.get("currentAssets"), s.get("currentLiabilities")),
            debt_to_equity: ratio(s.get("totalLiabilities"), equity),
        }
    }

    /// Serialize, optionally restricted to the named metrics.
    pub fn select(&self, names: Option<&[String]>) -> Map<String, Value> {
        let all = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        match names {
            None => all,
            Some(names) => all
                .into_iter()
                .filter(|(k, _)| names.iter().any(|n| n == k))
                .collect(),
        }
    }
}
