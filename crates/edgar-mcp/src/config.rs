//! Environment configuration
//!
//! Read once at start-up. Missing contact details are fatal.

use edgar_core::guard::{DEFAULT_MAX_BYTES, DEFAULT_PAGE_SIZE};
use edgar_core::normalize::DEFAULT_TOP_N;
use edgar_core::query::MAX_PAGE_SIZE;
use edgar_core::{Contact, Error, Result, EDGAR_BASE_URL};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Per-call numeric thresholds handed to every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_response_bytes: usize,
    pub default_page_size: u32,
    pub default_top_n: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_response_bytes: DEFAULT_MAX_BYTES,
            default_page_size: DEFAULT_PAGE_SIZE,
            default_top_n: DEFAULT_TOP_N,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub contact: Contact,
    pub host: String,
    pub port: u16,
    pub api_base: String,
    pub limits: Limits,
    pub upstream_timeout: Option<Duration>,
    pub shared_secret: Option<String>,
    pub interaction_log_dir: Option<PathBuf>,
    pub enable_financial_tools: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| Error::fatal(format!("{} must be set", key)))
        };

        let contact = Contact {
            email: required("SEC_API_MAIL")?,
            company: required("SEC_API_COMPANY")?,
        };

        let default_page_size = parse_or(get("SEC_DEFAULT_PAGE_SIZE"), "SEC_DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if !(1..=MAX_PAGE_SIZE).contains(&default_page_size) {
            return Err(Error::fatal(format!("SEC_DEFAULT_PAGE_SIZE must be 1-{}", MAX_PAGE_SIZE)));
        }

        let limits = Limits {
            max_response_bytes: parse_or(get("SEC_MAX_RESPONSE_BYTES"), "SEC_MAX_RESPONSE_BYTES", DEFAULT_MAX_BYTES)?,
            default_page_size,
            default_top_n: parse_or(get("SEC_DEFAULT_TOP_N"), "SEC_DEFAULT_TOP_N", DEFAULT_TOP_N)?,
        };

        let upstream_timeout = get("SEC_UPSTREAM_TIMEOUT_SECS")
            .map(|raw| parse::<u64>(&raw, "SEC_UPSTREAM_TIMEOUT_SECS"))
            .transpose()?
            .map(Duration::from_secs);

        let enable_financial_tools = match get("ENABLE_FINANCIAL_TOOLS").as_deref() {
            None => true,
            Some("1") | Some("true") | Some("yes") => true,
            Some("0") | Some("false") | Some("no") => false,
            Some(other) => {
                return Err(Error::fatal(format!("ENABLE_FINANCIAL_TOOLS: invalid flag '{}'", other)))
            }
        };

        Ok(Self {
            contact,
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(get("PORT"), "PORT", DEFAULT_PORT)?,
            api_base: get("SEC_API_BASE").unwrap_or_else(|| EDGAR_BASE_URL.to_string()),
            limits,
            upstream_timeout,
            shared_secret: get("MCP_SHARED_SECRET"),
            interaction_log_dir: get("SEC_INTERACTION_LOG_DIR").map(PathBuf::from),
            enable_financial_tools,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T: FromStr>(raw: &str, key: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| Error::fatal(format!("{}: cannot parse '{}'", key, raw)))
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T> {
    raw.map_or(Ok(default), |raw| parse(&raw, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgar_core::ErrorKind;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    const CONTACT: [(&str, &str); 2] = [("SEC_API_MAIL", "ops@acme.test"), ("SEC_API_COMPANY", "Acme")];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&CONTACT)).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.bind_addr(), "0.0.0.0:4000");
        assert_eq!(config.api_base, EDGAR_BASE_URL);
        assert_eq!(config.limits, Limits::default());
        assert!(config.upstream_timeout.is_none());
        assert!(config.shared_secret.is_none());
        assert!(config.enable_financial_tools);
        assert_eq!(config.contact.user_agent(), "Acme ops@acme.test");
    }

    #[test]
    fn test_missing_contact_is_fatal() {
        let err = Config::from_lookup(lookup(&[("SEC_API_MAIL", "ops@acme.test")])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fatal);

        let err = Config::from_lookup(lookup(&[("SEC_API_MAIL", " "), ("SEC_API_COMPANY", "Acme")])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fatal);
    }

    #[test]
    fn test_overrides() {
        let mut pairs = CONTACT.to_vec();
        pairs.extend([
            ("PORT", "8080"),
            ("SEC_MAX_RESPONSE_BYTES", "1024"),
            ("SEC_DEFAULT_PAGE_SIZE", "50"),
            ("SEC_UPSTREAM_TIMEOUT_SECS", "15"),
            ("MCP_SHARED_SECRET", "s3cret"),
            ("ENABLE_FINANCIAL_TOOLS", "false"),
            ("SEC_INTERACTION_LOG_DIR", "/var/log/edgar"),
        ]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.limits.max_response_bytes, 1024);
        assert_eq!(config.limits.default_page_size, 50);
        assert_eq!(config.upstream_timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.shared_secret.as_deref(), Some("s3cret"));
        assert!(!config.enable_financial_tools);
        assert_eq!(config.interaction_log_dir, Some(PathBuf::from("/var/log/edgar")));
    }

    #[test]
    fn test_bad_numbers_are_fatal() {
        for (key, value) in [("PORT", "http"), ("SEC_DEFAULT_PAGE_SIZE", "0"), ("SEC_DEFAULT_PAGE_SIZE", "101")] {
            let mut pairs = CONTACT.to_vec();
            pairs.push((key, value));
            assert!(Config::from_lookup(lookup(&pairs)).is_err(), "{}={}", key, value);
        }
    }
}
