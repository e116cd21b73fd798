//! Central Index Key canonicalization

use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Width of the canonical zero-padded form.
pub const CIK_WIDTH: usize = 10;

/// A validated entity identifier, stored in its canonical 10-digit form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cik(String);

impl Cik {
    /// Accepts 1 to 10 decimal digits, surrounding whitespace ignored.
    pub fn parse(input: &str) -> Result<Self> {
        let digits = input.trim();
        if digits.is_empty() || digits.len() > CIK_WIDTH {
            return Err(Error::bad_input(format!(
                "CIK must be 1-{} digits, got {:?}",
                CIK_WIDTH, input
            )));
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::bad_input(format!("CIK must be numeric, got {:?}", input)));
        }
        Ok(Self(format!("{:0>width$}", digits, width = CIK_WIDTH)))
    }

    /// Upstream frames report CIKs as bare integers.
    pub fn from_number(n: u64) -> Result<Self> {
        Self::parse(&n.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Cik {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Cik {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Cik {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pads_to_ten_digits() {
        for input in ["1", "320193", "0000320193", "9999999999", " 42 "] {
            let cik = Cik::parse(input).unwrap();
            assert_eq!(cik.as_str().len(), CIK_WIDTH);
            assert!(cik.as_str().bytes().all(|b| b.is_ascii_digit()));
        }
        assert_eq!(Cik::parse("320193").unwrap().to_string(), "0000320193");
    }

    #[test]
    fn test_rejects_invalid() {
        for input in ["", "   ", "12345678901", "AAPL", "12a4", "-1"] {
            assert!(Cik::parse(input).is_err(), "accepted {:?}", input);
        }
    }

    #[test]
    fn test_from_number() {
        assert_eq!(Cik::from_number(320193).unwrap().as_str(), "0000320193");
    }
}
