//! Error types for edgar-core

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure taxonomy shared by every component.
///
/// `PayloadTooLarge` never appears as an `Err`; it only labels the size-guard
/// advisory so clients can branch on a single `kind` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    UpstreamUnavailable,
    DataIntegrity,
    BadInput,
    PayloadTooLarge,
    NotFound,
    Fatal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UpstreamUnavailable => "UpstreamUnavailable",
            ErrorKind::DataIntegrity => "DataIntegrity",
            ErrorKind::BadInput => "BadInput",
            ErrorKind::PayloadTooLarge => "PayloadTooLarge",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Fatal => "Fatal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for EDGAR operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Bad input: {0}")]
    BadInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Fatal: {0}")]
    Fatal(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn upstream(msg: impl Into<String>) -> Self {
        Error::UpstreamUnavailable(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Error::DataIntegrity(msg.into())
    }

    pub fn bad_input(msg: impl Into<String>) -> Self {
        Error::BadInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Error::Fatal(msg.into())
    }

    /// Taxonomy kind reported in response envelopes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            Error::DataIntegrity(_) | Error::Serialization(_) | Error::Io(_) => ErrorKind::DataIntegrity,
            Error::BadInput(_) => ErrorKind::BadInput,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Fatal(_) => ErrorKind::Fatal,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::UpstreamUnavailable(err.to_string())
    }
}
