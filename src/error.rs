//! Error types for configuration edits and monitoring cycles

use std::fmt;

/// Errors raised synchronously when the configuring side edits a field
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The supplied text is not a valid value for the field.
    ///
    /// The previously stored value is left untouched.
    InvalidConfig {
        field: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidConfig {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidConfig {
                field,
                value,
                reason,
            } => write!(f, "invalid {field} '{value}': {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors that can occur while fetching the status page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// No response within the configured bound
    Timeout,

    /// Connection, DNS or TLS failure
    Transport(String),

    /// The server answered with a non-2xx status code
    HttpStatus(u16),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Timeout => write!(f, "request timed out"),
            FetchError::Transport(msg) => write!(f, "transport error: {}", msg),
            FetchError::HttpStatus(code) => write!(f, "HTTP error: status {}", code),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return FetchError::Timeout;
        }

        match err.status() {
            Some(status) if !status.is_success() => FetchError::HttpStatus(status.as_u16()),
            _ => FetchError::Transport(err.to_string()),
        }
    }
}

/// Errors that can occur while extracting the reading from a page body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// No element carries the expected style class
    NoCandidateElements,

    /// None of the candidate elements starts with the expected label
    LabelNotFound,

    /// The text left after stripping label and unit is not a number
    NumberFormat(String),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::NoCandidateElements => write!(f, "no candidate elements in page"),
            ExtractError::LabelNotFound => write!(f, "no element carries the expected label"),
            ExtractError::NumberFormat(text) => write!(f, "'{}' is not a valid number", text),
        }
    }
}

impl std::error::Error for ExtractError {}
