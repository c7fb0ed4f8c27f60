//! Error types for netcheck

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetcheckError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Remote or local command exited unsuccessfully
    #[error("Command '{cmd}' failed{}: {stderr}", .code.map(|c| format!(" with code {}", c)).unwrap_or_default())]
    CommandFailed { cmd: String, code: Option<i32>, stderr: String },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Observed state differs from the expected one
    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    /// Bounded poll ran out of tries
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Parse error
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Browser automation error
    #[error("Browser error: {0}")]
    Browser(String),

    /// Invalid state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// HTTP transport error (WebDriver)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<serde_json::Error> for NetcheckError {
    fn from(error: serde_json::Error) -> Self {
        NetcheckError::ParseError(error.to_string())
    }
}

pub type NetcheckResult<T> = Result<T, NetcheckError>;

/// Build an `AssertionFailed` unless `cond` holds.
pub(crate) fn ensure(cond: bool, msg: impl FnOnce() -> String) -> NetcheckResult<()> {
    if cond {
        Ok(())
    } else {
        Err(NetcheckError::AssertionFailed(msg()))
    }
}
