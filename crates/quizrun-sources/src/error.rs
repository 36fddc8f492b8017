//! Source and storage error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching a question bank.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The server answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { status: u16, url: String },

    /// The request never produced a response (connect failure, timeout).
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    /// A local bank file could not be read.
    #[error("failed to read {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    /// The payload is not a JSON array of records.
    #[error("invalid question bank from {origin}: {message}")]
    Parse { origin: String, message: String },
}

impl SourceError {
    /// Returns `true` if retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Network { .. } => true,
            SourceError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            SourceError::Io { .. } | SourceError::Parse { .. } => false,
        }
    }
}

/// Parse a raw payload into records, requiring a top-level array.
pub(crate) fn parse_payload(
    body: &str,
    origin: &str,
) -> Result<Vec<serde_json::Value>, SourceError> {
    quizrun_core::parser::parse_records(body).map_err(|e| SourceError::Parse {
        origin: origin.to_string(),
        message: format!("{e:#}"),
    })
}
