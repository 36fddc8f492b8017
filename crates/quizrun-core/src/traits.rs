//! Collaborator traits: question sources, persistent storage, and interpreters.
//!
//! Bank sources live in `quizrun-sources`, interpreters in `quizrun-runner`.
//! The core only depends on these seams.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ExecutionError, StoreError};
use crate::trace::TraceEvent;

// ---------------------------------------------------------------------------
// Question sources
// ---------------------------------------------------------------------------

/// Somewhere raw question records can be fetched from.
#[async_trait]
pub trait BankSource: Send + Sync {
    /// Human-readable location (path or URL) for messages.
    fn describe(&self) -> String;

    /// Fetch the raw records. The payload must be a JSON array.
    async fn fetch(&self) -> anyhow::Result<Vec<serde_json::Value>>;
}

// ---------------------------------------------------------------------------
// Persistent key-value boundary
// ---------------------------------------------------------------------------

/// A synchronous string key-value store scoped to one user.
///
/// Synchronous on purpose: a read-modify-write cycle cannot be interleaved
/// with another one.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Interpreter collaborator
// ---------------------------------------------------------------------------

/// Starts an interpreter. Each call is one initialization attempt.
#[async_trait]
pub trait InterpreterLoader: Send + Sync {
    /// Human-readable interpreter name (e.g. "python3").
    fn name(&self) -> &str;

    async fn initialize(&self) -> Result<Arc<dyn Interpreter>, ExecutionError>;
}

/// A ready interpreter handle.
#[async_trait]
pub trait Interpreter: Send + Sync {
    /// Run an instrumented program. Failures raised by the program map to
    /// [`ExecutionError::Script`].
    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecutionOutput, ExecutionError>;

    /// Trace events recorded by the most recent `execute`, draining them.
    async fn take_trace(&self) -> Result<Vec<TraceEvent>, ExecutionError>;

    /// Render a line plot of `request.series`.
    async fn plot(&self, request: &PlotRequest) -> Result<EncodedImage, ExecutionError>;
}

/// Request to execute a snippet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    /// The snippet as the user wrote it.
    pub snippet: String,
    /// The snippet wrapped in the instrumentation harness.
    pub program: String,
    /// Variables whose state is captured at each step. Empty means all
    /// top-level names.
    #[serde(default)]
    pub tracked: Vec<String>,
}

/// What a successful execution printed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionOutput {
    pub stdout: String,
}

/// Request to plot a numeric series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotRequest {
    pub series: Vec<f64>,
    pub title: String,
    /// Y-axis label.
    pub label: String,
}

/// An encoded image, opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    /// MIME type, e.g. `image/png`.
    pub mime: String,
    /// Base64 payload.
    pub base64: String,
}

impl EncodedImage {
    pub fn png(base64: impl Into<String>) -> Self {
        Self {
            mime: "image/png".to_string(),
            base64: base64.into(),
        }
    }

    /// `data:` URI suitable for an `<img src>`.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.base64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_data_uri() {
        let image = EncodedImage::png("iVBORw0KGgo=");
        assert_eq!(image.data_uri(), "data:image/png;base64,iVBORw0KGgo=");
    }
}
