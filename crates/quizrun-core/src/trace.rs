//! Execution trace model and series derivation.
//!
//! A trace is the ordered list of variable snapshots an instrumented snippet
//! reported while it ran. It lives only until the next run.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Whether a snapshot was taken before or after a statement ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PreExec,
    PostExec,
}

/// State of one variable at one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSnapshot {
    /// Truncated textual representation.
    pub repr: String,
    /// Scalar measure: length for collections, the value for numbers, 0/1
    /// for booleans. `None` when the value has no natural measure.
    #[serde(default)]
    pub measure: Option<f64>,
}

/// One instrumented step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub step: usize,
    pub kind: EventKind,
    /// Source line of the statement, 1-based.
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub variables: BTreeMap<String, VariableSnapshot>,
}

/// Ordered trace of one snippet run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    events: Vec<TraceEvent>,
}

impl ExecutionTrace {
    pub fn new(events: Vec<TraceEvent>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn post_exec(&self) -> impl Iterator<Item = &TraceEvent> {
        self.events
            .iter()
            .filter(|e| e.kind == EventKind::PostExec)
    }

    /// Every variable name that appears in any snapshot.
    pub fn variable_names(&self) -> BTreeSet<&str> {
        self.events
            .iter()
            .flat_map(|e| e.variables.keys().map(String::as_str))
            .collect()
    }
}

/// Result of a successful snippet run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub trace: ExecutionTrace,
    pub duration_ms: u64,
}

/// Measure of `variable` at each post-exec step.
///
/// A step where the variable is absent, or has no measure, contributes 0.
pub fn derive_series(trace: &ExecutionTrace, variable: &str) -> Vec<f64> {
    trace
        .post_exec()
        .map(|event| {
            event
                .variables
                .get(variable)
                .and_then(|v| v.measure)
                .unwrap_or(0.0)
        })
        .collect()
}
