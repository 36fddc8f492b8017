//! quizrun-runner — Instrumented snippet execution for code questions.
//!
//! [`CodeExecutionAdapter`] owns the interpreter lifecycle: lazy
//! initialization with bounded retries, timed execution of instrumented
//! snippets, trace collection, and plot delegation. Nothing here can fail a
//! quiz; every error is an [`ExecutionError`] the caller shows and moves on.

pub mod instrument;
pub mod mock;
pub mod python;
pub mod sandbox;

use std::sync::Arc;
use std::time::{Duration, Instant};

use quizrun_core::error::ExecutionError;
use quizrun_core::trace::{derive_series, ExecutionResult, ExecutionTrace};
use quizrun_core::traits::{EncodedImage, ExecuteRequest, Interpreter, InterpreterLoader, PlotRequest};

pub use python::{PythonInterpreter, PythonLoader};

/// Retry and timeout settings for [`CodeExecutionAdapter`].
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Initialization attempts before giving up.
    pub init_attempts: u32,
    /// Fixed delay between initialization attempts.
    pub init_backoff: Duration,
    /// Timeout used by [`CodeExecutionAdapter::run_default`].
    pub default_timeout: Duration,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            init_attempts: 3,
            init_backoff: Duration::from_millis(500),
            default_timeout: Duration::from_secs(5),
        }
    }
}

enum Environment {
    Uninitialized,
    Ready(Arc<dyn Interpreter>),
    Unavailable { attempts: u32, reason: String },
}

/// Runs snippets through an interpreter obtained from an [`InterpreterLoader`].
///
/// Operations take `&mut self`, so a second run cannot start while one is in
/// flight.
pub struct CodeExecutionAdapter {
    loader: Arc<dyn InterpreterLoader>,
    config: AdapterConfig,
    environment: Environment,
    last_trace: Option<ExecutionTrace>,
}

impl CodeExecutionAdapter {
    pub fn new(loader: Arc<dyn InterpreterLoader>) -> Self {
        Self {
            loader,
            config: AdapterConfig::default(),
            environment: Environment::Uninitialized,
            last_trace: None,
        }
    }

    pub fn with_config(mut self, config: AdapterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// `true` once an interpreter is ready.
    pub fn is_available(&self) -> bool {
        matches!(self.environment, Environment::Ready(_))
    }

    /// Initialize the interpreter if that has not happened yet.
    ///
    /// Tries up to `init_attempts` times, sleeping `init_backoff` between
    /// attempts. Once exhausted the adapter stays unavailable and every call
    /// returns [`ExecutionError::EnvironmentUnavailable`] until
    /// [`reinitialize`](Self::reinitialize).
    pub async fn initialize(&mut self) -> Result<(), ExecutionError> {
        match &self.environment {
            Environment::Ready(_) => return Ok(()),
            Environment::Unavailable { attempts, reason } => {
                return Err(ExecutionError::EnvironmentUnavailable {
                    attempts: *attempts,
                    reason: reason.clone(),
                })
            }
            Environment::Uninitialized => {}
        }

        let max_attempts = self.config.init_attempts.max(1);
        let mut last_reason = String::new();

        for attempt in 1..=max_attempts {
            tracing::debug!(
                interpreter = self.loader.name(),
                attempt,
                max_attempts,
                "initializing interpreter"
            );
            match self.loader.initialize().await {
                Ok(interpreter) => {
                    tracing::info!(
                        interpreter = self.loader.name(),
                        attempt,
                        "code execution available"
                    );
                    self.environment = Environment::Ready(interpreter);
                    return Ok(());
                }
                Err(e) => {
                    last_reason = e.to_string();
                    if attempt < max_attempts {
                        tracing::warn!(
                            attempt,
                            max_attempts,
                            error = %e,
                            "interpreter initialization failed, retrying in {:?}",
                            self.config.init_backoff
                        );
                        tokio::time::sleep(self.config.init_backoff).await;
                    }
                }
            }
        }

        tracing::error!(
            interpreter = self.loader.name(),
            attempts = max_attempts,
            reason = %last_reason,
            "code execution unavailable"
        );
        self.environment = Environment::Unavailable {
            attempts: max_attempts,
            reason: last_reason.clone(),
        };
        Err(ExecutionError::EnvironmentUnavailable {
            attempts: max_attempts,
            reason: last_reason,
        })
    }

    /// Forget any previous outcome and initialize again.
    pub async fn reinitialize(&mut self) -> Result<(), ExecutionError> {
        self.environment = Environment::Uninitialized;
        self.initialize().await
    }

    /// Run `snippet` tracking every top-level name.
    pub async fn run(
        &mut self,
        snippet: &str,
        timeout: Duration,
    ) -> Result<ExecutionResult, ExecutionError> {
        self.run_tracked(snippet, &[], timeout).await
    }

    /// Run `snippet` with the configured default timeout.
    pub async fn run_default(&mut self, snippet: &str) -> Result<ExecutionResult, ExecutionError> {
        let timeout = self.config.default_timeout;
        self.run_tracked(snippet, &[], timeout).await
    }

    /// Run `snippet`, snapshotting only the `tracked` variables.
    ///
    /// The previous trace is discarded first. Execution is raced against
    /// `timeout`; when it expires the interpreter future is dropped, which
    /// for the Python interpreter kills the child process. A script error or
    /// a timeout leaves the environment available.
    pub async fn run_tracked(
        &mut self,
        snippet: &str,
        tracked: &[String],
        timeout: Duration,
    ) -> Result<ExecutionResult, ExecutionError> {
        if timeout.is_zero() {
            return Err(ExecutionError::InvalidRequest(
                "timeout must be greater than zero".into(),
            ));
        }
        if snippet.trim().is_empty() {
            return Err(ExecutionError::InvalidRequest("snippet is empty".into()));
        }

        self.last_trace = None;
        let interpreter = self.interpreter().await?;

        let request = ExecuteRequest {
            snippet: snippet.to_string(),
            program: instrument::wrap(snippet, tracked),
            tracked: tracked.to_vec(),
        };

        let start = Instant::now();
        let output = match tokio::time::timeout(timeout, interpreter.execute(&request)).await {
            Ok(result) => result?,
            Err(_) => {
                let timeout_ms = timeout.as_millis() as u64;
                tracing::warn!(timeout_ms, "snippet timed out");
                return Err(ExecutionError::Timeout { timeout_ms });
            }
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        let trace = ExecutionTrace::new(interpreter.take_trace().await?);
        tracing::debug!(duration_ms, events = trace.len(), "snippet finished");
        self.last_trace = Some(trace.clone());

        Ok(ExecutionResult {
            stdout: output.stdout,
            trace,
            duration_ms,
        })
    }

    /// Trace of the most recent successful run.
    pub fn last_trace(&self) -> Option<&ExecutionTrace> {
        self.last_trace.as_ref()
    }

    /// Series for `variable` from the most recent successful run.
    pub fn series(&self, variable: &str) -> Result<Vec<f64>, ExecutionError> {
        self.last_trace
            .as_ref()
            .map(|trace| derive_series(trace, variable))
            .ok_or(ExecutionError::MissingTrace)
    }

    /// Render `series` as a PNG via the interpreter.
    pub async fn plot(
        &mut self,
        series: &[f64],
        title: &str,
    ) -> Result<EncodedImage, ExecutionError> {
        self.plot_labeled(series, title, "value").await
    }

    /// Plot the series of `variable` from the most recent run.
    pub async fn plot_variable(
        &mut self,
        variable: &str,
        title: &str,
    ) -> Result<EncodedImage, ExecutionError> {
        let series = self.series(variable)?;
        self.plot_labeled(&series, title, variable).await
    }

    async fn plot_labeled(
        &mut self,
        series: &[f64],
        title: &str,
        label: &str,
    ) -> Result<EncodedImage, ExecutionError> {
        let interpreter = self.interpreter().await?;
        let request = PlotRequest {
            series: series.to_vec(),
            title: title.to_string(),
            label: label.to_string(),
        };
        interpreter.plot(&request).await.map_err(|e| match e {
            ExecutionError::PlotGeneration(_) => e,
            other => ExecutionError::PlotGeneration(other.to_string()),
        })
    }

    async fn interpreter(&mut self) -> Result<Arc<dyn Interpreter>, ExecutionError> {
        self.initialize().await?;
        match &self.environment {
            Environment::Ready(interpreter) => Ok(Arc::clone(interpreter)),
            _ => Err(ExecutionError::Interpreter(
                "interpreter missing after initialization".into(),
            )),
        }
    }
}
