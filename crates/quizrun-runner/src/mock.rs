//! Scripted interpreter and loader for testing without a real Python.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use quizrun_core::error::ExecutionError;
use quizrun_core::trace::TraceEvent;
use quizrun_core::traits::{
    EncodedImage, ExecuteRequest, ExecutionOutput, Interpreter, InterpreterLoader, PlotRequest,
};

/// One-pixel transparent PNG.
pub const PLACEHOLDER_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// An interpreter that replays a fixed outcome for every execution.
#[derive(Default)]
pub struct ScriptedInterpreter {
    stdout: String,
    script_error: Option<String>,
    trace: Vec<TraceEvent>,
    delay: Option<Duration>,
    plot_error: Option<String>,
    execute_count: AtomicU32,
    last_request: Mutex<Option<ExecuteRequest>>,
    pending_trace: Mutex<Vec<TraceEvent>>,
}

impl ScriptedInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    /// Trace reported after every successful execution.
    pub fn with_trace(mut self, trace: Vec<TraceEvent>) -> Self {
        self.trace = trace;
        self
    }

    /// Every execution fails with this script error.
    pub fn failing_with(mut self, message: impl Into<String>) -> Self {
        self.script_error = Some(message.into());
        self
    }

    /// Sleep before answering, to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_plot_error(mut self, message: impl Into<String>) -> Self {
        self.plot_error = Some(message.into());
        self
    }

    pub fn execute_count(&self) -> u32 {
        self.execute_count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<ExecuteRequest> {
        lock(&self.last_request).clone()
    }
}

#[async_trait]
impl Interpreter for ScriptedInterpreter {
    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecutionOutput, ExecutionError> {
        self.execute_count.fetch_add(1, Ordering::Relaxed);
        *lock(&self.last_request) = Some(request.clone());
        lock(&self.pending_trace).clear();

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = &self.script_error {
            return Err(ExecutionError::Script {
                message: message.clone(),
            });
        }

        *lock(&self.pending_trace) = self.trace.clone();
        Ok(ExecutionOutput {
            stdout: self.stdout.clone(),
        })
    }

    async fn take_trace(&self) -> Result<Vec<TraceEvent>, ExecutionError> {
        Ok(std::mem::take(&mut *lock(&self.pending_trace)))
    }

    async fn plot(&self, request: &PlotRequest) -> Result<EncodedImage, ExecutionError> {
        if let Some(message) = &self.plot_error {
            return Err(ExecutionError::Interpreter(message.clone()));
        }
        if request.series.is_empty() {
            return Err(ExecutionError::PlotGeneration("empty series".into()));
        }
        Ok(EncodedImage::png(PLACEHOLDER_PNG))
    }
}

/// A loader that fails a configurable number of times before handing out
/// a shared [`ScriptedInterpreter`].
pub struct MockLoader {
    interpreter: Arc<ScriptedInterpreter>,
    failures: u32,
    attempts: AtomicU32,
}

impl MockLoader {
    pub fn new(interpreter: ScriptedInterpreter) -> Self {
        Self {
            interpreter: Arc::new(interpreter),
            failures: 0,
            attempts: AtomicU32::new(0),
        }
    }

    /// Fail the first `failures` initialization attempts.
    pub fn failing_first(mut self, failures: u32) -> Self {
        self.failures = failures;
        self
    }

    /// Fail every initialization attempt.
    pub fn always_failing() -> Self {
        Self::new(ScriptedInterpreter::new()).failing_first(u32::MAX)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn interpreter(&self) -> Arc<ScriptedInterpreter> {
        Arc::clone(&self.interpreter)
    }
}

#[async_trait]
impl InterpreterLoader for MockLoader {
    fn name(&self) -> &str {
        "mock"
    }

    async fn initialize(&self) -> Result<Arc<dyn Interpreter>, ExecutionError> {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        if attempt <= self.failures {
            return Err(ExecutionError::Interpreter(format!(
                "simulated startup failure (attempt {attempt})"
            )));
        }
        Ok(self.interpreter.clone())
    }
}
