//! `python3` subprocess interpreter.

use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use quizrun_core::error::ExecutionError;
use quizrun_core::trace::TraceEvent;
use quizrun_core::traits::{
    EncodedImage, ExecuteRequest, ExecutionOutput, Interpreter, InterpreterLoader, PlotRequest,
};

use crate::instrument;
use crate::sandbox::Sandbox;

pub const DEFAULT_PYTHON: &str = "python3";

const PLOT_SCRIPT: &str = r#"import base64
import io
import json
import sys

try:
    import matplotlib
    matplotlib.use("Agg")
    import matplotlib.pyplot as plt
except ImportError:
    sys.stderr.write("matplotlib is not installed\n")
    sys.exit(3)

request = json.loads(sys.stdin.read())
fig, ax = plt.subplots(figsize=(6, 3.5))
ax.plot(range(len(request["series"])), request["series"], marker="o")
ax.set_title(request["title"])
ax.set_xlabel("step")
ax.set_ylabel(request["label"])
fig.tight_layout()
buffer = io.BytesIO()
fig.savefig(buffer, format="png")
sys.stdout.write(base64.b64encode(buffer.getvalue()).decode("ascii"))
"#;

/// Starts [`PythonInterpreter`]s after checking the executable responds.
pub struct PythonLoader {
    program: String,
    probe_timeout: Duration,
}

impl PythonLoader {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            probe_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }
}

impl Default for PythonLoader {
    fn default() -> Self {
        Self::new(DEFAULT_PYTHON)
    }
}

#[async_trait]
impl InterpreterLoader for PythonLoader {
    fn name(&self) -> &str {
        &self.program
    }

    async fn initialize(&self) -> Result<Arc<dyn Interpreter>, ExecutionError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.probe_timeout, cmd.output())
            .await
            .map_err(|_| {
                ExecutionError::Interpreter(format!("`{} --version` timed out", self.program))
            })?
            .map_err(|e| ExecutionError::Interpreter(format!("failed to start {}: {e}", self.program)))?;

        if !output.status.success() {
            return Err(ExecutionError::Interpreter(format!(
                "`{} --version` exited with {}",
                self.program, output.status
            )));
        }

        // Python 2 printed its version on stderr.
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let version = if version.is_empty() {
            String::from_utf8_lossy(&output.stderr).trim().to_string()
        } else {
            version
        };
        if !version.starts_with("Python 3") {
            return Err(ExecutionError::Interpreter(format!(
                "{} is not Python 3 ({version})",
                self.program
            )));
        }

        tracing::info!(program = %self.program, %version, "interpreter ready");
        Ok(Arc::new(PythonInterpreter::new(self.program.clone())))
    }
}

/// Runs each program in a fresh [`Sandbox`] as a child process.
///
/// The child is killed when the execute future is dropped, so an expired
/// timeout does not leave it running.
pub struct PythonInterpreter {
    program: String,
    last_trace: Mutex<Vec<TraceEvent>>,
}

impl PythonInterpreter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            last_trace: Mutex::new(Vec::new()),
        }
    }

    fn store_trace(&self, events: Vec<TraceEvent>) {
        let mut slot = self.last_trace.lock().unwrap_or_else(|e| e.into_inner());
        *slot = events;
    }

    fn command(&self, sandbox: &Sandbox) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(sandbox.work_dir())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, val) in sandbox.build_env() {
            cmd.env(&key, &val);
        }
        cmd
    }
}

#[async_trait]
impl Interpreter for PythonInterpreter {
    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecutionOutput, ExecutionError> {
        self.store_trace(Vec::new());

        let sandbox = Sandbox::new()?;
        let path = sandbox.write_program(&request.program)?;

        let output = self
            .command(&sandbox)
            .arg(&path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ExecutionError::Interpreter(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExecutionError::Script {
                message: instrument::script_error_message(&stderr),
            });
        }

        self.store_trace(sandbox.read_trace()?);
        Ok(ExecutionOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        })
    }

    async fn take_trace(&self) -> Result<Vec<TraceEvent>, ExecutionError> {
        let mut slot = self.last_trace.lock().unwrap_or_else(|e| e.into_inner());
        Ok(std::mem::take(&mut *slot))
    }

    async fn plot(&self, request: &PlotRequest) -> Result<EncodedImage, ExecutionError> {
        use tokio::io::AsyncWriteExt;

        let sandbox = Sandbox::new()?;
        let path = sandbox.write_program(PLOT_SCRIPT)?;
        let payload = serde_json::to_vec(request)
            .map_err(|e| ExecutionError::PlotGeneration(e.to_string()))?;

        let mut child = self
            .command(&sandbox)
            .arg(&path)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| ExecutionError::PlotGeneration(format!("failed to run {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .await
                .map_err(|e| ExecutionError::PlotGeneration(format!("failed to send series: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExecutionError::PlotGeneration(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExecutionError::PlotGeneration(
                instrument::script_error_message(&stderr),
            ));
        }

        let encoded = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if encoded.is_empty() {
            return Err(ExecutionError::PlotGeneration("empty image".into()));
        }
        Ok(EncodedImage::png(encoded))
    }
}
