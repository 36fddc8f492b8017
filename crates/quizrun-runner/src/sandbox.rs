//! Throwaway working directory for one interpreter process.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use quizrun_core::error::ExecutionError;
use quizrun_core::trace::TraceEvent;

use crate::instrument::{self, TRACE_PATH_ENV};

const PROGRAM_FILE: &str = "program.py";
const TRACE_FILE: &str = "trace.jsonl";

/// Credentials a snippet could read, and variables that would make the
/// interpreter load code from outside the sandbox.
const SCRUBBED_VARS: &[&str] = &[
    "SSH_AUTH_SOCK",
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
    "GITHUB_TOKEN",
    "GH_TOKEN",
    "ANTHROPIC_API_KEY",
    "OPENAI_API_KEY",
    "DATABASE_URL",
    "PIP_INDEX_URL",
    "PYTHONSTARTUP",
    "PYTHONPATH",
    "PYTHONINSPECT",
];

/// A temporary directory holding the program and its trace output.
///
/// Removed on drop.
pub struct Sandbox {
    work_dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Result<Self, ExecutionError> {
        let work_dir = tempfile::Builder::new()
            .prefix("quizrun-")
            .tempdir()
            .map_err(|e| ExecutionError::Interpreter(format!("failed to create sandbox: {e}")))?;
        Ok(Self { work_dir })
    }

    pub fn work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    pub fn trace_path(&self) -> PathBuf {
        self.work_dir.path().join(TRACE_FILE)
    }

    /// Write the program to run and return its path.
    pub fn write_program(&self, program: &str) -> Result<PathBuf, ExecutionError> {
        let path = self.work_dir.path().join(PROGRAM_FILE);
        std::fs::write(&path, program).map_err(|e| {
            ExecutionError::Interpreter(format!("failed to write {PROGRAM_FILE}: {e}"))
        })?;
        Ok(path)
    }

    /// Trace events written by the harness. No file means no events.
    pub fn read_trace(&self) -> Result<Vec<TraceEvent>, ExecutionError> {
        match std::fs::read_to_string(self.trace_path()) {
            Ok(contents) => instrument::parse_trace(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(ExecutionError::Interpreter(format!(
                "failed to read trace: {e}"
            ))),
        }
    }

    /// Environment for the child process: trace location, a headless
    /// matplotlib backend, and blanked secrets.
    pub fn build_env(&self) -> Vec<(String, String)> {
        let dir = self.work_dir.path().to_string_lossy().to_string();
        let mut env = vec![
            (
                TRACE_PATH_ENV.to_string(),
                self.trace_path().to_string_lossy().to_string(),
            ),
            ("PYTHONDONTWRITEBYTECODE".to_string(), "1".to_string()),
            ("PYTHONIOENCODING".to_string(), "utf-8".to_string()),
            ("MPLBACKEND".to_string(), "Agg".to_string()),
            ("MPLCONFIGDIR".to_string(), dir),
        ];
        for var in SCRUBBED_VARS {
            env.push((var.to_string(), String::new()));
        }
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_is_written_inside_work_dir() {
        let sandbox = Sandbox::new().unwrap();
        let path = sandbox.write_program("print(1)").unwrap();
        assert!(path.starts_with(sandbox.work_dir()));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "print(1)");
    }

    #[test]
    fn missing_trace_is_empty() {
        let sandbox = Sandbox::new().unwrap();
        assert!(sandbox.read_trace().unwrap().is_empty());
    }

    #[test]
    fn trace_file_is_parsed() {
        let sandbox = Sandbox::new().unwrap();
        std::fs::write(
            sandbox.trace_path(),
            r#"{"step": 0, "kind": "post_exec", "line": 1, "variables": {}}"#,
        )
        .unwrap();
        assert_eq!(sandbox.read_trace().unwrap().len(), 1);
    }

    #[test]
    fn env_points_at_trace_and_scrubs_secrets() {
        let sandbox = Sandbox::new().unwrap();
        let env = sandbox.build_env();
        let trace = env.iter().find(|(k, _)| k == TRACE_PATH_ENV).unwrap();
        assert!(trace.1.ends_with(TRACE_FILE));
        assert!(env
            .iter()
            .any(|(k, v)| k == "AWS_SECRET_ACCESS_KEY" && v.is_empty()));
    }

    #[test]
    fn env_blanks_interpreter_hooks() {
        let sandbox = Sandbox::new().unwrap();
        let env = sandbox.build_env();
        for hook in ["PYTHONPATH", "PYTHONSTARTUP", "PYTHONINSPECT"] {
            assert!(env.iter().any(|(k, v)| k == hook && v.is_empty()), "{hook}");
        }
        assert!(!env.iter().any(|(k, _)| k.starts_with("CARGO_") || k.starts_with("DOCKER_")));
    }

    #[test]
    fn work_dir_removed_on_drop() {
        let sandbox = Sandbox::new().unwrap();
        let dir = sandbox.work_dir().to_path_buf();
        drop(sandbox);
        assert!(!dir.exists());
    }
}
