//! quizrun configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizrun_core::session::ProgressionMode;

/// Settings for the code-execution adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Interpreter executable.
    #[serde(default = "default_python")]
    pub python: String,
    /// Per-run timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_init_attempts")]
    pub init_attempts: u32,
    /// Delay between initialization attempts in milliseconds.
    #[serde(default = "default_init_backoff_ms")]
    pub init_backoff_ms: u64,
}

fn default_python() -> String {
    "python3".to_string()
}
fn default_timeout_ms() -> u64 {
    5000
}
fn default_init_attempts() -> u32 {
    3
}
fn default_init_backoff_ms() -> u64 {
    500
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            python: default_python(),
            timeout_ms: default_timeout_ms(),
            init_attempts: default_init_attempts(),
            init_backoff_ms: default_init_backoff_ms(),
        }
    }
}

/// Top-level quizrun configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizrunConfig {
    /// Bank locations: file paths, directories, or `http(s)://` URLs.
    #[serde(default)]
    pub banks: Vec<String>,
    #[serde(default)]
    pub default_mode: ProgressionMode,
    /// Where the wrong-answer store lives.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub runner: RunnerConfig,
}

fn default_data_dir() -> PathBuf {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".local").join("share").join("quizrun"))
        .unwrap_or_else(|| PathBuf::from(".quizrun"))
}

impl Default for QuizrunConfig {
    fn default() -> Self {
        Self {
            banks: Vec::new(),
            default_mode: ProgressionMode::default(),
            data_dir: default_data_dir(),
            runner: RunnerConfig::default(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
/// Unset variables expand to the empty string.
pub fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let name = &rest[start + 2..start + len];
        result.push_str(&std::env::var(name).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    result.push_str(rest);
    result
}

impl QuizrunConfig {
    /// Expand `${VAR}` references in every string-valued setting.
    fn resolve_env(mut self) -> Self {
        self.banks = self.banks.iter().map(|b| resolve_env_vars(b)).collect();
        self.data_dir = PathBuf::from(resolve_env_vars(&self.data_dir.to_string_lossy()));
        self.runner.python = resolve_env_vars(&self.runner.python);
        self
    }

    /// Apply `QUIZRUN_PYTHON` and `QUIZRUN_DATA_DIR`.
    fn apply_env_overrides(mut self) -> Self {
        if let Ok(python) = std::env::var("QUIZRUN_PYTHON") {
            if !python.trim().is_empty() {
                self.runner.python = python;
            }
        }
        if let Ok(dir) = std::env::var("QUIZRUN_DATA_DIR") {
            if !dir.trim().is_empty() {
                self.data_dir = PathBuf::from(dir);
            }
        }
        self
    }

    /// Problems worth telling the user about. None of them stop a quiz.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.banks.is_empty() {
            warnings.push("no banks configured; pass --bank or add `banks` to quizrun.toml".into());
        }
        if self.runner.timeout_ms == 0 {
            warnings.push("runner.timeout_ms is 0; every snippet run will be rejected".into());
        }
        if self.runner.init_attempts == 0 {
            warnings.push("runner.init_attempts is 0; one attempt will be made".into());
        }
        warnings
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizrun.toml` in the current directory
/// 2. `~/.config/quizrun/config.toml`
///
/// Environment variable overrides: `QUIZRUN_PYTHON`, `QUIZRUN_DATA_DIR`.
pub fn load_config() -> Result<QuizrunConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizrunConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => search_paths().into_iter().find(|p| p.exists()),
    };

    let config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<QuizrunConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => QuizrunConfig::default(),
    };

    Ok(config.apply_env_overrides().resolve_env())
}

fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("quizrun.toml")];
    if let Ok(home) = std::env::var("HOME") {
        paths.push(
            PathBuf::from(home)
                .join(".config")
                .join("quizrun")
                .join("config.toml"),
        );
    }
    paths
}
