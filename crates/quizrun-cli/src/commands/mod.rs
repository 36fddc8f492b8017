pub mod exec;
pub mod init;
pub mod take;
pub mod validate;
pub mod wrong;

use std::sync::Arc;
use std::time::Duration;

use quizrun_core::store::WrongAnswerStore;
use quizrun_runner::{AdapterConfig, CodeExecutionAdapter, PythonLoader};
use quizrun_sources::{JsonFileStore, QuizrunConfig};

/// Wrong-answer store under the configured data directory.
pub(crate) fn open_store(config: &QuizrunConfig) -> WrongAnswerStore {
    WrongAnswerStore::new(Box::new(JsonFileStore::new(&config.data_dir)))
}

/// Code-execution adapter for the configured interpreter. Nothing is
/// started until the first run.
pub(crate) fn build_adapter(config: &QuizrunConfig) -> CodeExecutionAdapter {
    let runner = &config.runner;
    CodeExecutionAdapter::new(Arc::new(PythonLoader::new(runner.python.clone()))).with_config(
        AdapterConfig {
            init_attempts: runner.init_attempts,
            init_backoff: Duration::from_millis(runner.init_backoff_ms),
            default_timeout: Duration::from_millis(runner.timeout_ms),
        },
    )
}
