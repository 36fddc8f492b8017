//! Local file bank source and the file-backed key-value store.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;

use quizrun_core::error::StoreError;
use quizrun_core::traits::{BankSource, KeyValueStore};

use crate::error::{parse_payload, SourceError};

/// A question bank stored as a JSON array in a local file.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn fetch_records(&self) -> Result<Vec<serde_json::Value>, SourceError> {
        let body = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SourceError::Io {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        parse_payload(&body, &self.describe())
    }
}

#[async_trait]
impl BankSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> anyhow::Result<Vec<serde_json::Value>> {
        Ok(self.fetch_records().await?)
    }
}

/// [`KeyValueStore`] keeping one JSON file per key under a directory.
///
/// Writes go to a temporary file in the same directory that is then renamed
/// over the target, so a crash never leaves a half-written blob.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding `key`. Characters outside `[A-Za-z0-9._-]` become `_`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

fn backend(action: &str, path: &Path, e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("failed to {action} {}: {e}", path.display()))
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(backend("read", &path, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        std::fs::create_dir_all(&self.dir).map_err(|e| backend("create", &self.dir, e))?;

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| backend("create", &self.dir, e))?;
        tmp.write_all(value.as_bytes())
            .and_then(|_| tmp.flush())
            .map_err(|e| backend("write", tmp.path(), e))?;
        tmp.persist(&path).map_err(|e| backend("replace", &path, e.error))?;

        tracing::debug!(path = %path.display(), bytes = value.len(), "stored blob");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(backend("remove", &path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizrun_core::store::WrongAnswerStore;
    use quizrun_core::QuestionBank;

    #[tokio::test]
    async fn file_source_reads_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bank.json");
        std::fs::write(
            &path,
            r#"[{"id": 1, "question": "q?", "options": ["a", "b"], "correct": 0}]"#,
        )
        .unwrap();

        let records = FileSource::new(&path).fetch().await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let err = FileSource::new("/definitely/not/here.json")
            .fetch_records()
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[test]
    fn store_round_trips_and_removes() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("data"));

        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "[1]").unwrap();
        store.set("k", "[1,2]").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("[1,2]"));

        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn keys_are_sanitized() {
        let store = JsonFileStore::new("/tmp/quizrun");
        assert_eq!(
            store.path_for("quizrun.wrong_answers/../x"),
            PathBuf::from("/tmp/quizrun/quizrun.wrong_answers_.._x.json")
        );
    }

    #[test]
    fn wrong_answers_survive_a_new_store_instance() {
        let dir = tempfile::tempdir().unwrap();
        let bank = QuestionBank::normalize(&[serde_json::json!(
            {"id": 7, "question": "q?", "options": ["a", "b"], "correct": 1}
        )])
        .bank;

        WrongAnswerStore::new(Box::new(JsonFileStore::new(dir.path())))
            .record(bank.questions())
            .unwrap();

        let reopened = WrongAnswerStore::new(Box::new(JsonFileStore::new(dir.path())));
        let loaded = reopened.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id.as_str(), "7");
    }
}
