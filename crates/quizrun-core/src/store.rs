//! Wrong-answer store: missed questions persisted across sessions.
//!
//! The whole set is one JSON blob under [`WRONG_ANSWERS_KEY`] in a
//! [`KeyValueStore`]. Entries are keyed by question id.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::error::StoreError;
use crate::model::{Question, QuestionId};
use crate::traits::KeyValueStore;

/// Key under which the wrong-answer set is persisted.
pub const WRONG_ANSWERS_KEY: &str = "quizrun.wrong_answers";

/// Persistent, id-deduplicated set of missed questions.
pub struct WrongAnswerStore {
    backend: Box<dyn KeyValueStore>,
    key: String,
}

impl WrongAnswerStore {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            key: WRONG_ANSWERS_KEY.to_string(),
        }
    }

    /// A store backed by process memory only.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::default()))
    }

    /// Use a different key, e.g. one store per bank.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Load the persisted set. A missing blob is an empty set.
    ///
    /// Entries that break question invariants make the whole blob corrupt.
    pub fn load(&self) -> Result<Vec<Question>, StoreError> {
        let blob = match self.backend.get(&self.key)? {
            Some(blob) if !blob.trim().is_empty() => blob,
            _ => return Ok(Vec::new()),
        };
        let questions: Vec<Question> =
            serde_json::from_str(&blob).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        for q in &questions {
            q.check()
                .map_err(|e| StoreError::Corrupt(format!("question `{}`: {e}", q.id)))?;
        }
        Ok(questions)
    }

    /// Replace the persisted set.
    pub fn save(&self, questions: &[Question]) -> Result<(), StoreError> {
        let blob =
            serde_json::to_string(questions).map_err(|e| StoreError::Serialize(e.to_string()))?;
        self.backend.set(&self.key, &blob)
    }

    /// Merge `incoming` into the persisted set and save it.
    ///
    /// Load, merge, and save happen back to back with no suspension point.
    /// Returns the number of entries after the merge.
    pub fn record(&self, incoming: &[Question]) -> Result<usize, StoreError> {
        if incoming.is_empty() {
            return Ok(self.load()?.len());
        }
        let existing = self.load()?;
        let merged = merge(&existing, incoming);
        self.save(&merged)?;
        tracing::debug!(
            added = incoming.len(),
            total = merged.len(),
            "recorded wrong answers"
        );
        Ok(merged.len())
    }

    /// Remove the given ids from the persisted set, e.g. after they were
    /// answered correctly in a review.
    pub fn forget(&self, ids: &[QuestionId]) -> Result<usize, StoreError> {
        let drop: HashSet<&QuestionId> = ids.iter().collect();
        let mut questions = self.load()?;
        questions.retain(|q| !drop.contains(&q.id));
        self.save(&questions)?;
        Ok(questions.len())
    }

    /// Delete the persisted set.
    pub fn clear(&self) -> Result<(), StoreError> {
        tracing::debug!(key = %self.key, "clearing wrong-answer store");
        self.backend.remove(&self.key)
    }
}

/// Merge two wrong-answer sets by id.
///
/// `existing` entries keep their order. When both sides share an id the
/// `incoming` content wins and stays at the existing position; new ids are
/// appended in `incoming` order. Duplicate ids within `incoming` resolve to
/// the last one.
pub fn merge(existing: &[Question], incoming: &[Question]) -> Vec<Question> {
    let mut merged: Vec<Question> = Vec::with_capacity(existing.len() + incoming.len());
    let mut positions: HashMap<QuestionId, usize> = HashMap::new();

    for q in existing.iter().chain(incoming.iter()) {
        match positions.get(&q.id) {
            Some(&at) => merged[at] = q.clone(),
            None => {
                positions.insert(q.id.clone(), merged.len());
                merged.push(q.clone());
            }
        }
    }
    merged
}

/// In-memory [`KeyValueStore`], used for tests and when persistence is off.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?.remove(key);
        Ok(())
    }
}
