//! Question bank normalization, merging, and filtering.
//!
//! A [`QuestionBank`] is immutable once built. Filtering or merging produces a
//! new bank; nothing mutates a bank in place.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{QuizError, ValidationError};
use crate::model::{Difficulty, Question, QuestionId, DEFAULT_CATEGORY, DEFAULT_EXPLANATION};

/// An ordered, immutable collection of questions with unique ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

/// A raw record that normalization skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    /// Position of the record in the input sequence.
    pub position: usize,
    /// Raw id of the record, if it had a usable one.
    pub id: Option<QuestionId>,
    pub reason: ValidationError,
}

/// Result of normalizing raw records: the bank plus everything that was skipped.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub bank: QuestionBank,
    pub rejected: Vec<RejectedRecord>,
}

/// Predicate over a question's category and difficulty.
///
/// `None` fields match everything. Category comparison is case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

impl QuestionFilter {
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            difficulty: None,
        }
    }

    pub fn difficulty(difficulty: Difficulty) -> Self {
        Self {
            category: None,
            difficulty: Some(difficulty),
        }
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn matches(&self, question: &Question) -> bool {
        let category_ok = self
            .category
            .as_ref()
            .map_or(true, |c| c.eq_ignore_ascii_case(&question.category));
        let difficulty_ok = self.difficulty.map_or(true, |d| d == question.difficulty);
        category_ok && difficulty_ok
    }
}

impl fmt::Display for QuestionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.category, self.difficulty) {
            (Some(c), Some(d)) => write!(f, "category `{c}`, difficulty {d}"),
            (Some(c), None) => write!(f, "category `{c}`"),
            (None, Some(d)) => write!(f, "difficulty {d}"),
            (None, None) => write!(f, "any question"),
        }
    }
}

impl QuestionBank {
    /// Normalize loosely-typed records into a bank.
    ///
    /// Malformed records are skipped, logged, and returned in
    /// [`Normalized::rejected`]; an invalid correct answer is never accepted.
    pub fn normalize(records: &[Value]) -> Normalized {
        let mut ids = IdAllocator::default();
        let mut questions = Vec::with_capacity(records.len());
        let mut rejected = Vec::new();

        for (position, record) in records.iter().enumerate() {
            match parse_record(record) {
                Ok(draft) => {
                    let id = ids.allocate(draft.id, &draft.text, &draft.options);
                    questions.push(Question {
                        id,
                        text: draft.text,
                        options: draft.options,
                        correct_index: draft.correct_index,
                        explanation: draft.explanation,
                        category: draft.category,
                        difficulty: draft.difficulty,
                        needs_code_runner: draft.needs_code_runner,
                    });
                }
                Err(reason) => {
                    let id = raw_id(record);
                    tracing::warn!(position, id = ?id, "skipping question record: {reason}");
                    rejected.push(RejectedRecord {
                        position,
                        id,
                        reason,
                    });
                }
            }
        }

        tracing::debug!(
            accepted = questions.len(),
            rejected = rejected.len(),
            "normalized question records"
        );

        Normalized {
            bank: QuestionBank { questions },
            rejected,
        }
    }

    /// Build a bank from already-typed questions, checking invariants.
    ///
    /// Duplicate ids are re-keyed the same way normalization does.
    pub fn from_questions(questions: Vec<Question>) -> Result<Self, QuizError> {
        let mut ids = IdAllocator::default();
        let mut checked = Vec::with_capacity(questions.len());
        for (position, mut q) in questions.into_iter().enumerate() {
            q.check()
                .map_err(|reason| QuizError::Validation { position, reason })?;
            q.id = ids.allocate(Some(q.id), &q.text, &q.options);
            checked.push(q);
        }
        Ok(Self { questions: checked })
    }

    /// Concatenate banks in input order. Nothing is dropped; ids that collide
    /// with an earlier bank get a numeric suffix.
    pub fn merge(banks: impl IntoIterator<Item = QuestionBank>) -> QuestionBank {
        let mut ids = IdAllocator::default();
        let mut questions = Vec::new();
        for bank in banks {
            for mut q in bank.questions {
                let original = q.id.clone();
                q.id = ids.allocate(Some(original.clone()), &q.text, &q.options);
                if q.id != original {
                    tracing::warn!(%original, rekeyed = %q.id, "duplicate question id across banks");
                }
                questions.push(q);
            }
        }
        QuestionBank { questions }
    }

    /// Questions matching `filter`, in their original order.
    pub fn filter(&self, filter: &QuestionFilter) -> Result<QuestionBank, QuizError> {
        let questions: Vec<Question> = self
            .questions
            .iter()
            .filter(|q| filter.matches(q))
            .cloned()
            .collect();
        if questions.is_empty() {
            return Err(QuizError::EmptyResult(format!("nothing matches {filter}")));
        }
        Ok(QuestionBank { questions })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Question> {
        self.questions.iter()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Position of the question with the given id.
    pub fn position(&self, id: &QuestionId) -> Option<usize> {
        self.questions.iter().position(|q| &q.id == id)
    }

    /// Distinct categories, sorted.
    pub fn categories(&self) -> Vec<String> {
        self.questions
            .iter()
            .map(|q| q.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl<'a> IntoIterator for &'a QuestionBank {
    type Item = &'a Question;
    type IntoIter = std::slice::Iter<'a, Question>;

    fn into_iter(self) -> Self::IntoIter {
        self.questions.iter()
    }
}

/// Hands out ids that are unique within one bank.
///
/// Records without an id get a name derived from their content, so the same
/// raw data always yields the same ids. Taken ids get the first free
/// `-2`, `-3`, ... suffix.
#[derive(Default)]
struct IdAllocator {
    taken: HashSet<QuestionId>,
}

impl IdAllocator {
    fn allocate(&mut self, preferred: Option<QuestionId>, text: &str, options: &[String]) -> QuestionId {
        let base = preferred.unwrap_or_else(|| content_id(text, options));
        let mut candidate = base.clone();
        let mut n = 2u32;
        while self.taken.contains(&candidate) {
            candidate = QuestionId::new(format!("{base}-{n}"));
            n += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}

fn content_id(text: &str, options: &[String]) -> QuestionId {
    let mut material = String::from(text);
    for option in options {
        material.push('\u{1f}');
        material.push_str(option);
    }
    let uuid = Uuid::new_v5(&Uuid::NAMESPACE_OID, material.as_bytes());
    QuestionId::new(format!("q-{}", &uuid.simple().to_string()[..12]))
}

/// A record that passed validation but has not been assigned an id yet.
struct Draft {
    id: Option<QuestionId>,
    text: String,
    options: Vec<String>,
    correct_index: usize,
    explanation: String,
    category: String,
    difficulty: Difficulty,
    needs_code_runner: bool,
}

fn parse_record(record: &Value) -> Result<Draft, ValidationError> {
    let obj = record.as_object().ok_or(ValidationError::NotAnObject)?;

    let text = match first_present(obj, &["question", "text"]) {
        None => return Err(ValidationError::MissingText),
        Some(Value::String(s)) if s.trim().is_empty() => return Err(ValidationError::MissingText),
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(ValidationError::InvalidField { field: "question" }),
    };

    let options = parse_options(obj.get("options"))?;

    let correct = first_present(obj, &["correct", "correctAnswer"])
        .ok_or(ValidationError::MissingCorrectAnswer)?;
    let correct_index = parse_correct_index(correct, options.len())?;

    let explanation = optional_string(obj, "explanation")?
        .unwrap_or_else(|| DEFAULT_EXPLANATION.to_string());
    let category =
        optional_string(obj, "category")?.unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    let difficulty = match optional_string(obj, "difficulty")? {
        None => Difficulty::default(),
        Some(raw) => raw.parse().unwrap_or_else(|e: String| {
            tracing::warn!("{e}, using {}", Difficulty::default());
            Difficulty::default()
        }),
    };

    let needs_code_runner = match first_present(obj, &["needCodeRunner", "needsCodeRunner"]) {
        None => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            return Err(ValidationError::InvalidField {
                field: "needCodeRunner",
            })
        }
    };

    let id = match obj.get("id") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(QuestionId::new(s.trim())),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Some(QuestionId::new(n.to_string())),
        Some(_) => return Err(ValidationError::InvalidField { field: "id" }),
    };

    Ok(Draft {
        id,
        text,
        options,
        correct_index,
        explanation,
        category,
        difficulty,
        needs_code_runner,
    })
}

/// First of `keys` that is present and not `null`.
fn first_present<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

fn optional_string(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::InvalidField { field }),
    }
}

fn parse_options(value: Option<&Value>) -> Result<Vec<String>, ValidationError> {
    let items = match value {
        None | Some(Value::Null) => return Err(ValidationError::TooFewOptions { found: 0 }),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ValidationError::InvalidField { field: "options" }),
    };

    let options = items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            _ => Err(ValidationError::InvalidField { field: "options" }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if options.len() < 2 {
        return Err(ValidationError::TooFewOptions {
            found: options.len(),
        });
    }
    Ok(options)
}

fn parse_correct_index(value: &Value, option_count: usize) -> Result<usize, ValidationError> {
    let index = match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| ValidationError::InvalidCorrectAnswer(n.to_string()))?,
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidCorrectAnswer(s.clone()))?,
        other => return Err(ValidationError::InvalidCorrectAnswer(other.to_string())),
    };

    if index < 0 || index as usize >= option_count {
        return Err(ValidationError::CorrectAnswerOutOfRange {
            index,
            options: option_count,
        });
    }
    Ok(index as usize)
}

fn raw_id(record: &Value) -> Option<QuestionId> {
    match record.get("id")? {
        Value::String(s) if !s.trim().is_empty() => Some(QuestionId::new(s.trim())),
        Value::Number(n) => Some(QuestionId::new(n.to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_records() -> Vec<Value> {
        vec![
            json!({"id": 1, "question": "len([1, 2])?", "options": ["1", "2"], "correct": 1,
                   "category": "lists", "difficulty": "easy"}),
            json!({"id": 2, "text": "type(1.0)?", "options": ["int", "float", "str"],
                   "correctAnswer": 1, "category": "types", "difficulty": "hard"}),
            json!({"id": 3, "question": "bool([])?", "options": ["True", "False"], "correct": "1",
                   "category": "lists"}),
        ]
    }

    #[test]
    fn normalize_fills_defaults() {
        let records = vec![json!({"question": "Q?", "options": ["a", "b"], "correct": 0})];
        let out = QuestionBank::normalize(&records);
        assert!(out.rejected.is_empty());
        let q = out.bank.get(0).unwrap();
        assert_eq!(q.explanation, DEFAULT_EXPLANATION);
        assert_eq!(q.category, DEFAULT_CATEGORY);
        assert_eq!(q.difficulty, Difficulty::Medium);
        assert!(!q.needs_code_runner);
        assert!(q.id.as_str().starts_with("q-"));
    }

    #[test]
    fn normalize_prefers_correct_over_correct_answer() {
        let records = vec![json!({
            "question": "Q?", "options": ["a", "b", "c"], "correct": 2, "correctAnswer": 0
        })];
        let out = QuestionBank::normalize(&records);
        assert_eq!(out.bank.get(0).unwrap().correct_index, 2);
    }

    #[test]
    fn normalize_falls_through_null_correct() {
        let records = vec![json!({
            "question": "Q?", "options": ["a", "b"], "correct": null, "correctAnswer": 1
        })];
        let out = QuestionBank::normalize(&records);
        assert_eq!(out.bank.get(0).unwrap().correct_index, 1);
    }

    #[test]
    fn normalize_skips_malformed_records() {
        let records = vec![
            json!({"id": "ok", "question": "Q?", "options": ["a", "b"], "correct": 0}),
            json!({"id": "no-options", "question": "Q?", "correct": 0}),
            json!({"id": "one-option", "question": "Q?", "options": ["a"], "correct": 0}),
            json!({"id": "out-of-range", "question": "Q?", "options": ["a", "b"], "correct": 2}),
            json!({"id": "negative", "question": "Q?", "options": ["a", "b"], "correct": -1}),
            json!({"id": "no-answer", "question": "Q?", "options": ["a", "b"]}),
            json!({"id": "word", "question": "Q?", "options": ["a", "b"], "correct": "b"}),
            json!({"id": "no-text", "options": ["a", "b"], "correct": 0}),
            json!("not an object"),
        ];
        let out = QuestionBank::normalize(&records);
        assert_eq!(out.bank.len(), 1);
        assert_eq!(out.rejected.len(), 8);

        let reason_for = |id: &str| {
            out.rejected
                .iter()
                .find(|r| r.id.as_ref().map(|i| i.as_str()) == Some(id))
                .map(|r| r.reason.clone())
                .unwrap()
        };
        assert_eq!(reason_for("no-options"), ValidationError::TooFewOptions { found: 0 });
        assert_eq!(
            reason_for("out-of-range"),
            ValidationError::CorrectAnswerOutOfRange { index: 2, options: 2 }
        );
        assert_eq!(reason_for("no-answer"), ValidationError::MissingCorrectAnswer);
        assert_eq!(reason_for("no-text"), ValidationError::MissingText);
        assert_eq!(out.rejected.last().unwrap().reason, ValidationError::NotAnObject);
        assert_eq!(out.rejected.last().unwrap().position, 8);
    }

    #[test]
    fn synthesized_ids_are_deterministic() {
        let records = vec![
            json!({"question": "Q1?", "options": ["a", "b"], "correct": 0}),
            json!({"question": "Q2?", "options": ["a", "b"], "correct": 1}),
        ];
        let first = QuestionBank::normalize(&records).bank;
        let second = QuestionBank::normalize(&records).bank;
        let ids = |b: &QuestionBank| b.iter().map(|q| q.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
        assert_ne!(first.get(0).unwrap().id, first.get(1).unwrap().id);
    }

    #[test]
    fn colliding_ids_are_never_reused() {
        let records = vec![
            json!({"id": 5, "question": "A?", "options": ["a", "b"], "correct": 0}),
            json!({"id": "5", "question": "B?", "options": ["a", "b"], "correct": 0}),
            json!({"id": 5, "question": "C?", "options": ["a", "b"], "correct": 0}),
            json!({"question": "D?", "options": ["a", "b"], "correct": 0}),
            json!({"question": "D?", "options": ["a", "b"], "correct": 0}),
        ];
        let bank = QuestionBank::normalize(&records).bank;
        let ids: Vec<&str> = bank.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(&ids[..3], &["5", "5-2", "5-3"]);
        assert_eq!(ids[4], format!("{}-2", ids[3]));
        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn unknown_difficulty_falls_back_to_medium() {
        let records = vec![json!({
            "question": "Q?", "options": ["a", "b"], "correct": 0, "difficulty": "brutal"
        })];
        let bank = QuestionBank::normalize(&records).bank;
        assert_eq!(bank.get(0).unwrap().difficulty, Difficulty::Medium);
    }

    #[test]
    fn merge_concatenates_in_order() {
        let a = QuestionBank::normalize(&sample_records()[..2]).bank;
        let b = QuestionBank::normalize(&sample_records()[2..]).bank;
        let merged = QuestionBank::merge([a, b]);
        let ids: Vec<&str> = merged.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn merge_keeps_colliding_questions() {
        let a = QuestionBank::normalize(&sample_records()).bank;
        let merged = QuestionBank::merge([a.clone(), a]);
        assert_eq!(merged.len(), 6);
        assert_eq!(merged.get(3).unwrap().id.as_str(), "1-2");
    }

    #[test]
    fn filter_preserves_order() {
        let bank = QuestionBank::normalize(&sample_records()).bank;
        let lists = bank.filter(&QuestionFilter::category("LISTS")).unwrap();
        let ids: Vec<&str> = lists.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);

        let easy_lists = bank
            .filter(&QuestionFilter::category("lists").with_difficulty(Difficulty::Easy))
            .unwrap();
        assert_eq!(easy_lists.len(), 1);
    }

    #[test]
    fn filter_with_no_match_is_empty_result() {
        let bank = QuestionBank::normalize(&sample_records()).bank;
        let err = bank
            .filter(&QuestionFilter::category("networking"))
            .unwrap_err();
        assert!(matches!(err, QuizError::EmptyResult(_)));
        assert_eq!(
            err.to_string(),
            "no questions to show: nothing matches category `networking`"
        );
        assert_eq!(bank.len(), 3);
    }

    #[test]
    fn categories_are_sorted_and_distinct() {
        let bank = QuestionBank::normalize(&sample_records()).bank;
        assert_eq!(bank.categories(), vec!["lists", "types"]);
    }

    #[test]
    fn from_questions_rejects_bad_correct_index() {
        let mut q = QuestionBank::normalize(&sample_records()).bank.get(0).unwrap().clone();
        q.correct_index = 9;
        let err = QuestionBank::from_questions(vec![q]).unwrap_err();
        assert!(matches!(err, QuizError::Validation { position: 0, .. }));
    }
}
