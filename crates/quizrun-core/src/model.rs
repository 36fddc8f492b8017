//! Core data model types for quizrun.
//!
//! These are the canonical shapes every other component works with. Raw,
//! loosely-typed records are turned into [`Question`]s by
//! [`QuestionBank::normalize`](crate::bank::QuestionBank::normalize).

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Explanation used when a record does not provide one.
pub const DEFAULT_EXPLANATION: &str = "No explanation provided.";

/// Category used when a record does not provide one.
pub const DEFAULT_CATEGORY: &str = "uncategorized";

/// Stable identifier of a question, unique within a bank.
///
/// Raw ids may be strings or integers; both normalize to the string form, so
/// `7` and `"7"` name the same question.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QuestionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for QuestionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for QuestionId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for QuestionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => QuestionId(s),
            RawId::Unsigned(n) => QuestionId(n.to_string()),
            RawId::Signed(n) => QuestionId(n.to_string()),
        })
    }
}

/// How hard a question is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" | "normal" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// A single multiple-choice question in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier within the bank.
    pub id: QuestionId,
    /// The question prompt.
    pub text: String,
    /// Answer options, in display order. Always at least two.
    pub options: Vec<String>,
    /// Index of the correct option.
    pub correct_index: usize,
    /// Shown after the question is evaluated.
    #[serde(default = "default_explanation")]
    pub explanation: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Whether the question comes with a runnable code snippet.
    #[serde(default)]
    pub needs_code_runner: bool,
}

impl Question {
    /// Whether `option` is the correct answer.
    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_index
    }

    /// Text of the correct option.
    pub fn correct_option(&self) -> &str {
        self.options
            .get(self.correct_index)
            .map_or("", String::as_str)
    }

    /// Check the invariants normalization guarantees, for questions that
    /// arrive already typed (from storage or another bank).
    pub fn check(&self) -> Result<(), ValidationError> {
        if self.options.len() < 2 {
            return Err(ValidationError::TooFewOptions {
                found: self.options.len(),
            });
        }
        if self.correct_index >= self.options.len() {
            return Err(ValidationError::CorrectAnswerOutOfRange {
                index: self.correct_index as i64,
                options: self.options.len(),
            });
        }
        Ok(())
    }
}

fn default_explanation() -> String {
    DEFAULT_EXPLANATION.to_string()
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}
