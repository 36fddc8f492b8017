//! Error types for the quiz core and the code-execution boundary.
//!
//! These are defined in `quizrun-core` so that every crate (and the CLI) can
//! classify failures by variant instead of matching on message strings.

use thiserror::Error;

use crate::session::ProgressionMode;

/// Why a raw question record was rejected during normalization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The record is not a JSON object.
    #[error("record is not an object")]
    NotAnObject,

    /// The record has no question text.
    #[error("missing question text")]
    MissingText,

    /// The record has fewer than two options.
    #[error("expected at least 2 options, found {found}")]
    TooFewOptions { found: usize },

    /// Neither `correct` nor `correctAnswer` is present.
    #[error("missing correct answer")]
    MissingCorrectAnswer,

    /// The correct answer is not an integer index.
    #[error("correct answer is not an option index: {0}")]
    InvalidCorrectAnswer(String),

    /// The correct answer does not index into `options`.
    #[error("correct answer {index} is out of range for {options} options")]
    CorrectAnswerOutOfRange { index: i64, options: usize },

    /// A field has the wrong JSON type.
    #[error("field `{field}` has an invalid type")]
    InvalidField { field: &'static str },
}

/// Errors raised by the wrong-answer store and its key-value backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key-value backend failed to read or write.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// The persisted blob could not be decoded.
    #[error("stored wrong-answer set is corrupt: {0}")]
    Corrupt(String),

    /// The wrong-answer set could not be encoded.
    #[error("failed to encode wrong-answer set: {0}")]
    Serialize(String),
}

/// Errors raised by question-bank and quiz-session operations.
#[derive(Debug, Error)]
pub enum QuizError {
    /// A record failed validation.
    #[error("invalid question record at position {position}: {reason}")]
    Validation {
        position: usize,
        reason: ValidationError,
    },

    /// A filter or the wrong-answer review produced no questions.
    #[error("no questions to show: {0}")]
    EmptyResult(String),

    /// A question or option index is outside the active bank.
    #[error("{what} index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// Submission attempted while at least one question is unanswered.
    #[error("question {} is unanswered", .first_unanswered + 1)]
    IncompleteAnswers { first_unanswered: usize },

    /// The session has already been submitted.
    #[error("quiz already submitted; reset to retake it")]
    Resubmission,

    /// A sequential-mode question was already evaluated.
    #[error("question {} is already answered", .index + 1)]
    SlotLocked { index: usize },

    /// A sequential-mode answer was given for a question other than the current one.
    #[error("expected an answer for question {}, got question {}", .expected + 1, .got + 1)]
    OutOfSequence { expected: usize, got: usize },

    /// The operation is not available in the session's progression mode.
    #[error("`{operation}` is not available in {mode} mode")]
    UnsupportedInMode {
        operation: &'static str,
        mode: ProgressionMode,
    },

    /// The wrong-answer store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QuizError {
    /// Returns `true` if the caller should surface this as a user-facing
    /// message and carry on. Index errors indicate a broken integration.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, QuizError::IndexOutOfBounds { .. })
    }
}

/// Errors raised by the code-execution adapter and interpreter collaborators.
///
/// None of these are fatal to a quiz: the caller disables code execution or
/// shows the message and keeps the session running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// The snippet did not finish within the timeout.
    #[error("execution timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The interpreter raised an error while running the snippet.
    #[error("script error: {message}")]
    Script { message: String },

    /// The interpreter could not be initialized.
    #[error("code execution unavailable after {attempts} attempt(s): {reason}")]
    EnvironmentUnavailable { attempts: u32, reason: String },

    /// The interpreter failed to render a plot.
    #[error("plot generation failed: {0}")]
    PlotGeneration(String),

    /// Series were requested before any run produced a trace.
    #[error("no execution trace available")]
    MissingTrace,

    /// The request itself was invalid (e.g. a zero timeout).
    #[error("invalid execution request: {0}")]
    InvalidRequest(String),

    /// The interpreter failed for a reason unrelated to the snippet.
    #[error("interpreter error: {0}")]
    Interpreter(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_answers_message_is_one_based() {
        let err = QuizError::IncompleteAnswers {
            first_unanswered: 2,
        };
        assert_eq!(err.to_string(), "question 3 is unanswered");
    }

    #[test]
    fn index_errors_are_not_recoverable() {
        let err = QuizError::IndexOutOfBounds {
            what: "question",
            index: 5,
            len: 2,
        };
        assert!(!err.is_recoverable());
        assert!(QuizError::Resubmission.is_recoverable());
        assert!(QuizError::EmptyResult("category `x`".into()).is_recoverable());
    }

    #[test]
    fn empty_result_message() {
        assert_eq!(
            QuizError::EmptyResult("no wrong answers recorded".into()).to_string(),
            "no questions to show: no wrong answers recorded"
        );
    }

    #[test]
    fn store_errors_convert() {
        let err: QuizError = StoreError::Corrupt("bad json".into()).into();
        assert!(err.to_string().contains("corrupt"));
    }
}
