//! quizrun-core — Question bank, answer sheet, quiz session, and wrong-answer store.
//!
//! This crate defines the data model, the quiz session state machine, and
//! the collaborator traits (bank sources, key-value storage, interpreters)
//! that the rest of quizrun builds on.

pub mod answers;
pub mod bank;
pub mod error;
pub mod model;
pub mod parser;
pub mod session;
pub mod store;
pub mod trace;
pub mod traits;

pub use answers::{AnswerSheet, Score};
pub use bank::{QuestionBank, QuestionFilter};
pub use error::{ExecutionError, QuizError, StoreError, ValidationError};
pub use model::{Difficulty, Question, QuestionId};
pub use session::{ProgressionMode, QuizSession, Selection};
pub use store::WrongAnswerStore;
