//! Per-session answer sheet and scoring.

use serde::{Deserialize, Serialize};

use crate::bank::QuestionBank;
use crate::error::QuizError;

/// Selected option per question of the active bank.
///
/// Slots are dense and 0-based; `None` means unanswered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSheet {
    slots: Vec<Option<usize>>,
}

/// Number of correct answers out of the bank size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
}

impl Score {
    /// Fraction of correct answers, 0.0 for an empty bank.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.correct, self.total)
    }
}

impl AnswerSheet {
    /// A sheet with `size` unanswered slots.
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![None; size],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Record `option` for question `index`, replacing any earlier choice.
    pub fn set(&mut self, index: usize, option: usize) -> Result<(), QuizError> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(QuizError::IndexOutOfBounds {
                what: "question",
                index,
                len,
            })?;
        *slot = Some(option);
        Ok(())
    }

    /// Selected option for question `index`, `None` if unanswered or out of range.
    pub fn get(&self, index: usize) -> Option<usize> {
        self.slots.get(index).copied().flatten()
    }

    /// Lowest unanswered index.
    pub fn first_unanswered(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    pub fn answered_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.first_unanswered().is_none()
    }

    pub fn slots(&self) -> &[Option<usize>] {
        &self.slots
    }

    /// Count slots whose selection equals the question's correct index.
    pub fn score(&self, bank: &QuestionBank) -> Score {
        let correct = self
            .slots
            .iter()
            .zip(bank.iter())
            .filter(|(slot, q)| slot.is_some_and(|opt| q.is_correct(opt)))
            .count();
        Score {
            correct,
            total: bank.len(),
        }
    }
}
