//! The quiz session state machine.
//!
//! A [`QuizSession`] owns the active bank, the answer sheet, scoring state,
//! the elapsed-time clock, and the wrong-answer store. Every operation is
//! synchronous and either applies completely or leaves the session as it was.
//!
//! ```text
//! Ready -> Answering -> Submitted
//!   ^                      |
//!   +-- reset / filter / wrong-only / full bank
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::answers::{AnswerSheet, Score};
use crate::bank::{QuestionBank, QuestionFilter};
use crate::error::QuizError;
use crate::model::{Question, QuestionId};
use crate::store::WrongAnswerStore;

/// How questions are presented and evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressionMode {
    /// All questions visible, one submit evaluates everything.
    #[default]
    Batch,
    /// One question at a time, each answer evaluated immediately.
    Sequential,
}

impl fmt::Display for ProgressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressionMode::Batch => write!(f, "batch"),
            ProgressionMode::Sequential => write!(f, "sequential"),
        }
    }
}

impl FromStr for ProgressionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "batch" | "all" => Ok(ProgressionMode::Batch),
            "sequential" | "one" | "step" => Ok(ProgressionMode::Sequential),
            other => Err(format!("unknown progression mode: {other}")),
        }
    }
}

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Fresh sheet, nothing answered yet.
    Ready,
    /// At least one answer recorded.
    Answering,
    /// Scored; the sheet is frozen until the next reset.
    Submitted,
}

/// Which subset of the full bank is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BankView {
    Full,
    Filtered { filter: QuestionFilter },
    WrongOnly,
}

/// Outcome of [`QuizSession::select_option`].
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Batch mode: the choice was recorded and can still be changed.
    Recorded,
    /// Sequential mode: the choice was evaluated and locked.
    Evaluated(Feedback),
}

/// Immediate feedback for a sequential-mode answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feedback {
    pub index: usize,
    pub selected: usize,
    pub correct_index: usize,
    pub is_correct: bool,
    pub explanation: String,
    /// Next question to answer, `None` after the last one.
    pub next: Option<usize>,
    /// Present when this answer completed the session.
    pub submission: Option<Submission>,
}

/// Result of finishing a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    pub score: Score,
    /// Ids answered incorrectly, in bank order.
    pub wrong: Vec<QuestionId>,
    pub elapsed_ms: u64,
    /// Set when the wrong answers could not be persisted. The submission
    /// itself still stands.
    pub persist_error: Option<String>,
}

/// Per-question result shown after submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionOutcome {
    pub index: usize,
    pub id: QuestionId,
    pub selected: Option<usize>,
    pub correct_index: usize,
    pub correct_option: String,
    pub is_correct: bool,
    pub explanation: String,
}

/// Read-only, serializable view of a session for renderers.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub mode: ProgressionMode,
    pub view: BankView,
    pub phase: SessionPhase,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub question_count: usize,
    pub answers: Vec<Option<usize>>,
    pub verdicts: Vec<Option<bool>>,
    /// Current question in sequential mode.
    pub cursor: Option<usize>,
    pub score: Option<Score>,
}

#[derive(Debug, Clone, Copy)]
struct Clock {
    started: Instant,
    stopped: Option<Instant>,
}

impl Clock {
    fn start() -> Self {
        Self {
            started: Instant::now(),
            stopped: None,
        }
    }

    fn stop(&mut self) {
        self.stopped.get_or_insert_with(Instant::now);
    }

    fn elapsed(&self) -> Duration {
        self.stopped
            .unwrap_or_else(Instant::now)
            .saturating_duration_since(self.started)
    }
}

/// One quiz run over a question bank.
pub struct QuizSession {
    id: Uuid,
    mode: ProgressionMode,
    full: QuestionBank,
    active: QuestionBank,
    view: BankView,
    sheet: AnswerSheet,
    verdicts: Vec<Option<bool>>,
    cursor: usize,
    phase: SessionPhase,
    score: Option<Score>,
    clock: Clock,
    started_at: DateTime<Utc>,
    wrong_answers: WrongAnswerStore,
}

impl QuizSession {
    /// Start a session over `bank`. The mode is fixed for the session's lifetime.
    pub fn new(
        bank: QuestionBank,
        mode: ProgressionMode,
        wrong_answers: WrongAnswerStore,
    ) -> Result<Self, QuizError> {
        if bank.is_empty() {
            return Err(QuizError::EmptyResult("the question bank is empty".into()));
        }
        let len = bank.len();
        let session = Self {
            id: Uuid::new_v4(),
            mode,
            active: bank.clone(),
            full: bank,
            view: BankView::Full,
            sheet: AnswerSheet::new(len),
            verdicts: vec![None; len],
            cursor: 0,
            phase: SessionPhase::Ready,
            score: None,
            clock: Clock::start(),
            started_at: Utc::now(),
            wrong_answers,
        };
        tracing::debug!(session = %session.id, %mode, questions = len, "quiz session started");
        Ok(session)
    }

    /// Record `option` for question `index`.
    ///
    /// In sequential mode only the current question can be answered; the
    /// answer is evaluated and locked, and the last answer finishes the
    /// session.
    pub fn select_option(&mut self, index: usize, option: usize) -> Result<Selection, QuizError> {
        if self.phase == SessionPhase::Submitted {
            return Err(QuizError::Resubmission);
        }
        let question = self
            .active
            .get(index)
            .ok_or(QuizError::IndexOutOfBounds {
                what: "question",
                index,
                len: self.active.len(),
            })?;
        if option >= question.options.len() {
            return Err(QuizError::IndexOutOfBounds {
                what: "option",
                index: option,
                len: question.options.len(),
            });
        }

        if self.mode == ProgressionMode::Sequential {
            if self.verdicts[index].is_some() {
                return Err(QuizError::SlotLocked { index });
            }
            if index != self.cursor {
                return Err(QuizError::OutOfSequence {
                    expected: self.cursor,
                    got: index,
                });
            }
        }

        let is_correct = question.is_correct(option);
        let correct_index = question.correct_index;
        let explanation = question.explanation.clone();

        self.sheet.set(index, option)?;
        self.phase = SessionPhase::Answering;

        if self.mode == ProgressionMode::Batch {
            return Ok(Selection::Recorded);
        }

        self.verdicts[index] = Some(is_correct);
        self.cursor += 1;
        let next = (self.cursor < self.active.len()).then_some(self.cursor);
        let submission = if next.is_none() {
            Some(self.finish())
        } else {
            None
        };

        Ok(Selection::Evaluated(Feedback {
            index,
            selected: option,
            correct_index,
            is_correct,
            explanation,
            next,
            submission,
        }))
    }

    /// Score a batch-mode session.
    pub fn submit(&mut self) -> Result<Submission, QuizError> {
        if self.mode != ProgressionMode::Batch {
            return Err(QuizError::UnsupportedInMode {
                operation: "submit",
                mode: self.mode,
            });
        }
        if self.phase == SessionPhase::Submitted {
            return Err(QuizError::Resubmission);
        }
        if let Some(first_unanswered) = self.sheet.first_unanswered() {
            return Err(QuizError::IncompleteAnswers { first_unanswered });
        }
        Ok(self.finish())
    }

    /// Fresh answer sheet over the same active bank; restarts the clock.
    /// The wrong-answer store is left alone.
    pub fn reset(&mut self) {
        let len = self.active.len();
        self.sheet = AnswerSheet::new(len);
        self.verdicts = vec![None; len];
        self.cursor = 0;
        self.phase = SessionPhase::Ready;
        self.score = None;
        self.clock = Clock::start();
        self.started_at = Utc::now();
        tracing::debug!(session = %self.id, questions = len, "quiz session reset");
    }

    /// Restrict the session to questions of the full bank matching `filter`.
    pub fn apply_filter(&mut self, filter: QuestionFilter) -> Result<(), QuizError> {
        let bank = self.full.filter(&filter)?;
        self.replace_active(bank, BankView::Filtered { filter });
        Ok(())
    }

    /// Review only questions recorded in the wrong-answer store.
    ///
    /// Fails with [`QuizError::EmptyResult`] when nothing has been missed yet.
    pub fn show_wrong_only(&mut self) -> Result<(), QuizError> {
        let wrong = self.wrong_answers.load()?;
        if wrong.is_empty() {
            return Err(QuizError::EmptyResult("no wrong answers recorded".into()));
        }
        let bank = QuestionBank::from_questions(wrong)?;
        self.replace_active(bank, BankView::WrongOnly);
        Ok(())
    }

    /// Return to the full bank the session was created with.
    pub fn back_to_full_bank(&mut self) {
        self.replace_active(self.full.clone(), BankView::Full);
    }

    fn replace_active(&mut self, bank: QuestionBank, view: BankView) {
        tracing::debug!(session = %self.id, ?view, questions = bank.len(), "switching active bank");
        self.active = bank;
        self.view = view;
        self.reset();
    }

    /// Score the sheet, freeze the session, and persist missed questions.
    fn finish(&mut self) -> Submission {
        let score = self.sheet.score(&self.active);
        self.score = Some(score);
        self.phase = SessionPhase::Submitted;
        self.clock.stop();

        let mut wrong_questions: Vec<Question> = Vec::new();
        let mut graduated: Vec<QuestionId> = Vec::new();
        for (index, q) in self.active.iter().enumerate() {
            if self.sheet.get(index).is_some_and(|opt| q.is_correct(opt)) {
                graduated.push(q.id.clone());
            } else {
                wrong_questions.push(q.clone());
            }
        }

        let mut persist_error = self.wrong_answers.record(&wrong_questions).err();

        // Questions answered correctly during a review leave the store.
        if persist_error.is_none() && self.view == BankView::WrongOnly && !graduated.is_empty() {
            persist_error = self.wrong_answers.forget(&graduated).err();
        }

        if let Some(e) = &persist_error {
            tracing::warn!(session = %self.id, "failed to persist wrong answers: {e}");
        }

        let elapsed_ms = self.clock.elapsed().as_millis() as u64;
        tracing::debug!(session = %self.id, %score, elapsed_ms, "quiz session submitted");

        Submission {
            score,
            wrong: wrong_questions.into_iter().map(|q| q.id).collect(),
            elapsed_ms,
            persist_error: persist_error.map(|e| e.to_string()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> ProgressionMode {
        self.mode
    }

    pub fn view(&self) -> &BankView {
        &self.view
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_submitted(&self) -> bool {
        self.phase == SessionPhase::Submitted
    }

    /// The active bank.
    pub fn bank(&self) -> &QuestionBank {
        &self.active
    }

    /// The bank the session was created with.
    pub fn full_bank(&self) -> &QuestionBank {
        &self.full
    }

    pub fn answers(&self) -> &AnswerSheet {
        &self.sheet
    }

    pub fn score(&self) -> Option<Score> {
        self.score
    }

    /// Lowest unanswered question, the one that needs attention.
    pub fn first_unanswered(&self) -> Option<usize> {
        self.sheet.first_unanswered()
    }

    /// Current question in sequential mode, `None` once finished or in batch mode.
    pub fn cursor(&self) -> Option<usize> {
        (self.mode == ProgressionMode::Sequential && self.cursor < self.active.len())
            .then_some(self.cursor)
    }

    /// Whether question `index` was answered correctly, once evaluated.
    pub fn verdict(&self, index: usize) -> Option<bool> {
        if self.phase == SessionPhase::Submitted {
            let q = self.active.get(index)?;
            return Some(self.sheet.get(index).is_some_and(|opt| q.is_correct(opt)));
        }
        self.verdicts.get(index).copied().flatten()
    }

    /// Time since the session started or was last reset, frozen at submission.
    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    pub fn wrong_answers(&self) -> &WrongAnswerStore {
        &self.wrong_answers
    }

    /// Per-question outcomes, available once submitted.
    pub fn results(&self) -> Option<Vec<QuestionOutcome>> {
        if self.phase != SessionPhase::Submitted {
            return None;
        }
        Some(
            self.active
                .iter()
                .enumerate()
                .map(|(index, q)| {
                    let selected = self.sheet.get(index);
                    QuestionOutcome {
                        index,
                        id: q.id.clone(),
                        selected,
                        correct_index: q.correct_index,
                        correct_option: q.correct_option().to_string(),
                        is_correct: selected.is_some_and(|opt| q.is_correct(opt)),
                        explanation: q.explanation.clone(),
                    }
                })
                .collect(),
        )
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            mode: self.mode,
            view: self.view.clone(),
            phase: self.phase,
            started_at: self.started_at,
            elapsed_ms: self.elapsed().as_millis() as u64,
            question_count: self.active.len(),
            answers: self.sheet.slots().to_vec(),
            verdicts: (0..self.active.len()).map(|i| self.verdict(i)).collect(),
            cursor: self.cursor(),
            score: self.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::model::Difficulty;
    use crate::traits::KeyValueStore;
    use serde_json::json;

    fn bank() -> QuestionBank {
        QuestionBank::normalize(&[
            json!({"id": 1, "question": "q1", "options": ["a", "b"], "correct": 0,
                   "category": "lists", "difficulty": "easy"}),
            json!({"id": 2, "question": "q2", "options": ["x", "y"], "correct": 1,
                   "category": "types"}),
            json!({"id": 3, "question": "q3", "options": ["m", "n", "o"], "correct": 2,
                   "category": "lists", "difficulty": "hard"}),
        ])
        .bank
    }

    fn session(mode: ProgressionMode) -> QuizSession {
        QuizSession::new(bank(), mode, WrongAnswerStore::in_memory()).unwrap()
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Backend("disk on fire".into()))
        }
        fn set(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Err(StoreError::Backend("disk on fire".into()))
        }
        fn remove(&self, _: &str) -> Result<(), StoreError> {
            Err(StoreError::Backend("disk on fire".into()))
        }
    }

    #[test]
    fn mode_parse() {
        assert_eq!("Sequential".parse::<ProgressionMode>().unwrap(), ProgressionMode::Sequential);
        assert_eq!("batch".parse::<ProgressionMode>().unwrap(), ProgressionMode::Batch);
        assert!("random".parse::<ProgressionMode>().is_err());
    }

    #[test]
    fn empty_bank_is_rejected() {
        let err = QuizSession::new(
            QuestionBank::default(),
            ProgressionMode::Batch,
            WrongAnswerStore::in_memory(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, QuizError::EmptyResult(_)));
    }

    #[test]
    fn batch_selection_moves_to_answering() {
        let mut s = session(ProgressionMode::Batch);
        assert_eq!(s.phase(), SessionPhase::Ready);
        assert_eq!(s.first_unanswered(), Some(0));
        assert_eq!(s.select_option(1, 0).unwrap(), Selection::Recorded);
        assert_eq!(s.phase(), SessionPhase::Answering);
        assert_eq!(s.first_unanswered(), Some(0));
        assert_eq!(s.verdict(1), None);
    }

    #[test]
    fn batch_answers_can_change_before_submit() {
        let mut s = session(ProgressionMode::Batch);
        s.select_option(0, 1).unwrap();
        s.select_option(0, 0).unwrap();
        assert_eq!(s.answers().get(0), Some(0));
    }

    #[test]
    fn out_of_range_indices_fail_without_side_effects() {
        let mut s = session(ProgressionMode::Batch);
        assert!(matches!(
            s.select_option(3, 0),
            Err(QuizError::IndexOutOfBounds { what: "question", .. })
        ));
        assert!(matches!(
            s.select_option(0, 2),
            Err(QuizError::IndexOutOfBounds { what: "option", .. })
        ));
        assert_eq!(s.phase(), SessionPhase::Ready);
        assert_eq!(s.answers().answered_count(), 0);
    }

    #[test]
    fn incomplete_submit_names_first_gap() {
        let mut s = session(ProgressionMode::Batch);
        s.select_option(0, 0).unwrap();
        s.select_option(2, 0).unwrap();
        let err = s.submit().unwrap_err();
        assert!(matches!(err, QuizError::IncompleteAnswers { first_unanswered: 1 }));
        assert_eq!(s.phase(), SessionPhase::Answering);
        assert!(s.score().is_none());
        assert!(s.wrong_answers().load().unwrap().is_empty());
    }

    #[test]
    fn submit_scores_and_records_wrong_answers() {
        let mut s = session(ProgressionMode::Batch);
        s.select_option(0, 0).unwrap();
        s.select_option(1, 0).unwrap();
        s.select_option(2, 2).unwrap();
        let submission = s.submit().unwrap();
        assert_eq!(submission.score, Score { correct: 2, total: 3 });
        assert_eq!(submission.wrong, vec![QuestionId::from("2")]);
        assert!(submission.persist_error.is_none());
        assert!(s.is_submitted());

        let stored = s.wrong_answers().load().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id.as_str(), "2");
    }

    #[test]
    fn resubmission_is_rejected() {
        let mut s = session(ProgressionMode::Batch);
        for i in 0..3 {
            s.select_option(i, 0).unwrap();
        }
        let first = s.submit().unwrap();
        assert!(matches!(s.submit(), Err(QuizError::Resubmission)));
        assert!(matches!(s.select_option(0, 1), Err(QuizError::Resubmission)));
        assert_eq!(s.score(), Some(first.score));
    }

    #[test]
    fn results_show_correct_options() {
        let mut s = session(ProgressionMode::Batch);
        assert!(s.results().is_none());
        s.select_option(0, 0).unwrap();
        s.select_option(1, 0).unwrap();
        s.select_option(2, 0).unwrap();
        s.submit().unwrap();
        let results = s.results().unwrap();
        assert!(results[0].is_correct);
        assert!(!results[1].is_correct);
        assert_eq!(results[1].correct_option, "y");
        assert_eq!(results[2].correct_option, "o");
        assert_eq!(s.verdict(1), Some(false));
    }

    #[test]
    fn reset_clears_score_but_not_store() {
        let mut s = session(ProgressionMode::Batch);
        for i in 0..3 {
            s.select_option(i, 1).unwrap();
        }
        s.submit().unwrap();
        s.reset();
        assert_eq!(s.phase(), SessionPhase::Ready);
        assert!(s.score().is_none());
        assert_eq!(s.answers().answered_count(), 0);
        assert_eq!(s.answers().score(s.bank()).correct, 0);
        assert_eq!(s.wrong_answers().load().unwrap().len(), 2);
    }

    #[test]
    fn clock_stops_at_submission() {
        let mut s = session(ProgressionMode::Batch);
        for i in 0..3 {
            s.select_option(i, 0).unwrap();
        }
        s.submit().unwrap();
        let frozen = s.elapsed();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(s.elapsed(), frozen);
    }

    #[test]
    fn sequential_reveals_and_advances() {
        let mut s = session(ProgressionMode::Sequential);
        assert_eq!(s.cursor(), Some(0));

        let Selection::Evaluated(fb) = s.select_option(0, 1).unwrap() else {
            panic!("sequential answers are evaluated");
        };
        assert!(!fb.is_correct);
        assert_eq!(fb.correct_index, 0);
        assert_eq!(fb.next, Some(1));
        assert!(fb.submission.is_none());
        assert_eq!(s.verdict(0), Some(false));
        assert_eq!(s.cursor(), Some(1));
    }

    #[test]
    fn sequential_locks_answered_and_rejects_skips() {
        let mut s = session(ProgressionMode::Sequential);
        s.select_option(0, 0).unwrap();
        assert!(matches!(s.select_option(0, 1), Err(QuizError::SlotLocked { index: 0 })));
        assert!(matches!(
            s.select_option(2, 0),
            Err(QuizError::OutOfSequence { expected: 1, got: 2 })
        ));
        assert_eq!(s.answers().get(0), Some(0));
    }

    #[test]
    fn sequential_last_answer_submits() {
        let mut s = session(ProgressionMode::Sequential);
        s.select_option(0, 0).unwrap();
        s.select_option(1, 1).unwrap();
        let Selection::Evaluated(fb) = s.select_option(2, 0).unwrap() else {
            panic!("sequential answers are evaluated");
        };
        assert_eq!(fb.next, None);
        let submission = fb.submission.unwrap();
        assert_eq!(submission.score, Score { correct: 2, total: 3 });
        assert!(s.is_submitted());
        assert_eq!(s.cursor(), None);
        assert!(matches!(s.submit(), Err(QuizError::UnsupportedInMode { .. })));
    }

    #[test]
    fn filter_replaces_bank_and_resets() {
        let mut s = session(ProgressionMode::Batch);
        s.select_option(0, 0).unwrap();
        s.apply_filter(QuestionFilter::category("lists")).unwrap();
        assert_eq!(s.bank().len(), 2);
        assert_eq!(s.answers().len(), 2);
        assert_eq!(s.phase(), SessionPhase::Ready);
        assert!(matches!(s.view(), BankView::Filtered { .. }));

        s.apply_filter(QuestionFilter::difficulty(Difficulty::Hard)).unwrap();
        assert_eq!(s.bank().len(), 1);
        assert_eq!(s.bank().get(0).unwrap().id.as_str(), "3");
    }

    #[test]
    fn failed_filter_leaves_session_untouched() {
        let mut s = session(ProgressionMode::Batch);
        s.apply_filter(QuestionFilter::category("types")).unwrap();
        s.select_option(0, 1).unwrap();
        let err = s
            .apply_filter(QuestionFilter::category("networking"))
            .unwrap_err();
        assert!(matches!(err, QuizError::EmptyResult(_)));
        assert_eq!(s.bank().len(), 1);
        assert_eq!(s.answers().get(0), Some(1));
        assert_eq!(s.phase(), SessionPhase::Answering);
    }

    #[test]
    fn wrong_only_requires_recorded_misses() {
        let mut s = session(ProgressionMode::Batch);
        assert!(matches!(s.show_wrong_only(), Err(QuizError::EmptyResult(_))));
        assert_eq!(s.view(), &BankView::Full);
    }

    #[test]
    fn wrong_only_review_graduates_correct_answers() {
        let mut s = session(ProgressionMode::Batch);
        s.select_option(0, 1).unwrap();
        s.select_option(1, 0).unwrap();
        s.select_option(2, 2).unwrap();
        s.submit().unwrap();

        s.show_wrong_only().unwrap();
        assert_eq!(s.view(), &BankView::WrongOnly);
        let ids: Vec<&str> = s.bank().iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);

        s.select_option(0, 0).unwrap();
        s.select_option(1, 0).unwrap();
        let submission = s.submit().unwrap();
        assert_eq!(submission.score, Score { correct: 1, total: 2 });

        let stored: Vec<String> = s
            .wrong_answers()
            .load()
            .unwrap()
            .into_iter()
            .map(|q| q.id.to_string())
            .collect();
        assert_eq!(stored, vec!["2"]);

        s.back_to_full_bank();
        assert_eq!(s.bank().len(), 3);
        assert_eq!(s.phase(), SessionPhase::Ready);
    }

    #[test]
    fn persistence_failure_does_not_undo_submission() {
        let mut s = QuizSession::new(
            bank(),
            ProgressionMode::Batch,
            WrongAnswerStore::new(Box::new(BrokenStore)),
        )
        .unwrap();
        for i in 0..3 {
            s.select_option(i, 0).unwrap();
        }
        let submission = s.submit().unwrap();
        assert!(submission.persist_error.unwrap().contains("disk on fire"));
        assert!(s.is_submitted());
        assert!(matches!(s.show_wrong_only(), Err(QuizError::Store(_))));
        assert!(s.is_submitted());
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut s = session(ProgressionMode::Sequential);
        s.select_option(0, 0).unwrap();
        let snap = s.snapshot();
        assert_eq!(snap.mode, ProgressionMode::Sequential);
        assert_eq!(snap.phase, SessionPhase::Answering);
        assert_eq!(snap.answers, vec![Some(0), None, None]);
        assert_eq!(snap.verdicts, vec![Some(true), None, None]);
        assert_eq!(snap.cursor, Some(1));
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["view"]["kind"], "full");
    }
}
