use std::collections::BTreeSet;
use std::fmt;

use donish_core::grading::{self, GradeReport};
use donish_core::model::{
    Answer, AnswerEdit, AnswerError, LessonId, Question, QuestionId, SessionId, SessionState,
};

use super::progress::SessionProgress;
use crate::error::NavigationError;

//
// ─── ANSWER OUTCOME ────────────────────────────────────────────────────────────
//

/// What happened to an answer edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Recorded,
    /// The question is locked; the stored answer is untouched.
    Ignored,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory test session over a drawn question list.
///
/// Holds no I/O; persistence and grading side effects live in
/// `TestSessionService`. Locks only ever accumulate: leaving a question with
/// `next` locks it when it has any answer, and nothing unlocks it.
#[derive(Clone, PartialEq, Eq)]
pub struct TestSession {
    state: SessionState,
}

impl TestSession {
    #[must_use]
    pub fn new(state: SessionState) -> Self {
        Self { state }
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn into_state(self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.state.session_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.state.lesson_id
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.state.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.questions.is_empty()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.state.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.state.questions.get(self.state.current)
    }

    #[must_use]
    pub fn answer_for(&self, id: QuestionId) -> Option<&Answer> {
        self.state.answers.get(&id)
    }

    #[must_use]
    pub fn is_locked(&self, id: QuestionId) -> bool {
        self.state.locked.contains(&id)
    }

    #[must_use]
    pub fn locked_ids(&self) -> &BTreeSet<QuestionId> {
        &self.state.locked
    }

    /// Questions whose answer is missing or incomplete.
    #[must_use]
    pub fn unanswered(&self) -> usize {
        self.state.unanswered()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.len();
        SessionProgress {
            total,
            answered: total - self.unanswered(),
            locked: self.state.locked.len(),
            current: self.state.current,
        }
    }

    /// Apply an answer edit to `question_id`.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::UnknownQuestion` for ids outside the session and
    /// the edit's validation error when it does not fit the question.
    pub fn answer(
        &mut self,
        question_id: QuestionId,
        edit: AnswerEdit,
    ) -> Result<AnswerOutcome, AnswerError> {
        let question = self
            .state
            .question(question_id)
            .ok_or(AnswerError::UnknownQuestion(question_id))?;
        if self.state.locked.contains(&question_id) {
            return Ok(AnswerOutcome::Ignored);
        }

        let updated = Answer::apply(self.state.answers.get(&question_id), question, edit)?;
        self.state.answers.insert(question_id, updated);
        Ok(AnswerOutcome::Recorded)
    }

    /// Lock the displayed question if it has any answer. Returns true when a
    /// new lock was added.
    pub fn lock_current(&mut self) -> bool {
        let Some(id) = self.current_question().map(|q| q.id) else {
            return false;
        };
        if !self.state.has_answer(id) {
            return false;
        }
        self.state.locked.insert(id)
    }

    /// Lock the question being left (same rule as `lock_current`) and move
    /// forward, staying on the last question. Returns true when a lock was added.
    pub fn next(&mut self) -> bool {
        let locked = self.lock_current();
        if self.state.current + 1 < self.len() {
            self.state.current += 1;
        }
        locked
    }

    /// Move back one question, staying on the first.
    pub fn previous(&mut self) {
        self.state.current = self.state.current.saturating_sub(1);
    }

    /// Move to any question without locking.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::OutOfRange` if `index` is not a question position.
    pub fn jump_to(&mut self, index: usize) -> Result<(), NavigationError> {
        let len = self.len();
        if index >= len {
            return Err(NavigationError::OutOfRange { index, len });
        }
        self.state.current = index;
        Ok(())
    }

    #[must_use]
    pub fn grade(&self, pass_threshold: u8) -> GradeReport {
        grading::grade(&self.state, pass_threshold)
    }
}

impl fmt::Debug for TestSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSession")
            .field("session_id", &self.state.session_id)
            .field("lesson_id", &self.state.lesson_id)
            .field("questions_len", &self.state.questions.len())
            .field("answers_len", &self.state.answers.len())
            .field("locked", &self.state.locked)
            .field("current", &self.state.current)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
