use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::model::answer::Answer;
use crate::model::ids::{LessonId, QuestionId, SessionId};
use crate::model::question::Question;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("session belongs to lesson {found}, expected {expected}")]
    LessonMismatch { expected: LessonId, found: LessonId },

    #[error("question {0} appears more than once")]
    DuplicateQuestion(QuestionId),

    #[error("answer or lock refers to question {0} outside the session")]
    StrayQuestion(QuestionId),

    #[error("question {0} is locked without an answer")]
    LockedWithoutAnswer(QuestionId),

    #[error("stored answer does not fit question {0}")]
    AnswerMismatch(QuestionId),

    #[error("current index {current} is outside {len} questions")]
    CurrentOutOfRange { current: usize, len: usize },
}

/// Persisted shape of an in-progress test session.
///
/// `questions` carries the drawn subset in display order, with options and
/// items already shuffled, so a resumed session shows the same layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: SessionId,
    pub lesson_id: LessonId,
    pub questions: Vec<Question>,
    pub answers: BTreeMap<QuestionId, Answer>,
    pub locked: BTreeSet<QuestionId>,
    pub current: usize,
    pub started_at: DateTime<Utc>,
}

impl SessionState {
    #[must_use]
    pub fn new(lesson_id: LessonId, questions: Vec<Question>, started_at: DateTime<Utc>) -> Self {
        Self {
            session_id: SessionId::generate(),
            lesson_id,
            questions,
            answers: BTreeMap::new(),
            locked: BTreeSet::new(),
            current: 0,
            started_at,
        }
    }

    /// Check applied to anything read back from storage.
    ///
    /// Beyond structure, every answer must fit its question and every locked
    /// question must carry a non-empty answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError` describing the first inconsistency.
    pub fn check_well_formed(&self, lesson_id: LessonId) -> Result<(), SessionStateError> {
        if self.lesson_id != lesson_id {
            return Err(SessionStateError::LessonMismatch {
                expected: lesson_id,
                found: self.lesson_id,
            });
        }

        let mut ids = BTreeSet::new();
        for q in &self.questions {
            if !ids.insert(q.id) {
                return Err(SessionStateError::DuplicateQuestion(q.id));
            }
        }

        if let Some(stray) = self
            .answers
            .keys()
            .chain(self.locked.iter())
            .find(|id| !ids.contains(id))
        {
            return Err(SessionStateError::StrayQuestion(*stray));
        }

        for q in &self.questions {
            if self.answers.get(&q.id).is_some_and(|a| !a.fits(q)) {
                return Err(SessionStateError::AnswerMismatch(q.id));
            }
        }
        if let Some(bare) = self.locked.iter().find(|id| !self.has_answer(**id)) {
            return Err(SessionStateError::LockedWithoutAnswer(*bare));
        }

        let len = self.questions.len();
        if (len == 0 && self.current != 0) || (len > 0 && self.current >= len) {
            return Err(SessionStateError::CurrentOutOfRange {
                current: self.current,
                len,
            });
        }

        Ok(())
    }

    #[must_use]
    pub fn is_well_formed(&self, lesson_id: LessonId) -> bool {
        self.check_well_formed(lesson_id).is_ok()
    }

    #[must_use]
    pub fn question_ids(&self) -> Vec<QuestionId> {
        self.questions.iter().map(|q| q.id).collect()
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Answers that are present and non-empty.
    #[must_use]
    pub fn has_answer(&self, id: QuestionId) -> bool {
        self.answers.get(&id).is_some_and(|a| !a.is_empty())
    }

    /// Questions without a complete answer.
    #[must_use]
    pub fn unanswered(&self) -> usize {
        self.questions
            .iter()
            .filter(|q| !self.answers.get(&q.id).is_some_and(|a| a.is_complete(q)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::content::LocalizedText;
    use crate::model::ids::OptionId;
    use crate::model::question::{ChoiceOption, QuestionKind};
    use crate::time::fixed_now;

    fn question(id: u64) -> Question {
        let text = |s: &str| LocalizedText::ru_only(s).unwrap();
        Question {
            id: QuestionId::new(id),
            lesson_id: LessonId::new(1),
            prompt: text("q"),
            image: None,
            kind: QuestionKind::SingleChoice {
                options: vec![
                    ChoiceOption {
                        id: OptionId::new(1),
                        text: text("a"),
                        image: None,
                    },
                    ChoiceOption {
                        id: OptionId::new(2),
                        text: text("b"),
                        image: None,
                    },
                ],
                correct: OptionId::new(1),
            },
        }
    }

    #[test]
    fn fresh_state_is_well_formed() {
        let state = SessionState::new(LessonId::new(1), vec![question(1), question(2)], fixed_now());
        assert!(state.is_well_formed(LessonId::new(1)));
        assert_eq!(state.unanswered(), 2);
    }

    #[test]
    fn stray_lock_is_rejected() {
        let mut state = SessionState::new(LessonId::new(1), vec![question(1)], fixed_now());
        state.locked.insert(QuestionId::new(7));
        assert_eq!(
            state.check_well_formed(LessonId::new(1)),
            Err(SessionStateError::StrayQuestion(QuestionId::new(7)))
        );
    }

    #[test]
    fn lock_without_answer_is_rejected() {
        let mut state = SessionState::new(LessonId::new(1), vec![question(1)], fixed_now());
        state.locked.insert(QuestionId::new(1));
        assert_eq!(
            state.check_well_formed(LessonId::new(1)),
            Err(SessionStateError::LockedWithoutAnswer(QuestionId::new(1)))
        );

        state
            .answers
            .insert(QuestionId::new(1), Answer::Choice(OptionId::new(1)));
        assert!(state.is_well_formed(LessonId::new(1)));
    }

    #[test]
    fn answer_of_the_wrong_shape_is_rejected() {
        let mut state = SessionState::new(LessonId::new(1), vec![question(1)], fixed_now());
        state
            .answers
            .insert(QuestionId::new(1), Answer::Digits(vec![Some(1)]));
        assert_eq!(
            state.check_well_formed(LessonId::new(1)),
            Err(SessionStateError::AnswerMismatch(QuestionId::new(1)))
        );

        state
            .answers
            .insert(QuestionId::new(1), Answer::Choice(OptionId::new(5)));
        assert_eq!(
            state.check_well_formed(LessonId::new(1)),
            Err(SessionStateError::AnswerMismatch(QuestionId::new(1)))
        );
    }

    #[test]
    fn wrong_lesson_and_bad_index_are_rejected() {
        let mut state = SessionState::new(LessonId::new(1), vec![question(1)], fixed_now());
        assert!(!state.is_well_formed(LessonId::new(2)));
        state.current = 1;
        assert!(matches!(
            state.check_well_formed(LessonId::new(1)),
            Err(SessionStateError::CurrentOutOfRange { .. })
        ));
    }

    #[test]
    fn state_survives_json() {
        let mut state = SessionState::new(LessonId::new(1), vec![question(1), question(2)], fixed_now());
        state
            .answers
            .insert(QuestionId::new(1), Answer::Choice(OptionId::new(2)));
        state.locked.insert(QuestionId::new(1));
        state.current = 1;

        let json = serde_json::to_string(&state).unwrap();
        let back: SessionState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
