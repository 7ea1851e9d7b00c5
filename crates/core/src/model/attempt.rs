use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{AttemptId, LessonId, SessionId};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("an attempt needs at least one question")]
    NoQuestions,

    #[error("correct count {correct} exceeds total {total}")]
    CorrectExceedsTotal { correct: u32, total: u32 },

    #[error("score {0} is above 100")]
    ScoreOutOfRange(u8),
}

//
// ─── ATTEMPT RECORD ───────────────────────────────────────────────────────────
//

/// Immutable outcome of one graded submission.
///
/// Records are appended to a lesson's history and never edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    lesson_id: LessonId,
    session_id: SessionId,
    score: u8,
    correct: u32,
    total: u32,
    passed: bool,
    submitted_at: DateTime<Utc>,
}

impl AttemptRecord {
    /// Rehydrate or build a record, checking the counts line up.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` for an empty attempt, impossible counts or a score above 100.
    pub fn new(
        lesson_id: LessonId,
        session_id: SessionId,
        score: u8,
        correct: u32,
        total: u32,
        passed: bool,
        submitted_at: DateTime<Utc>,
    ) -> Result<Self, AttemptError> {
        if total == 0 {
            return Err(AttemptError::NoQuestions);
        }
        if correct > total {
            return Err(AttemptError::CorrectExceedsTotal { correct, total });
        }
        if score > 100 {
            return Err(AttemptError::ScoreOutOfRange(score));
        }
        Ok(Self {
            lesson_id,
            session_id,
            score,
            correct,
            total,
            passed,
            submitted_at,
        })
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn score(&self) -> u8 {
        self.score
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    #[must_use]
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    /// Share of questions answered wrongly, in `0.0..=1.0`.
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        f64::from(self.total - self.correct) / f64::from(self.total)
    }
}

//
// ─── AGGREGATE STATS ──────────────────────────────────────────────────────────
//

/// Aggregates derived from a lesson's attempt history.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttemptStats {
    pub attempts: u32,
    pub best_score: Option<u8>,
    pub last_score: Option<u8>,
    pub average_error_rate: f64,
    pub passed: bool,
}

impl AttemptStats {
    /// `records` are expected oldest first; `last_score` comes from the final entry.
    #[must_use]
    pub fn from_records(records: &[AttemptRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let attempts = u32::try_from(records.len()).unwrap_or(u32::MAX);
        #[allow(clippy::cast_precision_loss)]
        let average_error_rate =
            records.iter().map(AttemptRecord::error_rate).sum::<f64>() / records.len() as f64;

        Self {
            attempts,
            best_score: records.iter().map(AttemptRecord::score).max(),
            last_score: records.last().map(AttemptRecord::score),
            average_error_rate,
            passed: records.iter().any(AttemptRecord::passed),
        }
    }
}

/// Attempt with its storage id, as read back from history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRow {
    pub id: AttemptId,
    pub record: AttemptRecord,
}

impl AttemptRow {
    #[must_use]
    pub fn new(id: AttemptId, record: AttemptRecord) -> Self {
        Self { id, record }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn record(score: u8, correct: u32, total: u32, passed: bool) -> AttemptRecord {
        AttemptRecord::new(
            LessonId::new(1),
            SessionId::generate(),
            score,
            correct,
            total,
            passed,
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_impossible_counts() {
        let err = AttemptRecord::new(
            LessonId::new(1),
            SessionId::generate(),
            50,
            11,
            10,
            false,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, AttemptError::CorrectExceedsTotal { correct: 11, total: 10 });

        let err = AttemptRecord::new(
            LessonId::new(1),
            SessionId::generate(),
            0,
            0,
            0,
            false,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, AttemptError::NoQuestions);
    }

    #[test]
    fn stats_over_history() {
        let history = vec![
            record(70, 7, 10, false),
            record(90, 9, 10, true),
            record(80, 8, 10, true),
        ];
        let stats = AttemptStats::from_records(&history);
        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.best_score, Some(90));
        assert_eq!(stats.last_score, Some(80));
        assert!(stats.passed);
        assert!((stats.average_error_rate - 0.2).abs() < 1e-9);
    }

    #[test]
    fn empty_history_has_default_stats() {
        let stats = AttemptStats::from_records(&[]);
        assert_eq!(stats.attempts, 0);
        assert_eq!(stats.best_score, None);
        assert!(!stats.passed);
        assert_eq!(stats.average_error_rate, 0.0);
    }
}
