use async_trait::async_trait;
use chrono::{DateTime, Utc};
use donish_core::model::{
    AttemptId, AttemptRecord, AttemptRow, LessonId, Question, QuestionId, RewardEntry,
    RewardOutcome, SessionState,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::codec;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Question bank per lesson.
#[async_trait]
pub trait QuestionBankRepository: Send + Sync {
    /// Insert or replace a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// All questions of a lesson, ordered by question id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or decoding failures.
    async fn questions_for_lesson(&self, lesson_id: LessonId)
    -> Result<Vec<Question>, StorageError>;
}

/// Device-local store for the in-progress session of each lesson.
#[async_trait]
pub trait SessionStateRepository: Send + Sync {
    /// Load the saved session for a lesson.
    ///
    /// A payload that cannot be decoded is reported as `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read at all.
    async fn load(&self, lesson_id: LessonId) -> Result<Option<SessionState>, StorageError>;

    /// Replace the saved session for `state.lesson_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the state cannot be written.
    async fn save(&self, state: &SessionState) -> Result<(), StorageError>;

    /// Forget the saved session for a lesson. Clearing nothing is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    async fn clear(&self, lesson_id: LessonId) -> Result<(), StorageError>;
}

/// Append-only attempt history.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be appended.
    async fn append_attempt(&self, record: &AttemptRecord) -> Result<AttemptId, StorageError>;

    /// Attempts for a lesson, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or decoding failures.
    async fn history(&self, lesson_id: LessonId) -> Result<Vec<AttemptRow>, StorageError>;
}

/// Reward ledger with at most one entry per attempt.
#[async_trait]
pub trait RewardLedgerRepository: Send + Sync {
    /// Credit `amount` for `attempt_id` unless it was already credited.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the ledger cannot be written.
    async fn credit(
        &self,
        attempt_id: AttemptId,
        amount: u32,
        at: DateTime<Utc>,
    ) -> Result<RewardOutcome, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the ledger cannot be read.
    async fn entry_for(&self, attempt_id: AttemptId) -> Result<Option<RewardEntry>, StorageError>;

    /// Sum of all credited amounts.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the ledger cannot be read.
    async fn balance(&self) -> Result<u64, StorageError>;
}

/// In-memory repository for tests and prototyping.
///
/// Session states are kept in their encoded form so decoding behaves the
/// same as with a durable backend.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<BTreeMap<(LessonId, QuestionId), Question>>>,
    states: Arc<Mutex<HashMap<LessonId, String>>>,
    attempts: Arc<Mutex<Vec<AttemptRow>>>,
    rewards: Arc<Mutex<BTreeMap<AttemptId, RewardEntry>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw session payload, bypassing encoding.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn put_raw_state(
        &self,
        lesson_id: LessonId,
        raw: impl Into<String>,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .states
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(lesson_id, raw.into());
        Ok(())
    }

    /// Whether a payload exists for the lesson, decodable or not.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn has_raw_state(&self, lesson_id: LessonId) -> Result<bool, StorageError> {
        let guard = self
            .states
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.contains_key(&lesson_id))
    }
}

#[async_trait]
impl QuestionBankRepository for InMemoryRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert((question.lesson_id, question.id), question.clone());
        Ok(())
    }

    async fn questions_for_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .range((lesson_id, QuestionId::new(0))..=(lesson_id, QuestionId::new(u64::MAX)))
            .map(|(_, q)| q.clone())
            .collect())
    }
}

#[async_trait]
impl SessionStateRepository for InMemoryRepository {
    async fn load(&self, lesson_id: LessonId) -> Result<Option<SessionState>, StorageError> {
        let guard = self
            .states
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&lesson_id).and_then(|raw| codec::decode_state(raw)))
    }

    async fn save(&self, state: &SessionState) -> Result<(), StorageError> {
        let raw = codec::encode_state(state)?;
        let mut guard = self
            .states
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(state.lesson_id, raw);
        Ok(())
    }

    async fn clear(&self, lesson_id: LessonId) -> Result<(), StorageError> {
        let mut guard = self
            .states
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&lesson_id);
        Ok(())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, record: &AttemptRecord) -> Result<AttemptId, StorageError> {
        let mut guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = AttemptId::try_from(guard.len() + 1)
            .map_err(|_| StorageError::Serialization("attempt id overflow".into()))?;
        guard.push(AttemptRow::new(id, record.clone()));
        Ok(id)
    }

    async fn history(&self, lesson_id: LessonId) -> Result<Vec<AttemptRow>, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .iter()
            .filter(|row| row.record.lesson_id() == lesson_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RewardLedgerRepository for InMemoryRepository {
    async fn credit(
        &self,
        attempt_id: AttemptId,
        amount: u32,
        at: DateTime<Utc>,
    ) -> Result<RewardOutcome, StorageError> {
        let mut guard = self
            .rewards
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if let Some(existing) = guard.get(&attempt_id) {
            return Ok(RewardOutcome::AlreadyCredited(existing.clone()));
        }
        let entry = RewardEntry::new(attempt_id, amount, at);
        guard.insert(attempt_id, entry.clone());
        Ok(RewardOutcome::Credited(entry))
    }

    async fn entry_for(&self, attempt_id: AttemptId) -> Result<Option<RewardEntry>, StorageError> {
        let guard = self
            .rewards
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&attempt_id).cloned())
    }

    async fn balance(&self) -> Result<u64, StorageError> {
        let guard = self
            .rewards
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.values().map(|e| u64::from(e.amount)).sum())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionBankRepository>,
    pub sessions: Arc<dyn SessionStateRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub rewards: Arc<dyn RewardLedgerRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repo(InMemoryRepository::new())
    }

    /// Wire every handle to one repository value.
    #[must_use]
    pub fn from_repo<R>(repo: R) -> Self
    where
        R: QuestionBankRepository
            + SessionStateRepository
            + AttemptRepository
            + RewardLedgerRepository
            + Clone
            + 'static,
    {
        Self {
            questions: Arc::new(repo.clone()),
            sessions: Arc::new(repo.clone()),
            attempts: Arc::new(repo.clone()),
            rewards: Arc::new(repo),
        }
    }
}
