//! Shared error types for the services crate.

use thiserror::Error;

use donish_core::gate::ContentKind;
use donish_core::model::{AnswerError, AttemptError, LessonId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Navigation requests that point outside the drawn question list.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NavigationError {
    #[error("question index {index} is outside {len} questions")]
    OutOfRange { index: usize, len: usize },
}

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("lesson content not yet consumed: {pending:?}")]
    GateClosed { pending: Vec<ContentKind> },
    #[error("lesson {0} has no questions; the test cannot be taken")]
    EmptyBank(LessonId),
    #[error("session already graded")]
    Finished,
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
