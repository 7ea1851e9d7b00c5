use thiserror::Error;

use crate::model::{
    AnswerError, AttemptError, MediaValidationError, QuestionError, SessionStateError,
    SettingsError, TextError,
};

/// Any domain validation failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Text(#[from] TextError),
    #[error(transparent)]
    Media(#[from] MediaValidationError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    SessionState(#[from] SessionStateError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}
