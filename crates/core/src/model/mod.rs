mod answer;
mod attempt;
pub mod content;
mod ids;
mod question;
mod reward;
mod session;
mod settings;

pub use content::{ImageRef, Locale, LocalizedText, MediaValidationError, TextError};
pub use ids::{AttemptId, ItemId, LessonId, OptionId, ParseIdError, QuestionId, SessionId};

pub use answer::{Answer, AnswerEdit, AnswerError};
pub use attempt::{AttemptError, AttemptRecord, AttemptRow, AttemptStats};
pub use question::{ChoiceOption, MatchItem, Question, QuestionDraft, QuestionError, QuestionKind};
pub use reward::{RewardEntry, RewardOutcome};
pub use session::{SessionState, SessionStateError};
pub use settings::{SettingsError, TestSettings};
