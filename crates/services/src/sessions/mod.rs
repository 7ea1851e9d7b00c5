mod plan;
mod progress;
mod service;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::{NavigationError, SessionError};
pub use plan::{SessionBuilder, shuffle_question};
pub use progress::SessionProgress;
pub use service::{AnswerOutcome, TestSession};
pub use view::{AttemptHistoryService, AttemptListItem};
pub use workflow::{ActiveSession, GateInput, GradedAttempt, SubmitOutcome, TestSessionService};
