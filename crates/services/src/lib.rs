#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod focus;
pub mod sessions;

pub use donish_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, NavigationError, SessionError};
pub use focus::{FocusMonitor, FocusProbe, FocusSignal, FocusSubscription};
pub use sessions::{
    ActiveSession, AnswerOutcome, AttemptHistoryService, AttemptListItem, GateInput,
    GradedAttempt, SessionBuilder, SessionProgress, SubmitOutcome, TestSession,
    TestSessionService,
};
