use std::sync::Arc;

use donish_core::model::TestSettings;
use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::sessions::{AttemptHistoryService, TestSessionService};

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    settings: TestSettings,
    sessions: Arc<TestSessionService>,
    history: Arc<AttemptHistoryService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        settings: TestSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, settings))
    }

    #[must_use]
    pub fn in_memory(clock: Clock, settings: TestSettings) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, settings)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, settings: TestSettings) -> Self {
        let sessions = Arc::new(TestSessionService::from_storage(clock, settings, storage));
        let history = Arc::new(AttemptHistoryService::new(
            Arc::clone(&storage.attempts),
            Arc::clone(&storage.rewards),
        ));
        Self {
            settings,
            sessions,
            history,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &TestSettings {
        &self.settings
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<TestSessionService> {
        Arc::clone(&self.sessions)
    }

    #[must_use]
    pub fn history(&self) -> Arc<AttemptHistoryService> {
        Arc::clone(&self.history)
    }
}
