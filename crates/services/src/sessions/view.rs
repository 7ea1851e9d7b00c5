use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use donish_core::model::{AttemptId, AttemptRecord, AttemptRow, AttemptStats, LessonId};
use storage::repository::{AttemptRepository, RewardLedgerRepository};

use crate::error::SessionError;

/// Presentation-agnostic list item for one recorded attempt.
///
/// No pre-formatted strings; the UI formats timestamps and scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptListItem {
    pub id: AttemptId,
    pub submitted_at: DateTime<Utc>,
    pub score: u8,
    pub correct: u32,
    pub total: u32,
    pub passed: bool,
    pub rewarded: bool,
}

impl AttemptListItem {
    #[must_use]
    pub fn from_row(row: &AttemptRow, rewarded: bool) -> Self {
        let record = &row.record;
        Self {
            id: row.id,
            submitted_at: record.submitted_at(),
            score: record.score(),
            correct: record.correct(),
            total: record.total(),
            passed: record.passed(),
            rewarded,
        }
    }
}

/// Read side of attempt history and the reward ledger.
#[derive(Clone)]
pub struct AttemptHistoryService {
    attempts: Arc<dyn AttemptRepository>,
    rewards: Arc<dyn RewardLedgerRepository>,
}

impl AttemptHistoryService {
    #[must_use]
    pub fn new(
        attempts: Arc<dyn AttemptRepository>,
        rewards: Arc<dyn RewardLedgerRepository>,
    ) -> Self {
        Self { attempts, rewards }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        let repo = storage::repository::InMemoryRepository::new();
        Self::new(Arc::new(repo.clone()), Arc::new(repo))
    }

    /// Attempts for a lesson, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn history(&self, lesson_id: LessonId) -> Result<Vec<AttemptListItem>, SessionError> {
        let rows = self.attempts.history(lesson_id).await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let rewarded = self.rewards.entry_for(row.id).await?.is_some();
            items.push(AttemptListItem::from_row(row, rewarded));
        }
        Ok(items)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn stats(&self, lesson_id: LessonId) -> Result<AttemptStats, SessionError> {
        let rows = self.attempts.history(lesson_id).await?;
        let records: Vec<AttemptRecord> = rows.into_iter().map(|row| row.record).collect();
        Ok(AttemptStats::from_records(&records))
    }

    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn reward_balance(&self) -> Result<u64, SessionError> {
        Ok(self.rewards.balance().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use donish_core::model::SessionId;
    use donish_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn record(score: u8, minutes: i64) -> AttemptRecord {
        AttemptRecord::new(
            LessonId::new(1),
            SessionId::generate(),
            score,
            u32::from(score / 10),
            10,
            score >= 80,
            fixed_now() + Duration::minutes(minutes),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn history_marks_rewarded_attempts() {
        let repo = InMemoryRepository::new();
        let svc = AttemptHistoryService::new(Arc::new(repo.clone()), Arc::new(repo.clone()));

        let failed = repo.append_attempt(&record(60, 0)).await.unwrap();
        let passed = repo.append_attempt(&record(90, 5)).await.unwrap();
        repo.credit(passed, 1, fixed_now()).await.unwrap();

        let items = svc.history(LessonId::new(1)).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, failed);
        assert!(!items[0].rewarded);
        assert!(items[1].rewarded);
        assert_eq!(items[1].score, 90);

        let stats = svc.stats(LessonId::new(1)).await.unwrap();
        assert_eq!(stats.attempts, 2);
        assert_eq!(stats.best_score, Some(90));
        assert!(stats.passed);
        assert_eq!(svc.reward_balance().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_history_has_no_stats() {
        let svc = AttemptHistoryService::in_memory();
        assert!(svc.history(LessonId::new(3)).await.unwrap().is_empty());
        assert_eq!(svc.stats(LessonId::new(3)).await.unwrap().attempts, 0);
        assert_eq!(svc.reward_balance().await.unwrap(), 0);
    }

    #[test]
    fn list_item_serializes_for_display() {
        let row = AttemptRow::new(4, record(80, 0));
        let json = serde_json::to_value(AttemptListItem::from_row(&row, true)).unwrap();
        assert_eq!(json["score"], 80);
        assert_eq!(json["rewarded"], true);
    }
}
