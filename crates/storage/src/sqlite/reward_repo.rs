use chrono::{DateTime, Utc};
use donish_core::model::{AttemptId, RewardEntry, RewardOutcome};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, map_reward_row, ser};
use crate::repository::{RewardLedgerRepository, StorageError};

#[async_trait::async_trait]
impl RewardLedgerRepository for SqliteRepository {
    async fn credit(
        &self,
        attempt_id: AttemptId,
        amount: u32,
        at: DateTime<Utc>,
    ) -> Result<RewardOutcome, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query(
            r"
            INSERT INTO rewards (attempt_id, amount, credited_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(attempt_id) DO NOTHING
            ",
        )
        .bind(attempt_id)
        .bind(i64::from(amount))
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        let row = sqlx::query(
            r"
            SELECT attempt_id, amount, credited_at
            FROM rewards
            WHERE attempt_id = ?1
            ",
        )
        .bind(attempt_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(conn)?;
        let entry = map_reward_row(&row)?;

        tx.commit().await.map_err(conn)?;

        if res.rows_affected() == 1 {
            Ok(RewardOutcome::Credited(entry))
        } else {
            Ok(RewardOutcome::AlreadyCredited(entry))
        }
    }

    async fn entry_for(&self, attempt_id: AttemptId) -> Result<Option<RewardEntry>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT attempt_id, amount, credited_at
            FROM rewards
            WHERE attempt_id = ?1
            ",
        )
        .bind(attempt_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_reward_row).transpose()
    }

    async fn balance(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COALESCE(SUM(amount), 0) AS total FROM rewards")
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        let total: i64 = row.try_get("total").map_err(ser)?;
        u64::try_from(total)
            .map_err(|_| StorageError::Serialization(format!("invalid balance: {total}")))
    }
}
