use chrono::Utc;
use donish_core::model::{LessonId, SessionState};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, id_i64, ser};
use crate::codec;
use crate::repository::{SessionStateRepository, StorageError};

#[async_trait::async_trait]
impl SessionStateRepository for SqliteRepository {
    async fn load(&self, lesson_id: LessonId) -> Result<Option<SessionState>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT payload
            FROM session_states
            WHERE lesson_id = ?1
            ",
        )
        .bind(id_i64("lesson_id", lesson_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let payload: String = row.try_get("payload").map_err(ser)?;
        Ok(codec::decode_state(&payload))
    }

    async fn save(&self, state: &SessionState) -> Result<(), StorageError> {
        let payload = codec::encode_state(state)?;

        sqlx::query(
            r"
            INSERT INTO session_states (lesson_id, payload, saved_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(lesson_id) DO UPDATE SET
                payload = excluded.payload,
                saved_at = excluded.saved_at
            ",
        )
        .bind(id_i64("lesson_id", state.lesson_id.value())?)
        .bind(payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn clear(&self, lesson_id: LessonId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM session_states WHERE lesson_id = ?1")
            .bind(id_i64("lesson_id", lesson_id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
