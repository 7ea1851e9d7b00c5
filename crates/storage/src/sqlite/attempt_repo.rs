use donish_core::model::{AttemptId, AttemptRecord, AttemptRow, LessonId};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_attempt_row};
use crate::repository::{AttemptRepository, StorageError};

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn append_attempt(&self, record: &AttemptRecord) -> Result<AttemptId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO attempts (lesson_id, session_id, score, correct, total, passed, submitted_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(id_i64("lesson_id", record.lesson_id().value())?)
        .bind(record.session_id().as_uuid())
        .bind(i64::from(record.score()))
        .bind(i64::from(record.correct()))
        .bind(i64::from(record.total()))
        .bind(record.passed())
        .bind(record.submitted_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }

    async fn history(&self, lesson_id: LessonId) -> Result<Vec<AttemptRow>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, lesson_id, session_id, score, correct, total, passed, submitted_at
            FROM attempts
            WHERE lesson_id = ?1
            ORDER BY submitted_at ASC, id ASC
            ",
        )
        .bind(id_i64("lesson_id", lesson_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_attempt_row).collect()
    }
}
