use chrono::Utc;
use donish_core::model::{LessonId, Question};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, id_i64, ser};
use crate::codec;
use crate::repository::{QuestionBankRepository, StorageError};

#[async_trait::async_trait]
impl QuestionBankRepository for SqliteRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let payload = codec::encode_question(question)?;

        sqlx::query(
            r"
            INSERT INTO questions (lesson_id, id, kind, payload, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(lesson_id, id) DO UPDATE SET
                kind = excluded.kind,
                payload = excluded.payload,
                updated_at = excluded.updated_at
            ",
        )
        .bind(id_i64("lesson_id", question.lesson_id.value())?)
        .bind(id_i64("question_id", question.id.value())?)
        .bind(question.kind.type_name())
        .bind(payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn questions_for_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT payload
            FROM questions
            WHERE lesson_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_i64("lesson_id", lesson_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| {
                let payload: String = row.try_get("payload").map_err(ser)?;
                codec::decode_question(&payload)
            })
            .collect()
    }
}
