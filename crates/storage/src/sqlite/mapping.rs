use donish_core::model::{AttemptRecord, AttemptRow, LessonId, RewardEntry, SessionId};
use sqlx::Row;
use uuid::Uuid;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn lesson_id_from_i64(v: i64) -> Result<LessonId, StorageError> {
    Ok(LessonId::new(i64_to_u64("lesson_id", v)?))
}

pub(crate) fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<AttemptRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let lesson_id = lesson_id_from_i64(row.try_get::<i64, _>("lesson_id").map_err(ser)?)?;
    let session_id = SessionId::from_uuid(row.try_get::<Uuid, _>("session_id").map_err(ser)?);
    let score_raw: i64 = row.try_get("score").map_err(ser)?;
    let score = u8::try_from(score_raw)
        .map_err(|_| StorageError::Serialization(format!("invalid score: {score_raw}")))?;
    let correct = u32_from_i64("correct", row.try_get::<i64, _>("correct").map_err(ser)?)?;
    let total = u32_from_i64("total", row.try_get::<i64, _>("total").map_err(ser)?)?;
    let passed: bool = row.try_get("passed").map_err(ser)?;
    let submitted_at = row.try_get("submitted_at").map_err(ser)?;

    let record = AttemptRecord::new(
        lesson_id,
        session_id,
        score,
        correct,
        total,
        passed,
        submitted_at,
    )
    .map_err(ser)?;
    Ok(AttemptRow::new(id, record))
}

pub(crate) fn map_reward_row(row: &sqlx::sqlite::SqliteRow) -> Result<RewardEntry, StorageError> {
    let attempt_id: i64 = row.try_get("attempt_id").map_err(ser)?;
    let amount = u32_from_i64("amount", row.try_get::<i64, _>("amount").map_err(ser)?)?;
    let credited_at = row.try_get("credited_at").map_err(ser)?;
    Ok(RewardEntry::new(attempt_id, amount, credited_at))
}
