use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// One schema step; statements run in a single transaction.
struct Migration {
    version: i64,
    statements: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        statements: &[
            r"
            CREATE TABLE IF NOT EXISTS questions (
                lesson_id INTEGER NOT NULL,
                id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                payload TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (lesson_id, id)
            );
            ",
            r"
            CREATE TABLE IF NOT EXISTS session_states (
                lesson_id INTEGER PRIMARY KEY,
                payload TEXT NOT NULL,
                saved_at TEXT NOT NULL
            );
            ",
            r"
            CREATE TABLE IF NOT EXISTS attempts (
                id INTEGER PRIMARY KEY,
                lesson_id INTEGER NOT NULL,
                session_id BLOB NOT NULL,
                score INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
                correct INTEGER NOT NULL CHECK (correct >= 0),
                total INTEGER NOT NULL CHECK (total > 0 AND correct <= total),
                passed INTEGER NOT NULL CHECK (passed IN (0, 1)),
                submitted_at TEXT NOT NULL
            );
            ",
            r"
            CREATE TABLE IF NOT EXISTS rewards (
                attempt_id INTEGER PRIMARY KEY,
                amount INTEGER NOT NULL CHECK (amount > 0),
                credited_at TEXT NOT NULL,
                FOREIGN KEY (attempt_id) REFERENCES attempts(id)
            );
            ",
            r"
            CREATE INDEX IF NOT EXISTS idx_attempts_lesson_submitted
                ON attempts (lesson_id, submitted_at, id);
            ",
        ],
    },
    // Attempt history is append-only.
    Migration {
        version: 2,
        statements: &[
            r"
            CREATE TRIGGER IF NOT EXISTS attempts_no_update
            BEFORE UPDATE ON attempts
            BEGIN
                SELECT RAISE(ABORT, 'attempts are append-only');
            END;
            ",
            r"
            CREATE TRIGGER IF NOT EXISTS attempts_no_delete
            BEFORE DELETE ON attempts
            BEGIN
                SELECT RAISE(ABORT, 'attempts are append-only');
            END;
            ",
        ],
    },
];

async fn applied_versions(pool: &SqlitePool) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT version FROM schema_migrations ORDER BY version")
        .fetch_all(pool)
        .await
}

/// Applies every migration newer than the recorded schema version.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );
        ",
    )
    .execute(pool)
    .await?;

    let applied = applied_versions(pool).await?;

    for migration in MIGRATIONS
        .iter()
        .filter(|m| !applied.contains(&m.version))
    {
        let mut tx = pool.begin().await?;
        for statement in migration.statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query(
            r"
            INSERT INTO schema_migrations (version, applied_at)
            VALUES (?1, ?2)
            ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(migration.version)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
    }

    Ok(())
}

/// Latest schema version known to this build.
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}
