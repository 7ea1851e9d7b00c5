use std::collections::BTreeMap;

use chrono::Duration;
use donish_core::model::{
    Answer, AttemptRecord, ItemId, LessonId, LocalizedText, MatchItem, Question, QuestionId,
    QuestionKind, SessionId, SessionState,
};
use donish_core::time::fixed_now;
use storage::repository::{
    AttemptRepository, QuestionBankRepository, RewardLedgerRepository, SessionStateRepository,
    Storage,
};
use storage::sqlite::SqliteRepository;

fn text(s: &str) -> LocalizedText {
    LocalizedText::new(s, Some(format!("{s} (tg)"))).unwrap()
}

fn numeric_question(lesson: u64, id: u64) -> Question {
    Question {
        id: QuestionId::new(id),
        lesson_id: LessonId::new(lesson),
        prompt: text("Сколько?"),
        image: None,
        kind: QuestionKind::Numeric {
            digits: vec![4, 2],
            unit: Some(text("см")),
        },
    }
}

fn matching_question(lesson: u64, id: u64) -> Question {
    let item = |id: u64| MatchItem {
        id: ItemId::new(id),
        text: text("item"),
    };
    Question {
        id: QuestionId::new(id),
        lesson_id: LessonId::new(lesson),
        prompt: text("Сопоставьте"),
        image: None,
        kind: QuestionKind::Matching {
            left: vec![item(1), item(2)],
            right: vec![item(10), item(11)],
            pairs: BTreeMap::from([
                (ItemId::new(1), ItemId::new(11)),
                (ItemId::new(2), ItemId::new(10)),
            ]),
        },
    }
}

fn attempt(lesson: u64, score: u8, minutes: i64) -> AttemptRecord {
    AttemptRecord::new(
        LessonId::new(lesson),
        SessionId::generate(),
        score,
        u32::from(score / 10),
        10,
        score >= 80,
        fixed_now() + Duration::minutes(minutes),
    )
    .unwrap()
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM schema_migrations")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(count.0, repo.schema_version().await.unwrap());
}

#[tokio::test]
async fn question_bank_round_trips_every_kind() {
    let repo = connect("memdb_bank").await;
    repo.upsert_question(&matching_question(1, 2)).await.unwrap();
    repo.upsert_question(&numeric_question(1, 1)).await.unwrap();
    repo.upsert_question(&numeric_question(2, 5)).await.unwrap();

    let bank = repo.questions_for_lesson(LessonId::new(1)).await.unwrap();
    assert_eq!(bank, vec![numeric_question(1, 1), matching_question(1, 2)]);

    let mut edited = numeric_question(1, 1);
    edited.kind = QuestionKind::Numeric {
        digits: vec![7],
        unit: None,
    };
    repo.upsert_question(&edited).await.unwrap();
    let bank = repo.questions_for_lesson(LessonId::new(1)).await.unwrap();
    assert_eq!(bank.len(), 2);
    assert_eq!(bank[0], edited);

    assert!(repo.questions_for_lesson(LessonId::new(9)).await.unwrap().is_empty());
}

#[tokio::test]
async fn session_state_save_load_clear() {
    let repo = connect("memdb_session").await;
    let lesson = LessonId::new(1);
    assert_eq!(repo.load(lesson).await.unwrap(), None);

    let mut state = SessionState::new(
        lesson,
        vec![numeric_question(1, 1), matching_question(1, 2)],
        fixed_now(),
    );
    state
        .answers
        .insert(QuestionId::new(1), Answer::Digits(vec![Some(4), None]));
    state.locked.insert(QuestionId::new(1));
    state.current = 1;
    repo.save(&state).await.unwrap();

    state.answers.insert(
        QuestionId::new(2),
        Answer::Pairs(BTreeMap::from([(ItemId::new(1), ItemId::new(11))])),
    );
    repo.save(&state).await.unwrap();

    assert_eq!(repo.load(lesson).await.unwrap(), Some(state));

    repo.clear(lesson).await.unwrap();
    assert_eq!(repo.load(lesson).await.unwrap(), None);
    repo.clear(lesson).await.unwrap();
}

#[tokio::test]
async fn unreadable_session_payload_loads_as_absent() {
    let repo = connect("memdb_corrupt").await;
    sqlx::query("INSERT INTO session_states (lesson_id, payload, saved_at) VALUES (3, ?1, ?2)")
        .bind(r#"{"version":99,"state":{}}"#)
        .bind(fixed_now())
        .execute(repo.pool())
        .await
        .unwrap();

    assert_eq!(repo.load(LessonId::new(3)).await.unwrap(), None);
}

#[tokio::test]
async fn attempts_append_in_submission_order() {
    let repo = connect("memdb_attempts").await;
    let late = repo.append_attempt(&attempt(1, 90, 10)).await.unwrap();
    let early = repo.append_attempt(&attempt(1, 60, 0)).await.unwrap();
    repo.append_attempt(&attempt(2, 100, 5)).await.unwrap();

    let history = repo.history(LessonId::new(1)).await.unwrap();
    let ids: Vec<_> = history.iter().map(|row| row.id).collect();
    assert_eq!(ids, vec![early, late]);
    assert_eq!(history[1].record.score(), 90);
    assert!(history[1].record.passed());
    assert_eq!(history[0].record.submitted_at(), fixed_now());
}

#[tokio::test]
async fn attempts_cannot_be_rewritten() {
    let repo = connect("memdb_attempts_frozen").await;
    let id = repo.append_attempt(&attempt(1, 50, 0)).await.unwrap();
    let id: i64 = id;

    let res = sqlx::query("UPDATE attempts SET score = 100 WHERE id = ?1")
        .bind(id)
        .execute(repo.pool())
        .await;
    assert!(res.is_err());

    let res = sqlx::query("DELETE FROM attempts WHERE id = ?1")
        .bind(id)
        .execute(repo.pool())
        .await;
    assert!(res.is_err());
}

#[tokio::test]
async fn reward_credit_is_idempotent_per_attempt() {
    let repo = connect("memdb_rewards").await;
    let first = repo.append_attempt(&attempt(1, 80, 0)).await.unwrap();
    let second = repo.append_attempt(&attempt(1, 100, 1)).await.unwrap();

    let credited = repo.credit(first, 1, fixed_now()).await.unwrap();
    assert!(credited.is_new());
    let again = repo
        .credit(first, 5, fixed_now() + Duration::minutes(1))
        .await
        .unwrap();
    assert!(!again.is_new());
    assert_eq!(again.entry().amount, 1);
    assert_eq!(again.entry().credited_at, fixed_now());

    repo.credit(second, 1, fixed_now()).await.unwrap();
    assert_eq!(repo.balance().await.unwrap(), 2);
    assert!(repo.entry_for(second).await.unwrap().is_some());
    assert!(repo.entry_for(second + 100).await.unwrap().is_none());
}

#[tokio::test]
async fn storage_facade_wires_sqlite_backend() {
    let storage = Storage::sqlite("sqlite:file:memdb_facade?mode=memory&cache=shared")
        .await
        .expect("storage");
    storage
        .questions
        .upsert_question(&numeric_question(4, 1))
        .await
        .unwrap();
    let bank = storage
        .questions
        .questions_for_lesson(LessonId::new(4))
        .await
        .unwrap();
    assert_eq!(bank.len(), 1);
    assert_eq!(storage.rewards.balance().await.unwrap(), 0);
}
