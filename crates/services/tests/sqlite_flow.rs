use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use donish_core::model::{
    AnswerEdit, ChoiceOption, ItemId, LessonId, LocalizedText, MatchItem, OptionId, Question,
    QuestionId, QuestionKind, TestSettings,
};
use donish_core::time::fixed_now;
use services::{AppServices, Clock, FocusProbe, GateInput, SubmitOutcome};
use storage::repository::Storage;

const LESSON: LessonId = LessonId::new(1);

fn text(s: &str) -> LocalizedText {
    LocalizedText::ru_only(s).unwrap()
}

fn mixed_bank() -> Vec<Question> {
    let mut bank = Vec::new();
    for n in 0..6_u64 {
        let id = QuestionId::new(n + 1);
        let kind = match n % 3 {
            0 => QuestionKind::SingleChoice {
                options: (1..=3)
                    .map(|o| ChoiceOption {
                        id: OptionId::new(o),
                        text: text(&o.to_string()),
                        image: None,
                    })
                    .collect(),
                correct: OptionId::new(2),
            },
            1 => {
                let item = |id: u64| MatchItem {
                    id: ItemId::new(id),
                    text: text(&id.to_string()),
                };
                QuestionKind::Matching {
                    left: vec![item(1), item(2), item(3)],
                    right: vec![item(10), item(11), item(12)],
                    pairs: BTreeMap::from([
                        (ItemId::new(1), ItemId::new(12)),
                        (ItemId::new(2), ItemId::new(10)),
                        (ItemId::new(3), ItemId::new(11)),
                    ]),
                }
            }
            _ => QuestionKind::Numeric {
                digits: vec![3, 0, 7],
                unit: Some(text("кг")),
            },
        };
        bank.push(Question {
            id,
            lesson_id: LESSON,
            prompt: text("?"),
            image: None,
            kind,
        });
    }
    bank
}

fn correct_edits(question: &Question) -> Vec<AnswerEdit> {
    match &question.kind {
        QuestionKind::SingleChoice { correct, .. } => vec![AnswerEdit::Choose(*correct)],
        QuestionKind::Matching { pairs, .. } => pairs
            .iter()
            .map(|(left, right)| AnswerEdit::Pair {
                left: *left,
                right: *right,
            })
            .collect(),
        QuestionKind::Numeric { digits, .. } => digits
            .iter()
            .enumerate()
            .map(|(position, value)| AnswerEdit::Digit {
                position,
                value: *value,
            })
            .collect(),
    }
}

struct Surface(AtomicBool);

impl FocusProbe for Surface {
    fn has_focus(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn is_visible(&self) -> bool {
        true
    }
}

#[tokio::test]
async fn sqlite_backed_session_runs_end_to_end() {
    let url = "sqlite:file:memdb_services_flow?mode=memory&cache=shared";
    let storage = Storage::sqlite(url).await.expect("connect sqlite");
    for question in mixed_bank() {
        storage.questions.upsert_question(&question).await.unwrap();
    }

    let settings = TestSettings::default().with_draw_size(4).unwrap();
    let app = AppServices::new_sqlite(url, Clock::fixed(fixed_now()), settings)
        .await
        .expect("services");
    let sessions = app.sessions();

    let mut active = sessions.start(LESSON, &GateInput::default()).await.unwrap();
    assert_eq!(active.session().len(), 4);

    sessions
        .attach_focus(&mut active, Arc::new(Surface(AtomicBool::new(true))))
        .unwrap();
    assert!(!active.obscured());

    let total = active.session().len();
    for index in 0..total {
        let question = active.current_question().cloned().unwrap();
        for edit in correct_edits(&question) {
            sessions.answer(&mut active, question.id, edit).await.unwrap();
        }
        if index + 1 < total {
            assert!(sessions.next(&mut active).await.unwrap());
        }
    }
    assert_eq!(active.session().locked_ids().len(), total - 1);

    let SubmitOutcome::Graded(graded) = sessions.submit(&mut active).await.unwrap() else {
        panic!("expected a graded attempt");
    };
    assert_eq!(graded.report.score, 100);
    assert!(active.focus().is_none());
    assert!(!active.obscured());

    let history = app.history();
    let items = history.history(LESSON).await.unwrap();
    assert_eq!(items.len(), 1);
    assert!(items[0].rewarded);
    assert_eq!(history.reward_balance().await.unwrap(), 1);
    assert_eq!(storage.sessions.load(LESSON).await.unwrap(), None);
}

#[tokio::test]
async fn sqlite_progress_survives_a_new_service_instance() {
    let url = "sqlite:file:memdb_services_resume?mode=memory&cache=shared";
    let storage = Storage::sqlite(url).await.expect("connect sqlite");
    for question in mixed_bank() {
        storage.questions.upsert_question(&question).await.unwrap();
    }
    let settings = TestSettings::default();

    let first_app = AppServices::new_sqlite(url, Clock::fixed(fixed_now()), settings)
        .await
        .unwrap();
    let sessions = first_app.sessions();
    let mut active = sessions.start(LESSON, &GateInput::default()).await.unwrap();
    assert_eq!(active.session().len(), 6);

    let question = active.current_question().cloned().unwrap();
    for edit in correct_edits(&question) {
        sessions.answer(&mut active, question.id, edit).await.unwrap();
    }
    sessions.next(&mut active).await.unwrap();
    drop(active);

    let second_app = AppServices::new_sqlite(url, Clock::fixed(fixed_now()), settings)
        .await
        .unwrap();
    let resumed = second_app
        .sessions()
        .start(LESSON, &GateInput::default())
        .await
        .unwrap();
    assert_eq!(resumed.session().questions()[0], question);
    assert!(resumed.session().is_locked(question.id));
    assert_eq!(resumed.session().len(), 6);
}
