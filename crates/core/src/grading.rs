//! Scoring of a finished session.
//!
//! Every question is all-or-nothing: a matching question needs every pair of
//! the key, a numeric question needs every digit.

use crate::model::{Answer, Question, QuestionId, QuestionKind, SessionState};

/// Outcome of grading a complete session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeReport {
    pub correct: u32,
    pub total: u32,
    pub score: u8,
    pub passed: bool,
    pub per_question: Vec<(QuestionId, bool)>,
}

/// Returns true when `answer` fully matches the key of `question`.
#[must_use]
pub fn is_correct(question: &Question, answer: Option<&Answer>) -> bool {
    match (&question.kind, answer) {
        (QuestionKind::SingleChoice { correct, .. }, Some(Answer::Choice(chosen))) => {
            chosen == correct
        }
        (QuestionKind::Matching { pairs, .. }, Some(Answer::Pairs(given))) => pairs
            .iter()
            .all(|(left, right)| given.get(left) == Some(right)),
        (QuestionKind::Numeric { digits, .. }, Some(Answer::Digits(given))) => {
            given.len() == digits.len()
                && given
                    .iter()
                    .zip(digits)
                    .all(|(g, expected)| *g == Some(*expected))
        }
        _ => false,
    }
}

/// `round(100 * correct / total)`, halves rounding up.
///
/// Returns 0 for an empty session; callers refuse to grade those.
#[must_use]
pub fn percent_score(correct: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = u64::from(correct.min(total));
    let total = u64::from(total);
    let rounded = (200 * correct + total) / (2 * total);
    u8::try_from(rounded).unwrap_or(100)
}

/// Grade every question of the session against `pass_threshold` (inclusive).
#[must_use]
pub fn grade(state: &SessionState, pass_threshold: u8) -> GradeReport {
    let per_question: Vec<(QuestionId, bool)> = state
        .questions
        .iter()
        .map(|q| (q.id, is_correct(q, state.answers.get(&q.id))))
        .collect();

    let total = u32::try_from(per_question.len()).unwrap_or(u32::MAX);
    let correct = u32::try_from(per_question.iter().filter(|(_, ok)| *ok).count())
        .unwrap_or(u32::MAX);
    let score = percent_score(correct, total);

    GradeReport {
        correct,
        total,
        score,
        passed: total > 0 && score >= pass_threshold,
        per_question,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChoiceOption, ItemId, LessonId, LocalizedText, MatchItem, OptionId};
    use crate::time::fixed_now;
    use std::collections::BTreeMap;

    fn text() -> LocalizedText {
        LocalizedText::ru_only("t").unwrap()
    }

    fn question(id: u64, kind: QuestionKind) -> Question {
        Question {
            id: QuestionId::new(id),
            lesson_id: LessonId::new(1),
            prompt: text(),
            image: None,
            kind,
        }
    }

    fn choice(id: u64) -> Question {
        question(
            id,
            QuestionKind::SingleChoice {
                options: vec![
                    ChoiceOption {
                        id: OptionId::new(1),
                        text: text(),
                        image: None,
                    },
                    ChoiceOption {
                        id: OptionId::new(2),
                        text: text(),
                        image: None,
                    },
                ],
                correct: OptionId::new(1),
            },
        )
    }

    fn matching(id: u64) -> Question {
        let items = |ids: [u64; 3]| {
            ids.iter()
                .map(|i| MatchItem {
                    id: ItemId::new(*i),
                    text: text(),
                })
                .collect()
        };
        question(
            id,
            QuestionKind::Matching {
                left: items([1, 2, 3]),
                right: items([10, 11, 12]),
                pairs: BTreeMap::from([
                    (ItemId::new(1), ItemId::new(10)),
                    (ItemId::new(2), ItemId::new(11)),
                    (ItemId::new(3), ItemId::new(12)),
                ]),
            },
        )
    }

    fn numeric(id: u64) -> Question {
        question(
            id,
            QuestionKind::Numeric {
                digits: vec![3, 1, 4],
                unit: None,
            },
        )
    }

    #[test]
    fn score_rounds_half_up() {
        assert_eq!(percent_score(10, 10), 100);
        assert_eq!(percent_score(8, 10), 80);
        assert_eq!(percent_score(1, 3), 33);
        assert_eq!(percent_score(2, 3), 67);
        assert_eq!(percent_score(1, 8), 13);
        assert_eq!(percent_score(0, 0), 0);
    }

    #[test]
    fn one_wrong_pair_fails_the_question() {
        let q = matching(1);
        let mut given = BTreeMap::from([
            (ItemId::new(1), ItemId::new(10)),
            (ItemId::new(2), ItemId::new(11)),
            (ItemId::new(3), ItemId::new(12)),
        ]);
        assert!(is_correct(&q, Some(&Answer::Pairs(given.clone()))));

        given.insert(ItemId::new(3), ItemId::new(11));
        assert!(!is_correct(&q, Some(&Answer::Pairs(given))));
    }

    #[test]
    fn one_wrong_digit_fails_the_question() {
        let q = numeric(1);
        assert!(is_correct(
            &q,
            Some(&Answer::Digits(vec![Some(3), Some(1), Some(4)]))
        ));
        assert!(!is_correct(
            &q,
            Some(&Answer::Digits(vec![Some(3), Some(1), Some(5)]))
        ));
        assert!(!is_correct(
            &q,
            Some(&Answer::Digits(vec![Some(3), Some(1), None]))
        ));
    }

    #[test]
    fn mismatched_answer_shape_is_wrong() {
        assert!(!is_correct(&choice(1), Some(&Answer::Digits(vec![Some(1)]))));
        assert!(!is_correct(&choice(1), None));
    }

    #[test]
    fn pass_boundary_is_inclusive() {
        let questions: Vec<Question> = (1..=10).map(choice).collect();
        let mut state = SessionState::new(LessonId::new(1), questions, fixed_now());
        for (i, q) in state.questions.clone().iter().enumerate() {
            let pick = if i < 8 { 1 } else { 2 };
            state.answers.insert(q.id, Answer::Choice(OptionId::new(pick)));
        }
        let report = grade(&state, 80);
        assert_eq!(report.correct, 8);
        assert_eq!(report.score, 80);
        assert!(report.passed);

        state
            .answers
            .insert(QuestionId::new(1), Answer::Choice(OptionId::new(2)));
        let report = grade(&state, 80);
        assert_eq!(report.score, 70);
        assert!(!report.passed);
    }

    #[test]
    fn empty_session_never_passes() {
        let state = SessionState::new(LessonId::new(1), Vec::new(), fixed_now());
        let report = grade(&state, 1);
        assert_eq!(report.total, 0);
        assert!(!report.passed);
    }
}
