use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::ids::{ItemId, OptionId, QuestionId};
use crate::model::question::{Question, QuestionKind, pair_list};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Edits that cannot apply to the targeted question.
///
/// A locked question is not an error; see `AnswerOutcome::Ignored`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("question {0} is not part of this session")]
    UnknownQuestion(QuestionId),

    #[error("{edit} edit does not apply to a {kind} question")]
    WrongKind {
        edit: &'static str,
        kind: &'static str,
    },

    #[error("option {0} does not belong to the question")]
    UnknownOption(OptionId),

    #[error("items {left}/{right} do not belong to the question")]
    UnknownItems { left: ItemId, right: ItemId },

    #[error("digit position {position} is outside the {width}-digit answer")]
    PositionOutOfRange { position: usize, width: usize },

    #[error("{0} is not a decimal digit")]
    InvalidDigit(u8),
}

//
// ─── ANSWERS ───────────────────────────────────────────────────────────────────
//

/// Learner's current answer; the shape follows the question type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    Choice(OptionId),
    Pairs(#[serde(with = "pair_list")] BTreeMap<ItemId, ItemId>),
    /// Fixed-width digit string, `None` marks a blank position.
    Digits(Vec<Option<u8>>),
}

/// A single mutation requested by the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerEdit {
    Choose(OptionId),
    Pair { left: ItemId, right: ItemId },
    Digit { position: usize, value: u8 },
}

impl AnswerEdit {
    fn name(self) -> &'static str {
        match self {
            AnswerEdit::Choose(_) => "choice",
            AnswerEdit::Pair { .. } => "pair",
            AnswerEdit::Digit { .. } => "digit",
        }
    }
}

impl Answer {
    /// True when nothing has been entered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Answer::Choice(_) => false,
            Answer::Pairs(pairs) => pairs.is_empty(),
            Answer::Digits(digits) => digits.iter().all(Option::is_none),
        }
    }

    /// True when the answer can be submitted for grading.
    ///
    /// Matching answers need a pair for every left item; numeric answers need
    /// every position filled.
    #[must_use]
    pub fn is_complete(&self, question: &Question) -> bool {
        match (self, &question.kind) {
            (Answer::Choice(_), QuestionKind::SingleChoice { .. }) => true,
            (Answer::Pairs(pairs), QuestionKind::Matching { left, .. }) => {
                left.iter().all(|item| pairs.contains_key(&item.id))
            }
            (Answer::Digits(entered), QuestionKind::Numeric { digits, .. }) => {
                entered.len() == digits.len() && entered.iter().all(Option::is_some)
            }
            _ => false,
        }
    }

    /// True when the answer has the shape of `question`'s kind and only
    /// refers to its own options or items.
    #[must_use]
    pub fn fits(&self, question: &Question) -> bool {
        match (self, &question.kind) {
            (Answer::Choice(option), QuestionKind::SingleChoice { .. }) => {
                question.has_option(*option)
            }
            (Answer::Pairs(pairs), QuestionKind::Matching { .. }) => pairs
                .iter()
                .all(|(left, right)| question.has_pair_items(*left, *right)),
            (Answer::Digits(digits), QuestionKind::Numeric { .. }) => {
                digits.len() == question.digit_width() && digits.iter().flatten().all(|d| *d <= 9)
            }
            _ => false,
        }
    }

    /// Apply one edit on top of an existing answer (or none).
    ///
    /// Choices overwrite, pairs merge per left item, digits overwrite a single
    /// position of a string as wide as the correct value.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError` when the edit does not fit the question.
    pub fn apply(
        current: Option<&Answer>,
        question: &Question,
        edit: AnswerEdit,
    ) -> Result<Answer, AnswerError> {
        match (edit, &question.kind) {
            (AnswerEdit::Choose(option), QuestionKind::SingleChoice { .. }) => {
                if !question.has_option(option) {
                    return Err(AnswerError::UnknownOption(option));
                }
                Ok(Answer::Choice(option))
            }
            (AnswerEdit::Pair { left, right }, QuestionKind::Matching { .. }) => {
                if !question.has_pair_items(left, right) {
                    return Err(AnswerError::UnknownItems { left, right });
                }
                let mut pairs = match current {
                    Some(Answer::Pairs(existing)) => existing.clone(),
                    _ => BTreeMap::new(),
                };
                pairs.insert(left, right);
                Ok(Answer::Pairs(pairs))
            }
            (AnswerEdit::Digit { position, value }, QuestionKind::Numeric { .. }) => {
                let width = question.digit_width();
                if position >= width {
                    return Err(AnswerError::PositionOutOfRange { position, width });
                }
                if value > 9 {
                    return Err(AnswerError::InvalidDigit(value));
                }
                let mut digits = match current {
                    Some(Answer::Digits(existing)) if existing.len() == width => existing.clone(),
                    _ => vec![None; width],
                };
                digits[position] = Some(value);
                Ok(Answer::Digits(digits))
            }
            (edit, kind) => Err(AnswerError::WrongKind {
                edit: edit.name(),
                kind: kind.type_name(),
            }),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::content::LocalizedText;
    use crate::model::ids::LessonId;
    use crate::model::question::{ChoiceOption, MatchItem};

    fn text(s: &str) -> LocalizedText {
        LocalizedText::ru_only(s).unwrap()
    }

    fn question(kind: QuestionKind) -> Question {
        Question {
            id: QuestionId::new(1),
            lesson_id: LessonId::new(1),
            prompt: text("q"),
            image: None,
            kind,
        }
    }

    fn choice_question() -> Question {
        question(QuestionKind::SingleChoice {
            options: (1..=3)
                .map(|id| ChoiceOption {
                    id: OptionId::new(id),
                    text: text("o"),
                    image: None,
                })
                .collect(),
            correct: OptionId::new(2),
        })
    }

    fn matching_question() -> Question {
        let items = |ids: &[u64]| {
            ids.iter()
                .map(|id| MatchItem {
                    id: ItemId::new(*id),
                    text: text("i"),
                })
                .collect::<Vec<_>>()
        };
        question(QuestionKind::Matching {
            left: items(&[1, 2]),
            right: items(&[10, 11]),
            pairs: BTreeMap::from([
                (ItemId::new(1), ItemId::new(10)),
                (ItemId::new(2), ItemId::new(11)),
            ]),
        })
    }

    fn numeric_question() -> Question {
        question(QuestionKind::Numeric {
            digits: vec![1, 2, 3],
            unit: None,
        })
    }

    #[test]
    fn choice_overwrites_previous() {
        let q = choice_question();
        let first = Answer::apply(None, &q, AnswerEdit::Choose(OptionId::new(1))).unwrap();
        let second = Answer::apply(Some(&first), &q, AnswerEdit::Choose(OptionId::new(3))).unwrap();
        assert_eq!(second, Answer::Choice(OptionId::new(3)));
        assert!(second.is_complete(&q));
    }

    #[test]
    fn unknown_option_is_rejected() {
        let q = choice_question();
        let err = Answer::apply(None, &q, AnswerEdit::Choose(OptionId::new(9))).unwrap_err();
        assert_eq!(err, AnswerError::UnknownOption(OptionId::new(9)));
    }

    #[test]
    fn pairs_merge_per_left_item() {
        let q = matching_question();
        let a = Answer::apply(
            None,
            &q,
            AnswerEdit::Pair {
                left: ItemId::new(1),
                right: ItemId::new(11),
            },
        )
        .unwrap();
        assert!(!a.is_empty());
        assert!(!a.is_complete(&q));

        let b = Answer::apply(
            Some(&a),
            &q,
            AnswerEdit::Pair {
                left: ItemId::new(2),
                right: ItemId::new(10),
            },
        )
        .unwrap();
        let c = Answer::apply(
            Some(&b),
            &q,
            AnswerEdit::Pair {
                left: ItemId::new(1),
                right: ItemId::new(10),
            },
        )
        .unwrap();

        let Answer::Pairs(pairs) = &c else {
            panic!("expected pairs");
        };
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[&ItemId::new(1)], ItemId::new(10));
        assert_eq!(pairs[&ItemId::new(2)], ItemId::new(10));
        assert!(c.is_complete(&q));
    }

    #[test]
    fn digits_fill_fixed_width() {
        let q = numeric_question();
        let a = Answer::apply(
            None,
            &q,
            AnswerEdit::Digit {
                position: 1,
                value: 2,
            },
        )
        .unwrap();
        assert_eq!(a, Answer::Digits(vec![None, Some(2), None]));
        assert!(!a.is_empty());
        assert!(!a.is_complete(&q));

        let err = Answer::apply(
            Some(&a),
            &q,
            AnswerEdit::Digit {
                position: 3,
                value: 1,
            },
        )
        .unwrap_err();
        assert_eq!(err, AnswerError::PositionOutOfRange { position: 3, width: 3 });
    }

    #[test]
    fn edit_kind_must_match_question() {
        let q = numeric_question();
        let err = Answer::apply(None, &q, AnswerEdit::Choose(OptionId::new(1))).unwrap_err();
        assert_eq!(
            err,
            AnswerError::WrongKind {
                edit: "choice",
                kind: "numeric"
            }
        );
    }

    #[test]
    fn fits_checks_shape_and_references() {
        let numeric = numeric_question();
        assert!(Answer::Digits(vec![Some(1), None, Some(3)]).fits(&numeric));
        assert!(!Answer::Digits(vec![Some(1), Some(2)]).fits(&numeric));
        assert!(!Answer::Digits(vec![Some(1), Some(12), Some(3)]).fits(&numeric));
        assert!(!Answer::Choice(OptionId::new(1)).fits(&numeric));

        let matching = matching_question();
        let stray = Answer::Pairs(BTreeMap::from([(ItemId::new(1), ItemId::new(99))]));
        assert!(!stray.fits(&matching));
        let ok = Answer::Pairs(BTreeMap::from([(ItemId::new(2), ItemId::new(10))]));
        assert!(ok.fits(&matching));

        let choice = choice_question();
        assert!(Answer::Choice(OptionId::new(3)).fits(&choice));
        assert!(!Answer::Choice(OptionId::new(9)).fits(&choice));
    }

    #[test]
    fn blank_digits_count_as_empty() {
        assert!(Answer::Digits(vec![None, None]).is_empty());
        assert!(Answer::Pairs(BTreeMap::new()).is_empty());
    }
}
