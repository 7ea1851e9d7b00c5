use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::model::content::{ImageRef, LocalizedText, MediaValidationError, TextError};
use crate::model::ids::{ItemId, LessonId, OptionId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {0}: single-choice needs at least two options")]
    TooFewOptions(QuestionId),

    #[error("question {0}: duplicate option id {1}")]
    DuplicateOption(QuestionId, OptionId),

    #[error("question {0}: correct option {1} is not among the options")]
    UnknownCorrectOption(QuestionId, OptionId),

    #[error("question {0}: matching needs at least one left item")]
    NoLeftItems(QuestionId),

    #[error("question {0}: duplicate item id {1}")]
    DuplicateItem(QuestionId, ItemId),

    #[error("question {0}: pair references unknown item {1}")]
    UnknownPairItem(QuestionId, ItemId),

    #[error("question {0}: right item {1} is the answer for more than one left item")]
    NonBijectivePairs(QuestionId, ItemId),

    #[error("question {0}: left item {1} has no correct right item")]
    UnpairedLeftItem(QuestionId, ItemId),

    #[error("question {0}: numeric answer needs at least one digit")]
    NoDigits(QuestionId),

    #[error("question {0}: {1} is not a decimal digit")]
    InvalidDigit(QuestionId, u8),

    #[error(transparent)]
    Text(#[from] TextError),

    #[error(transparent)]
    Media(#[from] MediaValidationError),
}

//
// ─── QUESTION TYPES ────────────────────────────────────────────────────────────
//

/// Option of a single-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: OptionId,
    pub text: LocalizedText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
}

/// Left or right entry of a matching question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchItem {
    pub id: ItemId,
    pub text: LocalizedText,
}

/// Type tag plus the type-specific answer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice {
        options: Vec<ChoiceOption>,
        correct: OptionId,
    },
    Matching {
        left: Vec<MatchItem>,
        right: Vec<MatchItem>,
        /// Correct right item for each left item.
        #[serde(with = "pair_list")]
        pairs: BTreeMap<ItemId, ItemId>,
    },
    Numeric {
        digits: Vec<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<LocalizedText>,
    },
}

impl QuestionKind {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            QuestionKind::SingleChoice { .. } => "single_choice",
            QuestionKind::Matching { .. } => "matching",
            QuestionKind::Numeric { .. } => "numeric",
        }
    }
}

/// A validated bank question.
///
/// The order of `options` (and `left`/`right` for matching) is the display
/// order; a drawn session stores its own shuffled copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub lesson_id: LessonId,
    pub prompt: LocalizedText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    pub kind: QuestionKind,
}

impl Question {
    /// Width of the digit string for numeric questions, 0 otherwise.
    #[must_use]
    pub fn digit_width(&self) -> usize {
        match &self.kind {
            QuestionKind::Numeric { digits, .. } => digits.len(),
            _ => 0,
        }
    }

    #[must_use]
    pub fn has_option(&self, option: OptionId) -> bool {
        match &self.kind {
            QuestionKind::SingleChoice { options, .. } => options.iter().any(|o| o.id == option),
            _ => false,
        }
    }

    #[must_use]
    pub fn has_pair_items(&self, left: ItemId, right: ItemId) -> bool {
        match &self.kind {
            QuestionKind::Matching {
                left: l, right: r, ..
            } => l.iter().any(|i| i.id == left) && r.iter().any(|i| i.id == right),
            _ => false,
        }
    }

    /// Check the answer key and content against the bank rules.
    ///
    /// # Errors
    ///
    /// Returns the first `QuestionError` found.
    pub fn validate(&self) -> Result<(), QuestionError> {
        self.prompt.validate()?;
        if let Some(image) = &self.image {
            image.validate()?;
        }

        match &self.kind {
            QuestionKind::SingleChoice { options, correct } => {
                if options.len() < 2 {
                    return Err(QuestionError::TooFewOptions(self.id));
                }
                let mut seen = BTreeSet::new();
                for option in options {
                    option.text.validate()?;
                    if let Some(image) = &option.image {
                        image.validate()?;
                    }
                    if !seen.insert(option.id) {
                        return Err(QuestionError::DuplicateOption(self.id, option.id));
                    }
                }
                if !seen.contains(correct) {
                    return Err(QuestionError::UnknownCorrectOption(self.id, *correct));
                }
            }
            QuestionKind::Matching { left, right, pairs } => {
                if left.is_empty() {
                    return Err(QuestionError::NoLeftItems(self.id));
                }
                let left_ids = unique_items(self.id, left)?;
                let right_ids = unique_items(self.id, right)?;

                let mut used_right = BTreeSet::new();
                for (l, r) in pairs {
                    if !left_ids.contains(l) {
                        return Err(QuestionError::UnknownPairItem(self.id, *l));
                    }
                    if !right_ids.contains(r) {
                        return Err(QuestionError::UnknownPairItem(self.id, *r));
                    }
                    if !used_right.insert(*r) {
                        return Err(QuestionError::NonBijectivePairs(self.id, *r));
                    }
                }
                // Completeness at grading time requires a pair for every left item,
                // so the key must cover all of them.
                if let Some(missing) = left_ids.iter().find(|id| !pairs.contains_key(id)) {
                    return Err(QuestionError::UnpairedLeftItem(self.id, *missing));
                }
            }
            QuestionKind::Numeric { digits, unit } => {
                if digits.is_empty() {
                    return Err(QuestionError::NoDigits(self.id));
                }
                if let Some(bad) = digits.iter().find(|d| **d > 9) {
                    return Err(QuestionError::InvalidDigit(self.id, *bad));
                }
                if let Some(unit) = unit {
                    unit.validate()?;
                }
            }
        }

        Ok(())
    }
}

fn unique_items(question: QuestionId, items: &[MatchItem]) -> Result<BTreeSet<ItemId>, QuestionError> {
    let mut seen = BTreeSet::new();
    for item in items {
        item.text.validate()?;
        if !seen.insert(item.id) {
            return Err(QuestionError::DuplicateItem(question, item.id));
        }
    }
    Ok(seen)
}

/// Serializes an item mapping as `[[left, right], ...]`.
///
/// Integer map keys do not survive serde's buffering of tagged and flattened
/// enums, so mappings never go over the wire as JSON objects.
pub(crate) mod pair_list {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    use crate::model::ids::ItemId;

    pub fn serialize<S: Serializer>(
        pairs: &BTreeMap<ItemId, ItemId>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let list: Vec<(ItemId, ItemId)> = pairs.iter().map(|(l, r)| (*l, *r)).collect();
        list.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<ItemId, ItemId>, D::Error> {
        let list = Vec::<(ItemId, ItemId)>::deserialize(deserializer)?;
        Ok(list.into_iter().collect())
    }
}

//
// ─── DRAFT (unvalidated input) ─────────────────────────────────────────────────
//

/// Question as authored or imported, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuestionDraft {
    pub id: QuestionId,
    pub lesson_id: LessonId,
    pub prompt: LocalizedText,
    #[serde(default)]
    pub image: Option<ImageRef>,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

impl QuestionDraft {
    /// # Errors
    ///
    /// Returns `QuestionError` if the answer key or content is invalid.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let question = Question {
            id: self.id,
            lesson_id: self.lesson_id,
            prompt: self.prompt,
            image: self.image,
            kind: self.kind,
        };
        question.validate()?;
        Ok(question)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
