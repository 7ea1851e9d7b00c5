use rand::Rng;
use rand::seq::{SliceRandom, index};
use std::collections::BTreeSet;

use donish_core::model::{Question, QuestionId, QuestionKind, SessionState, TestSettings};

/// Shuffle the presentation order inside one question.
///
/// Single-choice options and both matching columns are permuted; numeric
/// questions have nothing to reorder.
pub fn shuffle_question<R: Rng + ?Sized>(question: &mut Question, rng: &mut R) {
    match &mut question.kind {
        QuestionKind::SingleChoice { options, .. } => options.shuffle(rng),
        QuestionKind::Matching { left, right, .. } => {
            left.shuffle(rng);
            right.shuffle(rng);
        }
        QuestionKind::Numeric { .. } => {}
    }
}

/// Draws the question list for a session from a lesson's bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionBuilder {
    draw_size: usize,
}

impl SessionBuilder {
    #[must_use]
    pub fn new(draw_size: u32) -> Self {
        Self {
            draw_size: usize::try_from(draw_size).unwrap_or(usize::MAX),
        }
    }

    #[must_use]
    pub fn from_settings(settings: &TestSettings) -> Self {
        Self::new(settings.draw_size())
    }

    #[must_use]
    pub fn draw_size(&self) -> usize {
        self.draw_size
    }

    /// Draw `min(draw_size, bank.len())` questions without replacement and
    /// shuffle each one.
    pub fn fresh<R: Rng + ?Sized>(&self, bank: &[Question], rng: &mut R) -> Vec<Question> {
        draw(bank, self.draw_size, rng)
    }

    /// Rebuild a persisted session around its locked questions.
    ///
    /// Locked questions keep their stored layout, relative order and answers,
    /// up to `draw_size` of them. Everything else is dropped and the free
    /// slots are topped up from bank entries not already in use. The session
    /// id and start time carry over.
    pub fn resume<R: Rng + ?Sized>(
        &self,
        bank: &[Question],
        persisted: SessionState,
        rng: &mut R,
    ) -> SessionState {
        let SessionState {
            session_id,
            lesson_id,
            questions,
            mut answers,
            locked,
            started_at,
            ..
        } = persisted;

        let kept: Vec<Question> = questions
            .into_iter()
            .filter(|q| locked.contains(&q.id))
            .take(self.draw_size)
            .collect();
        let used: BTreeSet<QuestionId> = kept.iter().map(|q| q.id).collect();
        answers.retain(|id, _| used.contains(id));

        let candidates: Vec<Question> = bank
            .iter()
            .filter(|q| !used.contains(&q.id))
            .cloned()
            .collect();
        let top_up = draw(&candidates, self.draw_size.saturating_sub(kept.len()), rng);

        let kept_len = kept.len();
        let mut questions = kept;
        questions.extend(top_up);
        let current = if kept_len < questions.len() {
            kept_len
        } else {
            questions.len().saturating_sub(1)
        };

        SessionState {
            session_id,
            lesson_id,
            questions,
            answers,
            locked: used,
            current,
            started_at,
        }
    }
}

fn draw<R: Rng + ?Sized>(pool: &[Question], amount: usize, rng: &mut R) -> Vec<Question> {
    let amount = amount.min(pool.len());
    let mut drawn: Vec<Question> = index::sample(rng, pool.len(), amount)
        .into_iter()
        .map(|i| pool[i].clone())
        .collect();
    drawn.shuffle(rng);
    for question in &mut drawn {
        shuffle_question(question, rng);
    }
    drawn
}
