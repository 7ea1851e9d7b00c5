use chrono::{DateTime, Utc};

use crate::model::ids::AttemptId;

/// One credit in the learner's reward ledger.
///
/// The ledger holds at most one entry per attempt; the balance is the sum of
/// all entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardEntry {
    pub attempt_id: AttemptId,
    pub amount: u32,
    pub credited_at: DateTime<Utc>,
}

impl RewardEntry {
    #[must_use]
    pub fn new(attempt_id: AttemptId, amount: u32, credited_at: DateTime<Utc>) -> Self {
        Self {
            attempt_id,
            amount,
            credited_at,
        }
    }
}

/// Result of asking the ledger to credit an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewardOutcome {
    Credited(RewardEntry),
    /// The attempt already had an entry; nothing was written.
    AlreadyCredited(RewardEntry),
}

impl RewardOutcome {
    #[must_use]
    pub fn entry(&self) -> &RewardEntry {
        match self {
            RewardOutcome::Credited(e) | RewardOutcome::AlreadyCredited(e) => e,
        }
    }

    #[must_use]
    pub fn is_new(&self) -> bool {
        matches!(self, RewardOutcome::Credited(_))
    }
}
