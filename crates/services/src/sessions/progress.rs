use serde::Serialize;

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionProgress {
    pub total: usize,
    /// Questions with a complete answer.
    pub answered: usize,
    pub locked: usize,
    pub current: usize,
}

impl SessionProgress {
    #[must_use]
    pub fn unanswered(&self) -> usize {
        self.total - self.answered
    }

    #[must_use]
    pub fn is_ready_to_submit(&self) -> bool {
        self.total > 0 && self.answered == self.total
    }
}
