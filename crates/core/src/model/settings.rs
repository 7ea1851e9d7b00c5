use std::time::Duration;

use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("draw size must be > 0")]
    InvalidDrawSize,

    #[error("pass threshold must be between 1 and 100")]
    InvalidPassThreshold,

    #[error("reward amount must be > 0")]
    InvalidRewardAmount,

    #[error("focus poll interval must be between 50 and 5000 ms")]
    InvalidFocusPollInterval,
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Knobs governing a lesson test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestSettings {
    draw_size: u32,
    pass_threshold: u8,
    reward_amount: u32,
    focus_poll_interval_ms: u64,
}

impl Default for TestSettings {
    /// Ten questions, 80% to pass, one coin per passed attempt, 300 ms focus poll.
    fn default() -> Self {
        Self {
            draw_size: 10,
            pass_threshold: 80,
            reward_amount: 1,
            focus_poll_interval_ms: 300,
        }
    }
}

impl TestSettings {
    /// # Errors
    ///
    /// Returns `SettingsError` if any value is out of range.
    pub fn new(
        draw_size: u32,
        pass_threshold: u8,
        reward_amount: u32,
        focus_poll_interval_ms: u64,
    ) -> Result<Self, SettingsError> {
        if draw_size == 0 {
            return Err(SettingsError::InvalidDrawSize);
        }
        if !(1..=100).contains(&pass_threshold) {
            return Err(SettingsError::InvalidPassThreshold);
        }
        if reward_amount == 0 {
            return Err(SettingsError::InvalidRewardAmount);
        }
        if !(50..=5000).contains(&focus_poll_interval_ms) {
            return Err(SettingsError::InvalidFocusPollInterval);
        }
        Ok(Self {
            draw_size,
            pass_threshold,
            reward_amount,
            focus_poll_interval_ms,
        })
    }

    /// Returns a copy with a different draw size.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidDrawSize` for zero.
    pub fn with_draw_size(self, draw_size: u32) -> Result<Self, SettingsError> {
        Self::new(
            draw_size,
            self.pass_threshold,
            self.reward_amount,
            self.focus_poll_interval_ms,
        )
    }

    /// Maximum number of questions drawn into one session (K).
    #[must_use]
    pub fn draw_size(&self) -> u32 {
        self.draw_size
    }

    /// Minimum score, inclusive, for an attempt to pass.
    #[must_use]
    pub fn pass_threshold(&self) -> u8 {
        self.pass_threshold
    }

    #[must_use]
    pub fn reward_amount(&self) -> u32 {
        self.reward_amount
    }

    #[must_use]
    pub fn focus_poll_interval(&self) -> Duration {
        Duration::from_millis(self.focus_poll_interval_ms)
    }
}
