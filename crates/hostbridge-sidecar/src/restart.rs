//! Restart budget and exponential backoff.
//!
//! The delay before attempt `n` (0-indexed) is `base_delay × 2^n`. After
//! `max_attempts` consecutive failures the budget is exhausted and no further
//! attempt is made.

use std::time::Duration;

use hostbridge_config::Config;

/// Limits and pacing for worker restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RestartPolicy {
    /// Creates a policy allowing `max_attempts` consecutive attempts.
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Builds the policy from `max_restarts` and `restart_delay_ms`.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self::new(config.max_restarts(), config.restart_delay())
    }

    /// Returns the number of consecutive attempts allowed.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the delay to wait before the attempt numbered `attempt`.
    ///
    /// Saturates at [`Duration::MAX`] instead of overflowing.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        2_u32
            .checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }
}

/// Consecutive restart attempts since the last successful start.
///
/// Only mutated inside the supervisor's crash-handling section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestartState {
    attempt_count: u32,
}

impl RestartState {
    /// Returns the number of attempts made since the last success.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Returns `true` once no further attempt is allowed.
    #[must_use]
    pub const fn is_exhausted(&self, policy: &RestartPolicy) -> bool {
        self.attempt_count >= policy.max_attempts
    }

    /// Counts one attempt.
    pub const fn record_attempt(&mut self) {
        self.attempt_count = self.attempt_count.saturating_add(1);
    }

    /// Clears the count after a successful restart.
    pub const fn reset(&mut self) {
        self.attempt_count = 0;
    }
}
