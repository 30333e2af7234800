//! Supervisor lifecycle states.

use std::fmt;

/// Lifecycle of the supervised worker.
///
/// `Stopped → Starting → Running → (Crashed → Restarting → Starting) | Stopped`,
/// with `Unavailable` as the terminal state once the restart budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SupervisorState {
    /// No worker is running and none is wanted.
    #[default]
    Stopped,
    /// A worker is being spawned.
    Starting,
    /// A worker is running.
    Running,
    /// The worker exited unexpectedly.
    Crashed,
    /// Waiting out the backoff delay before the next attempt.
    Restarting,
    /// The restart budget is exhausted; no further attempts are made.
    Unavailable,
}

impl SupervisorState {
    /// Returns the lowercase state name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Crashed => "crashed",
            Self::Restarting => "restarting",
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
