//! Shared configuration for the hostbridge crates and binary.
//!
//! [`Config`] is loaded through `ortho_config`, layering defaults, an
//! optional TOML file (`--config-path`), `HOSTBRIDGE_*` environment variables
//! and command-line flags, in increasing order of precedence. The values
//! describe how the upload worker is located and supervised, how long
//! synchronous worker requests may block, and how logs are rendered.

mod defaults;
mod logging;

use std::path::{Path, PathBuf};
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_EVENT_POLL_MS, DEFAULT_GALLERY_TIMEOUT_SECS, DEFAULT_LISTENER_CAPACITY,
    DEFAULT_LOG_FILTER, DEFAULT_MAX_RESTARTS, DEFAULT_RESTART_DELAY_MS,
    DEFAULT_SHUTDOWN_GRACE_MS, DEFAULT_VERIFY_TIMEOUT_SECS, DEFAULT_WORKER_COUNT,
    MAX_WORKER_COUNT, MIN_EVENT_POLL_MS, MIN_WORKER_COUNT, default_log_filter_string,
    default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Runtime configuration for the upload bridge.
///
/// Every field has a default, so loading succeeds with no file, environment
/// or flags at all.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(prefix = "HOSTBRIDGE")]
pub struct Config {
    /// Explicit path to the worker binary. When unset the binary is searched
    /// for next to the running executable and in the working directory.
    #[serde(default)]
    pub worker_path: Option<PathBuf>,
    /// Concurrency requested from the worker via `--workers`.
    #[serde(default = "defaults::worker_count")]
    pub worker_count: u32,
    /// Consecutive restart attempts before the worker is abandoned.
    #[serde(default = "defaults::max_restarts")]
    pub max_restarts: u32,
    /// Base restart delay in milliseconds.
    #[serde(default = "defaults::restart_delay_ms")]
    pub restart_delay_ms: u64,
    /// Grace period in milliseconds between closing stdin and killing.
    #[serde(default = "defaults::shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
    /// Capacity of each event listener mailbox.
    #[serde(default = "defaults::listener_capacity")]
    pub listener_capacity: usize,
    /// Cancellation re-check interval for the event processor, in milliseconds.
    #[serde(default = "defaults::event_poll_ms")]
    pub event_poll_ms: u64,
    /// Timeout for credential verification requests, in seconds.
    #[serde(default = "defaults::verify_timeout_secs")]
    pub verify_timeout_secs: u64,
    /// Timeout for gallery requests, in seconds.
    #[serde(default = "defaults::gallery_timeout_secs")]
    pub gallery_timeout_secs: u64,
    /// `tracing` filter expression.
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "defaults::default_log_format")]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_path: None,
            worker_count: DEFAULT_WORKER_COUNT,
            max_restarts: DEFAULT_MAX_RESTARTS,
            restart_delay_ms: DEFAULT_RESTART_DELAY_MS,
            shutdown_grace_ms: DEFAULT_SHUTDOWN_GRACE_MS,
            listener_capacity: DEFAULT_LISTENER_CAPACITY,
            event_poll_ms: DEFAULT_EVENT_POLL_MS,
            verify_timeout_secs: DEFAULT_VERIFY_TIMEOUT_SECS,
            gallery_timeout_secs: DEFAULT_GALLERY_TIMEOUT_SECS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Explicit worker binary override, if configured.
    #[must_use]
    pub fn worker_path(&self) -> Option<&Path> {
        self.worker_path.as_deref()
    }

    /// Worker concurrency clamped to the range the worker accepts.
    #[must_use]
    pub fn worker_count(&self) -> u32 {
        self.worker_count.clamp(MIN_WORKER_COUNT, MAX_WORKER_COUNT)
    }

    /// Consecutive restart attempts allowed after a crash.
    #[must_use]
    pub const fn max_restarts(&self) -> u32 {
        self.max_restarts
    }

    /// Base delay for the exponential restart backoff.
    #[must_use]
    pub const fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    /// Grace period granted after stdin is closed during shutdown.
    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Capacity of each listener mailbox, never zero.
    #[must_use]
    pub fn listener_capacity(&self) -> usize {
        self.listener_capacity.max(1)
    }

    /// Interval at which the event processor re-checks cancellation, never
    /// shorter than [`MIN_EVENT_POLL_MS`].
    #[must_use]
    pub fn event_poll_interval(&self) -> Duration {
        Duration::from_millis(self.event_poll_ms.max(MIN_EVENT_POLL_MS))
    }

    /// Timeout applied to credential verification.
    #[must_use]
    pub const fn verify_timeout(&self) -> Duration {
        Duration::from_secs(self.verify_timeout_secs)
    }

    /// Timeout applied to gallery listing, creation and finalisation.
    #[must_use]
    pub const fn gallery_timeout(&self) -> Duration {
        Duration::from_secs(self.gallery_timeout_secs)
    }

    /// Filter expression handed to the tracing subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format for log records.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
