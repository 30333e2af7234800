//! Default values shared by the configuration loader and the binaries.

use crate::logging::LogFormat;

/// Worker concurrency passed to the sidecar when nothing else is configured.
pub const DEFAULT_WORKER_COUNT: u32 = 8;

/// Lowest accepted `--workers` value.
pub const MIN_WORKER_COUNT: u32 = 1;

/// Highest accepted `--workers` value.
pub const MAX_WORKER_COUNT: u32 = 16;

/// Consecutive restart attempts before the sidecar is declared unavailable.
pub const DEFAULT_MAX_RESTARTS: u32 = 5;

/// Base restart delay in milliseconds; doubled for every failed attempt.
pub const DEFAULT_RESTART_DELAY_MS: u64 = 2_000;

/// Grace period granted to the worker after stdin closes.
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 3_000;

/// Capacity of every listener mailbox.
pub const DEFAULT_LISTENER_CAPACITY: usize = 1_000;

/// Interval at which the event processor re-checks cancellation.
pub const DEFAULT_EVENT_POLL_MS: u64 = 1_000;

/// Shortest accepted event poll interval.
pub const MIN_EVENT_POLL_MS: u64 = 1;

/// Timeout for credential verification requests.
pub const DEFAULT_VERIFY_TIMEOUT_SECS: u64 = 15;

/// Timeout for gallery listing and creation requests.
pub const DEFAULT_GALLERY_TIMEOUT_SECS: u64 = 30;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

pub(crate) const fn worker_count() -> u32 {
    DEFAULT_WORKER_COUNT
}

pub(crate) const fn max_restarts() -> u32 {
    DEFAULT_MAX_RESTARTS
}

pub(crate) const fn restart_delay_ms() -> u64 {
    DEFAULT_RESTART_DELAY_MS
}

pub(crate) const fn shutdown_grace_ms() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_MS
}

pub(crate) const fn listener_capacity() -> usize {
    DEFAULT_LISTENER_CAPACITY
}

pub(crate) const fn event_poll_ms() -> u64 {
    DEFAULT_EVENT_POLL_MS
}

pub(crate) const fn verify_timeout_secs() -> u64 {
    DEFAULT_VERIFY_TIMEOUT_SECS
}

pub(crate) const fn gallery_timeout_secs() -> u64 {
    DEFAULT_GALLERY_TIMEOUT_SECS
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
