//! Synchronous request/response on top of the event broadcast.
//!
//! A request registers its own mailbox, sends the command and waits for the
//! first terminal event (`result`, `data`, `error` or `success`). Matching is
//! not scoped to the command: two concurrent requests waiting on the same
//! kinds may consume each other's replies. Callers that can identify their
//! reply, for example by `file`, should use
//! [`request_matching`](RequestCorrelator::request_matching).

use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

use hostbridge_protocol::{Command, Event};
use tracing::{debug, warn};

use crate::link::WorkerLink;

const CORRELATOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::correlator");

/// Turns the asynchronous event stream into blocking request calls.
#[derive(Debug, Clone)]
pub struct RequestCorrelator<L> {
    link: L,
    capacity: usize,
}

impl<L: WorkerLink> RequestCorrelator<L> {
    /// Creates a correlator whose per-request mailboxes hold `capacity`
    /// events.
    #[must_use]
    pub const fn new(link: L, capacity: usize) -> Self {
        Self { link, capacity }
    }

    /// Returns the underlying link.
    #[must_use]
    pub const fn link(&self) -> &L {
        &self.link
    }

    /// Sends `command` and returns the first terminal event, or the
    /// synthetic timeout reply after `timeout`.
    ///
    /// Never fails: send errors are returned as an `error` event carrying
    /// the failure message.
    pub fn request(&self, command: &Command, timeout: Duration) -> Event {
        self.request_matching(command, timeout, |_| true)
    }

    /// Like [`request`](Self::request) but only accepts terminal events for
    /// which `accept` returns `true`.
    pub fn request_matching<F>(&self, command: &Command, timeout: Duration, accept: F) -> Event
    where
        F: Fn(&Event) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let subscription = self.link.events().subscribe(self.capacity);
        if let Err(err) = self.link.send(command) {
            warn!(
                target: CORRELATOR_TARGET,
                action = %command.action(),
                error = %err,
                "request could not be sent"
            );
            return Event::error(err.to_string());
        }

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match subscription.recv_timeout(remaining) {
                Ok(event) if event.kind().is_terminal() && accept(&event) => return event,
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => break,
            }
        }

        debug!(
            target: CORRELATOR_TARGET,
            action = %command.action(),
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "request timed out"
        );
        Event::timeout()
    }
}
