//! A single worker process lifetime.

use std::process::{Child, ChildStdin, ExitStatus};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use hostbridge_protocol::{Command, FrameWriter};
use tracing::{debug, warn};

use super::SUPERVISOR_TARGET;
use crate::error::SidecarError;

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Owns one spawned worker. Replaced, never reused, on restart.
#[derive(Debug)]
pub(super) struct WorkerHandle {
    generation: u64,
    pid: u32,
    child: Mutex<Child>,
    input: Mutex<Option<FrameWriter<ChildStdin>>>,
}

impl WorkerHandle {
    pub(super) fn new(generation: u64, child: Child, input: ChildStdin) -> Self {
        Self {
            generation,
            pid: child.id(),
            child: Mutex::new(child),
            input: Mutex::new(Some(FrameWriter::new(input))),
        }
    }

    pub(super) const fn generation(&self) -> u64 {
        self.generation
    }

    pub(super) const fn pid(&self) -> u32 {
        self.pid
    }

    pub(super) fn is_alive(&self) -> bool {
        matches!(lock(&self.child).try_wait(), Ok(None))
    }

    pub(super) fn exit_status(&self) -> Option<ExitStatus> {
        lock(&self.child).try_wait().ok().flatten()
    }

    /// Serialises, writes and flushes `command` while holding the input lock
    /// so concurrent senders never interleave partial lines.
    pub(super) fn write(&self, command: &Command) -> Result<(), SidecarError> {
        let mut input = lock(&self.input);
        let Some(writer) = input.as_mut() else {
            return Err(SidecarError::cannot_send("worker input is closed"));
        };
        writer.send(command).map_err(SidecarError::from)
    }

    pub(super) fn close_input(&self) {
        drop(lock(&self.input).take());
    }

    /// Waits until `deadline` for the process to exit, then kills it.
    pub(super) fn wait_or_kill(&self, deadline: Instant) {
        let mut child = lock(&self.child);
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(target: SUPERVISOR_TARGET, pid = self.pid, ?status, "worker exited");
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(EXIT_POLL_INTERVAL),
                Ok(None) => {
                    warn!(
                        target: SUPERVISOR_TARGET,
                        pid = self.pid,
                        "worker did not exit within grace period, killing"
                    );
                    break;
                }
                Err(error) => {
                    warn!(
                        target: SUPERVISOR_TARGET,
                        pid = self.pid,
                        %error,
                        "failed to poll worker status, killing"
                    );
                    break;
                }
            }
        }
        drop(child.kill());
        drop(child.wait());
    }

    /// Kills the process immediately if it is still running.
    pub(super) fn kill(&self) {
        self.close_input();
        self.wait_or_kill(Instant::now());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}
