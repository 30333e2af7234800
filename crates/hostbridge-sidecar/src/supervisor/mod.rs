//! Worker process supervision.
//!
//! [`ProcessSupervisor`] owns the worker process, runs one reader thread per
//! process lifetime that forwards decoded events to the [`EventBroadcaster`],
//! and restarts the worker with exponential backoff when it dies. Crash
//! handling runs inside a dedicated critical section keyed by process
//! generation, so a reader hitting end-of-file and a writer hitting a broken
//! pipe for the same process trigger a single restart sequence.

mod handle;
mod state;

use std::io::PipeReader;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError, Weak};
use std::thread;
use std::time::{Duration, Instant};

use hostbridge_config::Config;
use hostbridge_protocol::{Command, Event, EventKind, EventStream};
use tracing::{debug, error, info, warn};

use self::handle::WorkerHandle;
pub use self::state::SupervisorState;
use crate::broadcast::EventBroadcaster;
use crate::error::SidecarError;
use crate::launch::{CommandLauncher, WorkerLauncher, WorkerProcess};
use crate::link::WorkerLink;
use crate::restart::{RestartPolicy, RestartState};

pub(crate) const SUPERVISOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::supervisor");

/// Message of the event broadcast once the restart budget is exhausted.
pub const UNAVAILABLE_MESSAGE: &str = "upload backend unavailable";

/// Keeps the worker process alive and routes its output to listeners.
///
/// Share it behind an [`Arc`]; dropping the supervisor kills the worker.
pub struct ProcessSupervisor {
    inner: Arc<Inner>,
}

struct Inner {
    launcher: Box<dyn WorkerLauncher>,
    policy: RestartPolicy,
    shutdown_grace: Duration,
    events: Arc<EventBroadcaster>,
    state: Mutex<SupervisorState>,
    handle: Mutex<Option<Arc<WorkerHandle>>>,
    restart: Mutex<RestartState>,
    generation: AtomicU64,
}

impl ProcessSupervisor {
    /// Creates a stopped supervisor. Call [`start`](Self::start) to spawn the
    /// worker.
    #[must_use]
    pub fn new(
        launcher: impl WorkerLauncher + 'static,
        policy: RestartPolicy,
        shutdown_grace: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                launcher: Box::new(launcher),
                policy,
                shutdown_grace,
                events: Arc::new(EventBroadcaster::new()),
                state: Mutex::new(SupervisorState::Stopped),
                handle: Mutex::new(None),
                restart: Mutex::new(RestartState::default()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Creates a stopped supervisor for the worker described by `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            CommandLauncher::from_config(config),
            RestartPolicy::from_config(config),
            config.shutdown_grace(),
        )
    }

    /// Spawns the worker and its reader thread.
    ///
    /// A previous handle, if any, is discarded without being killed.
    ///
    /// # Errors
    ///
    /// Returns [`SidecarError::BinaryNotFound`] or
    /// [`SidecarError::SpawnFailed`] when the worker cannot be started.
    pub fn start(&self) -> Result<(), SidecarError> {
        let mut restart = lock(&self.inner.restart);
        self.inner.set_state(SupervisorState::Starting);
        match self.inner.spawn_worker() {
            Ok(handle) => {
                restart.reset();
                self.inner.set_state(SupervisorState::Running);
                info!(
                    target: SUPERVISOR_TARGET,
                    pid = handle.pid(),
                    generation = handle.generation(),
                    "worker started"
                );
                Ok(())
            }
            Err(err) => {
                self.inner.set_state(SupervisorState::Stopped);
                error!(target: SUPERVISOR_TARGET, error = %err, "failed to start worker");
                Err(err)
            }
        }
    }

    /// Returns `true` while the current worker has not exited.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner.live_handle().is_some()
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SupervisorState {
        self.inner.state()
    }

    /// Returns the consecutive restart attempts since the last success.
    #[must_use]
    pub fn restart_attempts(&self) -> u32 {
        lock(&self.inner.restart).attempt_count()
    }

    /// Returns the broadcaster carrying worker events.
    #[must_use]
    pub fn events(&self) -> &Arc<EventBroadcaster> {
        &self.inner.events
    }

    /// Writes `command` to the worker.
    ///
    /// When the worker is not running one restart is attempted first. A
    /// failed write hands the worker to crash handling.
    ///
    /// # Errors
    ///
    /// Returns [`SidecarError::Unavailable`] once the restart budget is spent
    /// and [`SidecarError::CannotSend`] when the worker could not be started,
    /// a crash restart is still backing off, or the write failed.
    pub fn send(&self, command: &Command) -> Result<(), SidecarError> {
        let handle = match self.inner.live_handle() {
            Some(handle) => handle,
            None => self.inner.revive()?,
        };

        if let Err(err) = handle.write(command) {
            error!(
                target: SUPERVISOR_TARGET,
                action = %command.action(),
                error = %err,
                "failed to write command to worker"
            );
            self.inner.handle_crash(handle.generation());
            return Err(SidecarError::cannot_send(err.to_string()));
        }

        debug!(
            target: SUPERVISOR_TARGET,
            action = %command.action(),
            service = command.service(),
            files = command.files().len(),
            "command sent to worker"
        );
        Ok(())
    }

    /// Closes the worker's stdin, waits up to the grace period for it to exit
    /// and kills it otherwise. Safe to call when already stopped.
    pub fn shutdown(&self) {
        let previous = self.inner.replace_state(SupervisorState::Stopped);
        let Some(handle) = lock(&self.inner.handle).take() else {
            if previous != SupervisorState::Stopped {
                debug!(target: SUPERVISOR_TARGET, %previous, "supervisor stopped with no worker");
            }
            return;
        };

        info!(target: SUPERVISOR_TARGET, pid = handle.pid(), "shutting down worker");
        handle.close_input();
        handle.wait_or_kill(Instant::now() + self.inner.shutdown_grace);
    }
}

impl WorkerLink for ProcessSupervisor {
    fn send(&self, command: &Command) -> Result<(), SidecarError> {
        Self::send(self, command)
    }

    fn events(&self) -> &Arc<EventBroadcaster> {
        Self::events(self)
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        self.inner.replace_state(SupervisorState::Stopped);
        if let Some(handle) = lock(&self.inner.handle).take() {
            debug!(target: SUPERVISOR_TARGET, pid = handle.pid(), "killing worker on drop");
            handle.kill();
        }
    }
}

impl std::fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("state", &self.inner.state())
            .field("policy", &self.inner.policy)
            .field("listeners", &self.inner.events.listener_count())
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn state(&self) -> SupervisorState {
        *lock(&self.state)
    }

    fn set_state(&self, next: SupervisorState) {
        self.replace_state(next);
    }

    fn replace_state(&self, next: SupervisorState) -> SupervisorState {
        let mut state = lock(&self.state);
        let previous = *state;
        if previous != next {
            debug!(target: SUPERVISOR_TARGET, from = %previous, to = %next, "state change");
            *state = next;
        }
        previous
    }

    /// Moves to `next` unless the supervisor has been stopped. Returns
    /// `false` when stopped.
    fn advance(&self, next: SupervisorState) -> bool {
        let mut state = lock(&self.state);
        if *state == SupervisorState::Stopped {
            return false;
        }
        let previous = *state;
        if previous != next {
            debug!(target: SUPERVISOR_TARGET, from = %previous, to = %next, "state change");
            *state = next;
        }
        true
    }

    fn current(&self) -> Option<Arc<WorkerHandle>> {
        lock(&self.handle).clone()
    }

    fn live_handle(&self) -> Option<Arc<WorkerHandle>> {
        self.current().filter(|handle| handle.is_alive())
    }

    /// Launches a worker, installs its handle and starts its reader thread.
    fn spawn_worker(self: &Arc<Self>) -> Result<Arc<WorkerHandle>, SidecarError> {
        let WorkerProcess {
            child,
            input,
            output,
        } = self.launcher.launch()?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        let handle = Arc::new(WorkerHandle::new(generation, child, input));
        // Installed before the reader starts so an immediate end-of-file is
        // attributed to this generation.
        *lock(&self.handle) = Some(Arc::clone(&handle));

        let weak = Arc::downgrade(self);
        let events = Arc::clone(&self.events);
        let spawned = thread::Builder::new()
            .name(format!("hostbridge-reader-{generation}"))
            .spawn(move || read_events(&weak, &events, generation, output));
        if let Err(err) = spawned {
            lock(&self.handle).take();
            handle.kill();
            return Err(SidecarError::from(err));
        }
        Ok(handle)
    }

    /// Restarts a dead worker for a sender. Never waits on crash handling:
    /// while a restart sequence holds the section the send fails at once.
    fn revive(self: &Arc<Self>) -> Result<Arc<WorkerHandle>, SidecarError> {
        let mut restart = match self.restart.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poison)) => poison.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug!(
                    target: SUPERVISOR_TARGET,
                    state = %self.state(),
                    "send rejected while the worker restarts"
                );
                return Err(SidecarError::cannot_send("worker restart in progress"));
            }
        };
        if let Some(handle) = self.live_handle() {
            return Ok(handle);
        }
        if self.state() == SupervisorState::Unavailable {
            return Err(SidecarError::Unavailable);
        }

        warn!(target: SUPERVISOR_TARGET, "worker not running, attempting restart");
        self.set_state(SupervisorState::Starting);
        if let Err(err) = self.spawn_worker() {
            self.set_state(SupervisorState::Crashed);
            return Err(SidecarError::cannot_send(format!(
                "worker failed to start: {err}"
            )));
        }
        let Some(handle) = self.live_handle() else {
            self.set_state(SupervisorState::Crashed);
            return Err(SidecarError::cannot_send(
                "worker exited immediately after restart",
            ));
        };
        restart.reset();
        self.set_state(SupervisorState::Running);
        Ok(handle)
    }

    /// Handles the death of the worker identified by `generation`.
    ///
    /// Calls for a generation that has already been replaced, or made after
    /// shutdown or after giving up, return immediately.
    fn handle_crash(self: &Arc<Self>, generation: u64) {
        let mut restart = lock(&self.restart);
        if matches!(
            self.state(),
            SupervisorState::Stopped | SupervisorState::Unavailable
        ) {
            return;
        }
        let Some(dead) = self
            .current()
            .filter(|handle| handle.generation() == generation)
        else {
            return;
        };

        let exit_status = dead.exit_status();
        dead.kill();
        lock(&self.handle).take();
        error!(
            target: SUPERVISOR_TARGET,
            pid = dead.pid(),
            generation,
            exit_status = ?exit_status,
            "worker process crashed"
        );
        if !self.advance(SupervisorState::Crashed) {
            return;
        }
        self.restart_with_backoff(&mut restart);
    }

    fn restart_with_backoff(self: &Arc<Self>, restart: &mut RestartState) {
        loop {
            if restart.is_exhausted(&self.policy) {
                self.give_up();
                return;
            }
            let delay = self.policy.delay_for(restart.attempt_count());
            info!(
                target: SUPERVISOR_TARGET,
                attempt = restart.attempt_count().saturating_add(1),
                max_attempts = self.policy.max_attempts(),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "restarting worker after backoff"
            );
            if !self.advance(SupervisorState::Restarting) {
                return;
            }
            thread::sleep(delay);
            if !self.advance(SupervisorState::Starting) {
                return;
            }

            restart.record_attempt();
            match self.spawn_worker() {
                Ok(handle) if handle.is_alive() => {
                    if !self.advance(SupervisorState::Running) {
                        lock(&self.handle).take();
                        handle.kill();
                        return;
                    }
                    restart.reset();
                    info!(
                        target: SUPERVISOR_TARGET,
                        pid = handle.pid(),
                        generation = handle.generation(),
                        "worker restarted"
                    );
                    return;
                }
                Ok(handle) => {
                    warn!(
                        target: SUPERVISOR_TARGET,
                        generation = handle.generation(),
                        "worker exited immediately after restart"
                    );
                }
                Err(err) => {
                    warn!(target: SUPERVISOR_TARGET, error = %err, "worker restart failed");
                }
            }
        }
    }

    fn give_up(&self) {
        if !self.advance(SupervisorState::Unavailable) {
            return;
        }
        error!(
            target: SUPERVISOR_TARGET,
            max_attempts = self.policy.max_attempts(),
            "worker failed to restart; giving up"
        );
        self.events.dispatch(&Event::error(UNAVAILABLE_MESSAGE));
    }
}

/// Reader loop for one worker lifetime.
fn read_events(
    inner: &Weak<Inner>,
    events: &EventBroadcaster,
    generation: u64,
    output: PipeReader,
) {
    let mut stream = EventStream::new(output);
    loop {
        match stream.next_event() {
            Ok(Some(event)) => {
                if event.kind() == EventKind::Log {
                    debug!(
                        target: SUPERVISOR_TARGET,
                        generation,
                        msg = event.msg().unwrap_or_default(),
                        "worker log"
                    );
                }
                events.dispatch(&event);
            }
            Ok(None) => {
                warn!(target: SUPERVISOR_TARGET, generation, "worker output closed");
                break;
            }
            Err(err) => {
                error!(
                    target: SUPERVISOR_TARGET,
                    generation,
                    error = %err,
                    "failed to read worker output"
                );
                break;
            }
        }
    }
    if let Some(inner) = inner.upgrade() {
        inner.handle_crash(generation);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}

#[cfg(all(test, unix))]
mod tests;
