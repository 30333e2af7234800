//! Scripted worker, backend and loader for CLI tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use hostbridge_config::Config;
use hostbridge_protocol::{Command, Event};
use hostbridge_sidecar::{EventBroadcaster, SidecarError, WorkerLink};

use crate::backend::Backend;
use crate::config::ConfigLoader;
use crate::errors::AppError;

type Responder = dyn Fn(&Command) -> Vec<Event> + Send + Sync;

/// Worker that answers every command with scripted events.
#[derive(Clone)]
pub(crate) struct ScriptedWorker {
    events: Arc<EventBroadcaster>,
    sent: Arc<Mutex<Vec<Command>>>,
    responder: Arc<Responder>,
}

impl ScriptedWorker {
    pub(crate) fn new<F>(responder: F) -> Self
    where
        F: Fn(&Command) -> Vec<Event> + Send + Sync + 'static,
    {
        Self {
            events: Arc::new(EventBroadcaster::new()),
            sent: Arc::new(Mutex::new(Vec::new())),
            responder: Arc::new(responder),
        }
    }

    pub(crate) fn sent(&self) -> Vec<Command> {
        self.sent.lock().expect("sent log").clone()
    }
}

impl WorkerLink for ScriptedWorker {
    fn send(&self, command: &Command) -> Result<(), SidecarError> {
        self.sent.lock().expect("sent log").push(command.clone());
        for event in (self.responder)(command) {
            self.events.dispatch(&event);
        }
        Ok(())
    }

    fn events(&self) -> &Arc<EventBroadcaster> {
        &self.events
    }
}

/// Hands out the scripted worker and counts lifecycle calls.
pub(crate) struct ScriptedBackend {
    pub(crate) worker: ScriptedWorker,
    pub(crate) connects: AtomicUsize,
    pub(crate) releases: AtomicUsize,
}

impl ScriptedBackend {
    pub(crate) fn new(worker: ScriptedWorker) -> Self {
        Self {
            worker,
            connects: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        }
    }
}

impl Backend for ScriptedBackend {
    type Link = ScriptedWorker;

    fn connect(&self, _config: &Config) -> Result<Self::Link, AppError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.worker.clone())
    }

    fn release(&self, _link: &Self::Link) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Loader returning a fixed configuration.
pub(crate) struct StaticLoader(pub(crate) Config);

impl ConfigLoader for StaticLoader {
    fn load(&self, _args: &[std::ffi::OsString]) -> Result<Config, AppError> {
        Ok(self.0.clone())
    }
}
