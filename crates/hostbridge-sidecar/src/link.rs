//! The capability consumers need from a running worker.

use std::sync::Arc;

use hostbridge_protocol::Command;

use crate::broadcast::EventBroadcaster;
use crate::error::SidecarError;

/// Sends commands to the worker and exposes its event stream.
///
/// [`ProcessSupervisor`](crate::ProcessSupervisor) is the production
/// implementation; tests substitute in-memory links.
pub trait WorkerLink: Send + Sync {
    /// Writes one command line to the worker.
    ///
    /// # Errors
    ///
    /// Returns [`SidecarError`] when the command could not be delivered.
    fn send(&self, command: &Command) -> Result<(), SidecarError>;

    /// Returns the broadcaster carrying the worker's events.
    fn events(&self) -> &Arc<EventBroadcaster>;
}

impl<T: WorkerLink + ?Sized> WorkerLink for Arc<T> {
    fn send(&self, command: &Command) -> Result<(), SidecarError> {
        self.as_ref().send(command)
    }

    fn events(&self) -> &Arc<EventBroadcaster> {
        self.as_ref().events()
    }
}
