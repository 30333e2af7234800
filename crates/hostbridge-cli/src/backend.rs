//! Connection to the upload worker.

use std::sync::Arc;

use hostbridge_config::Config;
use hostbridge_sidecar::{ProcessSupervisor, WorkerLink};
use tracing::info;

use crate::errors::AppError;

const BACKEND_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::backend");

/// Provides a running worker for the duration of one command.
pub(crate) trait Backend {
    type Link: WorkerLink + Clone + 'static;

    /// Starts or attaches to the worker.
    fn connect(&self, config: &Config) -> Result<Self::Link, AppError>;

    /// Stops the worker once the command has finished.
    fn release(&self, link: &Self::Link);
}

/// Spawns the worker under a [`ProcessSupervisor`].
pub(crate) struct SupervisedBackend;

impl Backend for SupervisedBackend {
    type Link = Arc<ProcessSupervisor>;

    fn connect(&self, config: &Config) -> Result<Self::Link, AppError> {
        let supervisor = Arc::new(ProcessSupervisor::from_config(config));
        supervisor.start()?;
        info!(target: BACKEND_TARGET, "upload worker started");
        Ok(supervisor)
    }

    fn release(&self, link: &Self::Link) {
        link.shutdown();
    }
}
