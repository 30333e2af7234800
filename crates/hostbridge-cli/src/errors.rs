//! Error type for the CLI runtime.

use std::io;
use std::sync::Arc;

use hostbridge_dispatch::DispatchError;
use hostbridge_sidecar::SidecarError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("failed to start the upload worker: {0}")]
    Worker(#[from] SidecarError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("upload stopped: {message}")]
    BackendUnavailable { message: String },
    #[error("failed to serialise output: {0}")]
    Serialise(#[from] serde_json::Error),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}
