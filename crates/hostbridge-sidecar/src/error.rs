//! Error types for worker supervision.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use hostbridge_protocol::CodecError;
use thiserror::Error;

/// Errors raised while locating, launching or talking to the worker.
#[derive(Debug, Clone, Error)]
pub enum SidecarError {
    /// The worker binary is absent from every candidate directory.
    #[error("worker binary '{binary}' not found; searched: {}", display_paths(.searched))]
    BinaryNotFound {
        /// File name that was searched for.
        binary: String,
        /// Candidate paths, in search order.
        searched: Vec<PathBuf>,
    },

    /// The worker binary exists but could not be started.
    #[error("failed to spawn worker {}: {message}", .program.display())]
    SpawnFailed {
        /// Program that failed to start.
        program: PathBuf,
        /// Description of the failure.
        message: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// A command could not be delivered to the worker.
    #[error("cannot send command to worker: {reason}")]
    CannotSend {
        /// Why the command was not delivered.
        reason: String,
    },

    /// The restart budget is exhausted and the worker will not be restarted.
    #[error("upload backend unavailable")]
    Unavailable,

    /// An I/O failure outside of spawning.
    #[error("worker I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// A command could not be encoded or written.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl SidecarError {
    pub(crate) fn cannot_send(reason: impl Into<String>) -> Self {
        Self::CannotSend {
            reason: reason.into(),
        }
    }
}

impl From<io::Error> for SidecarError {
    fn from(source: io::Error) -> Self {
        Self::Io {
            source: Arc::new(source),
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return String::from("<no candidates>");
    }
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
