//! Error types for uploaders and the dispatcher.

use std::io;
use std::sync::Arc;

use hostbridge_protocol::SpecError;
use thiserror::Error;

/// Failures raised by an uploader while preparing a group or building a
/// request description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploaderError {
    /// The request chain the uploader produced is inconsistent.
    #[error("invalid request spec: {0}")]
    InvalidSpec(#[from] SpecError),

    /// The destination needs credentials that were not supplied.
    #[error("{service} requires credentials: {keys}")]
    MissingCredentials {
        /// Destination identifier.
        service: String,
        /// Comma-separated credential keys that are required.
        keys: String,
    },

    /// The per-group hook could not complete.
    #[error("could not prepare group '{group}': {message}")]
    Preparation {
        /// Group title.
        group: String,
        /// Human-readable reason.
        message: String,
    },
}

/// Failures raised while looking up uploaders or starting a batch.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// No uploader is registered under the requested identifier.
    #[error("unknown upload service '{service}'")]
    UnknownService {
        /// Requested identifier.
        service: String,
    },

    /// An uploader with the same identifier is already registered.
    #[error("upload service '{service}' is already registered")]
    DuplicateService {
        /// Conflicting identifier.
        service: String,
    },

    /// A batch thread could not be started.
    #[error("failed to start {thread} thread: {source}")]
    Spawn {
        /// Name of the thread.
        thread: &'static str,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}
