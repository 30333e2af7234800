//! Errors raised while framing messages or validating request specs.

use std::sync::Arc;

use thiserror::Error;

/// Failures encountered while encoding or decoding protocol lines.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// The line contained only whitespace.
    #[error("empty protocol line")]
    EmptyLine,

    /// The line was not a valid JSON object of the expected shape.
    #[error("malformed protocol line: {source}")]
    Malformed {
        /// Underlying JSON error.
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// A message could not be serialised.
    #[error("failed to serialise message: {source}")]
    Serialize {
        /// Underlying JSON error.
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// Writing the encoded line failed.
    #[error("failed to write protocol line: {source}")]
    Io {
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

/// Reasons an [`HttpRequestSpec`](crate::HttpRequestSpec) is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    /// The upload request or a pre-request step has no URL.
    #[error("{location} has an empty url")]
    EmptyUrl {
        /// Which request in the chain was affected.
        location: String,
    },

    /// The multipart body does not contain exactly one file field.
    #[error("expected exactly one file field, found {found}")]
    FileFieldCount {
        /// Number of file fields present.
        found: usize,
    },

    /// A dynamic multipart field references a value no step extracts.
    #[error("dynamic field '{field}' references '{reference}' which no step extracts")]
    UnknownDynamicReference {
        /// Multipart field name.
        field: String,
        /// Referenced extraction name.
        reference: String,
    },

    /// A step uses a `{placeholder}` not extracted by an earlier step.
    #[error("step '{step}' uses placeholder '{placeholder}' before it is extracted")]
    UnresolvedPlaceholder {
        /// Step action name.
        step: String,
        /// Placeholder name.
        placeholder: String,
    },
}
