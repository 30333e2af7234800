//! Commands written to the worker's standard input.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::http_spec::HttpRequestSpec;

/// Operation requested from the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Check that credentials are accepted by a service.
    Verify,
    /// List the remote galleries of an account.
    ListGalleries,
    /// Create a remote gallery.
    CreateGallery,
    /// Finalise a gallery once uploads are complete.
    FinalizeGallery,
    /// Render a thumbnail for a local file.
    GenerateThumb,
    /// Upload files using the worker's built-in per-service logic.
    Upload,
    /// Upload files by replaying an [`HttpRequestSpec`].
    HttpUpload,
}

impl Action {
    /// Returns the wire name of the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Verify => "verify",
            Self::ListGalleries => "list_galleries",
            Self::CreateGallery => "create_gallery",
            Self::FinalizeGallery => "finalize_gallery",
            Self::GenerateThumb => "generate_thumb",
            Self::Upload => "upload",
            Self::HttpUpload => "http_upload",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command (or upload job) sent to the worker.
///
/// Built fresh for every request and never mutated after it is sent.
///
/// # Example
///
/// ```
/// use hostbridge_protocol::{Action, Command};
///
/// let job = Command::new(Action::Upload, "pixhost.to")
///     .with_files(["/photos/a.jpg", "/photos/b.jpg"])
///     .with_config_value("threads", "2");
/// assert_eq!(job.files().len(), 2);
/// assert_eq!(job.config().get("threads").map(String::as_str), Some("2"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    action: Action,
    #[serde(default)]
    service: String,
    #[serde(default)]
    files: Vec<String>,
    #[serde(default)]
    creds: BTreeMap<String, String>,
    #[serde(default)]
    config: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    http_spec: Option<HttpRequestSpec>,
    #[serde(default)]
    context_data: BTreeMap<String, String>,
}

impl Command {
    /// Creates a command for `service` with no files, credentials or config.
    #[must_use]
    pub fn new(action: Action, service: impl Into<String>) -> Self {
        Self {
            action,
            service: service.into(),
            files: Vec::new(),
            creds: BTreeMap::new(),
            config: BTreeMap::new(),
            http_spec: None,
            context_data: BTreeMap::new(),
        }
    }

    /// Replaces the file list.
    #[must_use]
    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the credentials map.
    #[must_use]
    pub fn with_creds(mut self, creds: BTreeMap<String, String>) -> Self {
        self.creds = creds;
        self
    }

    /// Replaces the config map.
    #[must_use]
    pub fn with_config(mut self, config: BTreeMap<String, String>) -> Self {
        self.config = config;
        self
    }

    /// Adds a single config entry.
    #[must_use]
    pub fn with_config_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Attaches the HTTP request description for `http_upload` jobs.
    #[must_use]
    pub fn with_http_spec(mut self, spec: HttpRequestSpec) -> Self {
        self.http_spec = Some(spec);
        self
    }

    /// Returns the action.
    #[must_use]
    pub const fn action(&self) -> Action {
        self.action
    }

    /// Returns the destination service identifier.
    #[must_use]
    pub const fn service(&self) -> &str {
        self.service.as_str()
    }

    /// Returns the files covered by this command.
    #[must_use]
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Returns the credentials.
    #[must_use]
    pub const fn creds(&self) -> &BTreeMap<String, String> {
        &self.creds
    }

    /// Returns the config map.
    #[must_use]
    pub const fn config(&self) -> &BTreeMap<String, String> {
        &self.config
    }

    /// Returns the HTTP request description, if any.
    #[must_use]
    pub const fn http_spec(&self) -> Option<&HttpRequestSpec> {
        self.http_spec.as_ref()
    }

    /// Returns the opaque context map forwarded to the worker.
    #[must_use]
    pub const fn context_data(&self) -> &BTreeMap<String, String> {
        &self.context_data
    }
}
