//! Resolution of the worker executable.

use std::env;
use std::path::{Path, PathBuf};

use hostbridge_config::Config;
use tracing::debug;

use crate::error::SidecarError;

const LOCATE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::locate");

/// Platform file name of the worker binary.
pub const WORKER_BINARY: &str = if cfg!(windows) {
    "uploader.exe"
} else {
    "uploader"
};

/// Searches an ordered list of directories for the worker binary.
///
/// An explicit override short-circuits the search: when configured it is the
/// only candidate.
#[derive(Debug, Clone)]
pub struct WorkerLocator {
    binary: String,
    explicit: Option<PathBuf>,
    directories: Vec<PathBuf>,
}

impl WorkerLocator {
    /// Creates a locator that searches `directories` for `binary`.
    #[must_use]
    pub fn new(binary: impl Into<String>, directories: Vec<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            explicit: None,
            directories,
        }
    }

    /// Builds the default search: the configured path if any, otherwise the
    /// running executable's directory followed by the working directory.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let mut directories = Vec::new();
        if let Some(dir) = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            directories.push(dir);
        }
        if let Ok(cwd) = env::current_dir() {
            directories.push(cwd);
        }
        let locator = Self::new(WORKER_BINARY, directories);
        match config.worker_path() {
            Some(path) => locator.with_explicit(path),
            None => locator,
        }
    }

    /// Pins the search to a single explicit path.
    #[must_use]
    pub fn with_explicit(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    /// Returns the paths that are checked, in order.
    #[must_use]
    pub fn candidates(&self) -> Vec<PathBuf> {
        match &self.explicit {
            Some(path) => vec![path.clone()],
            None => self
                .directories
                .iter()
                .map(|dir| dir.join(&self.binary))
                .collect(),
        }
    }

    /// Returns the first candidate that exists as a file.
    ///
    /// # Errors
    ///
    /// Returns [`SidecarError::BinaryNotFound`] listing every candidate when
    /// none exists.
    pub fn locate(&self) -> Result<PathBuf, SidecarError> {
        let searched = self.candidates();
        if let Some(found) = searched.iter().find(|path| path.is_file()) {
            debug!(target: LOCATE_TARGET, path = %found.display(), "located worker binary");
            return Ok(found.clone());
        }
        Err(SidecarError::BinaryNotFound {
            binary: self.binary.clone(),
            searched,
        })
    }
}
