//! Uploader lookup by destination identifier.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{
    ImageBamUploader, ImxUploader, PixhostUploader, TurboUploader, Uploader, ViprUploader,
};
use crate::error::DispatchError;

/// Registry of available uploaders keyed by [`Uploader::id`]. Duplicate
/// registrations are rejected.
#[derive(Clone, Default)]
pub struct UploaderRegistry {
    uploaders: HashMap<String, Arc<dyn Uploader>>,
}

impl UploaderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in destination.
    #[must_use]
    pub fn with_builtins() -> Self {
        let builtins: [Arc<dyn Uploader>; 5] = [
            Arc::new(PixhostUploader),
            Arc::new(ImxUploader),
            Arc::new(ImageBamUploader),
            Arc::new(TurboUploader),
            Arc::new(ViprUploader),
        ];
        Self {
            uploaders: builtins
                .into_iter()
                .map(|uploader| (uploader.id().to_owned(), uploader))
                .collect(),
        }
    }

    /// Registers an uploader.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::DuplicateService`] when an uploader with the
    /// same identifier is already registered.
    pub fn register(&mut self, uploader: Arc<dyn Uploader>) -> Result<(), DispatchError> {
        let id = uploader.id().to_owned();
        if self.uploaders.contains_key(&id) {
            return Err(DispatchError::DuplicateService { service: id });
        }
        self.uploaders.insert(id, uploader);
        Ok(())
    }

    /// Looks up an uploader by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn Uploader>> {
        self.uploaders.get(id).cloned()
    }

    /// Looks up an uploader, failing when it is not registered.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownService`] for unregistered
    /// identifiers.
    pub fn require(&self, id: &str) -> Result<Arc<dyn Uploader>, DispatchError> {
        self.get(id).ok_or_else(|| DispatchError::UnknownService {
            service: id.to_owned(),
        })
    }

    /// Returns the registered identifiers in sorted order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.uploaders.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the number of registered uploaders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.uploaders.len()
    }

    /// Returns `true` when no uploaders are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uploaders.is_empty()
    }
}

impl fmt::Debug for UploaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploaderRegistry")
            .field("uploaders", &self.ids())
            .finish()
    }
}
