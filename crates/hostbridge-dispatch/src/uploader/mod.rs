//! Destination capabilities and the built-in uploaders.
//!
//! Every destination implements [`Uploader`]. Optional behaviour is exposed
//! through capability sub-traits that the dispatcher looks up explicitly:
//! [`GroupPreparer`] runs once per group before its jobs are built, and
//! [`HttpSpecBuilder`] describes the request chain the worker's generic
//! HTTP runner replays. Destinations without a builder are sent as legacy
//! `upload` jobs.

mod imagebam;
mod imx;
mod pixhost;
mod registry;
mod turbo;
mod vipr;

#[cfg(test)]
mod tests;

use hostbridge_protocol::HttpRequestSpec;
use hostbridge_sidecar::{CreatedGallery, GalleryService};

pub use self::imagebam::ImageBamUploader;
pub use self::imx::ImxUploader;
pub use self::pixhost::PixhostUploader;
pub use self::registry::UploaderRegistry;
pub use self::turbo::TurboUploader;
pub use self::vipr::ViprUploader;
use crate::error::UploaderError;
use crate::group::GroupAssignment;
use crate::settings::{Credentials, ServiceConfig};

/// A destination that files can be uploaded to.
pub trait Uploader: Send + Sync {
    /// Stable identifier sent to the worker, for example `imx.to`.
    fn id(&self) -> &str;

    /// Display name.
    fn name(&self) -> &str;

    /// Thumbnail size applied to cover sub-jobs, when the destination has a
    /// dedicated cover size.
    fn cover_thumbnail_size(&self) -> Option<&str> {
        None
    }

    /// Returns the per-group hook, if the destination has one.
    fn group_preparer(&self) -> Option<&dyn GroupPreparer> {
        None
    }

    /// Returns the request builder, if the destination supports the generic
    /// HTTP runner.
    fn spec_builder(&self) -> Option<&dyn HttpSpecBuilder> {
        None
    }
}

/// Work performed once per group before its jobs are built, such as
/// creating a remote gallery named after the group.
pub trait GroupPreparer: Send + Sync {
    /// Configuration key that receives the identifier of a created gallery.
    fn gallery_key(&self) -> &str;

    /// Prepares `group`. Returns the gallery created for it, if any.
    ///
    /// `config` is the group's private copy; an identifier already present
    /// under [`gallery_key`](Self::gallery_key) means the user chose a
    /// gallery manually.
    ///
    /// # Errors
    ///
    /// Returns [`UploaderError`] when preparation fails. The group is still
    /// dispatched without a gallery.
    fn prepare_group(
        &self,
        group: &GroupAssignment,
        config: &ServiceConfig,
        creds: &Credentials,
        galleries: &dyn GalleryService,
    ) -> Result<Option<CreatedGallery>, UploaderError>;
}

/// Builds the request chain the worker replays for every file of a job.
pub trait HttpSpecBuilder: Send + Sync {
    /// Builds the request description using `template_file` as the file
    /// field value; the worker substitutes each job file in turn.
    ///
    /// # Errors
    ///
    /// Returns [`UploaderError`] when the request cannot be described with
    /// the given configuration and credentials.
    fn build_http_spec(
        &self,
        template_file: &str,
        config: &ServiceConfig,
        creds: &Credentials,
    ) -> Result<HttpRequestSpec, UploaderError>;
}

/// Creates a gallery named after `group`, without square brackets.
fn create_group_gallery(
    service: &str,
    group: &GroupAssignment,
    creds: &Credentials,
    galleries: &dyn GalleryService,
) -> Result<Option<CreatedGallery>, UploaderError> {
    let cleaned = group.title().replace(['[', ']'], "");
    let name = cleaned.trim();
    match galleries.create_gallery(service, name, creds.as_map()) {
        Some(created) => Ok(Some(created)),
        None => Err(UploaderError::Preparation {
            group: group.title().to_owned(),
            message: format!("{service} did not create gallery '{name}'"),
        }),
    }
}
