//! pixhost.to: a single multipart POST with an optional gallery hash.

use hostbridge_protocol::{HttpRequestSpec, MultipartField, ResponseParser};
use hostbridge_sidecar::{CreatedGallery, GalleryService};

use super::{GroupPreparer, HttpSpecBuilder, Uploader, create_group_gallery};
use crate::error::UploaderError;
use crate::group::GroupAssignment;
use crate::settings::{Credentials, ServiceConfig};

const UPLOAD_URL: &str = "https://api.pixhost.to/images";

/// Uploader for pixhost.to.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixhostUploader;

impl Uploader for PixhostUploader {
    fn id(&self) -> &str {
        "pixhost.to"
    }

    fn name(&self) -> &str {
        "Pixhost.to"
    }

    fn cover_thumbnail_size(&self) -> Option<&str> {
        Some("500")
    }

    fn group_preparer(&self) -> Option<&dyn GroupPreparer> {
        Some(self)
    }

    fn spec_builder(&self) -> Option<&dyn HttpSpecBuilder> {
        Some(self)
    }
}

impl GroupPreparer for PixhostUploader {
    fn gallery_key(&self) -> &str {
        "gallery_hash"
    }

    fn prepare_group(
        &self,
        group: &GroupAssignment,
        config: &ServiceConfig,
        creds: &Credentials,
        galleries: &dyn GalleryService,
    ) -> Result<Option<CreatedGallery>, UploaderError> {
        if !config.flag("auto_gallery") || config.get(self.gallery_key()).is_some() {
            return Ok(None);
        }
        create_group_gallery(self.id(), group, creds, galleries)
    }
}

impl HttpSpecBuilder for PixhostUploader {
    fn build_http_spec(
        &self,
        template_file: &str,
        config: &ServiceConfig,
        _creds: &Credentials,
    ) -> Result<HttpRequestSpec, UploaderError> {
        let content_type = if config.get("content_type") == Some("Adult") {
            "1"
        } else {
            "0"
        };
        let mut spec = HttpRequestSpec::post(UPLOAD_URL)
            .multipart("img", MultipartField::file(template_file))
            .multipart("content_type", MultipartField::text(content_type))
            .multipart(
                "max_th_size",
                MultipartField::text(config.get_or("thumbnail_size", "200")),
            )
            .response_parser(ResponseParser::json("show_url", "th_url"));
        if let Some(hash) = config.get("gallery_hash") {
            spec = spec.multipart("gallery_hash", MultipartField::text(hash));
        }
        Ok(spec)
    }
}
