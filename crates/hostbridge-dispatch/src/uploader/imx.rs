//! imx.to: API-key upload with mapped thumbnail size and format ids.

use hostbridge_protocol::{HttpRequestSpec, MultipartField, ResponseParser};
use hostbridge_sidecar::{CreatedGallery, GalleryService};
use tracing::{info, warn};

use super::{GroupPreparer, HttpSpecBuilder, Uploader, create_group_gallery};
use crate::error::UploaderError;
use crate::group::GroupAssignment;
use crate::legacy::{imx_format_id, imx_size_id};
use crate::settings::{Credentials, ServiceConfig};

const IMX_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::uploader::imx");
const UPLOAD_URL: &str = "https://api.imx.to/v1/upload.php";

/// Uploader for imx.to.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImxUploader;

impl Uploader for ImxUploader {
    fn id(&self) -> &str {
        "imx.to"
    }

    fn name(&self) -> &str {
        "IMX.to"
    }

    fn cover_thumbnail_size(&self) -> Option<&str> {
        Some("300")
    }

    fn group_preparer(&self) -> Option<&dyn GroupPreparer> {
        Some(self)
    }

    fn spec_builder(&self) -> Option<&dyn HttpSpecBuilder> {
        Some(self)
    }
}

impl GroupPreparer for ImxUploader {
    fn gallery_key(&self) -> &str {
        "gallery_id"
    }

    fn prepare_group(
        &self,
        group: &GroupAssignment,
        config: &ServiceConfig,
        creds: &Credentials,
        galleries: &dyn GalleryService,
    ) -> Result<Option<CreatedGallery>, UploaderError> {
        if let Some(manual) = config.get(self.gallery_key()) {
            info!(target: IMX_TARGET, gallery_id = manual, "using manual gallery id");
            return Ok(None);
        }
        if !creds.has_all(&["imx_user", "imx_pass"]) {
            warn!(
                target: IMX_TARGET,
                group = group.title(),
                "no imx credentials; the service will file uploads under an untitled gallery"
            );
            return Ok(None);
        }
        create_group_gallery(self.id(), group, creds, galleries)
    }
}

impl HttpSpecBuilder for ImxUploader {
    fn build_http_spec(
        &self,
        template_file: &str,
        config: &ServiceConfig,
        creds: &Credentials,
    ) -> Result<HttpRequestSpec, UploaderError> {
        let size = imx_size_id(Some(config.get_or("thumbnail_size", "180")));
        let format = imx_format_id(Some(config.get_or("thumbnail_format", "Fixed Width")));
        let mut spec = HttpRequestSpec::post(UPLOAD_URL)
            .header("X-API-KEY", creds.get("imx_api").unwrap_or_default())
            .multipart("image", MultipartField::file(template_file))
            .multipart("format", MultipartField::text("json"))
            .multipart("adult", MultipartField::text("1"))
            .multipart("upload_type", MultipartField::text("file"))
            .multipart("simple_upload", MultipartField::text("Upload"))
            .multipart("thumbnail_size", MultipartField::text(size))
            .multipart("thumb_size_contaner", MultipartField::text(size))
            .multipart("thumbnail_format", MultipartField::text(format))
            .response_parser(
                ResponseParser::json("data.image_url", "data.thumbnail_url")
                    .with_success("status", "success"),
            );
        if let Some(gallery_id) = config.get("gallery_id") {
            spec = spec.multipart("gallery_id", MultipartField::text(gallery_id));
        }
        Ok(spec)
    }
}
