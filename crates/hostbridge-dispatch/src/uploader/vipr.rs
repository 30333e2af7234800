//! vipr.im, served by the worker's built-in legacy upload path.

use super::Uploader;

/// Uploader for vipr.im. It has no request builder, so its jobs always use
/// the legacy `upload` shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViprUploader;

impl Uploader for ViprUploader {
    fn id(&self) -> &str {
        "vipr.im"
    }

    fn name(&self) -> &str {
        "Vipr.im"
    }

    fn cover_thumbnail_size(&self) -> Option<&str> {
        Some("800x800")
    }
}
