//! The fixed-field `upload` job understood by workers without the generic
//! HTTP runner.
//!
//! Newer configuration keys (`thumbnail_size`, `thumbnail_format`,
//! `content_type`, `gallery_hash`) take precedence over the per-service
//! legacy keys they replaced.

use std::collections::BTreeMap;

use hostbridge_protocol::{Action, Command};

use crate::settings::{Credentials, ServiceConfig};

/// Maps a thumbnail width to the imx.to size id.
#[must_use]
pub fn imx_size_id(size: Option<&str>) -> &'static str {
    match size {
        Some("100") => "1",
        Some("150") => "6",
        Some("250") => "3",
        Some("300") => "4",
        _ => "2",
    }
}

/// Maps a thumbnail format name to the imx.to format id.
#[must_use]
pub fn imx_format_id(format: Option<&str>) -> &'static str {
    match format {
        Some("Fixed Height") => "4",
        Some("Proportional") => "2",
        Some("Square") => "3",
        _ => "1",
    }
}

/// Maps a thumbnail width to the imagebam.com size id.
#[must_use]
pub fn imagebam_size_id(size: Option<&str>) -> &'static str {
    match size {
        Some("100") => "1",
        Some("250") => "3",
        Some("300") => "4",
        _ => "2",
    }
}

/// Builds the legacy `upload` command for `files`.
#[must_use]
pub fn legacy_job(
    service: &str,
    files: &[String],
    config: &ServiceConfig,
    creds: &Credentials,
) -> Command {
    Command::new(Action::Upload, service)
        .with_files(files.iter().cloned())
        .with_creds(legacy_creds(creds))
        .with_config(legacy_config(service, config))
}

fn legacy_creds(creds: &Credentials) -> BTreeMap<String, String> {
    const PASSTHROUGH: [&str; 6] = [
        "vipr_user",
        "vipr_pass",
        "turbo_user",
        "turbo_pass",
        "imagebam_user",
        "imagebam_pass",
    ];
    let mut mapped = BTreeMap::new();
    mapped.insert(
        String::from("api_key"),
        creds.get("imx_api").unwrap_or_default().to_owned(),
    );
    for key in PASSTHROUGH {
        mapped.insert(key.to_owned(), creds.get(key).unwrap_or_default().to_owned());
    }
    mapped
}

fn legacy_config(service: &str, config: &ServiceConfig) -> BTreeMap<String, String> {
    let thumb = |legacy: &str| config.first_of(&["thumbnail_size", legacy]);
    let content = |legacy: &str| config.first_of(&["content_type", legacy]);
    let adult = |legacy: &str| content(legacy) == Some("Adult");

    let entries = [
        ("threads", config.threads_for(service)),
        ("imx_thumb_id", imx_size_id(thumb("imx_thumb"))),
        (
            "imx_format_id",
            imx_format_id(config.first_of(&["thumbnail_format", "imx_format"])),
        ),
        ("gallery_id", config.get_or("gallery_id", "")),
        ("pix_content", if adult("pix_content") { "1" } else { "0" }),
        ("pix_thumb", thumb("pix_thumb").unwrap_or("200")),
        (
            "pix_gallery_hash",
            config
                .first_of(&["gallery_hash", "pix_gallery_hash"])
                .unwrap_or_default(),
        ),
        ("vipr_thumb", thumb("vipr_thumb").unwrap_or("170x170")),
        ("vipr_gal_id", config.get_or("vipr_gal_id", "0")),
        (
            "turbo_content",
            if adult("turbo_content") { "adult" } else { "all" },
        ),
        ("turbo_thumb", thumb("turbo_thumb").unwrap_or("180")),
        (
            "ib_content",
            if adult("imagebam_content") { "nsfw" } else { "sfw" },
        ),
        ("ib_thumb", imagebam_size_id(thumb("imagebam_thumb"))),
    ];
    entries
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}
