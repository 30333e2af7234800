//! Unit tests for the registry and the built-in uploaders.

use std::collections::BTreeMap;
use std::sync::Arc;

use hostbridge_protocol::{HttpMethod, MultipartField, ResponseType};
use hostbridge_sidecar::CreatedGallery;
use rstest::{fixture, rstest};

use super::*;
use crate::error::DispatchError;
use crate::test_support::{MockGalleries, NoGalleries};

const TEMPLATE: &str = "/photos/cover.jpg";

fn config(entries: &[(&str, &str)]) -> ServiceConfig {
    entries.iter().copied().collect()
}

fn creds(entries: &[(&str, &str)]) -> Credentials {
    entries.iter().copied().collect()
}

fn text(value: &str) -> Option<MultipartField> {
    Some(MultipartField::text(value))
}

#[fixture]
fn registry() -> UploaderRegistry {
    UploaderRegistry::with_builtins()
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[rstest]
fn builtins_are_registered(registry: UploaderRegistry) {
    assert_eq!(
        registry.ids(),
        [
            "imagebam.com",
            "imx.to",
            "pixhost.to",
            "turboimagehost",
            "vipr.im"
        ]
    );
    assert_eq!(registry.len(), 5);
}

#[rstest]
fn register_rejects_duplicate(mut registry: UploaderRegistry) {
    let err = registry
        .register(Arc::new(ImxUploader))
        .expect_err("duplicate should fail");
    assert!(matches!(err, DispatchError::DuplicateService { ref service } if service == "imx.to"));
}

#[rstest]
fn require_reports_unknown_service(registry: UploaderRegistry) {
    let Err(err) = registry.require("example.invalid") else {
        panic!("unknown service should be rejected");
    };
    assert!(err.to_string().contains("example.invalid"));
    assert!(registry.require("imx.to").is_ok());
}

#[rstest]
#[case("pixhost.to", true, true)]
#[case("imx.to", true, true)]
#[case("imagebam.com", false, true)]
#[case("turboimagehost", false, true)]
#[case("vipr.im", false, false)]
fn capabilities_match_destination(
    registry: UploaderRegistry,
    #[case] id: &str,
    #[case] prepares: bool,
    #[case] builds: bool,
) {
    let uploader = registry.require(id).expect("registered");
    assert_eq!(uploader.group_preparer().is_some(), prepares);
    assert_eq!(uploader.spec_builder().is_some(), builds);
    assert!(uploader.cover_thumbnail_size().is_some());
}

// ---------------------------------------------------------------------------
// Request builders
// ---------------------------------------------------------------------------

#[test]
fn pixhost_spec_carries_optional_gallery() {
    let spec = PixhostUploader
        .build_http_spec(
            TEMPLATE,
            &config(&[("content_type", "Adult"), ("gallery_hash", "abc")]),
            &Credentials::new(),
        )
        .expect("builds");
    assert!(spec.validate().is_ok());
    assert_eq!(spec.url(), "https://api.pixhost.to/images");
    let fields = spec.multipart_fields();
    assert_eq!(fields.get("img").cloned(), Some(MultipartField::file(TEMPLATE)));
    assert_eq!(fields.get("content_type").cloned(), text("1"));
    assert_eq!(fields.get("max_th_size").cloned(), text("200"));
    assert_eq!(fields.get("gallery_hash").cloned(), text("abc"));
    assert_eq!(spec.parser().url_path(), "show_url");

    let plain = PixhostUploader
        .build_http_spec(TEMPLATE, &ServiceConfig::new(), &Credentials::new())
        .expect("builds");
    assert!(!plain.multipart_fields().contains_key("gallery_hash"));
}

#[rstest]
#[case(&[], "2", "1")]
#[case(&[("thumbnail_size", "300"), ("thumbnail_format", "Square")], "4", "3")]
#[case(&[("thumbnail_size", "999")], "2", "1")]
fn imx_spec_maps_thumbnail_settings(
    #[case] entries: &[(&str, &str)],
    #[case] size: &str,
    #[case] format: &str,
) {
    let spec = ImxUploader
        .build_http_spec(TEMPLATE, &config(entries), &creds(&[("imx_api", "key")]))
        .expect("builds");
    assert!(spec.validate().is_ok());
    assert_eq!(spec.headers().get("X-API-KEY").map(String::as_str), Some("key"));
    let fields = spec.multipart_fields();
    assert_eq!(fields.get("thumbnail_size").cloned(), text(size));
    assert_eq!(fields.get("thumb_size_contaner").cloned(), text(size));
    assert_eq!(fields.get("thumbnail_format").cloned(), text(format));
    assert_eq!(spec.parser().status_path(), "status");
    assert_eq!(spec.parser().success_value(), "success");
}

#[test]
fn imagebam_spec_chains_four_steps() {
    let spec = ImageBamUploader
        .build_http_spec(
            TEMPLATE,
            &config(&[("thumbnail_size", "300")]),
            &creds(&[("imagebam_user", "me@example.com"), ("imagebam_pass", "pw")]),
        )
        .expect("builds");
    assert!(spec.validate().is_ok());

    let actions: Vec<&str> = spec.steps().iter().map(|step| step.action()).collect();
    assert_eq!(
        actions,
        ["get_login_csrf", "submit_login", "get_api_csrf", "get_upload_token"]
    );
    let session = spec.steps().last().expect("upload token step");
    assert_eq!(session.method(), HttpMethod::Post);
    assert_eq!(session.response_kind(), ResponseType::Json);
    assert_eq!(
        session.form_fields().get("thumbnail_size").map(String::as_str),
        Some("4")
    );
    assert_eq!(
        spec.multipart_fields().get("upload_session").cloned(),
        Some(MultipartField::dynamic("upload_token"))
    );
}

#[test]
fn imagebam_requires_credentials() {
    let err = ImageBamUploader
        .build_http_spec(TEMPLATE, &ServiceConfig::new(), &Credentials::new())
        .expect_err("credentials required");
    assert!(matches!(err, UploaderError::MissingCredentials { .. }));
}

#[rstest]
#[case(&[], 1)]
#[case(&[("turbo_user", "me"), ("turbo_pass", "pw")], 2)]
fn turbo_spec_adds_login_only_with_credentials(
    #[case] entries: &[(&str, &str)],
    #[case] steps: usize,
) {
    let spec = TurboUploader
        .build_http_spec(TEMPLATE, &ServiceConfig::new(), &creds(entries))
        .expect("builds");
    assert!(spec.validate().is_ok());
    assert_eq!(spec.steps().len(), steps);
    assert_eq!(
        spec.steps().last().map(|step| step.action()),
        Some("get_endpoint")
    );
    assert!(spec.url().contains("upload_id="));
    assert!(
        spec.parser()
            .url_template()
            .is_some_and(|template| template.contains("{id}"))
    );
}

#[test]
fn turbo_upload_ids_differ_per_build() {
    let build = || {
        TurboUploader
            .build_http_spec(TEMPLATE, &ServiceConfig::new(), &Credentials::new())
            .expect("builds")
            .url()
            .to_owned()
    };
    assert_ne!(build(), build());
}

// ---------------------------------------------------------------------------
// Group preparation
// ---------------------------------------------------------------------------

fn vacation() -> GroupAssignment {
    GroupAssignment::new("[2024] Vacation", ["/a.jpg"])
}

#[test]
fn imx_creates_gallery_named_after_group() {
    let mut galleries = MockGalleries::new();
    galleries
        .expect_create_gallery()
        .withf(|service: &str, name: &str, _creds: &BTreeMap<String, String>| {
            service == "imx.to" && name == "2024 Vacation"
        })
        .times(1)
        .returning(|_, _, _| Some(CreatedGallery::Id(String::from("g42"))));

    let created = ImxUploader
        .prepare_group(
            &vacation(),
            &ServiceConfig::new(),
            &creds(&[("imx_user", "me"), ("imx_pass", "pw")]),
            &galleries,
        )
        .expect("prepares");
    assert_eq!(created, Some(CreatedGallery::Id(String::from("g42"))));
}

#[rstest]
#[case(&[("gallery_id", "manual")], &[("imx_user", "me"), ("imx_pass", "pw")])]
#[case(&[], &[("imx_user", "me")])]
fn imx_skips_gallery_creation(
    #[case] settings: &[(&str, &str)],
    #[case] credentials: &[(&str, &str)],
) {
    let galleries = MockGalleries::new();
    let created = ImxUploader
        .prepare_group(&vacation(), &config(settings), &creds(credentials), &galleries)
        .expect("prepares");
    assert_eq!(created, None);
}

#[test]
fn pixhost_creates_gallery_only_when_enabled() {
    let disabled = PixhostUploader
        .prepare_group(
            &vacation(),
            &ServiceConfig::new(),
            &Credentials::new(),
            &MockGalleries::new(),
        )
        .expect("prepares");
    assert_eq!(disabled, None);

    let err = PixhostUploader
        .prepare_group(
            &vacation(),
            &config(&[("auto_gallery", "true")]),
            &Credentials::new(),
            &NoGalleries,
        )
        .expect_err("creation fails");
    assert!(matches!(err, UploaderError::Preparation { .. }));
}
