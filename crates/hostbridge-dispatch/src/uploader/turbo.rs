//! turboimagehost: optional login, then endpoint discovery, then upload.

use hostbridge_protocol::{HttpRequestSpec, MultipartField, PreRequestStep, ResponseParser};
use uuid::Uuid;

use super::{HttpSpecBuilder, Uploader};
use crate::error::UploaderError;
use crate::settings::{Credentials, ServiceConfig};

const HOME_URL: &str = "https://www.turboimagehost.com/";
const LOGIN_URL: &str = "https://www.turboimagehost.com/login";
const UPLOAD_ENDPOINT: &str = "https://www.turboimagehost.com/upload_html5.tu";
const VIEWER_TEMPLATE: &str = "https://www.turboimagehost.com/p/{id}/{filename}.html";
const UPLOAD_ID_LEN: usize = 12;

/// Uploader for turboimagehost.com.
#[derive(Debug, Clone, Copy, Default)]
pub struct TurboUploader;

impl Uploader for TurboUploader {
    fn id(&self) -> &str {
        "turboimagehost"
    }

    fn name(&self) -> &str {
        "TurboImageHost"
    }

    fn cover_thumbnail_size(&self) -> Option<&str> {
        Some("600")
    }

    fn spec_builder(&self) -> Option<&dyn HttpSpecBuilder> {
        Some(self)
    }
}

impl HttpSpecBuilder for TurboUploader {
    fn build_http_spec(
        &self,
        template_file: &str,
        _config: &ServiceConfig,
        creds: &Credentials,
    ) -> Result<HttpRequestSpec, UploaderError> {
        let upload_id: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(UPLOAD_ID_LEN)
            .collect();
        let url = format!(
            "{UPLOAD_ENDPOINT}?upload_id={upload_id}&js_on=1&utype=reg&upload_type=file"
        );

        let mut spec = HttpRequestSpec::post(url);
        if let (Some(user), Some(password)) = (creds.get("turbo_user"), creds.get("turbo_pass")) {
            spec = spec.step(
                PreRequestStep::post("login", LOGIN_URL)
                    .form_field("username", user)
                    .form_field("password", password)
                    .form_field("login", "Login"),
            );
        }
        Ok(spec
            .step(
                PreRequestStep::get("get_endpoint", HOME_URL)
                    .extract("endpoint", r"regex:endpoint:\s*'([^']+)'"),
            )
            .multipart("qqfile", MultipartField::file(template_file))
            .response_parser(
                ResponseParser::json("", "")
                    .with_success("success", "true")
                    .with_url_template(VIEWER_TEMPLATE),
            ))
    }
}
