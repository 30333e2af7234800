//! imagebam.com: login, CSRF and upload-session chain before the upload.

use hostbridge_protocol::{
    HttpRequestSpec, MultipartField, PreRequestStep, ResponseParser, ResponseType,
};

use super::{HttpSpecBuilder, Uploader};
use crate::error::UploaderError;
use crate::legacy::imagebam_size_id;
use crate::settings::{Credentials, ServiceConfig};

const LOGIN_URL: &str = "https://www.imagebam.com/auth/login";
const HOME_URL: &str = "https://www.imagebam.com/";
const SESSION_URL: &str = "https://www.imagebam.com/upload/session";
const UPLOAD_URL: &str = "https://www.imagebam.com/upload";
const CREDENTIAL_KEYS: [&str; 2] = ["imagebam_user", "imagebam_pass"];

/// Uploader for imagebam.com. Uploads require an account.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageBamUploader;

impl Uploader for ImageBamUploader {
    fn id(&self) -> &str {
        "imagebam.com"
    }

    fn name(&self) -> &str {
        "ImageBam"
    }

    fn cover_thumbnail_size(&self) -> Option<&str> {
        Some("300")
    }

    fn spec_builder(&self) -> Option<&dyn HttpSpecBuilder> {
        Some(self)
    }
}

impl HttpSpecBuilder for ImageBamUploader {
    fn build_http_spec(
        &self,
        template_file: &str,
        config: &ServiceConfig,
        creds: &Credentials,
    ) -> Result<HttpRequestSpec, UploaderError> {
        let (Some(user), Some(password)) =
            (creds.get("imagebam_user"), creds.get("imagebam_pass"))
        else {
            return Err(UploaderError::MissingCredentials {
                service: self.id().to_owned(),
                keys: CREDENTIAL_KEYS.join(", "),
            });
        };
        let content_type = if config.get("content_type") == Some("Adult") {
            "0"
        } else {
            "1"
        };
        let thumbnail_size = imagebam_size_id(Some(config.get_or("thumbnail_size", "180")));

        Ok(HttpRequestSpec::post(UPLOAD_URL)
            .step(
                PreRequestStep::get("get_login_csrf", LOGIN_URL)
                    .extract("login_token", "input[name='_token']"),
            )
            .step(
                PreRequestStep::post("submit_login", LOGIN_URL)
                    .form_field("_token", "{login_token}")
                    .form_field("email", user)
                    .form_field("password", password)
                    .form_field("remember", "on"),
            )
            .step(
                PreRequestStep::get("get_api_csrf", HOME_URL)
                    .extract("csrf_token", "meta[name='csrf-token']"),
            )
            .step(
                PreRequestStep::post("get_upload_token", SESSION_URL)
                    .header("X-Requested-With", "XMLHttpRequest")
                    .header("X-CSRF-TOKEN", "{csrf_token}")
                    .header("Content-Type", "application/x-www-form-urlencoded")
                    .form_field("content_type", content_type)
                    .form_field("thumbnail_size", thumbnail_size)
                    .extract("upload_token", "data")
                    .response_type(ResponseType::Json),
            )
            .multipart("files[0]", MultipartField::file(template_file))
            .multipart("upload_session", MultipartField::dynamic("upload_token"))
            .response_parser(ResponseParser::json(
                "files.0.sourceUrl",
                "files.0.thumbUrl",
            )))
    }
}
