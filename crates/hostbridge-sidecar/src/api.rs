//! Typed wrappers around the worker's request/response commands.

use std::collections::BTreeMap;
use std::time::Duration;

use hostbridge_config::Config;
use hostbridge_protocol::{Action, Command, Event};
use serde_json::Value;
use tracing::{info, warn};

use crate::correlator::RequestCorrelator;
use crate::link::WorkerLink;

const API_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::api");

/// Thumbnail replies are expected quickly; callers render placeholders
/// otherwise.
const THUMB_TIMEOUT: Duration = Duration::from_secs(2);

/// Outcome of a credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    accepted: bool,
    message: String,
}

impl Verification {
    /// Returns `true` when the service accepted the credentials.
    #[must_use]
    pub const fn accepted(&self) -> bool {
        self.accepted
    }

    /// Returns the worker's explanation.
    #[must_use]
    pub const fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// A remote gallery as listed by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gallery {
    id: String,
    name: String,
}

impl Gallery {
    /// Creates a gallery record.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Returns the service-side identifier.
    #[must_use]
    pub const fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the display name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }
}

/// Identifier(s) of a newly created gallery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatedGallery {
    /// Services that identify galleries with a single id.
    Id(String),
    /// Services that need a separate upload hash to finalise the gallery.
    Hashes {
        /// Public gallery hash.
        gallery_hash: String,
        /// Private hash used for uploading into and finalising the gallery.
        upload_hash: String,
    },
}

impl CreatedGallery {
    /// Returns the identifier uploads should reference.
    #[must_use]
    pub const fn id(&self) -> &str {
        match self {
            Self::Id(id) => id.as_str(),
            Self::Hashes { gallery_hash, .. } => gallery_hash.as_str(),
        }
    }

    fn from_reply(reply: &Event) -> Option<Self> {
        match reply.data() {
            Some(Value::String(id)) if !id.is_empty() => Some(Self::Id(id.clone())),
            Some(Value::Number(id)) => Some(Self::Id(id.to_string())),
            Some(Value::Object(map)) => {
                let gallery_hash = map.get("gallery_hash").and_then(Value::as_str)?;
                let upload_hash = map.get("gallery_upload_hash").and_then(Value::as_str)?;
                Some(Self::Hashes {
                    gallery_hash: gallery_hash.to_owned(),
                    upload_hash: upload_hash.to_owned(),
                })
            }
            _ => reply
                .msg()
                .filter(|msg| !msg.is_empty())
                .map(|msg| Self::Id(msg.to_owned())),
        }
    }
}

/// Gallery operations used while preparing and completing uploads.
pub trait GalleryService: Send + Sync {
    /// Creates a gallery named `name`. Returns `None` on any failure.
    fn create_gallery(
        &self,
        service: &str,
        name: &str,
        creds: &BTreeMap<String, String>,
    ) -> Option<CreatedGallery>;

    /// Finalises a gallery once its uploads are done.
    fn finalize_gallery(&self, service: &str, upload_hash: &str, gallery_hash: &str) -> bool;
}

/// Synchronous worker commands, each bounded by a timeout.
#[derive(Debug, Clone)]
pub struct WorkerApi<L> {
    correlator: RequestCorrelator<L>,
    verify_timeout: Duration,
    gallery_timeout: Duration,
}

impl<L: WorkerLink> WorkerApi<L> {
    /// Creates the API using the timeouts and mailbox size from `config`.
    #[must_use]
    pub fn new(link: L, config: &Config) -> Self {
        Self {
            correlator: RequestCorrelator::new(link, config.listener_capacity()),
            verify_timeout: config.verify_timeout(),
            gallery_timeout: config.gallery_timeout(),
        }
    }

    /// Returns the correlator backing this API.
    #[must_use]
    pub const fn correlator(&self) -> &RequestCorrelator<L> {
        &self.correlator
    }

    /// Asks the worker to check `creds` against `service`.
    pub fn verify_login(&self, service: &str, creds: &BTreeMap<String, String>) -> Verification {
        let command = Command::new(Action::Verify, service).with_creds(creds.clone());
        let reply = self.correlator.request(&command, self.verify_timeout);
        let accepted = reply.is_success();
        let fallback = if accepted { "OK" } else { "Failed" };
        Verification {
            accepted,
            message: reply.msg().unwrap_or(fallback).to_owned(),
        }
    }

    /// Lists the account's galleries. Failures yield an empty list.
    pub fn list_galleries(&self, service: &str, creds: &BTreeMap<String, String>) -> Vec<Gallery> {
        let command = Command::new(Action::ListGalleries, service).with_creds(creds.clone());
        let reply = self.correlator.request(&command, self.gallery_timeout);
        if !reply.is_success() {
            warn!(
                target: API_TARGET,
                service,
                msg = reply.msg().unwrap_or_default(),
                "gallery listing failed"
            );
            return Vec::new();
        }
        reply
            .data()
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(gallery_from_value).collect())
            .unwrap_or_default()
    }

    /// Renders a thumbnail `width` pixels wide and returns it base64-encoded.
    pub fn generate_thumb(&self, file: &str, width: u32) -> Option<String> {
        let command = Command::new(Action::GenerateThumb, "")
            .with_files([file])
            .with_config_value("width", width.to_string());
        let reply = self
            .correlator
            .request_matching(&command, THUMB_TIMEOUT, |event| {
                event.file().is_none_or(|reply_file| reply_file == file)
            });
        if !reply.is_success() {
            return None;
        }
        reply
            .data()
            .and_then(Value::as_str)
            .filter(|data| !data.is_empty())
            .map(str::to_owned)
    }
}

impl<L: WorkerLink> GalleryService for WorkerApi<L> {
    fn create_gallery(
        &self,
        service: &str,
        name: &str,
        creds: &BTreeMap<String, String>,
    ) -> Option<CreatedGallery> {
        let command = Command::new(Action::CreateGallery, service)
            .with_creds(creds.clone())
            .with_config_value("gallery_name", name);
        let reply = self.correlator.request(&command, self.gallery_timeout);
        if !reply.is_success() {
            warn!(
                target: API_TARGET,
                service,
                gallery = name,
                msg = reply.msg().unwrap_or_default(),
                "gallery creation failed"
            );
            return None;
        }
        let created = CreatedGallery::from_reply(&reply);
        if let Some(gallery) = &created {
            info!(
                target: API_TARGET,
                service,
                gallery = name,
                id = gallery.id(),
                "gallery created"
            );
        }
        created
    }

    fn finalize_gallery(&self, service: &str, upload_hash: &str, gallery_hash: &str) -> bool {
        if upload_hash.is_empty() || gallery_hash.is_empty() {
            return false;
        }
        let command = Command::new(Action::FinalizeGallery, service)
            .with_config_value("gallery_upload_hash", upload_hash)
            .with_config_value("gallery_hash", gallery_hash);
        self.correlator
            .request(&command, self.verify_timeout)
            .is_success()
    }
}

fn gallery_from_value(value: &Value) -> Option<Gallery> {
    let id = value.get("id").and_then(scalar_text)?;
    let name = value
        .get("name")
        .and_then(scalar_text)
        .unwrap_or_else(|| id.clone());
    Some(Gallery { id, name })
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use hostbridge_protocol::EventKind;
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::test_support::ScriptedLink;

    fn api(replies: Vec<Event>) -> WorkerApi<ScriptedLink> {
        let config = Config {
            verify_timeout_secs: 1,
            gallery_timeout_secs: 1,
            ..Config::default()
        };
        WorkerApi::new(ScriptedLink::replying(replies), &config)
    }

    fn creds() -> BTreeMap<String, String> {
        BTreeMap::from([(String::from("imx_api"), String::from("key"))])
    }

    #[rstest]
    #[case("success", Some("Logged in"), true, "Logged in")]
    #[case("success", None, true, "OK")]
    #[case("failed", Some("Bad password"), false, "Bad password")]
    #[case("failed", None, false, "Failed")]
    fn verify_login_reports_outcome(
        #[case] status: &str,
        #[case] msg: Option<&str>,
        #[case] accepted: bool,
        #[case] message: &str,
    ) {
        let mut reply = Event::new(EventKind::Result).with_status(status);
        if let Some(msg) = msg {
            reply = reply.with_msg(msg);
        }
        let api = api(vec![reply]);

        let outcome = api.verify_login("imx.to", &creds());
        assert_eq!(outcome.accepted(), accepted);
        assert_eq!(outcome.message(), message);

        let sent = api.correlator().link().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent.first().map(Command::action), Some(Action::Verify));
        assert_eq!(sent.first().map(|c| c.creds().clone()), Some(creds()));
    }

    #[test]
    fn verify_timeout_is_a_failure() {
        let api = api(Vec::new());
        let outcome = api.verify_login("imx.to", &creds());
        assert!(!outcome.accepted());
        assert_eq!(outcome.message(), "Timeout");
    }

    #[test]
    fn list_galleries_parses_data_array() {
        let api = api(vec![
            Event::new(EventKind::Data)
                .with_status("success")
                .with_data(json!([
                    {"id": "12", "name": "Holiday"},
                    {"id": 7, "name": "Numbers"},
                    {"name": "no id"},
                ])),
        ]);
        let galleries = api.list_galleries("vipr.im", &creds());
        assert_eq!(
            galleries,
            vec![Gallery::new("12", "Holiday"), Gallery::new("7", "Numbers")]
        );
    }

    #[test]
    fn list_galleries_failure_is_empty() {
        let api = api(vec![Event::error("login failed")]);
        assert!(api.list_galleries("vipr.im", &creds()).is_empty());
    }

    #[rstest]
    #[case(json!("g123"), CreatedGallery::Id(String::from("g123")))]
    #[case(
        json!({"gallery_hash": "abc", "gallery_upload_hash": "up"}),
        CreatedGallery::Hashes {
            gallery_hash: String::from("abc"),
            upload_hash: String::from("up"),
        }
    )]
    fn create_gallery_accepts_both_reply_shapes(
        #[case] data: Value,
        #[case] expected: CreatedGallery,
    ) {
        let api = api(vec![
            Event::new(EventKind::Result)
                .with_status("success")
                .with_data(data),
        ]);
        assert_eq!(
            api.create_gallery("pixhost.to", "Vacation", &BTreeMap::new()),
            Some(expected)
        );
        let sent = api.correlator().link().sent();
        assert_eq!(
            sent.first()
                .and_then(|c| c.config().get("gallery_name").cloned()),
            Some(String::from("Vacation"))
        );
    }

    #[test]
    fn create_gallery_falls_back_to_message_id() {
        let api = api(vec![
            Event::new(EventKind::Result)
                .with_status("success")
                .with_msg("g9"),
        ]);
        assert_eq!(
            api.create_gallery("imx.to", "Vacation", &creds()),
            Some(CreatedGallery::Id(String::from("g9")))
        );
    }

    #[rstest]
    #[case("", "hash")]
    #[case("upload", "")]
    fn finalize_without_hashes_sends_nothing(#[case] upload: &str, #[case] gallery: &str) {
        let api = api(vec![Event::new(EventKind::Result).with_status("success")]);
        assert!(!api.finalize_gallery("pixhost.to", upload, gallery));
        assert!(api.correlator().link().sent().is_empty());
    }

    #[test]
    fn finalize_reports_success() {
        let api = api(vec![Event::new(EventKind::Result).with_status("success")]);
        assert!(api.finalize_gallery("pixhost.to", "upload", "hash"));
    }

    #[test]
    fn generate_thumb_ignores_other_files() {
        let api = api(vec![
            Event::new(EventKind::Data)
                .with_status("success")
                .with_file("/other.jpg")
                .with_data(json!("b3RoZXI=")),
            Event::new(EventKind::Data)
                .with_status("success")
                .with_file("/mine.jpg")
                .with_data(json!("bWluZQ==")),
        ]);
        assert_eq!(
            api.generate_thumb("/mine.jpg", 100),
            Some(String::from("bWluZQ=="))
        );
        let sent = api.correlator().link().sent();
        assert_eq!(
            sent.first().and_then(|c| c.config().get("width").cloned()),
            Some(String::from("100"))
        );
    }
}
