//! Declarative description of the HTTP exchange the worker performs per file.
//!
//! An [`HttpRequestSpec`] is the final upload request plus an ordered list of
//! [`PreRequestStep`]s (login, token discovery and so on) replayed before it.
//! Values a step extracts can be referenced by later steps through
//! `{name}` placeholders and by the upload body through
//! [`MultipartField::Dynamic`].
//!
//! On the wire the steps are nested as `pre_request` → `follow_up_request`;
//! that encoding lives in the private `wire` module and is applied through
//! serde's `into`/`from` container attributes, so in memory the chain is
//! always a flat `Vec`.

mod wire;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::SpecError;

/// HTTP verb, serialised in upper case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    #[default]
    Post,
    /// `PUT`
    Put,
}

/// Body format a step or upload response is parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Parse as JSON and address values with dotted paths.
    #[default]
    Json,
    /// Parse as HTML and address values with CSS selectors or `regex:` rules.
    Html,
}

/// One multipart form field of the upload request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum MultipartField {
    /// The file being uploaded; the worker substitutes the actual path.
    File(String),
    /// A literal text value.
    Text(String),
    /// A value extracted by one of the pre-request steps.
    Dynamic(String),
}

impl MultipartField {
    /// Shorthand for [`MultipartField::Text`].
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Shorthand for [`MultipartField::File`].
    #[must_use]
    pub fn file(path: impl Into<String>) -> Self {
        Self::File(path.into())
    }

    /// Shorthand for [`MultipartField::Dynamic`].
    #[must_use]
    pub fn dynamic(reference: impl Into<String>) -> Self {
        Self::Dynamic(reference.into())
    }
}

/// How the worker turns an upload response into image and thumbnail URLs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResponseParser {
    #[serde(rename = "type", default)]
    kind: ResponseType,
    #[serde(default)]
    url_path: String,
    #[serde(default)]
    thumb_path: String,
    #[serde(default)]
    status_path: String,
    #[serde(default)]
    success_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thumb_template: Option<String>,
}

impl ResponseParser {
    /// Parser that reads the image and thumbnail URLs from JSON paths.
    #[must_use]
    pub fn json(url_path: impl Into<String>, thumb_path: impl Into<String>) -> Self {
        Self {
            kind: ResponseType::Json,
            url_path: url_path.into(),
            thumb_path: thumb_path.into(),
            ..Self::default()
        }
    }

    /// Requires `status_path` to equal `success_value` for the upload to count.
    #[must_use]
    pub fn with_success(
        mut self,
        status_path: impl Into<String>,
        success_value: impl Into<String>,
    ) -> Self {
        self.status_path = status_path.into();
        self.success_value = success_value.into();
        self
    }

    /// Builds the image URL from a template such as `https://host/p/{id}.html`.
    #[must_use]
    pub fn with_url_template(mut self, template: impl Into<String>) -> Self {
        self.url_template = Some(template.into());
        self
    }

    /// Builds the thumbnail URL from a template.
    #[must_use]
    pub fn with_thumb_template(mut self, template: impl Into<String>) -> Self {
        self.thumb_template = Some(template.into());
        self
    }

    /// Returns the response format.
    #[must_use]
    pub const fn kind(&self) -> ResponseType {
        self.kind
    }

    /// Returns the path to the image URL.
    #[must_use]
    pub const fn url_path(&self) -> &str {
        self.url_path.as_str()
    }

    /// Returns the path to the thumbnail URL.
    #[must_use]
    pub const fn thumb_path(&self) -> &str {
        self.thumb_path.as_str()
    }

    /// Returns the path to the status field.
    #[must_use]
    pub const fn status_path(&self) -> &str {
        self.status_path.as_str()
    }

    /// Returns the value `status_path` must hold on success.
    #[must_use]
    pub const fn success_value(&self) -> &str {
        self.success_value.as_str()
    }

    /// Returns the image URL template, if any.
    #[must_use]
    pub fn url_template(&self) -> Option<&str> {
        self.url_template.as_deref()
    }

    /// Returns the thumbnail URL template, if any.
    #[must_use]
    pub fn thumb_template(&self) -> Option<&str> {
        self.thumb_template.as_deref()
    }
}

/// A request replayed before the upload, typically to log in or discover a
/// token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreRequestStep {
    action: String,
    url: String,
    method: HttpMethod,
    headers: BTreeMap<String, String>,
    form_fields: BTreeMap<String, String>,
    use_cookies: bool,
    extract_fields: BTreeMap<String, String>,
    response_type: ResponseType,
}

impl PreRequestStep {
    /// Creates a step named `action` with no headers, fields or extractions.
    ///
    /// Cookies are kept by default so session state flows into later steps.
    #[must_use]
    pub fn new(action: impl Into<String>, method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            url: url.into(),
            method,
            headers: BTreeMap::new(),
            form_fields: BTreeMap::new(),
            use_cookies: true,
            extract_fields: BTreeMap::new(),
            response_type: ResponseType::Html,
        }
    }

    /// Shorthand for a `GET` step.
    #[must_use]
    pub fn get(action: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(action, HttpMethod::Get, url)
    }

    /// Shorthand for a `POST` step.
    #[must_use]
    pub fn post(action: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(action, HttpMethod::Post, url)
    }

    /// Adds a request header. Values may contain `{name}` placeholders; braces
    /// naming nothing extracted are sent verbatim.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds a URL-encoded form field. Values may contain `{name}` placeholders.
    #[must_use]
    pub fn form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_fields.insert(name.into(), value.into());
        self
    }

    /// Extracts `name` from the response using `selector`.
    #[must_use]
    pub fn extract(mut self, name: impl Into<String>, selector: impl Into<String>) -> Self {
        self.extract_fields.insert(name.into(), selector.into());
        self
    }

    /// Sets how the response is parsed.
    #[must_use]
    pub const fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    /// Enables or disables cookie persistence for this step.
    #[must_use]
    pub const fn use_cookies(mut self, use_cookies: bool) -> Self {
        self.use_cookies = use_cookies;
        self
    }

    /// Returns the step name.
    #[must_use]
    pub const fn action(&self) -> &str {
        self.action.as_str()
    }

    /// Returns the request URL.
    #[must_use]
    pub const fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns the HTTP method.
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    /// Returns the request headers.
    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Returns the form fields.
    #[must_use]
    pub const fn form_fields(&self) -> &BTreeMap<String, String> {
        &self.form_fields
    }

    /// Returns the extraction rules keyed by extracted name.
    #[must_use]
    pub const fn extract_fields(&self) -> &BTreeMap<String, String> {
        &self.extract_fields
    }

    /// Returns the response format.
    #[must_use]
    pub const fn response_kind(&self) -> ResponseType {
        self.response_type
    }

    /// Returns whether cookies are persisted.
    #[must_use]
    pub const fn keeps_cookies(&self) -> bool {
        self.use_cookies
    }

    fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.headers
            .values()
            .chain(self.form_fields.values())
            .chain(std::iter::once(&self.url))
            .flat_map(|value| placeholder_names(value.as_str()))
    }
}

/// The full request chain for uploading one file to one destination.
///
/// # Example
///
/// ```
/// use hostbridge_protocol::{HttpRequestSpec, MultipartField, ResponseParser};
///
/// let spec = HttpRequestSpec::post("https://api.example.test/upload")
///     .multipart("image", MultipartField::file("/photos/a.jpg"))
///     .multipart("format", MultipartField::text("json"))
///     .response_parser(ResponseParser::json("data.url", "data.thumb"));
/// assert!(spec.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "wire::WireHttpSpec", from = "wire::WireHttpSpec")]
pub struct HttpRequestSpec {
    url: String,
    method: HttpMethod,
    headers: BTreeMap<String, String>,
    multipart_fields: BTreeMap<String, MultipartField>,
    form_fields: BTreeMap<String, String>,
    response_parser: ResponseParser,
    steps: Vec<PreRequestStep>,
}

impl HttpRequestSpec {
    /// Creates an upload request with no fields or steps.
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: BTreeMap::new(),
            multipart_fields: BTreeMap::new(),
            form_fields: BTreeMap::new(),
            response_parser: ResponseParser::default(),
            steps: Vec::new(),
        }
    }

    /// Shorthand for a `POST` upload.
    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    /// Adds a header to the upload request.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds a multipart field to the upload request.
    #[must_use]
    pub fn multipart(mut self, name: impl Into<String>, field: MultipartField) -> Self {
        self.multipart_fields.insert(name.into(), field);
        self
    }

    /// Adds a URL-encoded form field to the upload request.
    #[must_use]
    pub fn form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_fields.insert(name.into(), value.into());
        self
    }

    /// Sets the response parser.
    #[must_use]
    pub fn response_parser(mut self, parser: ResponseParser) -> Self {
        self.response_parser = parser;
        self
    }

    /// Appends a pre-request step; steps run in insertion order.
    #[must_use]
    pub fn step(mut self, step: PreRequestStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Returns the upload URL.
    #[must_use]
    pub const fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns the upload method.
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    /// Returns the upload headers.
    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Returns the multipart fields.
    #[must_use]
    pub const fn multipart_fields(&self) -> &BTreeMap<String, MultipartField> {
        &self.multipart_fields
    }

    /// Returns the form fields.
    #[must_use]
    pub const fn form_fields(&self) -> &BTreeMap<String, String> {
        &self.form_fields
    }

    /// Returns the response parser.
    #[must_use]
    pub const fn parser(&self) -> &ResponseParser {
        &self.response_parser
    }

    /// Returns the pre-request steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[PreRequestStep] {
        &self.steps
    }

    /// Checks the chain is internally consistent.
    ///
    /// # Errors
    ///
    /// Returns a [`SpecError`] when a URL is empty, the body does not carry
    /// exactly one file field, a dynamic field references a value no step
    /// extracts, or a step uses a placeholder before the step extracting it
    /// has run. Placeholders naming nothing any step extracts are literal
    /// text and pass through untouched.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.url.trim().is_empty() {
            return Err(SpecError::EmptyUrl {
                location: String::from("upload request"),
            });
        }

        let extractable: BTreeSet<&str> = self
            .steps
            .iter()
            .flat_map(|step| step.extract_fields.keys().map(String::as_str))
            .collect();
        let mut extracted: BTreeSet<&str> = BTreeSet::new();
        for step in &self.steps {
            if step.url.trim().is_empty() {
                return Err(SpecError::EmptyUrl {
                    location: format!("step '{}'", step.action),
                });
            }
            if let Some(missing) = step
                .placeholders()
                .find(|name| extractable.contains(name) && !extracted.contains(name))
            {
                return Err(SpecError::UnresolvedPlaceholder {
                    step: step.action.clone(),
                    placeholder: missing.to_owned(),
                });
            }
            extracted.extend(step.extract_fields.keys().map(String::as_str));
        }

        let found = self
            .multipart_fields
            .values()
            .filter(|field| matches!(field, MultipartField::File(_)))
            .count();
        if found != 1 {
            return Err(SpecError::FileFieldCount { found });
        }

        for (field, value) in &self.multipart_fields {
            if let MultipartField::Dynamic(reference) = value
                && !extracted.contains(reference.as_str())
            {
                return Err(SpecError::UnknownDynamicReference {
                    field: field.clone(),
                    reference: reference.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Returns the `{name}` placeholders in `value`, where `name` is made of
/// ASCII alphanumerics and underscores.
fn placeholder_names(value: &str) -> impl Iterator<Item = &str> {
    value
        .split('{')
        .skip(1)
        .filter_map(|segment| segment.split_once('}').map(|(name, _)| name))
        .filter(|name| {
            !name.is_empty()
                && name
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        })
}
