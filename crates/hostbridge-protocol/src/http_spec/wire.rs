//! Nested JSON encoding of [`HttpRequestSpec`] understood by the worker.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    HttpMethod, HttpRequestSpec, MultipartField, PreRequestStep, ResponseParser, ResponseType,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct WireHttpSpec {
    url: String,
    #[serde(default)]
    method: HttpMethod,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    multipart_fields: BTreeMap<String, MultipartField>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    form_fields: BTreeMap<String, String>,
    #[serde(default)]
    response_parser: ResponseParser,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pre_request: Option<Box<WireStep>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireStep {
    #[serde(default)]
    action: String,
    url: String,
    #[serde(default)]
    method: HttpMethod,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    form_fields: BTreeMap<String, String>,
    #[serde(default)]
    use_cookies: bool,
    #[serde(default)]
    extract_fields: BTreeMap<String, String>,
    #[serde(default)]
    response_type: ResponseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    follow_up_request: Option<Box<WireStep>>,
}

impl WireStep {
    fn from_step(step: PreRequestStep, follow_up_request: Option<Box<Self>>) -> Self {
        Self {
            action: step.action,
            url: step.url,
            method: step.method,
            headers: step.headers,
            form_fields: step.form_fields,
            use_cookies: step.use_cookies,
            extract_fields: step.extract_fields,
            response_type: step.response_type,
            follow_up_request,
        }
    }

    fn split(self) -> (PreRequestStep, Option<Box<Self>>) {
        let step = PreRequestStep {
            action: self.action,
            url: self.url,
            method: self.method,
            headers: self.headers,
            form_fields: self.form_fields,
            use_cookies: self.use_cookies,
            extract_fields: self.extract_fields,
            response_type: self.response_type,
        };
        (step, self.follow_up_request)
    }
}

impl From<HttpRequestSpec> for WireHttpSpec {
    fn from(spec: HttpRequestSpec) -> Self {
        let pre_request = spec
            .steps
            .into_iter()
            .rev()
            .fold(None, |next, step| Some(Box::new(WireStep::from_step(step, next))));
        Self {
            url: spec.url,
            method: spec.method,
            headers: spec.headers,
            multipart_fields: spec.multipart_fields,
            form_fields: spec.form_fields,
            response_parser: spec.response_parser,
            pre_request,
        }
    }
}

impl From<WireHttpSpec> for HttpRequestSpec {
    fn from(wire: WireHttpSpec) -> Self {
        let mut steps = Vec::new();
        let mut cursor = wire.pre_request;
        while let Some(node) = cursor {
            let (step, next) = (*node).split();
            steps.push(step);
            cursor = next;
        }
        Self {
            url: wire.url,
            method: wire.method,
            headers: wire.headers,
            multipart_fields: wire.multipart_fields,
            form_fields: wire.form_fields,
            response_parser: wire.response_parser,
            steps,
        }
    }
}
