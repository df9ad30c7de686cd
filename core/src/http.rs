//! HTTP request/response data and the transport seam.
//!
//! # Design
//! Requests and responses are plain data. `ProjectClient` builds an
//! `HttpRequest` for every operation with pure `build_*` methods, then hands
//! it to a `Transport` for the actual round trip. The default transport is a
//! blocking `ureq` agent; tests substitute an in-memory one.
//!
//! Every call on the platform API is a form-encoded POST to one endpoint, so
//! a request is just the endpoint URL plus an ordered list of form fields.
//! Repeated keys are allowed and preserve order.

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::Result;

/// Upper bound on a response body read into memory. PDF exports across every
/// record can be large, so this sits well above ureq's 10 MB default.
const MAX_BODY_BYTES: u64 = 512 * 1024 * 1024;

/// A form-encoded POST described as plain data.
#[derive(Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub fields: Vec<(String, String)>,
}

impl HttpRequest {
    pub(crate) fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            fields: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push((key.into(), value.into()));
    }

    pub(crate) fn push_opt(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.push(key, value);
        }
    }

    /// First value sent under `key`.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value sent under `key`, in order.
    pub fn values(&self, key: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Field names in the order they are sent.
    pub fn keys(&self) -> Vec<&str> {
        self.fields.iter().map(|(k, _)| k.as_str()).collect()
    }
}

// The body always carries the project token, so it never reaches Debug output.
impl std::fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<(&str, &str)> = self
            .fields
            .iter()
            .map(|(k, v)| {
                if k == "token" {
                    (k.as_str(), "<redacted>")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect();
        f.debug_struct("HttpRequest")
            .field("url", &self.url)
            .field("fields", &fields)
            .finish()
    }
}

/// A response described as plain data.
///
/// Most operations hand this straight back to the caller, who decides what
/// the status and body mean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// The platform signals success with exactly 200.
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Body as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Executes a form POST and returns the response as data.
///
/// Implementations must not treat non-2xx statuses as errors; only failures
/// to complete the round trip are `Err`.
pub trait Transport {
    fn post_form(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post_form(&self, request: &HttpRequest) -> Result<HttpResponse> {
        (**self).post_form(request)
    }
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn post_form(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let form = request
            .fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()));
        let mut response = self.agent.post(&request.url).send_form(form)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), header_text(value)))
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_vec()?;
        debug!(status, bytes = body.len(), "received response");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Header value as text, keeping non-ASCII bytes rather than dropping them.
fn header_text(value: &ureq::http::HeaderValue) -> String {
    String::from_utf8_lossy(value.as_bytes()).into_owned()
}
