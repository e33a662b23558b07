use std::fmt;
use std::time::Duration;

use crate::body::{Body, BodyInit, PayloadCarrier};
use crate::config::Capabilities;
use crate::errors::{BodyError, FetchError};
use crate::headers::Headers;

/// Methods whose capitalization is normalized. Any other method is kept as given.
const NORMALIZED_METHODS: [&str; 6] = ["DELETE", "GET", "HEAD", "OPTIONS", "POST", "PUT"];

fn normalize_method(method: &str) -> String {
    let upper = method.to_ascii_uppercase();
    if NORMALIZED_METHODS.contains(&upper.as_str()) {
        upper
    } else {
        method.to_string()
    }
}

/// Whether cookies and other credentials are sent along.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Credentials {
    #[default]
    Omit,
    SameOrigin,
    Include,
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Omit => write!(f, "omit"),
            Credentials::SameOrigin => write!(f, "same-origin"),
            Credentials::Include => write!(f, "include"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Cors,
    NoCors,
    SameOrigin,
    Navigate,
}

impl fmt::Display for RequestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestMode::Cors => write!(f, "cors"),
            RequestMode::NoCors => write!(f, "no-cors"),
            RequestMode::SameOrigin => write!(f, "same-origin"),
            RequestMode::Navigate => write!(f, "navigate"),
        }
    }
}

/// What a request is built from: a URL, or another request whose settings are inherited.
#[derive(Debug, Clone, Copy)]
pub enum RequestInput<'a> {
    Url(&'a str),
    Request(&'a Request),
}

impl<'a> From<&'a str> for RequestInput<'a> {
    fn from(url: &'a str) -> Self {
        RequestInput::Url(url)
    }
}

impl<'a> From<&'a String> for RequestInput<'a> {
    fn from(url: &'a String) -> Self {
        RequestInput::Url(url)
    }
}

impl<'a> From<&'a url::Url> for RequestInput<'a> {
    fn from(url: &'a url::Url) -> Self {
        RequestInput::Url(url.as_str())
    }
}

impl<'a> From<&'a Request> for RequestInput<'a> {
    fn from(request: &'a Request) -> Self {
        RequestInput::Request(request)
    }
}

/// Settings for a new request. Anything left unset is inherited from the input request, or
/// falls back to the defaults.
#[derive(Debug, Clone, Default)]
pub struct RequestInit {
    pub method: Option<String>,
    pub headers: Option<Headers>,
    /// An empty body takes over the input request's body, if any
    pub body: BodyInit,
    pub credentials: Option<Credentials>,
    pub mode: Option<RequestMode>,
    /// Overrides the client timeout for this request
    pub timeout: Option<Duration>,
}

impl RequestInit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn body(mut self, body: impl Into<BodyInit>) -> Self {
        self.body = body.into();
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn mode(mut self, mode: RequestMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// An empty string counts as no body, like an absent one.
fn carries_payload(init: &BodyInit) -> bool {
    match init {
        BodyInit::Empty => false,
        BodyInit::Text(s) => !s.is_empty(),
        _ => true,
    }
}

/// An outgoing HTTP request.
#[derive(Debug)]
pub struct Request {
    url: String,
    method: String,
    credentials: Credentials,
    mode: Option<RequestMode>,
    headers: Headers,
    timeout: Option<Duration>,
    body: Body,
}

impl Request {
    /// Builds a request with every host capability available.
    pub fn new<'a>(input: impl Into<RequestInput<'a>>, init: RequestInit) -> Result<Self, FetchError> {
        Self::with_capabilities(input, init, &Capabilities::default())
    }

    /// Builds a request for a host with the given capabilities.
    ///
    /// When `input` is a request, its URL, method, credentials, mode and headers are inherited
    /// unless `init` overrides them. If `init` has no body, the input's body is taken over and
    /// the input is marked as used; an input whose body was already used is rejected.
    pub fn with_capabilities<'a>(
        input: impl Into<RequestInput<'a>>,
        init: RequestInit,
        caps: &Capabilities,
    ) -> Result<Self, FetchError> {
        let mut body = init.body;

        let (url, method, credentials, mode, headers, timeout) = match input.into() {
            RequestInput::Url(url) => (url.to_string(), None, None, None, None, None),
            RequestInput::Request(source) => {
                if source.body_used() {
                    return Err(BodyError::AlreadyRead.into());
                }
                if !carries_payload(&body) && !source.body.init().is_empty() {
                    body = source.body.init().clone();
                    source.body.mark_used();
                }
                (
                    source.url.clone(),
                    Some(source.method.clone()),
                    Some(source.credentials),
                    source.mode,
                    Some(source.headers.clone()),
                    source.timeout,
                )
            }
        };

        let method = normalize_method(init.method.as_deref().or(method.as_deref()).unwrap_or("GET"));
        if (method == "GET" || method == "HEAD") && carries_payload(&body) {
            return Err(FetchError::BodyNotAllowed(method));
        }

        let mut headers = init.headers.or(headers).unwrap_or_default();
        let body = Body::new(body, &mut headers, caps)?;

        log::trace!("Request {method} {url} built with a {} body", body.storage_kind());

        Ok(Self {
            url,
            method,
            credentials: init.credentials.or(credentials).unwrap_or_default(),
            mode: init.mode.or(mode),
            headers,
            timeout: init.timeout.or(timeout),
            body,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn credentials(&self) -> Credentials {
        self.credentials
    }

    pub fn mode(&self) -> Option<RequestMode> {
        self.mode
    }

    /// Always `None`, referrers are not tracked.
    pub fn referrer(&self) -> Option<&str> {
        None
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Copies the request with a fresh body built from the original body value. Works after the
    /// body was read.
    pub fn try_clone(&self) -> Result<Self, FetchError> {
        let mut headers = self.headers.clone();
        let body = self.body.try_clone(&mut headers)?;
        Ok(Self {
            url: self.url.clone(),
            method: self.method.clone(),
            credentials: self.credentials,
            mode: self.mode,
            headers,
            timeout: self.timeout,
            body,
        })
    }
}

impl PayloadCarrier for Request {
    fn body(&self) -> &Body {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let req = Request::new("https://example.com/", RequestInit::new()).unwrap();
        assert_eq!(req.url(), "https://example.com/");
        assert_eq!(req.method(), "GET");
        assert_eq!(req.credentials(), Credentials::Omit);
        assert_eq!(req.mode(), None);
        assert_eq!(req.referrer(), None);
        assert!(req.headers().is_empty());
        assert!(!req.body_used());
    }

    #[test]
    fn standard_methods_are_upper_cased() {
        for (given, expected) in [("post", "POST"), ("Delete", "DELETE"), ("options", "OPTIONS"), ("patch", "patch")] {
            let req = Request::new("/x", RequestInit::new().method(given)).unwrap();
            assert_eq!(req.method(), expected);
        }
    }

    #[test]
    fn get_and_head_reject_bodies() {
        let err = Request::new("/x", RequestInit::new().body("data")).unwrap_err();
        assert!(matches!(err, FetchError::BodyNotAllowed(ref m) if m == "GET"));

        let err = Request::new("/x", RequestInit::new().method("head").body(vec![1u8])).unwrap_err();
        assert_eq!(err.to_string(), "Body not allowed for HEAD requests");

        // an empty string is no body
        assert!(Request::new("/x", RequestInit::new().body("")).is_ok());
    }

    #[tokio::test]
    async fn post_body_sets_content_type() {
        let req = Request::new("/x", RequestInit::new().method("POST").body("hello")).unwrap();
        assert_eq!(req.headers().get("content-type").unwrap(), Some("text/plain;charset=UTF-8"));
        assert_eq!(req.text().await.unwrap(), "hello");
        assert!(req.body_used());
    }

    #[tokio::test]
    async fn building_from_a_request_takes_over_its_body() {
        let mut headers = Headers::new();
        headers.set("X-Custom", "1").unwrap();
        let source = Request::new(
            "https://example.com/upload",
            RequestInit::new()
                .method("PUT")
                .headers(headers)
                .body("payload")
                .credentials(Credentials::Include)
                .mode(RequestMode::Cors),
        )
        .unwrap();

        let copy = Request::new(&source, RequestInit::new()).unwrap();
        assert!(source.body_used());
        assert_eq!(copy.url(), "https://example.com/upload");
        assert_eq!(copy.method(), "PUT");
        assert_eq!(copy.credentials(), Credentials::Include);
        assert_eq!(copy.mode(), Some(RequestMode::Cors));
        assert_eq!(copy.headers().get("x-custom").unwrap(), Some("1"));
        assert_eq!(copy.text().await.unwrap(), "payload");

        let err = Request::new(&source, RequestInit::new()).unwrap_err();
        assert!(err.is_already_read());
    }

    #[test]
    fn init_overrides_inherited_settings() {
        let source = Request::new("/a", RequestInit::new().method("POST").body("x")).unwrap();

        let mut headers = Headers::new();
        headers.set("accept", "*/*").unwrap();
        let copy = Request::new(&source, RequestInit::new().method("patch").headers(headers).body("y")).unwrap();

        // an explicit body leaves the source untouched
        assert!(!source.body_used());
        assert_eq!(copy.method(), "patch");
        assert!(!copy.headers().has("x-custom").unwrap());
        assert_eq!(copy.headers().get("accept").unwrap(), Some("*/*"));
    }

    #[tokio::test]
    async fn clone_after_consumption() {
        let req = Request::new("/x", RequestInit::new().method("POST").body("abc")).unwrap();
        assert_eq!(req.text().await.unwrap(), "abc");

        let copy = req.try_clone().unwrap();
        assert!(!copy.body_used());
        assert_eq!(copy.method(), "POST");
        assert_eq!(copy.text().await.unwrap(), "abc");
    }

    #[test]
    fn unsupported_body_fails_construction() {
        let err = Request::new("/x", RequestInit::new().method("POST").body(BodyInit::host(|| ()))).unwrap_err();
        assert!(matches!(err, FetchError::Body(BodyError::UnsupportedBodyType(_))));
    }
}
