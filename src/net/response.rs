//! Buffered HTTP response.
//!
//! A [`Response`] holds the status line, headers and final URL of a response next to its
//! [`Body`]. Responses come out of [`FetchClient::fetch`](crate::net::FetchClient::fetch), but
//! can also be built directly, e.g. to answer a request from a cache.
//!
//! ## Notes
//! - Status `1223` is reported by some legacy hosts for `204 No Content` and is normalized.
//! - `ok` is derived from the status once, at construction.
use http::header::LOCATION;

use crate::body::{Body, BodyInit, PayloadCarrier};
use crate::config::Capabilities;
use crate::errors::FetchError;
use crate::headers::Headers;

const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseType {
    #[default]
    Default,
    /// A network error, see [`Response::error`]
    Error,
}

/// Status line and metadata of a new response.
#[derive(Debug, Clone)]
pub struct ResponseInit {
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    /// Final URL, empty when unknown
    pub url: String,
}

impl Default for ResponseInit {
    fn default() -> Self {
        Self {
            status: 200,
            status_text: "OK".to_string(),
            headers: Headers::new(),
            url: String::new(),
        }
    }
}

#[derive(Debug)]
pub struct Response {
    response_type: ResponseType,
    /// Numeric HTTP status code (e.g., `200`, `404`), `0` for network errors
    status: u16,
    status_text: String,
    headers: Headers,
    url: String,
    body: Body,
}

impl Response {
    pub fn new(body: impl Into<BodyInit>, init: ResponseInit) -> Result<Self, FetchError> {
        Self::with_capabilities(body, init, &Capabilities::default())
    }

    pub fn with_capabilities(
        body: impl Into<BodyInit>,
        init: ResponseInit,
        caps: &Capabilities,
    ) -> Result<Self, FetchError> {
        let status = match init.status {
            1223 => 204,
            s => s,
        };
        let mut headers = init.headers;
        let body = Body::new(body, &mut headers, caps)?;

        Ok(Self {
            response_type: ResponseType::Default,
            status,
            status_text: init.status_text,
            headers,
            url: init.url,
            body,
        })
    }

    /// A response standing for a network error: status `0`, no status text and no body.
    pub fn error() -> Self {
        Self::error_with_capabilities(&Capabilities::default())
    }

    /// [`error`](Self::error) for a host with the given capabilities.
    pub fn error_with_capabilities(caps: &Capabilities) -> Self {
        Self {
            response_type: ResponseType::Error,
            status: 0,
            status_text: String::new(),
            headers: Headers::new(),
            url: String::new(),
            body: Body::empty(caps),
        }
    }

    /// A bodiless redirect to `url`. Only the redirect statuses 301, 302, 303, 307 and 308 are
    /// accepted.
    pub fn redirect(url: &str, status: u16) -> Result<Self, FetchError> {
        Self::redirect_with_capabilities(url, status, &Capabilities::default())
    }

    /// [`redirect`](Self::redirect) for a host with the given capabilities.
    pub fn redirect_with_capabilities(url: &str, status: u16, caps: &Capabilities) -> Result<Self, FetchError> {
        if !REDIRECT_STATUSES.contains(&status) {
            return Err(FetchError::InvalidStatus(status));
        }
        let mut headers = Headers::new();
        headers.set_header(LOCATION, url);

        Ok(Self {
            response_type: ResponseType::Default,
            status,
            status_text: "OK".to_string(),
            headers,
            url: String::new(),
            body: Body::empty(caps),
        })
    }

    pub fn response_type(&self) -> ResponseType {
        self.response_type
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// True for a 2xx status.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Copies the response with a fresh body built from the original body value.
    pub fn try_clone(&self) -> Result<Self, FetchError> {
        let mut headers = self.headers.clone();
        let body = self.body.try_clone(&mut headers)?;
        Ok(Self {
            response_type: self.response_type,
            status: self.status,
            status_text: self.status_text.clone(),
            headers,
            url: self.url.clone(),
            body,
        })
    }
}

impl PayloadCarrier for Response {
    fn body(&self) -> &Body {
        &self.body
    }
}
