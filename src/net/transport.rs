mod reqwest;

use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use http::{HeaderMap, Method};

use crate::errors::FetchError;
use crate::headers::Headers;
use crate::net::request::Credentials;

pub use self::reqwest::ReqwestTransport;

pub type TransportFuture = BoxFuture<'static, Result<TransportResponse, FetchError>>;

/// A request as handed to the transport. The body is already encoded.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: url::Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub credentials: Credentials,
    pub timeout: Option<Duration>,
}

/// A fully buffered response received by the transport.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    /// Reason phrase, `"Unknown"` for non-standard codes
    pub status_text: String,
    pub headers: Headers,
    /// Final URL after redirects, if the transport knows it
    pub url: Option<String>,
    pub body: Bytes,
}

// A transport sends one request over whatever network primitive the host provides.
pub trait Transport: Send + Sync {
    // Sends the request and buffers the complete response. Timeouts resolve to
    // `FetchError::Timeout`, everything else that keeps a response from arriving to
    // `FetchError::NetworkFailed`.
    fn send(&self, request: TransportRequest) -> TransportFuture;
}
