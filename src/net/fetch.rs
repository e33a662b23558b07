use std::sync::Arc;

use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::Method;

use crate::body::{Blob, BodyInit, PayloadCarrier};
use crate::config::FetchConfig;
use crate::errors::{BodyError, FetchError};
use crate::net::request::{Request, RequestInit, RequestInput};
use crate::net::response::{Response, ResponseInit};
use crate::net::transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};

/// Set by servers that want the final URL known on hosts that cannot report it.
const X_REQUEST_URL: HeaderName = HeaderName::from_static("x-request-url");

/// Sends requests through a [`Transport`] and wraps the results into [`Response`]s.
#[derive(Clone)]
pub struct FetchClient {
    config: FetchConfig,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for FetchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchClient").field("config", &self.config).finish_non_exhaustive()
    }
}

impl FetchClient {
    /// A client using the reqwest transport.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: FetchConfig, transport: impl Transport + 'static) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Builds a request from `input` and `init` and sends it.
    pub async fn fetch<'a>(
        &self,
        input: impl Into<RequestInput<'a>>,
        init: RequestInit,
    ) -> Result<Response, FetchError> {
        let request = Request::with_capabilities(input, init, &self.config.capabilities)?;
        self.send(&request).await
    }

    /// Sends `request`. A request whose body was already read is rejected.
    ///
    /// Sending consumes the body: a request with a body can be sent once, later attempts fail
    /// with `AlreadyRead`. Use [`Request::try_clone`] to send the same body again.
    pub async fn send(&self, request: &Request) -> Result<Response, FetchError> {
        if request.body_used() {
            return Err(BodyError::AlreadyRead.into());
        }

        let transport_request = self.to_transport_request(request)?;
        if !request.body().init().is_empty() {
            request.body().begin_read()?;
        }
        log::debug!("Fetching {} {}", transport_request.method, transport_request.url);

        let received = self.transport.send(transport_request).await?;
        log::debug!("Received {} {} from {}", received.status, received.status_text, request.url());

        self.to_response(received)
    }

    fn to_transport_request(&self, request: &Request) -> Result<TransportRequest, FetchError> {
        let url = url::Url::parse(request.url())?;
        let method = Method::from_bytes(request.method().as_bytes())
            .map_err(|_| FetchError::InvalidMethod(request.method().to_string()))?;

        let mut headers = request.headers().to_header_map();
        let payload = request.body().payload();
        let body = match payload {
            Some(payload) => {
                if let Some(ct) = payload.content_type {
                    if !headers.contains_key(CONTENT_TYPE) {
                        match HeaderValue::from_str(&ct) {
                            Ok(value) => {
                                headers.insert(CONTENT_TYPE, value);
                            }
                            Err(_) => log::warn!("Skipping unsendable content type {ct:?}"),
                        }
                    }
                }
                Some(payload.bytes)
            }
            None => None,
        };

        Ok(TransportRequest {
            method,
            url,
            headers,
            body,
            credentials: request.credentials(),
            timeout: request.timeout().or(self.config.timeout),
        })
    }

    fn to_response(&self, received: TransportResponse) -> Result<Response, FetchError> {
        let caps = self.config.capabilities;

        let url = received
            .url
            .filter(|u| !u.is_empty())
            .or_else(|| received.headers.get_header(&X_REQUEST_URL).map(str::to_string))
            .unwrap_or_default();

        // without blobs the host hands over the response already decoded as text
        let body: BodyInit = if caps.blob {
            let content_type = received.headers.get_header(&CONTENT_TYPE).unwrap_or_default();
            Blob::with_type(received.body, content_type).into()
        } else {
            String::from_utf8_lossy(&received.body).into_owned().into()
        };

        let init = ResponseInit {
            status: received.status,
            status_text: received.status_text,
            headers: received.headers,
            url,
        };
        Response::with_capabilities(body, init, &caps)
    }
}
