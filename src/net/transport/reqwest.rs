use futures::future::FutureExt;

use crate::config::FetchConfig;
use crate::errors::FetchError;
use crate::headers::Headers;
use crate::net::request::Credentials;
use crate::net::transport::{Transport, TransportFuture, TransportRequest, TransportResponse};

/// Transport backed by a [`reqwest::Client`].
///
/// Requests with `include` credentials go through a client that keeps a cookie store, all others
/// through a client without one.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ::reqwest::Client,
    cookie_client: ::reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_client(config, false)?,
            cookie_client: build_client(config, true)?,
        })
    }
}

fn build_client(config: &FetchConfig, cookies: bool) -> Result<::reqwest::Client, FetchError> {
    let mut builder = ::reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .cookie_store(cookies);
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(|e| FetchError::NetworkFailed(e.to_string()))
}

fn map_error(err: ::reqwest::Error) -> FetchError {
    if err.is_timeout() {
        log::warn!("Network request timed out: {err}");
        FetchError::Timeout
    } else {
        log::warn!("Network request failed: {err}");
        FetchError::NetworkFailed(err.to_string())
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: TransportRequest) -> TransportFuture {
        let client = match request.credentials {
            Credentials::Include => self.cookie_client.clone(),
            Credentials::Omit | Credentials::SameOrigin => self.client.clone(),
        };

        async move {
            let mut builder = client
                .request(request.method, request.url)
                .headers(request.headers);
            if let Some(timeout) = request.timeout {
                builder = builder.timeout(timeout);
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let res = builder.send().await.map_err(map_error)?;

            let status = res.status().as_u16();
            let status_text = res.status().canonical_reason().unwrap_or("Unknown").to_string();
            let headers = Headers::from(res.headers());
            let url = Some(res.url().to_string());

            // We don't do streaming
            let body = res.bytes().await.map_err(map_error)?;

            Ok(TransportResponse {
                status,
                status_text,
                headers,
                url,
                body,
            })
        }
        .boxed()
    }
}
