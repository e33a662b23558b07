//! Envelope objects and the transport layer.
//!
//! [`Request`] and [`Response`] wrap a [`Body`](crate::body::Body) with routing and status
//! metadata. A [`FetchClient`] sends requests through a [`Transport`], by default the
//! reqwest-backed [`ReqwestTransport`].
mod fetch;
mod request;
mod response;
mod transport;

pub use fetch::FetchClient;
pub use request::{Credentials, Request, RequestInit, RequestInput, RequestMode};
pub use response::{Response, ResponseInit, ResponseType};
pub use transport::{ReqwestTransport, Transport, TransportFuture, TransportRequest, TransportResponse};
