pub mod body;
pub mod config;
pub mod errors;
pub mod headers;
pub mod net;

pub use body::{Blob, Body, BodyInit, FormData, PayloadCarrier, UrlSearchParams};
pub use config::{Capabilities, FetchConfig};
pub use errors::{BodyError, FetchError, HeaderError};
pub use headers::Headers;
pub use net::{FetchClient, Request, RequestInit, Response, ResponseInit};
