use crate::body::StorageKind;
use crate::config::{Capability, ConfigError};

/// Errors raised by a [`Body`](crate::body::Body), either while normalizing the initial value
/// or while materializing it.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("Unsupported BodyInit type: {0}")]
    UnsupportedBodyType(String),

    #[error("Already read")]
    AlreadyRead,

    #[error("Could not read {from} body as {to}")]
    UnreadableAsFormat { from: StorageKind, to: &'static str },

    #[error("Malformed form data: {0:?}")]
    MalformedFormData(String),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("{0} is not supported by this host")]
    CapabilityMissing(Capability),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("Invalid character in header field name: {0:?}")]
    InvalidHeaderName(String),
}

/// Errors raised by the envelope objects and the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error(transparent)]
    Body(#[from] BodyError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Body not allowed for {0} requests")]
    BodyNotAllowed(String),

    #[error("Invalid request method: {0}")]
    InvalidMethod(String),

    #[error("Invalid status code: {0}")]
    InvalidStatus(u16),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Network request failed: {0}")]
    NetworkFailed(String),

    #[error("Network request timeout")]
    Timeout,
}

impl FetchError {
    /// Returns true when the error is the single-consumption rejection of a body.
    pub fn is_already_read(&self) -> bool {
        matches!(self, FetchError::Body(BodyError::AlreadyRead))
    }
}
