//! Request and response payloads.
//!
//! A [`Body`] is built from a [`BodyInit`] value. The [`classify`] step decides which storage form
//! the value is kept in, and the body can then be read exactly once as text, JSON, a [`Blob`], raw
//! bytes or [`FormData`].
mod blob;
mod body;
mod classify;
mod form_data;
mod init;
mod search_params;

pub use blob::Blob;
pub use body::{Body, BodyFuture, Payload, PayloadCarrier, StorageKind};
pub use classify::{classify, BodyKind, Classified};
pub use form_data::{decode, FormData, FormDataValue};
pub use init::{BodyInit, BufferView, HostValue, ViewKind};
pub use search_params::UrlSearchParams;
