//! Classification of body init values.
//!
//! [`classify`] looks at a [`BodyInit`] once and returns a [`Classified`] view that borrows the
//! payload in the shape the body stores it. A kind is only recognized when the host supports it;
//! a blob handed to a host without blob support is simply unsupported.
use std::fmt;

use bytes::Bytes;

use crate::body::blob::Blob;
use crate::body::form_data::FormData;
use crate::body::init::{BodyInit, BufferView, HostValue};
use crate::body::search_params::UrlSearchParams;
use crate::config::Capabilities;

/// The classification of a body init value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Empty,
    Text,
    Blob,
    FormData,
    UrlSearchParams,
    DataView,
    ArrayBufferLike,
    Unsupported,
}

impl fmt::Display for BodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BodyKind::Empty => "empty",
            BodyKind::Text => "text",
            BodyKind::Blob => "blob",
            BodyKind::FormData => "form data",
            BodyKind::UrlSearchParams => "url search params",
            BodyKind::DataView => "data view",
            BodyKind::ArrayBufferLike => "array buffer",
            BodyKind::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// A classified init value, borrowing the payload from the value it was classified from.
#[derive(Debug, Clone, Copy)]
pub enum Classified<'a> {
    Empty,
    Text(&'a str),
    Blob(&'a Blob),
    FormData(&'a FormData),
    UrlSearchParams(&'a UrlSearchParams),
    DataView(&'a BufferView),
    /// Raw buffers and typed views, already narrowed to the bytes inside the view
    ArrayBufferLike(&'a [u8]),
    /// Name of the type that could not be classified
    Unsupported(&'static str),
}

impl Classified<'_> {
    pub fn kind(&self) -> BodyKind {
        match self {
            Classified::Empty => BodyKind::Empty,
            Classified::Text(_) => BodyKind::Text,
            Classified::Blob(_) => BodyKind::Blob,
            Classified::FormData(_) => BodyKind::FormData,
            Classified::UrlSearchParams(_) => BodyKind::UrlSearchParams,
            Classified::DataView(_) => BodyKind::DataView,
            Classified::ArrayBufferLike(_) => BodyKind::ArrayBufferLike,
            Classified::Unsupported(_) => BodyKind::Unsupported,
        }
    }
}

/// Classifies `value` against the capabilities of the host.
///
/// Checks run in order: text, blob, form data, search params, data view, buffer or typed view.
pub fn classify<'a>(value: &'a BodyInit, caps: &Capabilities) -> Classified<'a> {
    match value {
        BodyInit::Empty => Classified::Empty,
        BodyInit::Text(s) => Classified::Text(s),
        BodyInit::Blob(b) if caps.blob => Classified::Blob(b),
        BodyInit::FormData(f) if caps.form_data => Classified::FormData(f),
        BodyInit::SearchParams(p) if caps.search_params => Classified::UrlSearchParams(p),
        BodyInit::View(v) => classify_view(v, caps).unwrap_or(Classified::Unsupported(value.type_name())),
        BodyInit::ArrayBuffer(b) if caps.array_buffer => Classified::ArrayBufferLike(b),
        BodyInit::Host(h) => classify_host(h, caps),
        other => Classified::Unsupported(other.type_name()),
    }
}

fn classify_view<'a>(view: &'a BufferView, caps: &Capabilities) -> Option<Classified<'a>> {
    // Data views become blobs for transmission, so they also need blob support
    if view.is_data_view() && caps.data_view && caps.array_buffer && caps.blob {
        return Some(Classified::DataView(view));
    }
    if caps.array_buffer {
        return Some(Classified::ArrayBufferLike(view.as_slice()));
    }
    None
}

fn classify_host<'a>(host: &'a HostValue, caps: &Capabilities) -> Classified<'a> {
    if let Some(s) = host.downcast_ref::<String>() {
        return Classified::Text(s);
    }
    if let Some(s) = host.downcast_ref::<&'static str>() {
        return Classified::Text(s);
    }
    if caps.blob {
        if let Some(b) = host.downcast_ref::<Blob>() {
            return Classified::Blob(b);
        }
    }
    if caps.form_data {
        if let Some(f) = host.downcast_ref::<FormData>() {
            return Classified::FormData(f);
        }
    }
    if caps.search_params {
        if let Some(p) = host.downcast_ref::<UrlSearchParams>() {
            return Classified::UrlSearchParams(p);
        }
    }
    if let Some(v) = host.downcast_ref::<BufferView>() {
        if let Some(c) = classify_view(v, caps) {
            return c;
        }
    }
    if caps.array_buffer {
        if let Some(b) = host.downcast_ref::<Bytes>() {
            return Classified::ArrayBufferLike(b);
        }
        if let Some(v) = host.downcast_ref::<Vec<u8>>() {
            return Classified::ArrayBufferLike(v);
        }
    }
    Classified::Unsupported(host.type_name())
}
