//! Values a body can be built from.
//!
//! [`BodyInit`] is the union of everything a host hands over as a payload. Most callers build it
//! through the `From` impls. [`HostValue`] carries values that arrive type-erased from script or
//! FFI glue; the classifier resolves those once when the body is created.
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::body::blob::Blob;
use crate::body::form_data::FormData;
use crate::body::search_params::UrlSearchParams;

/// Element type of a [`BufferView`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    /// Untyped view, reads are done per byte offset
    DataView,
}

impl ViewKind {
    /// Size in bytes of one element.
    pub fn element_size(&self) -> usize {
        match self {
            ViewKind::Int8 | ViewKind::Uint8 | ViewKind::Uint8Clamped | ViewKind::DataView => 1,
            ViewKind::Int16 | ViewKind::Uint16 => 2,
            ViewKind::Int32 | ViewKind::Uint32 | ViewKind::Float32 => 4,
            ViewKind::Float64 => 8,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ViewKind::Int8 => "Int8Array",
            ViewKind::Uint8 => "Uint8Array",
            ViewKind::Uint8Clamped => "Uint8ClampedArray",
            ViewKind::Int16 => "Int16Array",
            ViewKind::Uint16 => "Uint16Array",
            ViewKind::Int32 => "Int32Array",
            ViewKind::Uint32 => "Uint32Array",
            ViewKind::Float32 => "Float32Array",
            ViewKind::Float64 => "Float64Array",
            ViewKind::DataView => "DataView",
        }
    }
}

/// A typed or untyped window onto a shared byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferView {
    kind: ViewKind,
    buffer: Bytes,
    byte_offset: usize,
    byte_length: usize,
}

impl BufferView {
    /// Creates a view of `byte_length` bytes starting at `byte_offset`.
    ///
    /// Returns `None` when the window does not fit in `buffer` or is not a whole number of
    /// elements.
    pub fn new(kind: ViewKind, buffer: Bytes, byte_offset: usize, byte_length: usize) -> Option<Self> {
        let end = byte_offset.checked_add(byte_length)?;
        if end > buffer.len() || byte_length % kind.element_size() != 0 {
            return None;
        }
        Some(Self { kind, buffer, byte_offset, byte_length })
    }

    /// A view over the whole of `buffer`.
    pub fn whole(kind: ViewKind, buffer: Bytes) -> Option<Self> {
        let len = buffer.len();
        Self::new(kind, buffer, 0, len)
    }

    /// An untyped view over the whole of `buffer`.
    pub fn data_view(buffer: Bytes) -> Self {
        let byte_length = buffer.len();
        Self { kind: ViewKind::DataView, buffer, byte_offset: 0, byte_length }
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn is_data_view(&self) -> bool {
        self.kind == ViewKind::DataView
    }

    /// The complete underlying buffer, regardless of the window.
    pub fn buffer(&self) -> &Bytes {
        &self.buffer
    }

    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    /// The bytes inside the window.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[self.byte_offset..self.byte_offset + self.byte_length]
    }
}

/// A type-erased value handed over by the host.
#[derive(Clone)]
pub struct HostValue {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl HostValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            value: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostValue").field("type_name", &self.type_name).finish()
    }
}

/// The raw value a body is initialized with.
#[derive(Debug, Clone, Default)]
pub enum BodyInit {
    /// No body at all
    #[default]
    Empty,
    Text(String),
    Blob(Blob),
    FormData(FormData),
    SearchParams(UrlSearchParams),
    ArrayBuffer(Bytes),
    View(BufferView),
    Host(HostValue),
}

impl BodyInit {
    /// Wraps an arbitrary host value; it is classified when a body is built from it.
    pub fn host<T: Any + Send + Sync>(value: T) -> Self {
        BodyInit::Host(HostValue::new(value))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, BodyInit::Empty)
    }

    /// Name of the host type this value stands for, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            BodyInit::Empty => "null",
            BodyInit::Text(_) => "string",
            BodyInit::Blob(_) => "Blob",
            BodyInit::FormData(_) => "FormData",
            BodyInit::SearchParams(_) => "URLSearchParams",
            BodyInit::ArrayBuffer(_) => "ArrayBuffer",
            BodyInit::View(v) => v.kind().name(),
            BodyInit::Host(h) => h.type_name(),
        }
    }
}

impl From<&str> for BodyInit {
    fn from(s: &str) -> Self {
        BodyInit::Text(s.to_string())
    }
}

impl From<String> for BodyInit {
    fn from(s: String) -> Self {
        BodyInit::Text(s)
    }
}

impl From<Blob> for BodyInit {
    fn from(b: Blob) -> Self {
        BodyInit::Blob(b)
    }
}

impl From<FormData> for BodyInit {
    fn from(f: FormData) -> Self {
        BodyInit::FormData(f)
    }
}

impl From<UrlSearchParams> for BodyInit {
    fn from(p: UrlSearchParams) -> Self {
        BodyInit::SearchParams(p)
    }
}

impl From<Bytes> for BodyInit {
    fn from(b: Bytes) -> Self {
        BodyInit::ArrayBuffer(b)
    }
}

impl From<Vec<u8>> for BodyInit {
    fn from(v: Vec<u8>) -> Self {
        BodyInit::ArrayBuffer(Bytes::from(v))
    }
}

impl From<&[u8]> for BodyInit {
    fn from(s: &[u8]) -> Self {
        BodyInit::ArrayBuffer(Bytes::copy_from_slice(s))
    }
}

impl From<BufferView> for BodyInit {
    fn from(v: BufferView) -> Self {
        BodyInit::View(v)
    }
}

impl<T: Into<BodyInit>> From<Option<T>> for BodyInit {
    fn from(o: Option<T>) -> Self {
        o.map_or(BodyInit::Empty, Into::into)
    }
}
