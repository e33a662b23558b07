//! Immutable binary blobs and the asynchronous reader used to materialize them.
use bytes::{Bytes, BytesMut};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// An immutable chunk of bytes with an optional MIME type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blob {
    data: Bytes,
    /// Lower-cased MIME type, empty when unknown
    mime_type: String,
}

/// Blob types are kept only when they are printable ASCII, and are lower-cased.
fn normalize_type(mime_type: &str) -> String {
    if mime_type.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
        mime_type.to_ascii_lowercase()
    } else {
        String::new()
    }
}

impl Blob {
    /// Creates an untyped blob.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into(), mime_type: String::new() }
    }

    pub fn with_type(data: impl Into<Bytes>, mime_type: &str) -> Self {
        Self { data: data.into(), mime_type: normalize_type(mime_type) }
    }

    /// Concatenates `parts` into a single blob.
    pub fn from_parts<I, P>(parts: I, mime_type: &str) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        let mut buf = BytesMut::new();
        for part in parts {
            buf.extend_from_slice(part.as_ref());
        }
        Self::with_type(buf.freeze(), mime_type)
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// MIME type, or `""` when unknown.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Raw bytes of the blob. Cheap, the storage is shared.
    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }

    /// Returns a new blob with the bytes in `start..end`, clamped to the blob size.
    pub fn slice(&self, start: usize, end: usize, mime_type: &str) -> Blob {
        let end = end.min(self.data.len());
        let start = start.min(end);
        Blob::with_type(self.data.slice(start..end), mime_type)
    }
}

/// Reads the blob into a fresh buffer.
pub(crate) async fn read_as_array_buffer(blob: Blob) -> Bytes {
    Bytes::copy_from_slice(&blob.data)
}

/// Reads the blob as UTF-8 text. A leading byte order mark is dropped and invalid sequences are
/// replaced.
pub(crate) async fn read_as_text(blob: Blob) -> String {
    let data = blob.data.strip_prefix(UTF8_BOM).unwrap_or(&blob.data[..]);
    String::from_utf8_lossy(data).into_owned()
}
