//! The body of a request or response.
//!
//! A [`Body`] normalizes its init value into exactly one storage form when it is created and can
//! then be read **once**, in any of the supported shapes:
//!
//! | method           | text   | blob        | array buffer | form data |
//! |------------------|--------|-------------|--------------|-----------|
//! | `text()`         | as is  | UTF-8 read  | byte → char  | rejected  |
//! | `blob()`         | wrap   | as is       | wrap         | rejected  |
//! | `array_buffer()` | via blob | via blob  | as is        | rejected  |
//! | `form_data()`    | parse `text()` | parse `text()` | parse `text()` | rejected |
//! | `json()`         | parse `text()` | parse `text()` | parse `text()` | rejected |
//!
//! # Single consumption
//! Every read method runs the same check-and-set on the `used` flag *before* it returns its
//! future. Two reads issued back to back therefore never both proceed: the second one gets a
//! future that resolves to [`BodyError::AlreadyRead`], even if the first future has not been
//! polled yet. There is no queueing; the first caller wins.
//!
//! # Cloning
//! The init value is kept untouched next to the storage form, so [`Body::try_clone`] can build a
//! fresh, unread body at any time, including after the original was read.
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use futures::future::{self, BoxFuture, FutureExt};
use http::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;

use crate::body::blob::{self, Blob};
use crate::body::classify::{classify, Classified};
use crate::body::form_data::{self, FormData};
use crate::body::init::BodyInit;
use crate::config::{Capabilities, Capability};
use crate::errors::BodyError;
use crate::headers::Headers;

const TEXT_PLAIN_UTF8: &str = "text/plain;charset=UTF-8";
const FORM_URLENCODED_UTF8: &str = "application/x-www-form-urlencoded;charset=UTF-8";

/// Result of a body read. The read has already been claimed when this is handed out.
pub type BodyFuture<T> = BoxFuture<'static, Result<T, BodyError>>;

/// The storage form a body was normalized into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Text,
    Blob,
    FormData,
    ArrayBuffer,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Text => write!(f, "text"),
            StorageKind::Blob => write!(f, "Blob"),
            StorageKind::FormData => write!(f, "FormData"),
            StorageKind::ArrayBuffer => write!(f, "ArrayBuffer"),
        }
    }
}

#[derive(Debug, Clone)]
enum Storage {
    Text(String),
    Blob(Blob),
    FormData(FormData),
    ArrayBuffer(Bytes),
}

impl Storage {
    fn kind(&self) -> StorageKind {
        match self {
            Storage::Text(_) => StorageKind::Text,
            Storage::Blob(_) => StorageKind::Blob,
            Storage::FormData(_) => StorageKind::FormData,
            Storage::ArrayBuffer(_) => StorageKind::ArrayBuffer,
        }
    }
}

/// Bytes ready to be handed to a transport, with the content type they imply (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

/// One HTTP message payload.
#[derive(Debug)]
pub struct Body {
    /// The value the body was created from, kept for cloning
    init: BodyInit,
    storage: Storage,
    used: AtomicBool,
    caps: Capabilities,
}

fn rejected<T: Send + 'static>(err: BodyError) -> BodyFuture<T> {
    future::ready(Err(err)).boxed()
}

fn resolved<T: Send + 'static>(value: T) -> BodyFuture<T> {
    future::ready(Ok(value)).boxed()
}

/// Maps every byte to the character with the same code point.
fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

impl Body {
    /// Normalizes `init` into a body.
    ///
    /// When `headers` has no content type yet, one is inferred from the init value: plain text
    /// for strings, the blob's own type for typed blobs and the urlencoded type for search
    /// params. An existing content type is never overwritten.
    pub fn new(
        init: impl Into<BodyInit>,
        headers: &mut Headers,
        caps: &Capabilities,
    ) -> Result<Self, BodyError> {
        let mut init = init.into();

        let (storage, inferred, replacement) = match classify(&init, caps) {
            Classified::Empty => (Storage::Text(String::new()), None, None),
            Classified::Text(s) => (Storage::Text(s.to_string()), Some(TEXT_PLAIN_UTF8.to_string()), None),
            Classified::Blob(b) => {
                let inferred = (!b.mime_type().is_empty()).then(|| b.mime_type().to_string());
                (Storage::Blob(b.clone()), inferred, None)
            }
            Classified::FormData(f) => (Storage::FormData(f.clone()), None, None),
            Classified::UrlSearchParams(p) => {
                (Storage::Text(p.to_string()), Some(FORM_URLENCODED_UTF8.to_string()), None)
            }
            Classified::DataView(v) => {
                let copy = Bytes::copy_from_slice(v.buffer());
                // transports cannot send a data view, keep a blob of the same bytes instead
                let blob = BodyInit::Blob(Blob::new(copy.clone()));
                (Storage::ArrayBuffer(copy), None, Some(blob))
            }
            Classified::ArrayBufferLike(bytes) => {
                (Storage::ArrayBuffer(Bytes::copy_from_slice(bytes)), None, None)
            }
            Classified::Unsupported(type_name) => {
                log::debug!("Rejecting body init of type {type_name}");
                return Err(BodyError::UnsupportedBodyType(type_name.to_string()));
            }
        };

        if let Some(blob) = replacement {
            init = blob;
        }

        let has_content_type = headers
            .get_header(&CONTENT_TYPE)
            .is_some_and(|ct| !ct.is_empty());
        if !has_content_type {
            if let Some(ct) = inferred {
                headers.set_header(CONTENT_TYPE, ct);
            }
        }

        log::trace!("Body initialized from {} as {}", init.type_name(), storage.kind());

        Ok(Self {
            init,
            storage,
            used: AtomicBool::new(false),
            caps: *caps,
        })
    }

    /// An empty, unread body.
    pub fn empty(caps: &Capabilities) -> Self {
        Self {
            init: BodyInit::Empty,
            storage: Storage::Text(String::new()),
            used: AtomicBool::new(false),
            caps: *caps,
        }
    }

    /// Claims the single read of this body.
    pub(crate) fn begin_read(&self) -> Result<(), BodyError> {
        if self.used.swap(true, Ordering::AcqRel) {
            log::debug!("Rejecting second read of a {} body", self.storage.kind());
            return Err(BodyError::AlreadyRead);
        }
        Ok(())
    }

    fn require(&self, cap: Capability) -> Result<(), BodyError> {
        if self.caps.supports(cap) {
            Ok(())
        } else {
            Err(BodyError::CapabilityMissing(cap))
        }
    }

    /// Claims the read and converts the storage into a blob.
    fn read_blob(&self) -> Result<Blob, BodyError> {
        self.begin_read()?;
        match &self.storage {
            Storage::Blob(b) => Ok(b.clone()),
            Storage::ArrayBuffer(buf) => Ok(Blob::new(buf.clone())),
            Storage::FormData(_) => Err(BodyError::UnreadableAsFormat {
                from: StorageKind::FormData,
                to: "blob",
            }),
            Storage::Text(t) => Ok(Blob::new(t.clone().into_bytes())),
        }
    }

    /// Reads the body as a blob. Requires blob support.
    pub fn blob(&self) -> BodyFuture<Blob> {
        if let Err(e) = self.require(Capability::Blob) {
            return rejected(e);
        }
        match self.read_blob() {
            Ok(blob) => resolved(blob),
            Err(e) => rejected(e),
        }
    }

    /// Reads the body as raw bytes.
    ///
    /// Bodies stored as a buffer resolve right away; every other form is read through a blob and
    /// therefore needs blob support.
    pub fn array_buffer(&self) -> BodyFuture<Bytes> {
        if let Storage::ArrayBuffer(buf) = &self.storage {
            return match self.begin_read() {
                Ok(()) => resolved(buf.clone()),
                Err(e) => rejected(e),
            };
        }
        if let Err(e) = self.require(Capability::Blob) {
            return rejected(e);
        }
        match self.read_blob() {
            Ok(blob) => blob::read_as_array_buffer(blob).map(Ok).boxed(),
            Err(e) => rejected(e),
        }
    }

    /// Reads the body as text.
    ///
    /// Blobs are decoded as UTF-8. Buffers are decoded one byte per character (Latin-1), not as
    /// UTF-8.
    pub fn text(&self) -> BodyFuture<String> {
        if let Err(e) = self.begin_read() {
            return rejected(e);
        }
        match &self.storage {
            Storage::Blob(b) => blob::read_as_text(b.clone()).map(Ok).boxed(),
            Storage::ArrayBuffer(buf) => resolved(latin1_to_string(buf)),
            Storage::FormData(_) => rejected(BodyError::UnreadableAsFormat {
                from: StorageKind::FormData,
                to: "text",
            }),
            Storage::Text(t) => resolved(t.clone()),
        }
    }

    /// Reads the body as text and parses it as `application/x-www-form-urlencoded`.
    /// Requires form data support.
    pub fn form_data(&self) -> BodyFuture<FormData> {
        if let Err(e) = self.require(Capability::FormData) {
            return rejected(e);
        }
        self.text()
            .map(|text| -> Result<FormData, BodyError> { form_data::decode(&text?) })
            .boxed()
    }

    /// Reads the body as text and deserializes it from JSON.
    pub fn json<T>(&self) -> BodyFuture<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.text()
            .map(|text| -> Result<T, BodyError> { Ok(serde_json::from_str(&text?)?) })
            .boxed()
    }

    /// [`json`](Self::json) into an untyped value.
    pub fn json_value(&self) -> BodyFuture<serde_json::Value> {
        self.json()
    }

    /// Whether a read has been claimed.
    pub fn is_used(&self) -> bool {
        self.used.load(Ordering::Acquire)
    }

    /// Marks the body as read without materializing it, for when another envelope takes it over.
    pub(crate) fn mark_used(&self) {
        self.used.store(true, Ordering::Release);
    }

    pub fn storage_kind(&self) -> StorageKind {
        self.storage.kind()
    }

    /// The init value, after data views were replaced by blobs.
    pub fn init(&self) -> &BodyInit {
        &self.init
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Builds an unread body from the original init value.
    ///
    /// `headers` receives an inferred content type only if it has none, like in [`Body::new`].
    pub fn try_clone(&self, headers: &mut Headers) -> Result<Body, BodyError> {
        Body::new(self.init.clone(), headers, &self.caps)
    }

    /// The bytes to transmit, or `None` for a body without init value.
    ///
    /// Form data is encoded as `multipart/form-data` with a freshly generated boundary, which is
    /// returned as the payload's content type. This does not claim the read.
    pub fn payload(&self) -> Option<Payload> {
        if self.init.is_empty() {
            return None;
        }
        let payload = match &self.storage {
            Storage::Text(t) => Payload { bytes: Bytes::from(t.clone()), content_type: None },
            Storage::Blob(b) => Payload { bytes: b.bytes(), content_type: None },
            Storage::ArrayBuffer(buf) => Payload { bytes: buf.clone(), content_type: None },
            Storage::FormData(f) => {
                let boundary = format!("----GosubFormBoundary{}", uuid::Uuid::new_v4().simple());
                Payload {
                    bytes: f.to_multipart(&boundary),
                    content_type: Some(format!("multipart/form-data; boundary={boundary}")),
                }
            }
        };
        Some(payload)
    }
}

/// Anything that carries a [`Body`]: requests and responses.
///
/// All read methods forward to the embedded body, so the single-consumption rule applies to the
/// carrier as a whole.
pub trait PayloadCarrier {
    fn body(&self) -> &Body;

    fn body_used(&self) -> bool {
        self.body().is_used()
    }

    fn text(&self) -> BodyFuture<String> {
        self.body().text()
    }

    fn blob(&self) -> BodyFuture<Blob> {
        self.body().blob()
    }

    fn array_buffer(&self) -> BodyFuture<Bytes> {
        self.body().array_buffer()
    }

    fn form_data(&self) -> BodyFuture<FormData> {
        self.body().form_data()
    }

    fn json<T>(&self) -> BodyFuture<T>
    where
        Self: Sized,
        T: DeserializeOwned + Send + 'static,
    {
        self.body().json()
    }

    fn json_value(&self) -> BodyFuture<serde_json::Value> {
        self.body().json_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::init::{BufferView, ViewKind};
    use crate::body::search_params::UrlSearchParams;
    use serde::Deserialize;

    fn body(init: impl Into<BodyInit>) -> (Body, Headers) {
        let mut headers = Headers::new();
        let body = Body::new(init, &mut headers, &Capabilities::default()).unwrap();
        (body, headers)
    }

    fn content_type(headers: &Headers) -> Option<&str> {
        headers.get_header(&CONTENT_TYPE)
    }

    #[tokio::test]
    async fn text_round_trips() {
        let (b, headers) = body("hello world");
        assert_eq!(b.storage_kind(), StorageKind::Text);
        assert_eq!(content_type(&headers), Some(TEXT_PLAIN_UTF8));
        assert_eq!(b.text().await.unwrap(), "hello world");
        assert!(b.is_used());
    }

    #[tokio::test]
    async fn empty_init_reads_as_empty_text_without_content_type() {
        let (b, headers) = body(BodyInit::Empty);
        assert_eq!(content_type(&headers), None);
        assert_eq!(b.text().await.unwrap(), "");
        assert!(b.payload().is_none());
    }

    #[tokio::test]
    async fn empty_string_still_infers_text_plain() {
        let (b, headers) = body("");
        assert_eq!(content_type(&headers), Some(TEXT_PLAIN_UTF8));
        assert_eq!(b.text().await.unwrap(), "");
    }

    #[tokio::test]
    async fn second_read_is_rejected_across_methods() {
        let (b, _) = body("{\"x\":1}");
        assert_eq!(b.text().await.unwrap(), "{\"x\":1}");

        assert!(matches!(b.json_value().await, Err(BodyError::AlreadyRead)));
        assert!(matches!(b.text().await, Err(BodyError::AlreadyRead)));
        assert!(matches!(b.blob().await, Err(BodyError::AlreadyRead)));
        assert!(matches!(b.array_buffer().await, Err(BodyError::AlreadyRead)));
        assert!(matches!(b.form_data().await, Err(BodyError::AlreadyRead)));
    }

    #[tokio::test]
    async fn guard_is_claimed_before_the_first_future_is_polled() {
        let (b, _) = body(Blob::with_type("payload", "text/plain"));

        let first = b.text();
        let second = b.array_buffer();

        // the second call lost even though the first has not run yet
        assert!(matches!(second.await, Err(BodyError::AlreadyRead)));
        assert_eq!(first.await.unwrap(), "payload");
    }

    #[tokio::test]
    async fn json_parses_objects_and_reports_errors() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Point {
            x: i32,
        }

        let (b, _) = body("{\"x\":1}");
        assert_eq!(b.json::<Point>().await.unwrap(), Point { x: 1 });

        let (b, _) = body("{\"x\":1}");
        assert_eq!(b.json_value().await.unwrap(), serde_json::json!({"x": 1}));

        let (b, _) = body("not json");
        assert!(matches!(b.json_value().await, Err(BodyError::JsonParse(_))));
        assert!(b.is_used());
    }

    #[tokio::test]
    async fn array_buffer_text_is_latin1() {
        let (b, headers) = body(vec![72u8, 101, 121]);
        assert_eq!(b.storage_kind(), StorageKind::ArrayBuffer);
        assert_eq!(content_type(&headers), None);
        assert_eq!(b.text().await.unwrap(), "Hey");

        // UTF-8 snowman bytes are not decoded as UTF-8
        let (b, _) = body(vec![0xE2u8, 0x98, 0x83]);
        assert_eq!(b.text().await.unwrap(), "\u{e2}\u{98}\u{83}");
    }

    #[tokio::test]
    async fn buffers_are_copied_on_init() {
        let view = BufferView::new(ViewKind::Uint8, Bytes::from_static(b"0123456789"), 2, 3).unwrap();
        let (b, _) = body(view);
        assert_eq!(b.array_buffer().await.unwrap(), Bytes::from_static(b"234"));
    }

    #[tokio::test]
    async fn data_view_copies_whole_buffer_and_keeps_a_blob_init() {
        let view = BufferView::new(ViewKind::DataView, Bytes::from_static(b"abcdef"), 1, 2).unwrap();
        let (b, _) = body(view);

        assert_eq!(b.storage_kind(), StorageKind::ArrayBuffer);
        match b.init() {
            BodyInit::Blob(blob) => assert_eq!(blob.bytes(), Bytes::from_static(b"abcdef")),
            other => panic!("expected blob init, got {other:?}"),
        }
        assert_eq!(b.array_buffer().await.unwrap(), Bytes::from_static(b"abcdef"));
    }

    #[tokio::test]
    async fn blob_content_type_is_inferred_and_read_as_text() {
        let (b, headers) = body(Blob::with_type("<p>hi</p>", "Text/HTML"));
        assert_eq!(content_type(&headers), Some("text/html"));
        assert_eq!(b.text().await.unwrap(), "<p>hi</p>");

        let (_, headers) = body(Blob::new("untyped"));
        assert_eq!(content_type(&headers), None);
    }

    #[tokio::test]
    async fn blob_and_array_buffer_conversions() {
        let (b, _) = body("abc");
        let blob = b.blob().await.unwrap();
        assert_eq!(blob.bytes(), Bytes::from_static(b"abc"));

        let (b, _) = body(vec![1u8, 2]);
        assert_eq!(b.blob().await.unwrap().bytes(), Bytes::from_static(&[1, 2]));

        let (b, _) = body("abc");
        assert_eq!(b.array_buffer().await.unwrap(), Bytes::from_static(b"abc"));

        let (b, _) = body(Blob::new(vec![9u8]));
        assert_eq!(b.array_buffer().await.unwrap(), Bytes::from_static(&[9]));
    }

    #[tokio::test]
    async fn form_data_storage_cannot_be_read_as_text_or_blob() {
        let mut form = FormData::new();
        form.append("a", "1");

        let (b, headers) = body(form.clone());
        assert_eq!(content_type(&headers), None);
        assert!(matches!(
            b.text().await,
            Err(BodyError::UnreadableAsFormat { from: StorageKind::FormData, to: "text" })
        ));
        // the failed read still consumed the body
        assert!(b.is_used());

        let (b, _) = body(form.clone());
        let err = b.blob().await.unwrap_err();
        assert_eq!(err.to_string(), "Could not read FormData body as blob");

        let (b, _) = body(form);
        assert!(matches!(b.array_buffer().await, Err(BodyError::UnreadableAsFormat { .. })));
    }

    #[tokio::test]
    async fn form_data_parses_urlencoded_text() {
        let (b, _) = body("a=1&b=2&b=3");
        let form = b.form_data().await.unwrap();

        let b_values: Vec<_> = form.get_all("b").into_iter().filter_map(|v| v.as_text()).collect();
        assert_eq!(form.get("a").and_then(|v| v.as_text()), Some("1"));
        assert_eq!(b_values, vec!["2", "3"]);
    }

    #[tokio::test]
    async fn malformed_form_text_rejects_the_read() {
        let (b, _) = body("a=%zz");
        assert!(matches!(b.form_data().await, Err(BodyError::MalformedFormData(_))));
        assert!(b.is_used());

        let (b, _) = body("b=%FF");
        let err = b.form_data().await.unwrap_err();
        assert_eq!(err.to_string(), "Malformed form data: \"%FF\"");
    }

    #[tokio::test]
    async fn search_params_converge_to_text() {
        let params: UrlSearchParams = [("q", "a b"), ("n", "1")].into_iter().collect();
        let (b, headers) = body(params);

        assert_eq!(b.storage_kind(), StorageKind::Text);
        assert_eq!(content_type(&headers), Some(FORM_URLENCODED_UTF8));

        let form = b.form_data().await.unwrap();
        assert_eq!(form.get("q").and_then(|v| v.as_text()), Some("a b"));
    }

    #[test]
    fn existing_content_type_is_never_overwritten() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "application/custom").unwrap();

        Body::new("hello", &mut headers, &Capabilities::default()).unwrap();
        assert_eq!(headers.get("content-type").unwrap(), Some("application/custom"));
        assert_eq!(headers.get_all("content-type").unwrap().len(), 1);
    }

    #[test]
    fn unsupported_init_fails_synchronously() {
        let mut headers = Headers::new();
        let err = Body::new(BodyInit::host(|| ()), &mut headers, &Capabilities::default()).unwrap_err();

        assert!(matches!(err, BodyError::UnsupportedBodyType(_)));
        assert!(headers.is_empty());
    }

    #[test]
    fn blob_without_support_is_unsupported() {
        let mut headers = Headers::new();
        let err = Body::new(Blob::new("x"), &mut headers, &Capabilities::legacy()).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported BodyInit type: Blob");
    }

    #[tokio::test]
    async fn missing_capabilities_reject_without_consuming() {
        let mut headers = Headers::new();
        let b = Body::new("a=1", &mut headers, &Capabilities::none()).unwrap();

        assert!(matches!(b.blob().await, Err(BodyError::CapabilityMissing(Capability::Blob))));
        assert!(matches!(b.array_buffer().await, Err(BodyError::CapabilityMissing(Capability::Blob))));
        assert!(matches!(b.form_data().await, Err(BodyError::CapabilityMissing(Capability::FormData))));
        assert!(!b.is_used());

        assert_eq!(b.text().await.unwrap(), "a=1");
    }

    #[tokio::test]
    async fn buffers_read_without_blob_support() {
        let mut headers = Headers::new();
        let b = Body::new(vec![1u8, 2, 3], &mut headers, &Capabilities::legacy()).unwrap();
        assert_eq!(b.array_buffer().await.unwrap(), Bytes::from_static(&[1, 2, 3]));
    }

    #[tokio::test]
    async fn clone_after_consumption_is_readable() {
        let (b, mut headers) = body("original");
        assert_eq!(b.text().await.unwrap(), "original");

        let copy = b.try_clone(&mut headers).unwrap();
        assert!(!copy.is_used());
        assert_eq!(copy.text().await.unwrap(), "original");
        assert_eq!(headers.get_all("content-type").unwrap(), vec![TEXT_PLAIN_UTF8]);
    }

    #[test]
    fn payload_encodes_storage() {
        let (b, _) = body("héllo");
        assert_eq!(b.payload().unwrap().bytes, Bytes::from("héllo"));

        let mut form = FormData::new();
        form.append("a", "1");
        let (b, _) = body(form);
        let payload = b.payload().unwrap();
        let ct = payload.content_type.unwrap();
        let boundary = ct.strip_prefix("multipart/form-data; boundary=").unwrap();
        assert!(payload.bytes.starts_with(format!("--{boundary}\r\n").as_bytes()));

        // payload does not consume
        assert!(!b.is_used());
    }

    struct Carrier(Body);

    impl PayloadCarrier for Carrier {
        fn body(&self) -> &Body {
            &self.0
        }
    }

    #[tokio::test]
    async fn carriers_forward_to_their_body() {
        let (b, _) = body("[1,2,3]");
        let c = Carrier(b);

        assert!(!c.body_used());
        assert_eq!(c.json::<Vec<u8>>().await.unwrap(), vec![1, 2, 3]);
        assert!(c.body_used());
        assert!(matches!(c.text().await, Err(BodyError::AlreadyRead)));
    }
}
