//! Multipart form data.
//!
//! [`FormData`] is an ordered list of named entries, each either a text value or a file (a
//! [`Blob`] plus a filename). Bodies decode `application/x-www-form-urlencoded` text into it
//! (see [`decode`]) and requests encode it as `multipart/form-data` when sending.
use bytes::{BufMut, Bytes, BytesMut};
use percent_encoding::percent_decode_str;

use crate::body::blob::Blob;
use crate::errors::BodyError;

/// Filename used for blob entries appended without one.
const DEFAULT_FILENAME: &str = "blob";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormDataValue {
    Text(String),
    File { blob: Blob, filename: String },
}

impl FormDataValue {
    /// The text value, `None` for files.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormDataValue::Text(s) => Some(s),
            FormDataValue::File { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, FormDataValue)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), FormDataValue::Text(value.into())));
    }

    pub fn append_blob(&mut self, name: impl Into<String>, blob: Blob, filename: Option<&str>) {
        let filename = filename.unwrap_or(DEFAULT_FILENAME).to_string();
        self.entries.push((name.into(), FormDataValue::File { blob, filename }));
    }

    /// Replaces every entry named `name` with a single text entry at the first one's position.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = FormDataValue::Text(value.into());
        match self.entries.iter().position(|(n, _)| n == name) {
            Some(idx) => {
                self.entries[idx].1 = value;
                let mut kept_first = false;
                self.entries.retain(|(n, _)| {
                    if n != name {
                        return true;
                    }
                    let keep = !kept_first;
                    kept_first = true;
                    keep
                });
            }
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FormDataValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_all(&self, name: &str) -> Vec<&FormDataValue> {
        self.entries.iter().filter(|(n, _)| n == name).map(|(_, v)| v).collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn delete(&mut self, name: &str) {
        self.entries.retain(|(n, _)| n != name);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormDataValue)> + '_ {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encodes the entries as a `multipart/form-data` payload delimited by `boundary`.
    pub fn to_multipart(&self, boundary: &str) -> Bytes {
        let mut out = BytesMut::new();
        for (name, value) in &self.entries {
            out.put_slice(format!("--{boundary}\r\n").as_bytes());
            match value {
                FormDataValue::Text(text) => {
                    out.put_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", escape_quoted(name))
                            .as_bytes(),
                    );
                    out.put_slice(text.as_bytes());
                }
                FormDataValue::File { blob, filename } => {
                    out.put_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                            escape_quoted(name),
                            escape_quoted(filename)
                        )
                        .as_bytes(),
                    );
                    let mime = match blob.mime_type() {
                        "" => "application/octet-stream",
                        t => t,
                    };
                    out.put_slice(format!("Content-Type: {mime}\r\n\r\n").as_bytes());
                    out.put_slice(&blob.bytes());
                }
            }
            out.put_slice(b"\r\n");
        }
        out.put_slice(format!("--{boundary}--\r\n").as_bytes());
        out.freeze()
    }
}

/// Escapes a name for use inside a quoted `Content-Disposition` parameter.
fn escape_quoted(s: &str) -> String {
    s.replace('\r', "%0D").replace('\n', "%0A").replace('"', "%22")
}

/// Parses `application/x-www-form-urlencoded` text into form data.
///
/// Pairs are split on `&` and then on the first `=`. `+` decodes to a space before percent
/// decoding. Empty segments are skipped and a pair without `=` gets an empty value. A `%` that is
/// not followed by two hex digits, or escapes that do not form valid UTF-8, fail the whole decode.
pub fn decode(body: &str) -> Result<FormData, BodyError> {
    let mut form = FormData::new();
    for pair in body.trim().split('&').filter(|p| !p.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        form.append(decode_component(name)?, decode_component(value)?);
    }
    Ok(form)
}

fn decode_component(raw: &str) -> Result<String, BodyError> {
    let raw = raw.replace('+', " ");
    let bytes = raw.as_bytes();
    for (idx, _) in raw.match_indices('%') {
        let escape = bytes.get(idx + 1..idx + 3);
        if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
            return Err(BodyError::MalformedFormData(raw.to_string()));
        }
    }
    percent_decode_str(&raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| BodyError::MalformedFormData(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text<'a>(form: &'a FormData, name: &str) -> Vec<&'a str> {
        form.get_all(name).into_iter().filter_map(FormDataValue::as_text).collect()
    }

    #[test]
    fn decode_keeps_repeated_keys() {
        let form = decode("a=1&b=2&b=3").unwrap();
        assert_eq!(text(&form, "a"), vec!["1"]);
        assert_eq!(text(&form, "b"), vec!["2", "3"]);
        assert_eq!(form.len(), 3);
    }

    #[test]
    fn decode_handles_plus_percent_and_extra_equals() {
        let form = decode("  name=John+Doe&eq=a=b=c&pct=100%25&sp=%20x  ").unwrap();
        assert_eq!(text(&form, "name"), vec!["John Doe"]);
        assert_eq!(text(&form, "eq"), vec!["a=b=c"]);
        assert_eq!(text(&form, "pct"), vec!["100%"]);
        assert_eq!(text(&form, "sp"), vec![" x"]);
    }

    #[test]
    fn decode_skips_empty_segments() {
        let form = decode("a=1&&b=2&").unwrap();
        assert_eq!(form.iter().map(|(n, _)| n).collect::<Vec<_>>(), vec!["a", "b"]);

        let form = decode("flag").unwrap();
        assert_eq!(text(&form, "flag"), vec![""]);

        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn decode_rejects_malformed_escapes() {
        for body in ["a=%zz", "a=1&b=%4", "bad%=x", "b=%FF", "snow=%E2%98"] {
            let err = decode(body).unwrap_err();
            assert!(matches!(err, BodyError::MalformedFormData(_)), "{body}: {err}");
        }

        let form = decode("snow=%E2%98%83").unwrap();
        assert_eq!(text(&form, "snow"), vec!["\u{2603}"]);
    }

    #[test]
    fn set_replaces_all_entries_of_a_name() {
        let mut form = FormData::new();
        form.append("a", "1");
        form.append("b", "2");
        form.append("a", "3");
        form.set("a", "x");

        assert_eq!(text(&form, "a"), vec!["x"]);
        assert_eq!(form.iter().map(|(n, _)| n).collect::<Vec<_>>(), vec!["a", "b"]);

        form.delete("b");
        assert!(!form.has("b"));
    }

    #[test]
    fn multipart_encoding_contains_all_parts() {
        let mut form = FormData::new();
        form.append("field", "value");
        form.append_blob("upload", Blob::with_type("PNG", "image/png"), Some("a.png"));
        form.append_blob("raw", Blob::new("zz"), None);

        let body = form.to_multipart("XYZ");
        let body = std::str::from_utf8(&body).unwrap();

        assert_eq!(
            body,
            "--XYZ\r\n\
             Content-Disposition: form-data; name=\"field\"\r\n\r\n\
             value\r\n\
             --XYZ\r\n\
             Content-Disposition: form-data; name=\"upload\"; filename=\"a.png\"\r\n\
             Content-Type: image/png\r\n\r\n\
             PNG\r\n\
             --XYZ\r\n\
             Content-Disposition: form-data; name=\"raw\"; filename=\"blob\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             zz\r\n\
             --XYZ--\r\n"
        );
    }
}
