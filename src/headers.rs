//! Header container.
//!
//! [`Headers`] is a multimap from a normalized (trimmed, lower-cased) header name to the ordered
//! list of values received or set for that name. Names must consist of HTTP token characters
//! (`[A-Za-z0-9!#$%&'*+.^_`|~-]`); anything else is rejected with
//! [`HeaderError::InvalidHeaderName`]. Values are stored as plain strings and are only checked
//! when the headers are handed to the transport (see [`Headers::to_header_map`]).
//!
//! Names keep the position at which they were first inserted, so iteration is in insertion order
//! and repeated calls yield the same sequence as long as nothing was mutated in between.
//!
//! ```rust
//! use gosub_fetch::headers::Headers;
//! # fn main() -> Result<(), gosub_fetch::errors::HeaderError> {
//! let mut headers = Headers::new();
//! headers.append("Accept", "text/html")?;
//! headers.append("accept", "application/json")?;
//!
//! assert_eq!(headers.get("ACCEPT")?, Some("text/html"));
//! assert_eq!(headers.get_all("accept")?, vec!["text/html", "application/json"]);
//! # Ok(()) }
//! ```
use crate::errors::HeaderError;
use http::header::{HeaderMap, HeaderName, HeaderValue};

/// Normalized name/value multimap shared by a body and its envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    /// Entries in first-insertion order. Names are unique.
    entries: Vec<(HeaderName, Vec<String>)>,
}

fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// Trims and lower-cases `name`, rejecting characters outside the HTTP token set.
fn normalize_name(name: &str) -> Result<HeaderName, HeaderError> {
    let trimmed = name.trim();
    // http accepts a few bytes (like `"`) that are not tokens
    if !trimmed.bytes().all(is_token_char) {
        return Err(HeaderError::InvalidHeaderName(name.to_string()));
    }
    HeaderName::from_bytes(trimmed.as_bytes())
        .map_err(|_| HeaderError::InvalidHeaderName(name.to_string()))
}

impl Headers {
    /// Creates an empty header container.
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Builds a container by appending every `(name, value)` pair in order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, HeaderError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToString,
    {
        let mut headers = Headers::new();
        for (name, value) in pairs {
            headers.append(name.as_ref(), value)?;
        }
        Ok(headers)
    }

    /// Builds a container from a plain name to value mapping.
    pub fn from_map<K, V, S>(map: &std::collections::HashMap<K, V, S>) -> Result<Self, HeaderError>
    where
        K: AsRef<str>,
        V: ToString,
    {
        Self::from_pairs(map.iter().map(|(k, v)| (AsRef::<str>::as_ref(k), v.to_string())))
    }

    /// Parses a raw header block as returned by XHR-like hosts.
    ///
    /// Obsolete line folding (a newline followed by spaces or tabs) is replaced by a single space.
    /// Every line is split at its first `:`; lines without a name are ignored, and so are lines
    /// whose name is not a valid header name.
    pub fn parse_block(raw: &str) -> Self {
        let mut lines: Vec<String> = Vec::new();
        for line in raw.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.starts_with([' ', '\t']) {
                if let Some(prev) = lines.last_mut() {
                    prev.push(' ');
                    prev.push_str(line.trim_start_matches([' ', '\t']));
                    continue;
                }
            }
            lines.push(line.to_string());
        }

        let mut headers = Headers::new();
        for line in lines {
            let (key, value) = line.split_once(':').unwrap_or((line.as_str(), ""));
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            if let Err(e) = headers.append(key, value.trim()) {
                log::warn!("Skipping response header line {line:?}: {e}");
            }
        }
        headers
    }

    fn position(&self, name: &HeaderName) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }

    /// Appends `value` to the values of `name`, creating the entry if needed.
    pub fn append<V: ToString>(&mut self, name: &str, value: V) -> Result<(), HeaderError> {
        let name = normalize_name(name)?;
        let value = value.to_string();

        match self.position(&name) {
            Some(idx) => self.entries[idx].1.push(value),
            None => self.entries.push((name, vec![value])),
        }
        Ok(())
    }

    /// Replaces all values of `name` with the single `value`.
    pub fn set<V: ToString>(&mut self, name: &str, value: V) -> Result<(), HeaderError> {
        let name = normalize_name(name)?;
        let value = value.to_string();

        match self.position(&name) {
            Some(idx) => self.entries[idx].1 = vec![value],
            None => self.entries.push((name, vec![value])),
        }
        Ok(())
    }

    /// Returns the first value of `name`, if any.
    pub fn get(&self, name: &str) -> Result<Option<&str>, HeaderError> {
        let name = normalize_name(name)?;
        Ok(self
            .position(&name)
            .and_then(|idx| self.entries[idx].1.first())
            .map(String::as_str))
    }

    /// Returns every value of `name`, or an empty list.
    pub fn get_all(&self, name: &str) -> Result<Vec<&str>, HeaderError> {
        let name = normalize_name(name)?;
        Ok(self
            .position(&name)
            .map(|idx| self.entries[idx].1.iter().map(String::as_str).collect())
            .unwrap_or_default())
    }

    pub fn has(&self, name: &str) -> Result<bool, HeaderError> {
        let name = normalize_name(name)?;
        Ok(self.position(&name).is_some())
    }

    /// Removes `name` and all of its values.
    pub fn delete(&mut self, name: &str) -> Result<(), HeaderError> {
        let name = normalize_name(name)?;
        self.entries.retain(|(n, _)| n != &name);
        Ok(())
    }

    /// First value of an already normalized name (e.g. `http::header::CONTENT_TYPE`).
    pub fn get_header(&self, name: &HeaderName) -> Option<&str> {
        self.position(name)
            .and_then(|idx| self.entries[idx].1.first())
            .map(String::as_str)
    }

    /// Infallible [`set`](Self::set) for an already normalized name.
    pub fn set_header<V: ToString>(&mut self, name: HeaderName, value: V) {
        let value = value.to_string();
        match self.position(&name) {
            Some(idx) => self.entries[idx].1 = vec![value],
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Calls `visit(value, name)` once per stored value, in insertion order.
    pub fn for_each<F: FnMut(&str, &str)>(&self, mut visit: F) {
        for (name, value) in self.iter() {
            visit(value, name);
        }
    }

    /// Lazy `(name, value)` sequence, one pair per value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.as_str(), v.as_str())))
    }

    /// Names, repeated once per value.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.iter().map(|(name, _)| name)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> + '_ {
        self.iter().map(|(_, value)| value)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.iter()
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts into an `http::HeaderMap` for the transport.
    ///
    /// Values that are not valid HTTP header values (e.g. containing line breaks) cannot be sent
    /// and are skipped.
    pub fn to_header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, values) in &self.entries {
            for value in values {
                match HeaderValue::from_str(value) {
                    Ok(v) => {
                        map.append(name.clone(), v);
                    }
                    Err(_) => log::warn!("Dropping unsendable value for header {name}: {value:?}"),
                }
            }
        }
        map
    }
}

impl From<&HeaderMap> for Headers {
    fn from(map: &HeaderMap) -> Self {
        let mut headers = Headers::new();
        for (name, value) in map.iter() {
            let value = match value.to_str() {
                Ok(v) => v.to_string(),
                Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
            };
            match headers.position(name) {
                Some(idx) => headers.entries[idx].1.push(value),
                None => headers.entries.push((name.clone(), vec![value])),
            }
        }
        headers
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
