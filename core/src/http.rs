//! Request descriptor consumed by `TransferSession::send`.
//!
//! # Design
//! The request is plain data owned by the caller: a URL and an ordered list
//! of header name/value pairs. Header names behave like a mapping (setting a
//! name twice keeps one entry) while insertion order is kept, because that is
//! the order the lines go out on the wire. The body is not part of the
//! descriptor; it is passed next to it so the same request can be reused with
//! different payloads.

/// An HTTP request described as plain data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Builder form of `set_header`.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Set `name` to `value`, replacing an existing entry of the same name in
    /// place so the wire position of the header does not move.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}
