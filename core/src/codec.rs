//! Header wire format, both directions.
//!
//! Outgoing: every request header becomes a `"Name: value"` line for the
//! engine's header list. Incoming: the raw bytes the engine pushed through the
//! header callback (possibly several blocks, one per redirect hop) are split
//! into lines and turned into a name/value mapping.

use crate::http::HttpRequest;

const CONTENT_LENGTH: &str = "Content-Length";

/// Build the outgoing header lines for `request`.
///
/// A caller-supplied Content-Length is dropped; when `body` is non-empty a
/// Content-Length line computed from its real length is appended instead.
pub fn request_header_lines(request: &HttpRequest, body: &[u8]) -> Vec<String> {
    let mut lines: Vec<String> = request
        .headers
        .iter()
        .filter(|(name, _)| !name.eq_ignore_ascii_case(CONTENT_LENGTH))
        .map(|(name, value)| format!("{name}: {value}"))
        .collect();
    if !body.is_empty() {
        lines.push(format!("{CONTENT_LENGTH}: {}", body.len()));
    }
    lines
}

/// Response headers in arrival order. Setting a name that is already present
/// overwrites its value, so the last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    entries: Vec<(String, String)>,
}

impl ResponseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Look up a header. An exact name match is preferred; otherwise the
    /// first entry whose name matches ignoring ASCII case is returned.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .or_else(|| self.entries.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Parse accumulated raw header bytes into a mapping.
///
/// Lines without a colon, or with an empty name, are skipped; that drops
/// status lines and the blank lines between redirect hops.
pub fn parse_header_block(raw: &[u8]) -> ResponseHeaders {
    let mut headers = ResponseHeaders::new();
    for line in raw.split(|&b| b == b'\n') {
        if let Some((name, value)) = parse_header_line(line) {
            headers.set(name, value);
        }
    }
    headers
}

fn parse_header_line(line: &[u8]) -> Option<(String, String)> {
    let colon = line.iter().position(|&b| b == b':')?;
    if colon == 0 {
        return None;
    }
    let name = &line[..colon];
    let mut value = &line[colon + 1..];
    if let Some(rest) = value.strip_prefix(b" ") {
        value = rest;
    }
    if let Some(rest) = value.strip_suffix(b"\r") {
        value = rest;
    }
    Some((
        String::from_utf8_lossy(name).into_owned(),
        String::from_utf8_lossy(value).into_owned(),
    ))
}
