//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Sessions and replies cross the boundary as opaque handles. Requests are
//! described by the C caller with borrowed C strings; the library copies
//! what it needs and never frees caller memory. Enums carry explicit
//! discriminants so the generated header is stable.

use std::ffi::CStr;
use std::os::raw::c_char;

use reply_core::{
    CertificateFormat, DefaultEngine, ErrorKind, HttpRequest, KeyAlgorithm, Reply, TransferSession,
};

/// Opaque handle to a transfer session.
pub struct FfiSession {
    pub(crate) inner: TransferSession<DefaultEngine>,
}

/// Opaque handle to a finished reply.
pub struct FfiReply {
    pub(crate) inner: Reply,
}

// ---------------------------------------------------------------------------
// Request types (caller-owned)
// ---------------------------------------------------------------------------

/// A single request header as a pair of borrowed C strings.
#[repr(C)]
pub struct FfiHeader {
    pub name: *const c_char,
    pub value: *const c_char,
}

/// A request as C-compatible plain data. The library reads but does not
/// free these fields.
#[repr(C)]
pub struct FfiHttpRequest {
    pub url: *const c_char,
    pub headers: *const FfiHeader,
    pub headers_len: u32,
}

impl FfiHttpRequest {
    /// Copy into a core request. Returns `None` on null or non-UTF-8 strings.
    ///
    /// # Safety
    /// `url` and every header string must be valid NUL-terminated strings and
    /// `headers` must point to `headers_len` entries (or be null when zero).
    pub(crate) unsafe fn to_core(&self) -> Option<HttpRequest> {
        let url = unsafe { borrowed_str(self.url) }?;
        let mut request = HttpRequest::new(url);
        if self.headers_len > 0 {
            if self.headers.is_null() {
                return None;
            }
            let headers =
                unsafe { std::slice::from_raw_parts(self.headers, self.headers_len as usize) };
            for header in headers {
                let name = unsafe { borrowed_str(header.name) }?;
                let value = unsafe { borrowed_str(header.value) }?;
                request.set_header(name, value);
            }
        }
        Some(request)
    }
}

/// Borrow a C string as `&str`. `None` for null or invalid UTF-8.
///
/// # Safety
/// `s` must be null or a valid NUL-terminated string.
pub(crate) unsafe fn borrowed_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(s) }.to_str().ok()
}

// ---------------------------------------------------------------------------
// Option enums
// ---------------------------------------------------------------------------

/// Client certificate encoding.
#[repr(C)]
#[derive(Clone, Copy)]
pub enum FfiCertificateFormat {
    Pem = 0,
    Der = 1,
}

impl From<FfiCertificateFormat> for CertificateFormat {
    fn from(f: FfiCertificateFormat) -> Self {
        match f {
            FfiCertificateFormat::Pem => CertificateFormat::Pem,
            FfiCertificateFormat::Der => CertificateFormat::Der,
        }
    }
}

/// Private key algorithm hint.
#[repr(C)]
#[derive(Clone, Copy)]
pub enum FfiKeyAlgorithm {
    Rsa = 0,
    Dsa = 1,
    Ec = 2,
    Opaque = 3,
}

impl From<FfiKeyAlgorithm> for KeyAlgorithm {
    fn from(a: FfiKeyAlgorithm) -> Self {
        match a {
            FfiKeyAlgorithm::Rsa => KeyAlgorithm::Rsa,
            FfiKeyAlgorithm::Dsa => KeyAlgorithm::Dsa,
            FfiKeyAlgorithm::Ec => KeyAlgorithm::Ec,
            FfiKeyAlgorithm::Opaque => KeyAlgorithm::Opaque,
        }
    }
}

// ---------------------------------------------------------------------------
// Result codes
// ---------------------------------------------------------------------------

/// Outcome of a session configuration call.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiStatus {
    Ok = 0,
    NullArg = 1,
    InvalidArg = 2,
    Rejected = 3,
    Panic = 4,
}

/// Error kind of a failed transfer; `None` when the transfer succeeded.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorKind {
    None = 0,
    ProtocolUnsupported = 1,
    ProtocolFailure = 2,
    Timeout = 3,
    ConnectionRefused = 4,
    TlsHandshakeFailed = 5,
    TooManyRedirects = 6,
    HostNotFound = 7,
    ProxyNotFound = 8,
    ContentMalformed = 9,
    ContentAccessDenied = 10,
    UnknownNetworkError = 11,
}

impl From<ErrorKind> for FfiErrorKind {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::ProtocolUnsupported => FfiErrorKind::ProtocolUnsupported,
            ErrorKind::ProtocolFailure => FfiErrorKind::ProtocolFailure,
            ErrorKind::Timeout => FfiErrorKind::Timeout,
            ErrorKind::ConnectionRefused => FfiErrorKind::ConnectionRefused,
            ErrorKind::TlsHandshakeFailed => FfiErrorKind::TlsHandshakeFailed,
            ErrorKind::TooManyRedirects => FfiErrorKind::TooManyRedirects,
            ErrorKind::HostNotFound => FfiErrorKind::HostNotFound,
            ErrorKind::ProxyNotFound => FfiErrorKind::ProxyNotFound,
            ErrorKind::ContentMalformed => FfiErrorKind::ContentMalformed,
            ErrorKind::ContentAccessDenied => FfiErrorKind::ContentAccessDenied,
            ErrorKind::UnknownNetworkError => FfiErrorKind::UnknownNetworkError,
        }
    }
}
