//! The transfer engine contract.
//!
//! # Design
//! An engine is a stateful handle that is configured option by option and
//! then driven through one blocking `perform`. During `perform` it pushes
//! response bytes into a `TransferSink` (header bytes and body bytes on two
//! separate entry points) and finally reports a `ResultCode`. Option setters
//! are per-handle, not per-call: whatever a previous transfer configured stays
//! in effect until overwritten, so `TransferSession` rewrites every option it
//! owns on every call.
//!
//! Result codes use libcurl's numbering so the curl backend passes codes
//! through untouched and other backends translate into the same space.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[cfg(feature = "curl")]
mod curl_engine;
#[cfg(feature = "ureq")]
mod ureq_engine;

#[cfg(feature = "curl")]
pub use curl_engine::CurlEngine;
#[cfg(feature = "ureq")]
pub use ureq_engine::UreqEngine;

/// Redirect hops every engine follows until told otherwise.
pub const DEFAULT_MAX_REDIRECTS: u32 = 10;

/// Engine used by `TransferSession::new`.
#[cfg(feature = "ureq")]
pub type DefaultEngine = UreqEngine;

/// Engine used by `TransferSession::new`.
#[cfg(all(feature = "curl", not(feature = "ureq")))]
pub type DefaultEngine = CurlEngine;

/// Outcome code of one transfer attempt, numbered like libcurl's `CURLcode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultCode(u32);

impl ResultCode {
    pub const OK: Self = Self(0);
    pub const UNSUPPORTED_PROTOCOL: Self = Self(1);
    pub const FAILED_INIT: Self = Self(2);
    pub const URL_MALFORMAT: Self = Self(3);
    pub const COULDNT_RESOLVE_PROXY: Self = Self(5);
    pub const COULDNT_RESOLVE_HOST: Self = Self(6);
    pub const COULDNT_CONNECT: Self = Self(7);
    pub const WEIRD_SERVER_REPLY: Self = Self(8);
    pub const REMOTE_ACCESS_DENIED: Self = Self(9);
    pub const HTTP2: Self = Self(16);
    pub const PARTIAL_FILE: Self = Self(18);
    pub const HTTP_RETURNED_ERROR: Self = Self(22);
    pub const WRITE_ERROR: Self = Self(23);
    pub const READ_ERROR: Self = Self(26);
    pub const OUT_OF_MEMORY: Self = Self(27);
    pub const OPERATION_TIMEDOUT: Self = Self(28);
    pub const SSL_CONNECT_ERROR: Self = Self(35);
    pub const FILE_COULDNT_READ_FILE: Self = Self(37);
    pub const BAD_FUNCTION_ARGUMENT: Self = Self(43);
    pub const TOO_MANY_REDIRECTS: Self = Self(47);
    pub const GOT_NOTHING: Self = Self(52);
    pub const SSL_ENGINE_NOTFOUND: Self = Self(53);
    pub const SEND_ERROR: Self = Self(55);
    pub const RECV_ERROR: Self = Self(56);
    pub const SSL_CERTPROBLEM: Self = Self(58);
    pub const SSL_CIPHER: Self = Self(59);
    pub const PEER_FAILED_VERIFICATION: Self = Self(60);
    pub const BAD_CONTENT_ENCODING: Self = Self(61);
    pub const LOGIN_DENIED: Self = Self(67);
    pub const HTTP2_STREAM: Self = Self(92);
    pub const PROXY: Self = Self(97);

    pub const fn from_raw(code: u32) -> Self {
        Self(code)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// Human-readable text for the code, as the engine reports it.
    pub fn description(self) -> &'static str {
        match self.0 {
            0 => "No error",
            1 => "Unsupported protocol",
            2 => "Failed initialization",
            3 => "URL using bad/illegal format or missing URL",
            5 => "Couldn't resolve proxy name",
            6 => "Couldn't resolve host name",
            7 => "Couldn't connect to server",
            8 => "Weird server reply",
            9 => "Access denied to remote resource",
            16 => "Error in the HTTP2 framing layer",
            18 => "Transferred a partial file",
            22 => "HTTP response code said error",
            23 => "Failed writing received data to disk/application",
            26 => "Failed to open/read local data from file/application",
            27 => "Out of memory",
            28 => "Timeout was reached",
            35 => "SSL connect error",
            37 => "Couldn't read a file:// file",
            43 => "A libcurl function was given a bad argument",
            47 => "Number of redirects hit maximum amount",
            52 => "Server returned nothing (no headers, no data)",
            53 => "SSL crypto engine not found",
            55 => "Failed sending data to the peer",
            56 => "Failure when receiving data from the peer",
            58 => "Problem with the local SSL certificate",
            59 => "Couldn't use specified SSL cipher",
            60 => "SSL peer certificate or SSH remote key was not OK",
            61 => "Unrecognized or bad HTTP Content or Transfer-Encoding",
            67 => "Login denied",
            92 => "Stream error in the HTTP/2 framing layer",
            97 => "proxy handshake error",
            _ => "Unknown error",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.0)
    }
}

/// Encoding of a client certificate file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateFormat {
    #[default]
    Pem,
    Der,
}

impl CertificateFormat {
    /// Engine option value (`"PEM"` / `"DER"`).
    pub fn as_str(self) -> &'static str {
        match self {
            CertificateFormat::Pem => "PEM",
            CertificateFormat::Der => "DER",
        }
    }
}

/// Algorithm hint for a private key. Accepted for API compatibility; engines
/// infer the algorithm from the key file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAlgorithm {
    #[default]
    Rsa,
    Dsa,
    Ec,
    Opaque,
}

/// Receiver for the bytes an engine produces during `perform`.
///
/// Both methods return how many bytes were consumed. Anything short of the
/// full chunk makes the engine abort the transfer with
/// `ResultCode::WRITE_ERROR`.
pub trait TransferSink {
    fn on_body_chunk(&mut self, chunk: &[u8]) -> usize;
    fn on_header_chunk(&mut self, chunk: &[u8]) -> usize;
}

/// A blocking HTTP transfer engine handle.
pub trait TransferEngine {
    fn set_url(&mut self, url: &str) -> Result<(), ResultCode>;

    /// Replace the outgoing header list. Lines are `"Name: value"` without
    /// a line terminator.
    fn set_headers(&mut self, lines: &[String]) -> Result<(), ResultCode>;

    /// Set the outgoing payload. `None` switches the handle back to a
    /// body-less GET.
    fn set_body(&mut self, body: Option<&[u8]>) -> Result<(), ResultCode>;

    fn set_client_certificate(
        &mut self,
        path: &Path,
        format: CertificateFormat,
    ) -> Result<(), ResultCode>;

    fn set_private_key(&mut self, path: &Path) -> Result<(), ResultCode>;

    fn set_verbose(&mut self, verbose: bool) -> Result<(), ResultCode>;

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<(), ResultCode>;

    fn set_max_redirects(&mut self, max: u32) -> Result<(), ResultCode>;

    /// Run the configured transfer to completion, feeding `sink`.
    fn perform(&mut self, sink: &mut dyn TransferSink) -> ResultCode;

    /// Status code of the last completed transfer.
    fn response_code(&self) -> u16;

    fn describe(&self, code: ResultCode) -> String {
        code.description().to_string()
    }
}

impl<E: TransferEngine + ?Sized> TransferEngine for Box<E> {
    fn set_url(&mut self, url: &str) -> Result<(), ResultCode> {
        (**self).set_url(url)
    }

    fn set_headers(&mut self, lines: &[String]) -> Result<(), ResultCode> {
        (**self).set_headers(lines)
    }

    fn set_body(&mut self, body: Option<&[u8]>) -> Result<(), ResultCode> {
        (**self).set_body(body)
    }

    fn set_client_certificate(
        &mut self,
        path: &Path,
        format: CertificateFormat,
    ) -> Result<(), ResultCode> {
        (**self).set_client_certificate(path, format)
    }

    fn set_private_key(&mut self, path: &Path) -> Result<(), ResultCode> {
        (**self).set_private_key(path)
    }

    fn set_verbose(&mut self, verbose: bool) -> Result<(), ResultCode> {
        (**self).set_verbose(verbose)
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<(), ResultCode> {
        (**self).set_timeout(timeout)
    }

    fn set_max_redirects(&mut self, max: u32) -> Result<(), ResultCode> {
        (**self).set_max_redirects(max)
    }

    fn perform(&mut self, sink: &mut dyn TransferSink) -> ResultCode {
        (**self).perform(sink)
    }

    fn response_code(&self) -> u16 {
        (**self).response_code()
    }

    fn describe(&self, code: ResultCode) -> String {
        (**self).describe(code)
    }
}
