//! Error types for the reply adapter.
//!
//! # Design
//! Two families with different lifetimes. `TransferError` describes a
//! transfer that failed below HTTP (DNS, connect, TLS, timeouts, broken
//! replies) and is carried as data inside the returned `Reply`; `send` never
//! returns it as `Err`. HTTP error statuses (4xx/5xx) are not errors here,
//! they are successful transfers. `SessionError` covers setup: an engine
//! rejecting an option or a configuration that cannot be loaded.

use std::fmt;
use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::engine::ResultCode;

/// Domain classification of a failed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    ProtocolUnsupported,
    /// Generic breakdown at the HTTP layer.
    ProtocolFailure,
    Timeout,
    ConnectionRefused,
    TlsHandshakeFailed,
    TooManyRedirects,
    HostNotFound,
    ProxyNotFound,
    /// Bad or empty server reply, partial content, unreadable upload source.
    ContentMalformed,
    ContentAccessDenied,
    /// Send/receive level failures not otherwise classified.
    UnknownNetworkError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::ProtocolUnsupported => "protocol unsupported",
            ErrorKind::ProtocolFailure => "protocol failure",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ConnectionRefused => "connection refused",
            ErrorKind::TlsHandshakeFailed => "TLS handshake failed",
            ErrorKind::TooManyRedirects => "too many redirects",
            ErrorKind::HostNotFound => "host not found",
            ErrorKind::ProxyNotFound => "proxy not found",
            ErrorKind::ContentMalformed => "content malformed",
            ErrorKind::ContentAccessDenied => "content access denied",
            ErrorKind::UnknownNetworkError => "unknown network error",
        };
        f.write_str(s)
    }
}

/// A failed transfer: its classification, the engine's message and the raw
/// result code it came from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct TransferError {
    pub kind: ErrorKind,
    pub message: String,
    pub code: ResultCode,
}

/// Errors raised while setting up a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The engine refused an option value.
    #[error("engine rejected {option}: {code}")]
    Option {
        option: &'static str,
        code: ResultCode,
    },

    /// A session configuration could not be parsed.
    #[error("invalid session configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// A session configuration file could not be read.
    #[error("failed to read session configuration: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_error_display() {
        let err = TransferError {
            kind: ErrorKind::HostNotFound,
            message: "Couldn't resolve host name".to_string(),
            code: ResultCode::COULDNT_RESOLVE_HOST,
        };
        assert_eq!(err.to_string(), "host not found: Couldn't resolve host name");
    }

    #[test]
    fn option_error_display() {
        let err = SessionError::Option {
            option: "ssl certificate",
            code: ResultCode::BAD_FUNCTION_ARGUMENT,
        };
        assert_eq!(
            err.to_string(),
            "engine rejected ssl certificate: A libcurl function was given a bad argument (43)"
        );
    }

    #[test]
    fn config_error_wraps_serde() {
        let err: SessionError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, SessionError::Config(_)));
    }
}
