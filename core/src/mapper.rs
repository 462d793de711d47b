//! Result code to domain error translation.
//!
//! The table is a literal `match`; codes it does not name fall through to
//! `ErrorKind::UnknownNetworkError`. The message is always the engine's own
//! text for the code, passed through unmodified.

use crate::engine::ResultCode;
use crate::error::{ErrorKind, TransferError};

/// Classify an engine result code.
pub fn classify(code: ResultCode) -> ErrorKind {
    match code {
        ResultCode::UNSUPPORTED_PROTOCOL | ResultCode::URL_MALFORMAT => {
            ErrorKind::ProtocolUnsupported
        }
        ResultCode::HTTP2 | ResultCode::HTTP_RETURNED_ERROR | ResultCode::HTTP2_STREAM => {
            ErrorKind::ProtocolFailure
        }
        ResultCode::OPERATION_TIMEDOUT => ErrorKind::Timeout,
        ResultCode::COULDNT_CONNECT => ErrorKind::ConnectionRefused,
        ResultCode::SSL_CONNECT_ERROR
        | ResultCode::SSL_ENGINE_NOTFOUND
        | ResultCode::SSL_CERTPROBLEM
        | ResultCode::SSL_CIPHER
        | ResultCode::PEER_FAILED_VERIFICATION => ErrorKind::TlsHandshakeFailed,
        ResultCode::TOO_MANY_REDIRECTS => ErrorKind::TooManyRedirects,
        ResultCode::COULDNT_RESOLVE_HOST => ErrorKind::HostNotFound,
        ResultCode::COULDNT_RESOLVE_PROXY | ResultCode::PROXY => ErrorKind::ProxyNotFound,
        ResultCode::WEIRD_SERVER_REPLY
        | ResultCode::PARTIAL_FILE
        | ResultCode::READ_ERROR
        | ResultCode::FILE_COULDNT_READ_FILE
        | ResultCode::GOT_NOTHING
        | ResultCode::BAD_CONTENT_ENCODING => ErrorKind::ContentMalformed,
        ResultCode::REMOTE_ACCESS_DENIED | ResultCode::LOGIN_DENIED => {
            ErrorKind::ContentAccessDenied
        }
        _ => ErrorKind::UnknownNetworkError,
    }
}

/// Build the error for a failed transfer from its code and the engine's
/// message for it.
pub fn map_failure(code: ResultCode, message: impl Into<String>) -> TransferError {
    TransferError {
        kind: classify(code),
        message: message.into(),
        code,
    }
}

/// `map_failure` with the built-in description of `code`.
pub fn map(code: ResultCode) -> TransferError {
    map_failure(code, code.description())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_maps_to_timeout() {
        let err = map(ResultCode::OPERATION_TIMEDOUT);
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert_eq!(err.message, "Timeout was reached");
        assert_eq!(err.code, ResultCode::OPERATION_TIMEDOUT);
    }

    #[test]
    fn unknown_code_maps_to_unknown_with_message() {
        let err = map(ResultCode::from_raw(4242));
        assert_eq!(err.kind, ErrorKind::UnknownNetworkError);
        assert!(!err.message.is_empty());
    }

    #[test]
    fn send_and_recv_errors_are_unknown() {
        assert_eq!(classify(ResultCode::SEND_ERROR), ErrorKind::UnknownNetworkError);
        assert_eq!(classify(ResultCode::RECV_ERROR), ErrorKind::UnknownNetworkError);
    }

    #[test]
    fn tls_family_maps_to_handshake_failed() {
        for code in [
            ResultCode::SSL_CONNECT_ERROR,
            ResultCode::SSL_CERTPROBLEM,
            ResultCode::SSL_CIPHER,
            ResultCode::PEER_FAILED_VERIFICATION,
        ] {
            assert_eq!(classify(code), ErrorKind::TlsHandshakeFailed, "{code}");
        }
    }

    #[test]
    fn message_is_passed_through() {
        let err = map_failure(ResultCode::COULDNT_CONNECT, "Failed to connect to h port 1");
        assert_eq!(err.kind, ErrorKind::ConnectionRefused);
        assert_eq!(err.message, "Failed to connect to h port 1");
    }
}
