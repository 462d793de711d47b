//! C-ABI wrapper around `reply-core`.
//!
//! # Overview
//! Lets a C or C++ host run blocking HTTP transfers through a
//! `TransferSession` and consume the resulting reply as a readable stream
//! with headers, status and error, without linking against Rust types.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Sessions and replies are opaque handles. A session must not be used
//!   from two threads at once; replies are independent of their session.
//! - Strings returned by the library are owned by the caller and released
//!   with `reply_free_string`; handles with their matching `*_free`.
//! - `build.rs` runs cbindgen over this crate and writes the C header to
//!   `$OUT_DIR/reply_ffi.h`.

pub mod types;

use std::ffi::CString;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use reply_core::TransferSession;
use tracing::error;

use types::*;

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

/// Create a session with the default engine.
///
/// Returns null if an internal panic occurs. Free with `reply_session_free`.
#[unsafe(no_mangle)]
pub extern "C" fn reply_session_new() -> *mut FfiSession {
    catch_unwind(|| {
        let session = FfiSession {
            inner: TransferSession::new(),
        };
        Box::into_raw(Box::new(session))
    })
    .unwrap_or_else(|_| {
        error!("panic in reply_session_new");
        std::ptr::null_mut()
    })
}

/// Free a session created by `reply_session_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn reply_session_free(session: *mut FfiSession) {
    if !session.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(session) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Session options
// ---------------------------------------------------------------------------

/// Run `f` against a live session, translating null handles and panics.
fn with_session(
    session: *mut FfiSession,
    name: &str,
    f: impl FnOnce(&mut FfiSession) -> FfiStatus,
) -> FfiStatus {
    if session.is_null() {
        return FfiStatus::NullArg;
    }
    catch_unwind(AssertUnwindSafe(|| f(unsafe { &mut *session }))).unwrap_or_else(|_| {
        error!("panic in {name}");
        FfiStatus::Panic
    })
}

/// Set the client certificate file and its encoding.
#[unsafe(no_mangle)]
pub extern "C" fn reply_session_set_certificate(
    session: *mut FfiSession,
    path: *const c_char,
    format: FfiCertificateFormat,
) -> FfiStatus {
    if path.is_null() {
        return FfiStatus::NullArg;
    }
    with_session(session, "reply_session_set_certificate", |s| {
        let Some(path) = (unsafe { borrowed_str(path) }) else {
            return FfiStatus::InvalidArg;
        };
        match s.inner.set_certificate(path, format.into()) {
            Ok(()) => FfiStatus::Ok,
            Err(_) => FfiStatus::Rejected,
        }
    })
}

/// Set the private key file. `algorithm` is a hint only.
#[unsafe(no_mangle)]
pub extern "C" fn reply_session_set_ssl_key(
    session: *mut FfiSession,
    path: *const c_char,
    algorithm: FfiKeyAlgorithm,
) -> FfiStatus {
    if path.is_null() {
        return FfiStatus::NullArg;
    }
    with_session(session, "reply_session_set_ssl_key", |s| {
        let Some(path) = (unsafe { borrowed_str(path) }) else {
            return FfiStatus::InvalidArg;
        };
        match s.inner.set_ssl_key(path, algorithm.into()) {
            Ok(()) => FfiStatus::Ok,
            Err(_) => FfiStatus::Rejected,
        }
    })
}

/// Set engine verbosity; zero turns verbose output off.
#[unsafe(no_mangle)]
pub extern "C" fn reply_session_set_verbosity(session: *mut FfiSession, level: u32) -> FfiStatus {
    with_session(session, "reply_session_set_verbosity", |s| {
        match s.inner.set_verbosity_level(level) {
            Ok(()) => FfiStatus::Ok,
            Err(_) => FfiStatus::Rejected,
        }
    })
}

/// Set a whole-transfer timeout in milliseconds; zero disables it.
#[unsafe(no_mangle)]
pub extern "C" fn reply_session_set_timeout_ms(session: *mut FfiSession, ms: u64) -> FfiStatus {
    with_session(session, "reply_session_set_timeout_ms", |s| {
        let timeout = (ms > 0).then(|| Duration::from_millis(ms));
        match s.inner.set_timeout(timeout) {
            Ok(()) => FfiStatus::Ok,
            Err(_) => FfiStatus::Rejected,
        }
    })
}

// ---------------------------------------------------------------------------
// Transfer
// ---------------------------------------------------------------------------

/// Perform `request` with an optional body and return the finished reply.
///
/// `body` may be null when `body_len` is zero. Returns null only for null or
/// invalid arguments or an internal panic; transfer failures come back as a
/// reply whose `reply_error_kind` is not `None`. Free with `reply_free`.
#[unsafe(no_mangle)]
pub extern "C" fn reply_session_send(
    session: *mut FfiSession,
    request: *const FfiHttpRequest,
    body: *const u8,
    body_len: usize,
) -> *mut FfiReply {
    if session.is_null() || request.is_null() || (body.is_null() && body_len > 0) {
        return std::ptr::null_mut();
    }
    catch_unwind(AssertUnwindSafe(|| {
        let session = unsafe { &mut *session };
        let Some(request) = (unsafe { (*request).to_core() }) else {
            return std::ptr::null_mut();
        };
        let body = if body_len == 0 {
            &[][..]
        } else {
            unsafe { std::slice::from_raw_parts(body, body_len) }
        };
        let reply = session.inner.send(&request, body);
        Box::into_raw(Box::new(FfiReply { inner: reply }))
    }))
    .unwrap_or_else(|_| {
        error!("panic in reply_session_send");
        std::ptr::null_mut()
    })
}

// ---------------------------------------------------------------------------
// Reply access
// ---------------------------------------------------------------------------

/// Copy up to `max_len` body bytes into `out`, advancing the read cursor.
/// Returns the number of bytes copied; zero once the body is exhausted.
#[unsafe(no_mangle)]
pub extern "C" fn reply_read(reply: *mut FfiReply, out: *mut u8, max_len: usize) -> usize {
    if reply.is_null() || out.is_null() {
        return 0;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let reply = unsafe { &mut *reply };
        let chunk = reply.inner.read_chunk(max_len);
        unsafe { std::ptr::copy_nonoverlapping(chunk.as_ptr(), out, chunk.len()) };
        chunk.len()
    }))
    .unwrap_or(0)
}

/// Body bytes not yet read.
#[unsafe(no_mangle)]
pub extern "C" fn reply_bytes_available(reply: *const FfiReply) -> usize {
    if reply.is_null() {
        return 0;
    }
    catch_unwind(AssertUnwindSafe(|| unsafe { &*reply }.inner.bytes_available())).unwrap_or(0)
}

/// HTTP status of a successful transfer, or -1 when the transfer failed.
#[unsafe(no_mangle)]
pub extern "C" fn reply_status(reply: *const FfiReply) -> i32 {
    if reply.is_null() {
        return -1;
    }
    catch_unwind(AssertUnwindSafe(|| {
        unsafe { &*reply }
            .inner
            .status()
            .map(i32::from)
            .unwrap_or(-1)
    }))
    .unwrap_or(-1)
}

/// Error kind of a failed transfer; `None` for a successful one.
#[unsafe(no_mangle)]
pub extern "C" fn reply_error_kind(reply: *const FfiReply) -> FfiErrorKind {
    if reply.is_null() {
        return FfiErrorKind::None;
    }
    catch_unwind(AssertUnwindSafe(|| {
        unsafe { &*reply }
            .inner
            .error()
            .map(|e| e.kind.into())
            .unwrap_or(FfiErrorKind::None)
    }))
    .unwrap_or_else(|_| {
        error!("panic in reply_error_kind");
        FfiErrorKind::UnknownNetworkError
    })
}

/// Engine message of a failed transfer, or null. Free with
/// `reply_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn reply_error_message(reply: *const FfiReply) -> *mut c_char {
    if reply.is_null() {
        return std::ptr::null_mut();
    }
    catch_unwind(AssertUnwindSafe(|| {
        match unsafe { &*reply }.inner.error() {
            Some(err) => into_c_string(&err.message),
            None => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Value of response header `name`, or null if absent. Free with
/// `reply_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn reply_header(reply: *const FfiReply, name: *const c_char) -> *mut c_char {
    if reply.is_null() || name.is_null() {
        return std::ptr::null_mut();
    }
    catch_unwind(AssertUnwindSafe(|| {
        let Some(name) = (unsafe { borrowed_str(name) }) else {
            return std::ptr::null_mut();
        };
        match unsafe { &*reply }.inner.header(name) {
            Some(value) => into_c_string(value),
            None => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Interior NULs cannot be represented; such values come back truncated at
/// the first NUL.
fn into_c_string(s: &str) -> *mut c_char {
    let bytes = s.split('\0').next().unwrap_or("");
    CString::new(bytes).unwrap_or_default().into_raw()
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free a reply returned by `reply_session_send`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn reply_free(reply: *mut FfiReply) {
    if !reply.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(reply) });
        }));
    }
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn reply_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::{CStr, CString};

    fn start_server() -> String {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        std_listener.set_nonblocking(true).unwrap();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
                mock_server::run(listener).await
            })
            .unwrap();
        });

        format!("http://{addr}")
    }

    fn take_string(s: *mut c_char) -> String {
        assert!(!s.is_null());
        let out = unsafe { CStr::from_ptr(s) }.to_str().unwrap().to_string();
        reply_free_string(s);
        out
    }

    fn request(url: &CString) -> FfiHttpRequest {
        FfiHttpRequest {
            url: url.as_ptr(),
            headers: std::ptr::null(),
            headers_len: 0,
        }
    }

    #[test]
    fn generated_header_declares_the_c_surface() {
        let header = include_str!(concat!(env!("OUT_DIR"), "/reply_ffi.h"));
        assert!(header.contains("REPLY_FFI_H"));
        for function in [
            "reply_session_new",
            "reply_session_send",
            "reply_read",
            "reply_error_kind",
            "reply_free_string",
        ] {
            assert!(header.contains(function), "missing {function}");
        }
        assert!(header.contains("FfiErrorKind"));
    }

    #[test]
    fn session_new_and_free() {
        let session = reply_session_new();
        assert!(!session.is_null());
        reply_session_free(session);
    }

    #[test]
    fn session_free_null_is_safe() {
        reply_session_free(std::ptr::null_mut());
    }

    #[test]
    fn options_on_null_session_report_null_arg() {
        let path = CString::new("/tmp/c.pem").unwrap();
        assert_eq!(
            reply_session_set_certificate(std::ptr::null_mut(), path.as_ptr(), FfiCertificateFormat::Pem),
            FfiStatus::NullArg
        );
        assert_eq!(
            reply_session_set_verbosity(std::ptr::null_mut(), 1),
            FfiStatus::NullArg
        );
    }

    #[test]
    fn options_are_accepted() {
        let session = reply_session_new();
        let cert = CString::new("/tmp/client.der").unwrap();
        let key = CString::new("/tmp/client.key").unwrap();
        assert_eq!(
            reply_session_set_certificate(session, cert.as_ptr(), FfiCertificateFormat::Der),
            FfiStatus::Ok
        );
        assert_eq!(
            reply_session_set_ssl_key(session, key.as_ptr(), FfiKeyAlgorithm::Ec),
            FfiStatus::Ok
        );
        assert_eq!(reply_session_set_verbosity(session, 0), FfiStatus::Ok);
        assert_eq!(reply_session_set_timeout_ms(session, 0), FfiStatus::Ok);
        assert_eq!(
            reply_session_set_ssl_key(session, std::ptr::null(), FfiKeyAlgorithm::Rsa),
            FfiStatus::NullArg
        );
        reply_session_free(session);
    }

    #[test]
    fn send_with_null_arguments_returns_null() {
        let session = reply_session_new();
        assert!(reply_session_send(session, std::ptr::null(), std::ptr::null(), 0).is_null());

        let url = CString::new("http://127.0.0.1:1/").unwrap();
        let req = request(&url);
        assert!(reply_session_send(std::ptr::null_mut(), &req, std::ptr::null(), 0).is_null());
        assert!(reply_session_send(session, &req, std::ptr::null(), 4).is_null());
        reply_session_free(session);
    }

    #[test]
    fn send_with_missing_header_array_returns_null() {
        let session = reply_session_new();
        let url = CString::new("http://127.0.0.1:1/").unwrap();
        let req = FfiHttpRequest {
            url: url.as_ptr(),
            headers: std::ptr::null(),
            headers_len: 2,
        };
        assert!(reply_session_send(session, &req, std::ptr::null(), 0).is_null());
        reply_session_free(session);
    }

    #[test]
    fn reply_accessors_on_null_are_safe() {
        let mut buf = [0u8; 4];
        assert_eq!(reply_read(std::ptr::null_mut(), buf.as_mut_ptr(), 4), 0);
        assert_eq!(reply_bytes_available(std::ptr::null()), 0);
        assert_eq!(reply_status(std::ptr::null()), -1);
        assert_eq!(reply_error_kind(std::ptr::null()), FfiErrorKind::None);
        assert!(reply_error_message(std::ptr::null()).is_null());
        reply_free(std::ptr::null_mut());
        reply_free_string(std::ptr::null_mut());
    }

    #[test]
    fn get_json_through_the_c_surface() {
        let base = start_server();
        let session = reply_session_new();
        let url = CString::new(format!("{base}/json")).unwrap();
        let req = request(&url);

        let reply = reply_session_send(session, &req, std::ptr::null(), 0);
        assert!(!reply.is_null());
        assert_eq!(reply_status(reply), 200);
        assert_eq!(reply_error_kind(reply), FfiErrorKind::None);
        assert!(reply_error_message(reply).is_null());

        let name = CString::new("Content-Type").unwrap();
        assert_eq!(take_string(reply_header(reply, name.as_ptr())), "application/json");
        let missing = CString::new("X-Missing").unwrap();
        assert!(reply_header(reply, missing.as_ptr()).is_null());

        let mut buf = [0u8; 4];
        let mut body = Vec::new();
        loop {
            let n = reply_read(reply, buf.as_mut_ptr(), buf.len());
            if n == 0 {
                break;
            }
            body.extend_from_slice(&buf[..n]);
        }
        assert_eq!(body, br#"{"ok":true}"#);
        assert_eq!(reply_bytes_available(reply), 0);

        reply_free(reply);
        reply_session_free(session);
    }

    #[test]
    fn post_with_headers_through_the_c_surface() {
        let base = start_server();
        let session = reply_session_new();
        let url = CString::new(format!("{base}/echo")).unwrap();
        let name = CString::new("X-Test").unwrap();
        let value = CString::new("abc").unwrap();
        let headers = [FfiHeader {
            name: name.as_ptr(),
            value: value.as_ptr(),
        }];
        let req = FfiHttpRequest {
            url: url.as_ptr(),
            headers: headers.as_ptr(),
            headers_len: 1,
        };
        let body = b"hello";

        let reply = reply_session_send(session, &req, body.as_ptr(), body.len());
        assert_eq!(reply_status(reply), 200);

        let echo: mock_server::Echo = unsafe { &*reply }.inner.json().unwrap();
        assert_eq!(echo.method, "POST");
        assert_eq!(echo.body, "hello");
        assert_eq!(echo.header("x-test"), Some("abc"));

        reply_free(reply);
        reply_session_free(session);
    }

    #[test]
    fn refused_connection_is_a_reply_with_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let session = reply_session_new();
        let url = CString::new(format!("http://127.0.0.1:{port}/")).unwrap();
        let req = request(&url);

        let reply = reply_session_send(session, &req, std::ptr::null(), 0);
        assert!(!reply.is_null());
        assert_eq!(reply_status(reply), -1);
        assert_eq!(reply_error_kind(reply), FfiErrorKind::ConnectionRefused);
        assert!(!take_string(reply_error_message(reply)).is_empty());

        reply_free(reply);
        reply_session_free(session);
    }

    #[test]
    fn accessors_on_a_partly_read_reply() {
        let base = start_server();
        let session = reply_session_new();
        let url = CString::new(format!("{base}/bytes/10")).unwrap();
        let req = request(&url);

        let reply = reply_session_send(session, &req, std::ptr::null(), 0);
        let mut buf = [0u8; 4];
        assert_eq!(reply_read(reply, buf.as_mut_ptr(), buf.len()), 4);
        assert_eq!(reply_bytes_available(reply), 6);
        assert_eq!(reply_status(reply), 200);
        assert_eq!(reply_error_kind(reply), FfiErrorKind::None);

        reply_free(reply);
        reply_session_free(session);
    }
}
