//! One engine handle driven through sequential blocking transfers.
//!
//! # Design
//! Engine options are per-handle state. Every `send` therefore rewrites all
//! the options it owns (URL, header list, body), including clearing the body
//! when the new request has none; otherwise the previous transfer's settings
//! would leak into the next one. The outgoing header list is rebuilt from
//! scratch on every call.
//!
//! `send` takes `&mut self`, so a session can never have two transfers in
//! flight. Hosts needing parallel transfers use one session per thread.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, debug_span, warn};
use uuid::Uuid;

use crate::codec;
use crate::config::SessionConfig;
use crate::engine::{CertificateFormat, KeyAlgorithm, ResultCode, TransferEngine};
use crate::error::SessionError;
use crate::http::HttpRequest;
use crate::mapper;
use crate::reply::Reply;

/// Adapter turning one blocking engine call into a finished `Reply`.
#[derive(Debug)]
pub struct TransferSession<E: TransferEngine> {
    engine: E,
    pending_headers: Vec<String>,
}

#[cfg(any(feature = "ureq", feature = "curl"))]
impl TransferSession<crate::engine::DefaultEngine> {
    pub fn new() -> Self {
        Self::with_engine(crate::engine::DefaultEngine::new())
    }
}

#[cfg(any(feature = "ureq", feature = "curl"))]
impl Default for TransferSession<crate::engine::DefaultEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: TransferEngine> TransferSession<E> {
    pub fn with_engine(engine: E) -> Self {
        Self {
            engine,
            pending_headers: Vec::new(),
        }
    }

    /// Build a session and apply `config` to its engine.
    pub fn from_config(engine: E, config: &SessionConfig) -> Result<Self, SessionError> {
        let mut session = Self::with_engine(engine);
        session.set_timeout(config.timeout())?;
        session.set_max_redirects(config.max_redirects)?;
        session.set_verbosity_level(config.verbosity)?;
        if let Some(cert) = &config.certificate {
            session.set_certificate(&cert.path, cert.format)?;
        }
        if let Some(key) = &config.private_key {
            session.set_ssl_key(&key.path, key.algorithm)?;
        }
        Ok(session)
    }

    /// Perform `request` with `body` (empty means no body) and return the
    /// finished reply. Failures are reported through `Reply::error`.
    pub fn send(&mut self, request: &HttpRequest, body: &[u8]) -> Reply {
        let mut reply = Reply::new();
        self.send_into(request, body, &mut reply);
        reply
    }

    /// Like `send`, but reuses caller-owned storage. `reply` is reset first.
    pub fn send_into(&mut self, request: &HttpRequest, body: &[u8], reply: &mut Reply) {
        reply.reset();

        let span = debug_span!("transfer", id = %Uuid::new_v4(), url = %request.url);
        let _enter = span.enter();

        if request.url.is_empty() {
            warn!("refusing transfer with an empty URL");
            reply.fail(mapper::map(ResultCode::URL_MALFORMAT));
            return;
        }

        if let Err(code) = self.configure(request, body) {
            let err = mapper::map_failure(code, self.engine.describe(code));
            warn!(kind = %err.kind, %code, "engine rejected request configuration");
            reply.fail(err);
            return;
        }

        let code = self.engine.perform(reply);
        if code.is_ok() {
            let status = self.engine.response_code();
            debug!(status, body_len = reply.body().len(), "transfer complete");
            reply.complete(status);
        } else {
            let err = mapper::map_failure(code, self.engine.describe(code));
            warn!(kind = %err.kind, %code, message = %err.message, "transfer failed");
            reply.fail(err);
        }
    }

    fn configure(&mut self, request: &HttpRequest, body: &[u8]) -> Result<(), ResultCode> {
        self.pending_headers.clear();
        self.pending_headers
            .extend(codec::request_header_lines(request, body));
        debug!(
            headers = self.pending_headers.len(),
            body_len = body.len(),
            "configuring transfer"
        );

        self.engine.set_url(&request.url)?;
        self.engine.set_headers(&self.pending_headers)?;
        self.engine
            .set_body(if body.is_empty() { None } else { Some(body) })
    }

    /// Client certificate used for TLS. The file is not checked here.
    pub fn set_certificate(
        &mut self,
        path: impl AsRef<Path>,
        format: CertificateFormat,
    ) -> Result<(), SessionError> {
        self.engine
            .set_client_certificate(path.as_ref(), format)
            .map_err(|code| SessionError::Option {
                option: "client certificate",
                code,
            })
    }

    /// Private key for the client certificate. `algorithm` is accepted but
    /// the engine infers the key type from the file.
    pub fn set_ssl_key(
        &mut self,
        path: impl AsRef<Path>,
        algorithm: KeyAlgorithm,
    ) -> Result<(), SessionError> {
        debug!(?algorithm, "setting private key");
        self.engine
            .set_private_key(path.as_ref())
            .map_err(|code| SessionError::Option {
                option: "private key",
                code,
            })
    }

    /// Any level above zero turns on the engine's verbose output.
    pub fn set_verbosity_level(&mut self, level: u32) -> Result<(), SessionError> {
        self.engine
            .set_verbose(level > 0)
            .map_err(|code| SessionError::Option {
                option: "verbosity",
                code,
            })
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<(), SessionError> {
        self.engine
            .set_timeout(timeout)
            .map_err(|code| SessionError::Option {
                option: "timeout",
                code,
            })
    }

    pub fn set_max_redirects(&mut self, max: u32) -> Result<(), SessionError> {
        self.engine
            .set_max_redirects(max)
            .map_err(|code| SessionError::Option {
                option: "max redirects",
                code,
            })
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}
