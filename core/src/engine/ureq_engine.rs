//! Pure-Rust engine on top of `ureq`.
//!
//! # Design
//! `ureq` hands back a finished `http::Response` rather than calling back,
//! so `perform` replays it into the sink: the status line and headers of the
//! final response become one wire-format header block, then the body is read
//! in fixed-size chunks and pushed as it arrives. Redirects are followed
//! inside `ureq`; only the last hop's headers reach the sink.
//!
//! The `Agent` is built lazily and cached until an option that shapes it
//! (timeout, redirects, client certificate) changes.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, trace};
use ureq::http::Response;
use ureq::tls::{Certificate, ClientCert, PrivateKey, TlsConfig};
use ureq::{Agent, Body};

use super::{CertificateFormat, ResultCode, TransferEngine, TransferSink, DEFAULT_MAX_REDIRECTS};

const CHUNK_SIZE: usize = 16 * 1024;

/// Transfer engine backed by a `ureq::Agent`.
pub struct UreqEngine {
    url: String,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    certificate: Option<(PathBuf, CertificateFormat)>,
    private_key: Option<PathBuf>,
    verbose: bool,
    timeout: Option<Duration>,
    max_redirects: u32,
    agent: Option<Agent>,
    status: u16,
}

impl UreqEngine {
    pub fn new() -> Self {
        Self {
            url: String::new(),
            headers: Vec::new(),
            body: None,
            certificate: None,
            private_key: None,
            verbose: false,
            timeout: None,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            agent: None,
            status: 0,
        }
    }

    fn agent(&mut self) -> Result<Agent, ResultCode> {
        if let Some(agent) = &self.agent {
            return Ok(agent.clone());
        }
        let mut builder = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(self.timeout)
            .max_redirects(self.max_redirects);
        if let Some(client_cert) = self.client_cert()? {
            builder = builder.tls_config(TlsConfig::builder().client_cert(Some(client_cert)).build());
        }
        let agent: Agent = builder.build().new_agent();
        self.agent = Some(agent.clone());
        Ok(agent)
    }

    /// Load the configured certificate and key. Without a separate key path
    /// the key is read from the certificate file.
    fn client_cert(&self) -> Result<Option<ClientCert>, ResultCode> {
        let Some((cert_path, format)) = &self.certificate else {
            return Ok(None);
        };
        let cert_bytes = read_credential(cert_path)?;
        let certificate = match format {
            CertificateFormat::Pem => Certificate::from_pem(&cert_bytes).map_err(|err| {
                debug!(path = %cert_path.display(), error = %err, "bad client certificate");
                ResultCode::SSL_CERTPROBLEM
            })?,
            CertificateFormat::Der => Certificate::from_der(&cert_bytes).to_owned(),
        };
        let key_path = self.private_key.as_deref().unwrap_or(cert_path.as_path());
        let key_bytes = read_credential(key_path)?;
        let key = PrivateKey::from_pem(&key_bytes).map_err(|err| {
            debug!(path = %key_path.display(), error = %err, "bad private key");
            ResultCode::SSL_CERTPROBLEM
        })?;
        Ok(Some(ClientCert::new_with_certs(&[certificate], key)))
    }

    fn execute(&self, agent: &Agent) -> Result<Response<Body>, ureq::Error> {
        match &self.body {
            Some(body) => {
                let mut request = agent.post(self.url.as_str());
                for (name, value) in &self.headers {
                    request = request.header(name.as_str(), value.as_str());
                }
                request.send(&body[..])
            }
            None => {
                let mut request = agent.get(self.url.as_str());
                for (name, value) in &self.headers {
                    request = request.header(name.as_str(), value.as_str());
                }
                request.call()
            }
        }
    }
}

impl Default for UreqEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferEngine for UreqEngine {
    fn set_url(&mut self, url: &str) -> Result<(), ResultCode> {
        self.url = url.to_string();
        Ok(())
    }

    /// Lines are split on the first `": "`, the separator the session writes,
    /// so the value is kept exactly as given. Content-Length lines are
    /// dropped: `ureq` derives the length from the payload it sends.
    fn set_headers(&mut self, lines: &[String]) -> Result<(), ResultCode> {
        let mut headers = Vec::with_capacity(lines.len());
        for line in lines {
            let (name, value) = match line.split_once(": ") {
                Some(pair) => pair,
                None => (
                    line.strip_suffix(':')
                        .ok_or(ResultCode::BAD_FUNCTION_ARGUMENT)?,
                    "",
                ),
            };
            if name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            headers.push((name.to_string(), value.to_string()));
        }
        self.headers = headers;
        Ok(())
    }

    fn set_body(&mut self, body: Option<&[u8]>) -> Result<(), ResultCode> {
        self.body = body.map(<[u8]>::to_vec);
        Ok(())
    }

    fn set_client_certificate(
        &mut self,
        path: &Path,
        format: CertificateFormat,
    ) -> Result<(), ResultCode> {
        self.certificate = Some((path.to_path_buf(), format));
        self.agent = None;
        Ok(())
    }

    fn set_private_key(&mut self, path: &Path) -> Result<(), ResultCode> {
        self.private_key = Some(path.to_path_buf());
        self.agent = None;
        Ok(())
    }

    fn set_verbose(&mut self, verbose: bool) -> Result<(), ResultCode> {
        self.verbose = verbose;
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<(), ResultCode> {
        self.timeout = timeout;
        self.agent = None;
        Ok(())
    }

    fn set_max_redirects(&mut self, max: u32) -> Result<(), ResultCode> {
        self.max_redirects = max;
        self.agent = None;
        Ok(())
    }

    fn perform(&mut self, sink: &mut dyn TransferSink) -> ResultCode {
        self.status = 0;
        let agent = match self.agent() {
            Ok(agent) => agent,
            Err(code) => return code,
        };
        if self.verbose {
            debug!(url = %self.url, post = self.body.is_some(), "> request");
            for (name, value) in &self.headers {
                debug!("> {name}: {value}");
            }
        }

        let response = match self.execute(&agent) {
            Ok(response) => response,
            Err(err) => {
                debug!(error = %err, "ureq request failed");
                return error_code(
                    &err,
                    Stage::Request {
                        tls: is_https(&self.url),
                    },
                );
            }
        };
        self.status = response.status().as_u16();

        let block = header_block(&response);
        if self.verbose {
            debug!("< {}", String::from_utf8_lossy(&block).trim_end());
        }
        if sink.on_header_chunk(&block) < block.len() {
            return ResultCode::WRITE_ERROR;
        }

        let mut reader = response.into_body().into_reader();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    trace!(len = n, "body bytes received");
                    if sink.on_body_chunk(&buf[..n]) < n {
                        return ResultCode::WRITE_ERROR;
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    debug!(error = %err, "body read failed");
                    return io_error_code(&err, Stage::Body);
                }
            }
        }
        ResultCode::OK
    }

    fn response_code(&self) -> u16 {
        self.status
    }
}

fn read_credential(path: &Path) -> Result<Vec<u8>, ResultCode> {
    std::fs::read(path).map_err(|err| {
        debug!(path = %path.display(), error = %err, "cannot read TLS credential");
        ResultCode::SSL_CERTPROBLEM
    })
}

/// Status line plus headers of `response` in wire format, blank line included.
fn header_block(response: &Response<Body>) -> Vec<u8> {
    let status = response.status();
    let mut block = format!(
        "{:?} {} {}\r\n",
        response.version(),
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    )
    .into_bytes();
    for (name, value) in response.headers() {
        block.extend_from_slice(name.as_str().as_bytes());
        block.extend_from_slice(b": ");
        block.extend_from_slice(value.as_bytes());
        block.extend_from_slice(b"\r\n");
    }
    block.extend_from_slice(b"\r\n");
    block
}

/// Where a failure happened. Some io errors only make sense in context:
/// `InvalidData` while talking to an https URL is rustls refusing the
/// handshake, and an early EOF means nothing or only part of the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Request { tls: bool },
    Body,
}

impl Stage {
    fn eof(self) -> ResultCode {
        match self {
            Stage::Request { .. } => ResultCode::GOT_NOTHING,
            Stage::Body => ResultCode::PARTIAL_FILE,
        }
    }
}

fn is_https(url: &str) -> bool {
    url.get(..6)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("https:"))
}

/// Translate a `ureq` failure.
fn error_code(err: &ureq::Error, stage: Stage) -> ResultCode {
    match err {
        ureq::Error::HostNotFound => ResultCode::COULDNT_RESOLVE_HOST,
        ureq::Error::ConnectionFailed => ResultCode::COULDNT_CONNECT,
        ureq::Error::Timeout(_) | ureq::Error::BodyStalled => ResultCode::OPERATION_TIMEDOUT,
        ureq::Error::TooManyRedirects => ResultCode::TOO_MANY_REDIRECTS,
        ureq::Error::RedirectFailed => ResultCode::WEIRD_SERVER_REPLY,
        ureq::Error::BadUri(_) => ResultCode::URL_MALFORMAT,
        ureq::Error::Http(_) => ResultCode::BAD_FUNCTION_ARGUMENT,
        ureq::Error::Tls(_) | ureq::Error::Rustls(_) => ResultCode::SSL_CONNECT_ERROR,
        ureq::Error::Pem(_) => ResultCode::SSL_CERTPROBLEM,
        ureq::Error::InvalidProxyUrl => ResultCode::COULDNT_RESOLVE_PROXY,
        ureq::Error::ConnectProxyFailed(_) => ResultCode::PROXY,
        ureq::Error::Protocol(_) | ureq::Error::LargeResponseHeader(..) => {
            ResultCode::WEIRD_SERVER_REPLY
        }
        ureq::Error::Decompress(..) => ResultCode::BAD_CONTENT_ENCODING,
        ureq::Error::StatusCode(_) => ResultCode::HTTP_RETURNED_ERROR,
        ureq::Error::Io(io_err) => io_error_code(io_err, stage),
        _ => ResultCode::RECV_ERROR,
    }
}

fn io_error_code(err: &io::Error, stage: Stage) -> ResultCode {
    if let Some(inner) = err.get_ref().and_then(|e| e.downcast_ref::<ureq::Error>()) {
        return error_code(inner, stage);
    }
    match err.kind() {
        io::ErrorKind::ConnectionRefused => ResultCode::COULDNT_CONNECT,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ResultCode::OPERATION_TIMEDOUT,
        io::ErrorKind::UnexpectedEof => stage.eof(),
        io::ErrorKind::InvalidData if stage == (Stage::Request { tls: true }) => {
            ResultCode::SSL_CONNECT_ERROR
        }
        io::ErrorKind::BrokenPipe => ResultCode::SEND_ERROR,
        _ => ResultCode::RECV_ERROR,
    }
}
