//! libcurl engine over the `curl` crate's easy handle.
//!
//! Callbacks are attached to a scoped `Transfer` for each `perform`, which
//! lets them borrow the sink for exactly the duration of the call. libcurl
//! delivers every header block it sees, one per redirect hop.

use std::cell::RefCell;
use std::path::Path;
use std::time::Duration;

use curl::easy::{Easy, InfoType, List};
use tracing::{debug, trace};

use super::{CertificateFormat, ResultCode, TransferEngine, TransferSink, DEFAULT_MAX_REDIRECTS};

/// Transfer engine backed by a libcurl easy handle.
pub struct CurlEngine {
    easy: Easy,
    verbose: bool,
    status: u16,
}

impl CurlEngine {
    /// A fresh handle that follows up to `DEFAULT_MAX_REDIRECTS` hops, the
    /// same default as the other engines.
    pub fn new() -> Self {
        let mut easy = Easy::new();
        // setopt on a fresh handle only fails when libcurl is out of memory,
        // which the first perform reports anyway
        let _ = easy.follow_location(true);
        let _ = easy.max_redirections(DEFAULT_MAX_REDIRECTS);
        Self {
            easy,
            verbose: false,
            status: 0,
        }
    }

    fn run(&mut self, sink: &RefCell<&mut dyn TransferSink>) -> Result<(), curl::Error> {
        let verbose = self.verbose;
        let mut transfer = self.easy.transfer();
        transfer.write_function(|data| Ok(sink.borrow_mut().on_body_chunk(data)))?;
        transfer.header_function(|data| sink.borrow_mut().on_header_chunk(data) == data.len())?;
        if verbose {
            transfer.debug_function(trace_debug)?;
        }
        transfer.perform()
    }
}

impl Default for CurlEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn code_of(err: curl::Error) -> ResultCode {
    ResultCode::from_raw(err.code() as u32)
}

fn trace_debug(kind: InfoType, data: &[u8]) {
    let prefix = match kind {
        InfoType::Text => "*",
        InfoType::HeaderIn => "<",
        InfoType::HeaderOut => ">",
        _ => return,
    };
    trace!("{prefix} {}", String::from_utf8_lossy(data).trim_end());
}

impl TransferEngine for CurlEngine {
    fn set_url(&mut self, url: &str) -> Result<(), ResultCode> {
        self.easy.url(url).map_err(code_of)
    }

    fn set_headers(&mut self, lines: &[String]) -> Result<(), ResultCode> {
        let mut list = List::new();
        for line in lines {
            list.append(line).map_err(code_of)?;
        }
        self.easy.http_headers(list).map_err(code_of)
    }

    fn set_body(&mut self, body: Option<&[u8]>) -> Result<(), ResultCode> {
        match body {
            Some(body) => {
                self.easy.post(true).map_err(code_of)?;
                self.easy.post_fields_copy(body).map_err(code_of)
            }
            None => self.easy.get(true).map_err(code_of),
        }
    }

    fn set_client_certificate(
        &mut self,
        path: &Path,
        format: CertificateFormat,
    ) -> Result<(), ResultCode> {
        self.easy.ssl_cert_type(format.as_str()).map_err(code_of)?;
        self.easy.ssl_cert(path).map_err(code_of)
    }

    fn set_private_key(&mut self, path: &Path) -> Result<(), ResultCode> {
        self.easy.ssl_key(path).map_err(code_of)
    }

    fn set_verbose(&mut self, verbose: bool) -> Result<(), ResultCode> {
        self.verbose = verbose;
        self.easy.verbose(verbose).map_err(code_of)
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<(), ResultCode> {
        // zero means no timeout to libcurl
        self.easy
            .timeout(timeout.unwrap_or(Duration::ZERO))
            .map_err(code_of)
    }

    fn set_max_redirects(&mut self, max: u32) -> Result<(), ResultCode> {
        self.easy.follow_location(max > 0).map_err(code_of)?;
        self.easy.max_redirections(max).map_err(code_of)
    }

    fn perform(&mut self, sink: &mut dyn TransferSink) -> ResultCode {
        let sink = RefCell::new(sink);
        let result = self.run(&sink);
        // getinfo needs the handle mutably, so the status is cached here
        self.status = self
            .easy
            .response_code()
            .map(|code| code as u16)
            .unwrap_or(0);
        match result {
            Ok(()) => ResultCode::OK,
            Err(err) => {
                debug!(error = %err, "curl transfer failed");
                code_of(err)
            }
        }
    }

    fn response_code(&self) -> u16 {
        self.status
    }

    fn describe(&self, code: ResultCode) -> String {
        curl::Error::new(code.raw() as _).description().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_are_accepted() {
        let mut engine = CurlEngine::new();
        engine.set_url("http://127.0.0.1/").unwrap();
        engine
            .set_headers(&["Accept: */*".to_string(), "Content-Length: 3".to_string()])
            .unwrap();
        engine.set_body(Some(b"abc")).unwrap();
        engine.set_body(None).unwrap();
        engine.set_timeout(Some(Duration::from_millis(500))).unwrap();
        engine.set_timeout(None).unwrap();
        engine.set_max_redirects(0).unwrap();
    }

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

    #[test]
    fn redirects_are_followed_by_default() {
        let base = start_server();
        let mut session = crate::TransferSession::with_engine(CurlEngine::new());

        let reply = session.send(&crate::HttpRequest::new(format!("{base}/redirect/2")), b"");

        assert_eq!(reply.status(), Some(200));
        assert_eq!(reply.header("X-Hop"), Some("0"));
        assert_eq!(reply.body(), b"arrived");
    }

    #[test]
    fn describe_uses_libcurl_text() {
        let engine = CurlEngine::new();
        assert!(!engine.describe(ResultCode::COULDNT_RESOLVE_HOST).is_empty());
        assert_eq!(engine.response_code(), 0);
    }
}
