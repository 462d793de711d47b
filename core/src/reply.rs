//! The per-transfer response object.
//!
//! # Design
//! The engine pushes bytes while `perform` blocks; the caller pulls them
//! afterwards. `Reply` bridges the two by buffering everything in memory
//! during the transfer (it is the engine's `TransferSink`) and exposing a
//! forward-only read cursor once the transfer has completed. Writes and reads
//! never overlap in time, so no synchronisation is involved.
//!
//! After a completed transfer exactly one of status / error is present. The
//! `Outcome` enum makes "both" unrepresentable; "neither" only exists between
//! `reset` and completion.

use std::io::{self, Read};

use serde::de::DeserializeOwned;
use tracing::trace;

use crate::codec::{self, ResponseHeaders};
use crate::engine::{ResultCode, TransferSink};
use crate::error::TransferError;
use crate::mapper;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Status(u16),
    Failed(TransferError),
}

/// The reply contract hosts program against.
///
/// Mirrors an asynchronous network reply, but every `Reply` handed out by a
/// session is already finished: there is nothing left to wait for and
/// nothing to abort.
pub trait NetworkReply: Read {
    fn is_finished(&self) -> bool;

    /// No-op on an already completed transfer.
    fn abort(&mut self);

    fn status(&self) -> Option<u16>;

    fn error(&self) -> Option<&TransferError>;

    fn raw_header(&self, name: &str) -> Option<&str>;

    /// Bytes left between the read cursor and the end of the body.
    fn bytes_available(&self) -> usize;
}

/// Outcome and buffered content of one transfer.
#[derive(Debug, Clone, Default)]
pub struct Reply {
    cursor: usize,
    body: Vec<u8>,
    raw_headers: Vec<u8>,
    headers: ResponseHeaders,
    outcome: Option<Outcome>,
}

impl Reply {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear everything so the storage can carry another transfer.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.body.clear();
        self.raw_headers.clear();
        self.headers.clear();
        self.outcome = None;
    }

    /// Record a transport-level success and parse the accumulated headers.
    pub(crate) fn complete(&mut self, status: u16) {
        self.headers = codec::parse_header_block(&self.raw_headers);
        self.outcome = Some(Outcome::Status(status));
    }

    pub(crate) fn fail(&mut self, error: TransferError) {
        self.outcome = Some(Outcome::Failed(error));
    }

    /// Copy up to `max_len` bytes from the cursor and advance past them.
    /// Returns an empty slice once the body is exhausted.
    pub fn read_chunk(&mut self, max_len: usize) -> &[u8] {
        let start = self.cursor.min(self.body.len());
        let end = start.saturating_add(max_len).min(self.body.len());
        self.cursor = end;
        &self.body[start..end]
    }

    pub fn status(&self) -> Option<u16> {
        match &self.outcome {
            Some(Outcome::Status(status)) => Some(*status),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&TransferError> {
        match &self.outcome {
            Some(Outcome::Failed(err)) => Some(err),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn headers(&self) -> &ResponseHeaders {
        &self.headers
    }

    /// Header bytes exactly as the engine delivered them, every redirect hop
    /// included.
    pub fn raw_headers(&self) -> &[u8] {
        &self.raw_headers
    }

    /// The whole body, independent of the read cursor.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn bytes_available(&self) -> usize {
        self.body.len().saturating_sub(self.cursor)
    }

    /// Decode the whole body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Turn the status/error pair into a `Result`. A reply no transfer has
    /// completed yet is an error with result code 2 (failed initialization).
    pub fn into_result(self) -> Result<Reply, TransferError> {
        match self.outcome {
            Some(Outcome::Status(_)) => Ok(self),
            Some(Outcome::Failed(err)) => Err(err),
            None => Err(mapper::map(ResultCode::FAILED_INIT)),
        }
    }
}

impl TransferSink for Reply {
    fn on_body_chunk(&mut self, chunk: &[u8]) -> usize {
        trace!(len = chunk.len(), "body chunk");
        self.body.extend_from_slice(chunk);
        chunk.len()
    }

    fn on_header_chunk(&mut self, chunk: &[u8]) -> usize {
        trace!(len = chunk.len(), "header chunk");
        self.raw_headers.extend_from_slice(chunk);
        chunk.len()
    }
}

impl Read for Reply {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let chunk = self.read_chunk(buf.len());
        let n = chunk.len();
        buf[..n].copy_from_slice(chunk);
        Ok(n)
    }
}

impl NetworkReply for Reply {
    fn is_finished(&self) -> bool {
        Reply::is_finished(self)
    }

    fn abort(&mut self) {}

    fn status(&self) -> Option<u16> {
        Reply::status(self)
    }

    fn error(&self) -> Option<&TransferError> {
        Reply::error(self)
    }

    fn raw_header(&self, name: &str) -> Option<&str> {
        self.header(name)
    }

    fn bytes_available(&self) -> usize {
        Reply::bytes_available(self)
    }
}
