//! Blocking HTTP transfers exposed as finished, readable replies.
//!
//! # Overview
//! A `TransferSession` owns one transfer engine handle. `send` translates a
//! `HttpRequest` plus optional body into engine options, runs the engine's
//! blocking perform, collects the bytes the engine pushes through its
//! callbacks into a `Reply`, and hands that reply back. The caller then pulls
//! the body through a forward-only read cursor and inspects headers, status
//! or error.
//!
//! # Design
//! - Transport failures never surface as `Err` from `send`; they are carried
//!   in the reply (`Reply::error`) next to an absent status. HTTP 4xx/5xx are
//!   successful transfers.
//! - Every `send` returns a freshly owned `Reply`; `send_into` lets callers
//!   recycle storage explicitly.
//! - Engines sit behind the `TransferEngine` trait. `ureq` (default feature)
//!   and libcurl (`curl` feature) backends are provided.

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod mapper;
pub mod reply;
pub mod session;

pub use codec::ResponseHeaders;
pub use config::SessionConfig;
pub use engine::{CertificateFormat, KeyAlgorithm, ResultCode, TransferEngine, TransferSink};
pub use error::{ErrorKind, SessionError, TransferError};
pub use http::HttpRequest;
pub use reply::{NetworkReply, Reply};
pub use session::TransferSession;

#[cfg(any(feature = "ureq", feature = "curl"))]
pub use engine::DefaultEngine;
