//! Session configuration.
//!
//! Loaded from JSON so hosts can keep transfer settings next to the rest of
//! their configuration. Every field is optional; an empty object yields the
//! engine defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::{CertificateFormat, KeyAlgorithm, DEFAULT_MAX_REDIRECTS};
use crate::error::SessionError;

/// Settings applied by `TransferSession::from_config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Whole-transfer timeout in milliseconds. `None` waits indefinitely.
    pub timeout_ms: Option<u64>,
    pub max_redirects: u32,
    pub verbosity: u32,
    pub certificate: Option<CertificateConfig>,
    pub private_key: Option<PrivateKeyConfig>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            verbosity: 0,
            certificate: None,
            private_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub format: CertificateFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKeyConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub algorithm: KeyAlgorithm,
}

impl SessionConfig {
    pub fn from_json(raw: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config = SessionConfig::from_json("{}").unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.max_redirects, 10);
        assert!(config.timeout().is_none());
    }

    #[test]
    fn certificate_format_defaults_to_pem() {
        let config =
            SessionConfig::from_json(r#"{"certificate":{"path":"/tmp/c.pem"}}"#).unwrap();
        let cert = config.certificate.unwrap();
        assert_eq!(cert.path, PathBuf::from("/tmp/c.pem"));
        assert_eq!(cert.format, CertificateFormat::Pem);
    }

    #[test]
    fn timeout_converts_to_duration() {
        let config = SessionConfig::from_json(r#"{"timeout_ms":250}"#).unwrap();
        assert_eq!(config.timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn unknown_format_is_rejected() {
        let err = SessionConfig::from_json(r#"{"certificate":{"path":"/c","format":"p12"}}"#)
            .unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SessionConfig::from_file("/nonexistent/reply-session.json").unwrap_err();
        assert!(matches!(err, SessionError::Io(_)));
    }
}
