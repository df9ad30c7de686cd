//! Error types for the project API client.
//!
//! # Design
//! Two failure kinds reach callers from the checked paths: an access error
//! when a credential is missing at construction, and a request error when the
//! server answers a checked call (the metadata probe, the PDF export) with a
//! non-200 status. The remaining variants cover the plumbing underneath:
//! transport failures, JSON shape problems and local file I/O.

use std::fmt;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Which construction input was absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    Token,
    Host,
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Token => write!(f, "API token"),
            Credential::Host => write!(f, "API host"),
        }
    }
}

/// Errors returned by `ProjectClient` and its transport.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required credential was absent or blank. Raised before any network
    /// call is made.
    #[error("{0} not provided")]
    MissingCredential(Credential),

    /// The server answered a status-checked call with something other than 200.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// A metadata row lacked one of the four schema keys.
    #[error("metadata row {row} is missing `{key}`")]
    SchemaParse { row: usize, key: &'static str },

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The HTTP agent could not complete the round trip.
    #[error("transport error: {0}")]
    Transport(#[from] ureq::Error),

    /// Writing a downloaded file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// True for configuration faults the caller must fix before retrying.
    pub fn is_access_error(&self) -> bool {
        matches!(self, ApiError::MissingCredential(_))
    }

    /// True when the server rejected a status-checked call.
    pub fn is_request_error(&self) -> bool {
        matches!(self, ApiError::HttpStatus { .. })
    }

    /// Status code carried by a request error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
