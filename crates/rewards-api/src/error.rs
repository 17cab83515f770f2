//! Error types for issuer and rewards requests

/// Errors from credential and reward operations.
///
/// `Unauthorized` is kept apart from every other failure so callers can tell
/// "retry later" from "acquire a new credential".
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("credential rejected by {endpoint} (401)")]
    Unauthorized { endpoint: &'static str },

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("unexpected response from {endpoint}: {reason}")]
    Decode {
        endpoint: &'static str,
        reason: String,
    },

    #[error("invalid egress: {0}")]
    InvalidEgress(String),
}

impl Error {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized { .. })
    }
}

/// Result alias for rewards operations.
pub type Result<T> = std::result::Result<T, Error>;
