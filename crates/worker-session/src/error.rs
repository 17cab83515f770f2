//! Error types for the persistent connection

/// Errors from opening or using a session connection.
///
/// None of these are fatal to the session: every one of them is turned into
/// a connection-lost event and handled by the reconnect policy.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid connection URL: {0}")]
    InvalidUrl(String),

    #[error("proxy tunnel failed: {0}")]
    Proxy(String),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("receive failed: {0}")]
    Receive(String),

    #[error("message encoding failed: {0}")]
    Encode(String),
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;
