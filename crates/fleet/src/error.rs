//! Error types for fleet operations

/// Errors from fleet operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no accounts configured")]
    NoAccounts,

    #[error("account {index}: building client failed: {source}")]
    Client {
        index: usize,
        source: rewards_api::Error,
    },

    #[error(transparent)]
    Api(#[from] rewards_api::Error),

    #[error(transparent)]
    Session(#[from] worker_session::Error),
}

/// Result alias for fleet operations.
pub type Result<T> = std::result::Result<T, Error>;
