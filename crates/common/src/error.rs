//! Startup error types shared by config and input loading

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while assembling the fleet at startup.
///
/// Runtime failures never surface through this type; they are retried or
/// absorbed inside the owning account.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Input file {}: {reason}", path.display())]
    Input { path: PathBuf, reason: String },
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;
