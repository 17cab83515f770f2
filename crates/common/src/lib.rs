//! Types shared by every crate of the worker fleet

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
