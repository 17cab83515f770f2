//! HTTP client for the credential issuer and the rewards indexer
//!
//! Every operation is a single request/response; the only retrying done here
//! is the transport-level [`RetryPolicy`], which re-sends on 5xx and timeouts
//! with a linearly growing delay. Deciding when to re-authenticate or back
//! off for longer is left to the caller.
//!
//! Call flow for one account:
//! 1. `RewardsClient::new()` binds the account's egress into a `reqwest::Client`
//! 2. `acquire_credential()` exchanges the wallet address for a bearer token
//! 3. `fetch_claim_state()` / `trigger_claim()` run the daily claim check
//! 4. `fetch_point_total()` is polled; `Error::Unauthorized` means the token
//!    has expired and a new one must be acquired

pub mod client;
pub mod constants;
pub mod credential;
pub mod egress;
pub mod error;
pub mod retry;
pub mod rewards;

pub use client::{ApiEndpoints, RewardsClient};
pub use credential::Credential;
pub use egress::Egress;
pub use error::{Error, Result};
pub use retry::RetryPolicy;
pub use rewards::{ClaimState, PointTotal};
