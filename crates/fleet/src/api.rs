//! Seam between supervisors and the HTTP client
//!
//! Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
//! (`Arc<dyn RewardsApi>`), so supervisors can be driven by scripted fakes.

use std::future::Future;
use std::pin::Pin;

use rewards_api::{ClaimState, Credential, PointTotal, Result, RewardsClient};
use serde_json::Value;

type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// The four operations an account cycle needs.
pub trait RewardsApi: Send + Sync {
    fn acquire_credential<'a>(&'a self, address: &'a str) -> ApiFuture<'a, Credential>;

    /// Must report a rejected credential as `Error::Unauthorized`.
    fn fetch_point_total<'a>(&'a self, credential: &'a Credential) -> ApiFuture<'a, PointTotal>;

    fn fetch_claim_state<'a>(
        &'a self,
        credential: &'a Credential,
    ) -> ApiFuture<'a, Option<ClaimState>>;

    fn trigger_claim<'a>(&'a self, credential: &'a Credential) -> ApiFuture<'a, Value>;
}

impl RewardsApi for RewardsClient {
    fn acquire_credential<'a>(&'a self, address: &'a str) -> ApiFuture<'a, Credential> {
        Box::pin(RewardsClient::acquire_credential(self, address))
    }

    fn fetch_point_total<'a>(&'a self, credential: &'a Credential) -> ApiFuture<'a, PointTotal> {
        Box::pin(RewardsClient::fetch_point_total(self, credential))
    }

    fn fetch_claim_state<'a>(
        &'a self,
        credential: &'a Credential,
    ) -> ApiFuture<'a, Option<ClaimState>> {
        Box::pin(RewardsClient::fetch_claim_state(self, credential))
    }

    fn trigger_claim<'a>(&'a self, credential: &'a Credential) -> ApiFuture<'a, Value> {
        Box::pin(RewardsClient::trigger_claim(self, credential))
    }
}
