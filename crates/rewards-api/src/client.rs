//! Per-account issuer/indexer client
//!
//! One `RewardsClient` is built per account so that its egress is baked into
//! the underlying `reqwest::Client`. Operations are plain request/response;
//! [`RetryPolicy`] is the only retrying layer.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::constants::{
    CLAIM_DETAILS_PATH, CLAIM_REWARD_PATH, GENERATE_TOKEN_PATH, REWARD_REALTIME_PATH,
    browser_headers,
};
use crate::credential::{Credential, TokenResponse};
use crate::egress::Egress;
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::rewards::{ClaimState, PointTotal};

/// Base URLs of the two HTTP services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    /// Credential issuer, e.g. `https://issuer.example`
    pub auth_base_url: String,
    /// Reward indexer
    pub rewards_base_url: String,
}

#[derive(Debug, Clone)]
pub struct RewardsClient {
    http: reqwest::Client,
    endpoints: ApiEndpoints,
    retry: RetryPolicy,
}

impl RewardsClient {
    /// Build a client routed through `egress` (direct when `None`).
    pub fn new(
        endpoints: ApiEndpoints,
        egress: Option<&Egress>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .default_headers(browser_headers())
            .timeout(timeout);
        if let Some(egress) = egress {
            builder = builder.proxy(egress.to_reqwest_proxy()?);
        }
        let http = builder
            .build()
            .map_err(|e| Error::Http(format!("building HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoints,
            retry,
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoints.auth_base_url.trim_end_matches('/'))
    }

    fn rewards_url(&self, path: &str) -> String {
        format!(
            "{}{path}",
            self.endpoints.rewards_base_url.trim_end_matches('/')
        )
    }

    /// Exchange a wallet address for a bearer credential.
    ///
    /// A 2xx without a `token` field yields an empty credential; the caller
    /// decides whether that warrants another attempt.
    #[instrument(skip_all)]
    pub async fn acquire_credential(&self, address: &str) -> Result<Credential> {
        const ENDPOINT: &str = "generate_token";
        let request = self
            .http
            .post(self.auth_url(GENERATE_TOKEN_PATH))
            .json(&serde_json::json!({ "address": address }));

        let response = self
            .retry
            .send(request)
            .await
            .map_err(|e| Error::Http(format!("{ENDPOINT} request failed: {e}")))?;
        let response = check_status(ENDPOINT, response, false).await?;

        let body: TokenResponse = response.json().await.map_err(|e| Error::Decode {
            endpoint: ENDPOINT,
            reason: e.to_string(),
        })?;
        let credential = Credential::new(body.token.unwrap_or_default());
        debug!(empty = credential.is_empty(), "token endpoint answered");
        Ok(credential)
    }

    /// Current heartbeat point total.
    ///
    /// Returns `Error::Unauthorized` when the credential has been rejected.
    #[instrument(skip_all)]
    pub async fn fetch_point_total(&self, credential: &Credential) -> Result<PointTotal> {
        const ENDPOINT: &str = "reward_realtime";
        let body = self
            .get_bearer(ENDPOINT, REWARD_REALTIME_PATH, credential)
            .await?;
        PointTotal::from_realtime(&body).map_err(|reason| Error::Decode {
            endpoint: ENDPOINT,
            reason,
        })
    }

    /// Daily claim eligibility, or `None` when the indexer has no record.
    #[instrument(skip_all)]
    pub async fn fetch_claim_state(&self, credential: &Credential) -> Result<Option<ClaimState>> {
        const ENDPOINT: &str = "claim_details";
        let body = self
            .get_bearer(ENDPOINT, CLAIM_DETAILS_PATH, credential)
            .await?;
        if body.is_null() {
            return Ok(None);
        }
        serde_json::from_value(body)
            .map(Some)
            .map_err(|e| Error::Decode {
                endpoint: ENDPOINT,
                reason: e.to_string(),
            })
    }

    /// Trigger the daily claim. The payload is returned as-is for logging.
    #[instrument(skip_all)]
    pub async fn trigger_claim(&self, credential: &Credential) -> Result<Value> {
        self.get_bearer("claim_reward", CLAIM_REWARD_PATH, credential)
            .await
    }

    async fn get_bearer(
        &self,
        endpoint: &'static str,
        path: &str,
        credential: &Credential,
    ) -> Result<Value> {
        let request = self
            .http
            .get(self.rewards_url(path))
            .bearer_auth(credential.token());
        let response = self
            .retry
            .send(request)
            .await
            .map_err(|e| Error::Http(format!("{endpoint} request failed: {e}")))?;
        let response = check_status(endpoint, response, true).await?;

        let text = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("{endpoint} body read failed: {e}")))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| Error::Decode {
            endpoint,
            reason: e.to_string(),
        })
    }
}

/// Map non-2xx responses to errors. 401 on a bearer call is reported as
/// `Unauthorized`; everything else collapses to `Status`.
async fn check_status(
    endpoint: &'static str,
    response: reqwest::Response,
    bearer: bool,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if bearer && status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::Unauthorized { endpoint });
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<no body>"));
    Err(Error::Status {
        endpoint,
        status: status.as_u16(),
        body,
    })
}
