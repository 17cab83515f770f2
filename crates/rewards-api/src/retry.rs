//! Transport-level retry policy
//!
//! Wraps every issuer/indexer request. A request is re-sent when the server
//! answers 5xx or the transport times out, up to `max_retries` extra
//! attempts, sleeping `base_delay * n` before the n-th retry. The policy
//! holds no state between calls.

use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Delay unit; the n-th retry waits `n * base_delay`
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay * retry
    }

    /// Send `request`, retrying on 5xx responses and timeouts.
    ///
    /// The final attempt's outcome is returned unchanged, so a persistent 5xx
    /// comes back as `Ok(response)` for the caller to classify. Requests
    /// whose body cannot be cloned are sent exactly once.
    pub async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<reqwest::Response, reqwest::Error> {
        let mut retry = 0u32;
        loop {
            let Some(attempt) = request.try_clone() else {
                return request.send().await;
            };
            let outcome = attempt.send().await;

            let retryable = match &outcome {
                Ok(response) => response.status().is_server_error(),
                Err(e) => e.is_timeout(),
            };
            if !retryable || retry >= self.max_retries {
                return outcome;
            }

            retry += 1;
            let delay = self.delay_for(retry);
            match &outcome {
                Ok(response) => warn!(
                    retry,
                    status = response.status().as_u16(),
                    delay_ms = delay.as_millis() as u64,
                    "server error, retrying"
                ),
                Err(e) => warn!(
                    retry,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "request timed out, retrying"
                ),
            }
            tokio::time::sleep(delay).await;
        }
    }
}
