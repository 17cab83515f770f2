//! Endpoint paths and the browser header set
//!
//! The issuer and indexer only answer requests that look like they come
//! from the browser extension, so every request carries the same fixed
//! header set.

use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, HeaderMap, HeaderName, HeaderValue, PRAGMA, USER_AGENT,
};

/// Token issuance, relative to the issuer base URL.
pub const GENERATE_TOKEN_PATH: &str = "/api/v1/auth/generate_token";

/// Realtime reward totals, relative to the rewards base URL.
pub const REWARD_REALTIME_PATH: &str = "/api/v1/reward_realtime";

/// Daily claim eligibility.
pub const CLAIM_DETAILS_PATH: &str = "/api/v1/claim_details";

/// Daily claim trigger.
pub const CLAIM_REWARD_PATH: &str = "/api/v1/claim_reward";

/// Characters of the token kept at the start of its log preview.
pub const TOKEN_PREVIEW_HEAD: usize = 36;

/// Characters of the token kept at the end of its log preview.
pub const TOKEN_PREVIEW_TAIL: usize = 8;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const SEC_CH_UA: &str = r#""Google Chrome";v="131", "Chromium";v="131", "Not_A Brand";v="24""#;

/// Headers sent with every issuer/indexer request and with the WebSocket
/// upgrade.
pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(
        HeaderName::from_static("sec-ch-ua"),
        HeaderValue::from_static(SEC_CH_UA),
    );
    headers.insert(
        HeaderName::from_static("sec-ch-ua-mobile"),
        HeaderValue::from_static("?0"),
    );
    headers.insert(
        HeaderName::from_static("sec-ch-ua-platform"),
        HeaderValue::from_static("\"Windows\""),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("empty"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("cors"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("none"),
    );
    headers
}
