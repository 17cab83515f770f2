//! Bearer credential issued per account

use common::Secret;
use serde::Deserialize;

use crate::constants::{TOKEN_PREVIEW_HEAD, TOKEN_PREVIEW_TAIL};

/// Short-lived bearer token authorizing both HTTP calls and the persistent
/// connection. Never persisted; replaced wholesale on expiry.
#[derive(Debug, Clone)]
pub struct Credential {
    token: Secret<String>,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Secret::new(token.into()),
        }
    }

    /// Full token, for Authorization headers and the connection URL only.
    pub fn token(&self) -> &str {
        self.token.expose()
    }

    /// A successful issuer response can still carry no token.
    pub fn is_empty(&self) -> bool {
        self.token.is_empty()
    }

    /// Abbreviated form safe to log.
    pub fn short(&self) -> String {
        self.token.preview(TOKEN_PREVIEW_HEAD, TOKEN_PREVIEW_TAIL)
    }
}

/// Body returned by the token endpoint. Only `token` is used.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_tolerates_missing_token() {
        let parsed: TokenResponse = serde_json::from_str(r#"{"status":"ok"}"#).unwrap();
        assert!(parsed.token.is_none());

        let parsed: TokenResponse =
            serde_json::from_str(r#"{"token":"abc","expires":123}"#).unwrap();
        assert_eq!(parsed.token.as_deref(), Some("abc"));
    }

    #[test]
    fn short_form_never_contains_full_token() {
        let token = format!("{}{}{}", "h".repeat(36), "SECRETCORE", "t".repeat(8));
        let credential = Credential::new(token.clone());
        assert_eq!(credential.token(), token);
        assert!(!credential.short().contains("SECRETCORE"));
        assert!(credential.short().starts_with(&"h".repeat(36)));
        assert!(credential.short().ends_with(&"t".repeat(8)));
    }

    #[test]
    fn debug_is_redacted() {
        let credential = Credential::new("tok_live_123");
        assert!(!format!("{credential:?}").contains("tok_live_123"));
    }
}
