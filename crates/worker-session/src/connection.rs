//! Transport abstraction for the persistent connection
//!
//! Decouples the session driver from the wire transport. `WsConnector`
//! speaks WebSocket through the account's egress; tests plug in in-memory
//! connectors that script opens, frames and closures.
//!
//! Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
//! (`Arc<dyn Connector>`).

use std::future::Future;
use std::pin::Pin;

use reqwest::Url;
use rewards_api::{Credential, Egress};

use crate::error::{Error, Result};

/// Opens connections to the coordination service.
pub trait Connector: Send + Sync {
    /// Open one connection to `url`, routed through `egress` when given.
    fn connect<'a>(
        &'a self,
        url: &'a str,
        egress: Option<&'a Egress>,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn Connection>>> + Send + 'a>>;
}

/// One open, bidirectional text connection.
pub trait Connection: Send {
    /// Write one text frame.
    fn send(&mut self, text: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Next text frame. `None` once the remote has closed the connection.
    /// Must be cancel-safe: the driver races it against timers.
    fn recv(&mut self) -> Pin<Box<dyn Future<Output = Option<Result<String>>> + Send + '_>>;

    /// Close the connection, best-effort.
    fn close(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Connection URL for one credential: the base URL with the token appended
/// as the `token` query parameter.
pub fn connection_url(base: &str, credential: &Credential) -> Result<String> {
    let mut url = Url::parse(base).map_err(|e| Error::InvalidUrl(format!("{base}: {e}")))?;
    match url.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(Error::InvalidUrl(format!(
                "{base}: scheme must be ws or wss, got {other}"
            )));
        }
    }
    url.query_pairs_mut()
        .append_pair("token", credential.token());
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_carries_token_query() {
        let url = connection_url("wss://gw.example/ws", &Credential::new("abc.def")).unwrap();
        assert_eq!(url, "wss://gw.example/ws?token=abc.def");
    }

    #[test]
    fn url_keeps_existing_query() {
        let url = connection_url("ws://127.0.0.1:9/ws?v=2", &Credential::new("t")).unwrap();
        assert_eq!(url, "ws://127.0.0.1:9/ws?v=2&token=t");
    }

    #[test]
    fn url_rejects_http_scheme() {
        let err = connection_url("https://gw.example/ws", &Credential::new("t")).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
