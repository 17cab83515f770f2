//! Network egress (proxy) description
//!
//! A proxy URI is parsed once at fleet start. HTTP traffic hands the URI to
//! `reqwest::Proxy`; the persistent connection uses the parsed host, port
//! and credentials to open its own tunnel.

use std::fmt;

use reqwest::Url;

/// Route an account's traffic takes to the outside world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Egress {
    /// HTTP `CONNECT` tunnelling proxy (`http://` or `https://`; the
    /// latter is reached over TLS)
    Http(Url),
    /// SOCKS4 proxy
    Socks4(Url),
    /// SOCKS5 proxy, optionally with username/password
    Socks5(Url),
}

impl Egress {
    /// Parse a proxy URI.
    ///
    /// Returns `None` for unparseable URIs, URIs without a host, and
    /// schemes other than `http`, `https`, `socks4` and `socks5`; the
    /// account assigned to such an entry runs without egress.
    pub fn parse(uri: &str) -> Option<Self> {
        let url = Url::parse(uri.trim()).ok()?;
        url.host_str()?;
        match url.scheme() {
            "http" | "https" => Some(Egress::Http(url)),
            "socks4" => Some(Egress::Socks4(url)),
            "socks5" => Some(Egress::Socks5(url)),
            _ => None,
        }
    }

    pub fn url(&self) -> &Url {
        match self {
            Egress::Http(url) | Egress::Socks4(url) | Egress::Socks5(url) => url,
        }
    }

    /// Whether the proxy itself must be spoken to over TLS.
    pub fn is_tls(&self) -> bool {
        matches!(self, Egress::Http(url) if url.scheme() == "https")
    }

    /// Proxy host, as written in the URI.
    pub fn host(&self) -> &str {
        self.url().host_str().unwrap_or_default()
    }

    /// Proxy port, falling back to the scheme's conventional port.
    pub fn port(&self) -> u16 {
        let url = self.url();
        url.port_or_known_default().unwrap_or(match self {
            Egress::Http(_) => 8080,
            Egress::Socks4(_) | Egress::Socks5(_) => 1080,
        })
    }

    /// `(username, password)` when the URI carries userinfo.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let url = self.url();
        if url.username().is_empty() {
            return None;
        }
        Some((url.username(), url.password().unwrap_or_default()))
    }

    /// Build the matching `reqwest` proxy.
    pub fn to_reqwest_proxy(&self) -> crate::Result<reqwest::Proxy> {
        reqwest::Proxy::all(self.url().as_str())
            .map_err(|e| crate::Error::InvalidEgress(format!("{self}: {e}")))
    }
}

/// Redacts the password so the egress can be logged.
impl fmt::Display for Egress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let url = self.url();
        write!(f, "{}://", url.scheme())?;
        if !url.username().is_empty() {
            write!(f, "{}:***@", url.username())?;
        }
        write!(f, "{}:{}", self.host(), self.port())
    }
}
