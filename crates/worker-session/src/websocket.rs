//! WebSocket transport, optionally tunnelled through the account's egress
//!
//! The TCP stream is opened directly, through an HTTP `CONNECT` tunnel, or
//! through a SOCKS4/SOCKS5 handshake; the WebSocket (and TLS for `wss://`)
//! upgrade then runs over whichever stream came back. An `https://` proxy is
//! itself reached over TLS before `CONNECT` is sent, as `reqwest` does for
//! the account's HTTP calls.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures_util::{SinkExt, StreamExt};
use rewards_api::Egress;
use rewards_api::constants::browser_headers;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_socks::tcp::{Socks4Stream, Socks5Stream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::connection::{Connection, Connector};
use crate::error::{Error, Result};

/// Upper bound on a proxy's CONNECT response head.
const MAX_CONNECT_RESPONSE: usize = 8 * 1024;

/// Any stream the WebSocket upgrade can run over.
trait TunnelStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> TunnelStream for T {}

type TunnelIo = Box<dyn TunnelStream>;

/// Production connector: WebSocket over TCP, TLS for `wss://`.
#[derive(Debug, Clone, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WsConnector {
    fn connect<'a>(
        &'a self,
        url: &'a str,
        egress: Option<&'a Egress>,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn Connection>>> + Send + 'a>> {
        Box::pin(async move {
            let mut request = url
                .into_client_request()
                .map_err(|e| Error::InvalidUrl(e.to_string()))?;
            for (name, value) in browser_headers().iter() {
                request.headers_mut().insert(name.clone(), value.clone());
            }

            let uri = request.uri();
            let host = uri
                .host()
                .ok_or_else(|| Error::InvalidUrl("connection URL has no host".into()))?
                .trim_start_matches('[')
                .trim_end_matches(']')
                .to_string();
            let port = uri
                .port_u16()
                .unwrap_or(if uri.scheme_str() == Some("wss") { 443 } else { 80 });

            let stream = open_stream(&host, port, egress).await?;
            let (socket, response) = tokio_tungstenite::client_async_tls(request, stream)
                .await
                .map_err(|e| Error::Connect(e.to_string()))?;
            debug!(status = response.status().as_u16(), "websocket upgraded");

            Ok(Box::new(WsConnection { socket }) as Box<dyn Connection>)
        })
    }
}

async fn open_stream(host: &str, port: u16, egress: Option<&Egress>) -> Result<TunnelIo> {
    let Some(egress) = egress else {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| Error::Connect(format!("{host}:{port}: {e}")))?;
        return Ok(Box::new(stream));
    };

    let proxy_addr = format!("{}:{}", egress.host(), egress.port());
    match egress {
        Egress::Http(_) => {
            let stream = TcpStream::connect(proxy_addr.as_str())
                .await
                .map_err(|e| Error::Proxy(format!("{egress}: {e}")))?;
            if egress.is_tls() {
                let stream = proxy_tls(egress, stream).await?;
                Ok(Box::new(http_connect(stream, egress, host, port).await?))
            } else {
                Ok(Box::new(http_connect(stream, egress, host, port).await?))
            }
        }
        Egress::Socks4(_) => {
            let stream = match egress.credentials() {
                Some((user, _)) => {
                    Socks4Stream::connect_with_userid(proxy_addr.as_str(), (host, port), user)
                        .await
                }
                None => Socks4Stream::connect(proxy_addr.as_str(), (host, port)).await,
            }
            .map_err(|e| Error::Proxy(format!("{egress}: {e}")))?;
            Ok(Box::new(stream))
        }
        Egress::Socks5(_) => {
            let stream = match egress.credentials() {
                Some((user, pass)) => {
                    Socks5Stream::connect_with_password(
                        proxy_addr.as_str(),
                        (host, port),
                        user,
                        pass,
                    )
                    .await
                }
                None => Socks5Stream::connect(proxy_addr.as_str(), (host, port)).await,
            }
            .map_err(|e| Error::Proxy(format!("{egress}: {e}")))?;
            Ok(Box::new(stream))
        }
    }
}

/// TLS session with an `https://` proxy, verified against the webpki roots.
async fn proxy_tls(egress: &Egress, stream: TcpStream) -> Result<TlsStream<TcpStream>> {
    let provider = Arc::new(tokio_rustls::rustls::crypto::aws_lc_rs::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Proxy(format!("{egress}: TLS setup: {e}")))?
        .with_root_certificates(RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.into(),
        })
        .with_no_client_auth();
    let name = egress.host().trim_start_matches('[').trim_end_matches(']');
    let server_name = ServerName::try_from(name.to_string())
        .map_err(|e| Error::Proxy(format!("{egress}: {e}")))?;
    TlsConnector::from(Arc::new(config))
        .connect(server_name, stream)
        .await
        .map_err(|e| Error::Proxy(format!("{egress}: TLS handshake: {e}")))
}

/// Open an HTTP `CONNECT` tunnel to `host:port` over a stream already
/// connected to `egress`.
async fn http_connect<S>(mut stream: S, egress: &Egress, host: &str, port: u16) -> Result<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream
        .write_all(connect_request(egress, host, port).as_bytes())
        .await
        .map_err(|e| Error::Proxy(format!("{egress}: writing CONNECT: {e}")))?;

    // Read byte-wise so nothing past the response head is consumed.
    let mut head = Vec::with_capacity(256);
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if head.len() >= MAX_CONNECT_RESPONSE {
            return Err(Error::Proxy(format!(
                "{egress}: CONNECT response head too large"
            )));
        }
        let n = stream
            .read(&mut byte)
            .await
            .map_err(|e| Error::Proxy(format!("{egress}: reading CONNECT response: {e}")))?;
        if n == 0 {
            return Err(Error::Proxy(format!(
                "{egress}: proxy closed during CONNECT"
            )));
        }
        head.push(byte[0]);
    }

    let head = String::from_utf8_lossy(&head);
    let status_line = head.lines().next().unwrap_or_default();
    match connect_status(status_line) {
        Some(code) if (200..300).contains(&code) => Ok(stream),
        _ => Err(Error::Proxy(format!(
            "{egress}: CONNECT rejected: {status_line}"
        ))),
    }
}

fn connect_request(egress: &Egress, host: &str, port: u16) -> String {
    let mut request = format!("CONNECT {host}:{port} HTTP/1.1\r\nHost: {host}:{port}\r\n");
    if let Some((user, pass)) = egress.credentials() {
        let token = STANDARD.encode(format!("{user}:{pass}"));
        request.push_str(&format!("Proxy-Authorization: Basic {token}\r\n"));
    }
    request.push_str("\r\n");
    request
}

/// Status code from a line like `HTTP/1.1 200 Connection established`.
fn connect_status(line: &str) -> Option<u16> {
    let mut parts = line.split_whitespace();
    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

struct WsConnection {
    socket: WebSocketStream<MaybeTlsStream<TunnelIo>>,
}

impl Connection for WsConnection {
    fn send(&mut self, text: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.socket
                .send(Message::text(text))
                .await
                .map_err(|e| Error::Send(e.to_string()))
        })
    }

    fn recv(&mut self) -> Pin<Box<dyn Future<Output = Option<Result<String>>> + Send + '_>> {
        Box::pin(async move {
            loop {
                match self.socket.next().await {
                    Some(Ok(Message::Text(text))) => return Some(Ok(text.as_str().to_owned())),
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => return Some(Ok(text)),
                        Err(_) => debug!(len = bytes.len(), "dropping non-UTF-8 binary frame"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "remote closed connection");
                        return None;
                    }
                    // Ping/pong are answered by tungstenite itself.
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Some(Err(Error::Receive(e.to_string()))),
                    None => return None,
                }
            }
        })
    }

    fn close(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            if let Err(e) = self.socket.close(None).await {
                debug!(error = %e, "websocket close failed");
            }
        })
    }
}
