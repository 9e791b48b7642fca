//! Transport resolution and dialing.
//!
//! `ws://` and `wss://` addresses dial TCP. `ws+unix://<host>/path` dials a
//! Unix-domain socket whose path is the host segment encoded as unpadded
//! base64url; a host that does not decode is used as the path verbatim.

use std::path::{Path, PathBuf};
use std::pin::Pin;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use futures::stream::BoxStream;
use futures::{Sink, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::{HeaderName, HeaderValue, AUTHORIZATION, USER_AGENT};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::WebSocketStream;
use tracing::debug;
use url::Url;

use crate::error::DriverError;

/// Write half of a connection, whatever the underlying stream.
pub type WsSink = Pin<Box<dyn Sink<Message, Error = WsError> + Send>>;
/// Read half of a connection, whatever the underlying stream.
pub type WsSource = BoxStream<'static, Result<Message, WsError>>;

const CLIENT_ROLE: &str = "Universal";
const CLIENT_AGENT: &str = concat!("botwire/", env!("CARGO_PKG_VERSION"));

/// Where a driver connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp { url: String },
    Unix { socket_path: PathBuf, request_url: String },
}

impl Endpoint {
    /// URL sent in the WebSocket upgrade request.
    pub fn request_url(&self) -> &str {
        match self {
            Endpoint::Tcp { url } => url,
            Endpoint::Unix { request_url, .. } => request_url,
        }
    }
}

/// Resolve a configured address to a transport endpoint.
pub fn resolve_uri(uri: &str) -> Result<Endpoint, DriverError> {
    let parsed = Url::parse(uri)?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(Endpoint::Tcp {
            url: uri.to_string(),
        }),
        "ws+unix" | "wss+unix" => {
            let host = parsed
                .host_str()
                .filter(|host| !host.is_empty())
                .ok_or_else(|| DriverError::InvalidUri(format!("{}: missing socket host", uri)))?;
            let path = if parsed.path().is_empty() { "/" } else { parsed.path() };
            let mut request_url = format!("ws://localhost{}", path);
            if let Some(query) = parsed.query() {
                request_url.push('?');
                request_url.push_str(query);
            }
            Ok(Endpoint::Unix {
                socket_path: decode_socket_path(host),
                request_url,
            })
        }
        other => Err(DriverError::InvalidUri(format!(
            "{}: unsupported scheme '{}'",
            uri, other
        ))),
    }
}

/// Build a `ws+unix://` address for the socket at `socket_path`.
pub fn encode_unix_url(socket_path: impl AsRef<Path>, ws_path: &str) -> String {
    let host = URL_SAFE_NO_PAD.encode(socket_path.as_ref().as_os_str().as_encoded_bytes());
    if ws_path.starts_with('/') {
        format!("ws+unix://{}{}", host, ws_path)
    } else {
        format!("ws+unix://{}/{}", host, ws_path)
    }
}

fn decode_socket_path(host: &str) -> PathBuf {
    URL_SAFE_NO_PAD
        .decode(host)
        .ok()
        .and_then(path_from_bytes)
        .unwrap_or_else(|| PathBuf::from(host))
}

#[cfg(unix)]
fn path_from_bytes(bytes: Vec<u8>) -> Option<PathBuf> {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;

    Some(PathBuf::from(OsString::from_vec(bytes)))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: Vec<u8>) -> Option<PathBuf> {
    String::from_utf8(bytes).ok().map(PathBuf::from)
}

/// Build the upgrade request with the client headers.
pub fn build_request(endpoint: &Endpoint, access_token: Option<&str>) -> Result<Request, DriverError> {
    let mut request = endpoint.request_url().into_client_request()?;
    let headers = request.headers_mut();
    headers.insert(
        HeaderName::from_static("x-client-role"),
        HeaderValue::from_static(CLIENT_ROLE),
    );
    headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_AGENT));
    if let Some(token) = access_token {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| DriverError::InvalidUri(format!("access token: {}", e)))?;
        headers.insert(AUTHORIZATION, value);
    }
    Ok(request)
}

/// Open a WebSocket connection to `endpoint`.
pub async fn dial(
    endpoint: &Endpoint,
    access_token: Option<&str>,
) -> Result<(WsSink, WsSource), DriverError> {
    let request = build_request(endpoint, access_token)?;
    match endpoint {
        Endpoint::Tcp { url } => {
            debug!("Dialing {}", url);
            if url.starts_with("wss:") {
                install_crypto_provider();
            }
            let (ws, _) = tokio_tungstenite::connect_async(request)
                .await
                .map_err(|e| DriverError::Dial(format!("{}: {}", url, e)))?;
            Ok(split(ws))
        }
        Endpoint::Unix { socket_path, .. } => dial_unix(socket_path, request).await,
    }
}

/// rustls needs a process-wide provider before the first TLS handshake.
fn install_crypto_provider() {
    // Already installed on every dial after the first.
    rustls::crypto::ring::default_provider().install_default().ok();
}

#[cfg(unix)]
async fn dial_unix(socket_path: &Path, request: Request) -> Result<(WsSink, WsSource), DriverError> {
    debug!("Dialing unix socket {}", socket_path.display());
    let stream = tokio::net::UnixStream::connect(socket_path)
        .await
        .map_err(|e| DriverError::Dial(format!("{}: {}", socket_path.display(), e)))?;
    let (ws, _) = tokio_tungstenite::client_async(request, stream)
        .await
        .map_err(|e| DriverError::Dial(format!("{}: {}", socket_path.display(), e)))?;
    Ok(split(ws))
}

#[cfg(not(unix))]
async fn dial_unix(socket_path: &Path, _request: Request) -> Result<(WsSink, WsSource), DriverError> {
    Err(DriverError::Dial(format!(
        "{}: unix sockets are not supported on this platform",
        socket_path.display()
    )))
}

fn split<S>(ws: WebSocketStream<S>) -> (WsSink, WsSource)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (sink, source) = ws.split();
    let sink: WsSink = Box::pin(sink);
    let source: WsSource = source.boxed();
    (sink, source)
}
