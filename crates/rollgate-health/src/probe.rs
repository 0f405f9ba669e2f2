//! HTTP probe.
//!
//! Issues a single GET against a health endpoint and reports the status
//! code, bounded by a per-attempt timeout.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use http::{StatusCode, Uri};
use thiserror::Error;
use tracing::debug;

/// Errors from a single probe attempt. None of these are fatal on their
/// own: the caller counts them as a failed attempt.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid probe url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("connection to {address} failed: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP handshake failed: {0}")]
    Handshake(#[source] hyper::Error),

    #[error("request failed: {0}")]
    Request(#[source] hyper::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Boxed future returned by [`HttpProber::get`].
pub type ProbeFuture<'a> =
    Pin<Box<dyn Future<Output = Result<StatusCode, ProbeError>> + Send + 'a>>;

/// Issues health probes. Injected into the controller for testability.
pub trait HttpProber: Send + Sync {
    /// GET `url`, giving up after `timeout`.
    fn get<'a>(&'a self, url: &'a str, timeout: Duration) -> ProbeFuture<'a>;
}

/// Probe over a fresh HTTP/1.1 connection per attempt.
#[derive(Debug, Clone, Default)]
pub struct HyperProber;

impl HyperProber {
    pub fn new() -> Self {
        Self
    }
}

impl HttpProber for HyperProber {
    fn get<'a>(&'a self, url: &'a str, timeout: Duration) -> ProbeFuture<'a> {
        Box::pin(http_get(url, timeout))
    }
}

/// Split an `http://` URL into a connect address, host header, and request path.
fn parse_target(url: &str) -> Result<(String, String, String), ProbeError> {
    let invalid = |reason: &str| ProbeError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let uri: Uri = url.parse().map_err(|_| invalid("not a valid URI"))?;
    if uri.scheme_str() != Some("http") {
        return Err(invalid("only http:// is supported"));
    }
    let host = uri.host().ok_or_else(|| invalid("missing host"))?;
    let port = uri.port_u16().unwrap_or(80);
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let host_header = match uri.port_u16() {
        Some(p) => format!("{host}:{p}"),
        None => host.to_string(),
    };
    Ok((format!("{host}:{port}"), host_header, path))
}

async fn http_get(url: &str, timeout: Duration) -> Result<StatusCode, ProbeError> {
    let (address, host_header, path) = parse_target(url)?;

    let result = tokio::time::timeout(timeout, async {
        let stream = tokio::net::TcpStream::connect(&address)
            .await
            .map_err(|source| ProbeError::Connect {
                address: address.clone(),
                source,
            })?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(ProbeError::Handshake)?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = http::Request::builder()
            .method("GET")
            .uri(path.as_str())
            .header("host", host_header.as_str())
            .header("user-agent", concat!("rollgate/", env!("CARGO_PKG_VERSION")))
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .map_err(|e| ProbeError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let resp = sender.send_request(req).await.map_err(ProbeError::Request)?;
        Ok::<_, ProbeError>(resp.status())
    })
    .await;

    match result {
        Ok(Ok(status)) => {
            debug!(%url, %status, "health probe answered");
            Ok(status)
        }
        Ok(Err(e)) => {
            debug!(%url, error = %e, "health probe failed");
            Err(e)
        }
        Err(_) => {
            debug!(%url, "health probe timed out");
            Err(ProbeError::Timeout(timeout))
        }
    }
}
