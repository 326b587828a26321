//! Abstract transport seams.
//!
//! The terminal talks over a duplex message channel, the sync queue over a
//! request/response HTTP channel. Hosts supply the concrete implementations.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::StudyResult;

/// Boxed `Send` future used by object-safe async traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Lifecycle and data events delivered by a duplex transport, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established.
    Open,
    /// One discrete message from the remote side.
    Message(String),
    /// The connection failed. The detail is for logs only.
    Error(String),
    /// The connection closed. No further events follow.
    Closed,
}

/// One duplex connection, exposed as a pair of channels.
///
/// Sending on `outgoing` writes one message; dropping `outgoing` closes the
/// connection. `events` yields [`TransportEvent`]s until `Closed`.
pub struct DuplexChannel {
    pub outgoing: mpsc::Sender<String>,
    pub events: mpsc::Receiver<TransportEvent>,
}

impl DuplexChannel {
    /// Create a connected pair: the channel handed to the client and the
    /// remote end (its event sender and outgoing receiver).
    pub fn pair(
        capacity: usize,
    ) -> (
        Self,
        mpsc::Sender<TransportEvent>,
        mpsc::Receiver<String>,
    ) {
        let (out_tx, out_rx) = mpsc::channel(capacity);
        let (ev_tx, ev_rx) = mpsc::channel(capacity);
        (
            Self {
                outgoing: out_tx,
                events: ev_rx,
            },
            ev_tx,
            out_rx,
        )
    }
}

/// Opens duplex connections.
///
/// `open` never blocks: connection success or failure is reported through
/// the returned channel's events.
pub trait Connector: Send + Sync + 'static {
    fn open(&self, endpoint: &str) -> DuplexChannel;
}

/// HTTP-like request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!("unsupported method: {other}")),
        }
    }
}

/// An outgoing HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    pub fn json_body(self, body: impl Into<String>) -> Self {
        let mut req = self.header("Content-Type", "application/json");
        req.body = Some(body.into());
        req
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Look up a header value by case-insensitive name.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A received HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 5xx status.
    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

/// Request/response channel to the backend.
///
/// Network failures are `Err`; any received response, whatever its status,
/// is `Ok`.
pub trait HttpTransport: Send + Sync + 'static {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, StudyResult<HttpResponse>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_sets_protocol_headers() {
        let req = HttpRequest::new(HttpMethod::Post, "http://api/cards")
            .bearer("tok")
            .json_body("{}");
        assert_eq!(req.header_value("authorization"), Some("Bearer tok"));
        assert_eq!(req.header_value("Content-Type"), Some("application/json"));
        assert_eq!(req.body.as_deref(), Some("{}"));
    }

    #[test]
    fn status_classes() {
        assert!(HttpResponse::new(204).is_success());
        assert!(!HttpResponse::new(404).is_success());
        assert!(!HttpResponse::new(404).is_server_error());
        assert!(HttpResponse::new(503).is_server_error());
    }

    #[test]
    fn method_parse_and_display() {
        assert_eq!("patch".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert!("TRACE".parse::<HttpMethod>().is_err());
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
        assert_eq!(serde_json::to_string(&HttpMethod::Put).unwrap(), "\"PUT\"");
    }

    #[tokio::test]
    async fn duplex_pair_routes_both_ways() {
        let (mut chan, ev_tx, mut out_rx) = DuplexChannel::pair(4);
        chan.outgoing.send("hello".into()).await.unwrap();
        assert_eq!(out_rx.recv().await.as_deref(), Some("hello"));
        ev_tx.send(TransportEvent::Open).await.unwrap();
        assert_eq!(chan.events.recv().await, Some(TransportEvent::Open));
    }
}
