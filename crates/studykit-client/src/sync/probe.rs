//! Connectivity probe.

use std::sync::Arc;
use std::time::Duration;

use studykit_core::transport::{HttpMethod, HttpRequest, HttpTransport};
use tokio::time;
use tracing::debug;

/// Backend reachability as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectivityState {
    Online,
    Offline,
    /// A probe is in flight (also the state before the first probe).
    #[default]
    Checking,
}

impl std::fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Checking => "checking",
        };
        f.write_str(s)
    }
}

/// Bounded-time health check against the backend.
#[derive(Clone)]
pub struct ConnectivityProbe {
    http: Arc<dyn HttpTransport>,
    url: String,
    timeout: Duration,
}

impl ConnectivityProbe {
    pub fn new(http: Arc<dyn HttpTransport>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// `true` if the backend answered with any status below 500 within the
    /// timeout. Errors, 5xx and timeouts all mean offline. On timeout the
    /// in-flight request is dropped.
    pub async fn check(&self) -> bool {
        let request = HttpRequest::new(HttpMethod::Get, &self.url).timeout(self.timeout);
        match time::timeout(self.timeout, self.http.send(request)).await {
            Ok(Ok(response)) => {
                debug!(status = response.status, "health probe answered");
                !response.is_server_error()
            }
            Ok(Err(e)) => {
                debug!("health probe failed: {e}");
                false
            }
            Err(_) => {
                debug!(timeout = ?self.timeout, "health probe timed out");
                false
            }
        }
    }
}
