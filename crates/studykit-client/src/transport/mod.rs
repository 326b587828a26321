//! Concrete transports.
//!
//! - [`WebSocketConnector`]: duplex text-frame connection for the terminal.
//! - [`ReqwestTransport`]: HTTP client for the sync queue.

pub mod http;
pub mod websocket;

pub use http::ReqwestTransport;
pub use websocket::WebSocketConnector;

use studykit_core::error::{StudyError, StudyResult};

/// Check that a terminal endpoint uses a WebSocket scheme.
pub fn validate_endpoint(url: &str) -> StudyResult<()> {
    let lower = url.to_lowercase();
    if lower.starts_with("ws://") || lower.starts_with("wss://") {
        Ok(())
    } else {
        Err(StudyError::Transport(format!(
            "unsupported URL scheme: {url} (expected ws:// or wss://)"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_websocket_schemes() {
        assert!(validate_endpoint("ws://localhost:8080/terminal").is_ok());
        assert!(validate_endpoint("WSS://example.com/terminal").is_ok());
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(validate_endpoint("http://example.com").is_err());
        assert!(validate_endpoint("localhost:8080").is_err());
    }
}
