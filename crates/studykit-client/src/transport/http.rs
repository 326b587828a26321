//! reqwest-backed [`HttpTransport`].

use std::time::Duration;

use studykit_core::error::{StudyError, StudyResult};
use studykit_core::transport::{BoxFuture, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use tracing::debug;

/// HTTP client for the sync queue (reusable, connection pooled).
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client with a 30 second default request timeout.
    pub fn new() -> StudyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StudyError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, StudyResult<HttpResponse>> {
        Box::pin(async move {
            debug!(method = %request.method, url = %request.url, "http request");

            let mut req = self
                .client
                .request(to_reqwest_method(request.method), &request.url);
            for (name, value) in &request.headers {
                req = req.header(name.as_str(), value.as_str());
            }
            if let Some(body) = request.body {
                req = req.body(body);
            }
            if let Some(timeout) = request.timeout {
                req = req.timeout(timeout);
            }

            let response = req.send().await.map_err(|e| {
                if e.is_timeout() {
                    StudyError::Timeout
                } else {
                    StudyError::Http(e.to_string())
                }
            })?;

            let status = response.status().as_u16();
            // The status is authoritative; a body cut short still counts as delivered.
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    debug!(status, "failed to read response body: {e}");
                    String::new()
                }
            };

            Ok(HttpResponse { status, body })
        })
    }
}
