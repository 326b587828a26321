//! Scripted HTTP backend shared by the sync tests.

use std::collections::HashMap;
use std::sync::Mutex;

use studykit_core::error::{StudyError, StudyResult};
use studykit_core::transport::{BoxFuture, HttpRequest, HttpResponse, HttpTransport};
use tokio::sync::Semaphore;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Reply {
    Status(u16),
    NetworkError,
    Hang,
    /// Answers 200 once the test calls [`ScriptedHttp::release`].
    Gated,
}

/// Answers `/health` with a configurable reply and every other URL with
/// 200 unless scripted otherwise. Records all requests.
pub(crate) struct ScriptedHttp {
    requests: Mutex<Vec<HttpRequest>>,
    health: Mutex<Reply>,
    replies: Mutex<HashMap<String, Reply>>,
    gate: Semaphore,
}

impl ScriptedHttp {
    pub(crate) fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            health: Mutex::new(Reply::Status(200)),
            replies: Mutex::new(HashMap::new()),
            gate: Semaphore::new(0),
        }
    }

    pub(crate) fn set_health(&self, reply: Reply) {
        *self.health.lock().unwrap() = reply;
    }

    pub(crate) fn set_reply(&self, url: &str, reply: Reply) {
        self.replies.lock().unwrap().insert(url.to_string(), reply);
    }

    /// Let one gated request complete.
    pub(crate) fn release(&self) {
        self.gate.add_permits(1);
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests other than health probes.
    pub(crate) fn operation_requests(&self) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| !r.url.ends_with("/health"))
            .collect()
    }
}

impl HttpTransport for ScriptedHttp {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, StudyResult<HttpResponse>> {
        let reply = if request.url.ends_with("/health") {
            *self.health.lock().unwrap()
        } else {
            self.replies
                .lock()
                .unwrap()
                .get(&request.url)
                .copied()
                .unwrap_or(Reply::Status(200))
        };
        self.requests.lock().unwrap().push(request);

        Box::pin(async move {
            match reply {
                Reply::Status(status) => Ok(HttpResponse::new(status)),
                Reply::NetworkError => Err(StudyError::Http("connection refused".into())),
                Reply::Hang => std::future::pending().await,
                Reply::Gated => {
                    if let Ok(permit) = self.gate.acquire().await {
                        permit.forget();
                    }
                    Ok(HttpResponse::new(200))
                }
            }
        })
    }
}
