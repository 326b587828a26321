use serde::{Deserialize, Serialize};
use studykit_core::ids::{generate_id, now_millis};
use studykit_core::transport::HttpMethod;

/// A mutating request waiting for confirmed delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOperation {
    /// Assigned once at enqueue time; stable across restarts and retries.
    pub id: String,
    pub endpoint: String,
    pub method: HttpMethod,
    /// JSON request body, already serialized.
    pub body: String,
    /// Unix millis.
    pub enqueued_at: i64,
}

impl PendingOperation {
    pub fn new(endpoint: impl Into<String>, method: HttpMethod, body: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            endpoint: endpoint.into(),
            method,
            body: body.into(),
            enqueued_at: now_millis(),
        }
    }
}
