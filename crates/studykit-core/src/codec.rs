//! JSON framing for the terminal protocol.
//!
//! Server frames are parsed tolerantly: the parser has no error path. Client
//! frames serialize to a single JSON object per transport message.

use serde::Deserialize;
use serde_json::Value;

use crate::error::StudyResult;
use crate::messages::{ClientFrame, ServerFrame};

/// Known server frame shapes, discriminated by `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireServerFrame {
    Session {
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(rename = "sandboxType", default)]
        sandbox_type: Option<String>,
    },
    Output {
        data: String,
    },
    Error {
        #[serde(default)]
        message: String,
    },
    Unavailable {
        #[serde(default)]
        message: String,
    },
}

impl From<WireServerFrame> for ServerFrame {
    fn from(w: WireServerFrame) -> Self {
        match w {
            WireServerFrame::Session {
                session_id,
                sandbox_type,
            } => ServerFrame::Session {
                session_id,
                sandbox_type,
            },
            WireServerFrame::Output { data } => ServerFrame::Output { data },
            WireServerFrame::Error { message } => ServerFrame::Error { message },
            WireServerFrame::Unavailable { message } => ServerFrame::Unavailable { message },
        }
    }
}

const KNOWN_TYPES: [&str; 4] = ["session", "output", "error", "unavailable"];

/// Parse one transport message into a [`ServerFrame`].
///
/// - JSON objects with a known `type` and the expected fields map to their
///   variant.
/// - JSON objects with an unrecognised string `type` map to `Unknown`.
/// - Everything else (invalid JSON, non-objects, known types with missing
///   fields) maps to `Raw` carrying the payload unchanged.
pub fn parse_server_frame(payload: &str) -> ServerFrame {
    let value: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(_) => return ServerFrame::Raw(payload.to_string()),
    };

    let kind = match value.get("type").and_then(Value::as_str) {
        Some(k) => k.to_string(),
        None => return ServerFrame::Raw(payload.to_string()),
    };

    if !KNOWN_TYPES.contains(&kind.as_str()) {
        return ServerFrame::Unknown { kind };
    }

    match serde_json::from_value::<WireServerFrame>(value) {
        Ok(frame) => frame.into(),
        Err(_) => ServerFrame::Raw(payload.to_string()),
    }
}

/// Serialize a client frame into its wire form.
pub fn encode_client_frame(frame: &ClientFrame) -> StudyResult<String> {
    Ok(serde_json::to_string(frame)?)
}
