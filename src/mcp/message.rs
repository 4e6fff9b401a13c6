//! Structural classification of decoded JSON-RPC messages
//!
//! Messages carry no explicit discriminant; their kind is inferred from which of
//! `method`, `id`, `result` and `error` are present.

use serde_json::Value;

pub const INITIALIZE_METHOD: &str = "initialize";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Initialize,
    Request,
    Notification,
    Response,
    Invalid,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Request => "request",
            Self::Notification => "notification",
            Self::Response => "response",
            Self::Invalid => "invalid",
        }
    }
}

/// Classifies an arbitrary JSON value. Total and side-effect free.
///
/// A present `id` counts even when it is `null`. Response shape is checked
/// before request shape, so an object carrying `result` together with
/// `method` and `id` is a Response.
pub fn classify(message: &Value) -> MessageKind {
    let Some(object) = message.as_object() else {
        return MessageKind::Invalid;
    };

    let has_id = object.contains_key("id");
    let has_outcome = object.contains_key("result") || object.contains_key("error");

    if has_id && has_outcome {
        return MessageKind::Response;
    }

    match object.get("method").and_then(Value::as_str) {
        Some(INITIALIZE_METHOD) if has_id => MessageKind::Initialize,
        Some(_) if has_id => MessageKind::Request,
        Some(_) => MessageKind::Notification,
        None => MessageKind::Invalid,
    }
}

pub fn is_initialize_request(message: &Value) -> bool {
    classify(message) == MessageKind::Initialize
}

/// Requests and initialize requests both expect exactly one response.
pub fn expects_response(message: &Value) -> bool {
    matches!(
        classify(message),
        MessageKind::Request | MessageKind::Initialize
    )
}

pub fn method_of(message: &Value) -> Option<&str> {
    message.get("method").and_then(Value::as_str)
}

/// Canonical text of a message id, usable as a map key.
///
/// `1` and `"1"` produce different keys.
pub fn id_key(message: &Value) -> Option<String> {
    message.get("id").map(Value::to_string)
}
