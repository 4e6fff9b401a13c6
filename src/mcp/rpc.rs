//! JSON-RPC protocol representations and formatting utilities
//!
//! Builds response and error envelopes, and maps engine-side failures onto in-band
//! JSON-RPC payloads.

use rust_mcp_sdk::schema::{
    CallToolResult, ContentBlock, JsonrpcErrorResponse, JsonrpcResultResponse, RequestId,
    Result as McpResult, RpcError, TextContent,
};
use serde_json::{json, Value};
use thiserror::Error;

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const SERVER_ERROR: i32 = -32000;
pub const SESSION_NOT_FOUND: i32 = -32001;
pub const REQUEST_CONFLICT: i32 = -32002;

/// Failure raised by a method handler inside the protocol engine.
///
/// These never surface as HTTP errors; the dispatcher turns them into protocol
/// responses.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("tool failed: {0}")]
    ToolFailed(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    pub fn into_response(self, id: Option<Value>) -> Value {
        match self {
            Self::InvalidParams(message) => json_rpc_error_with_data(
                id,
                INVALID_PARAMS,
                "Invalid params",
                Some(json!({ "message": message })),
            ),
            Self::ToolFailed(message) => json_rpc_result(id, tool_failure(message)),
            Self::Internal(message) => {
                tracing::error!(error = %message, "method handler failed");
                json_rpc_error(id, INTERNAL_ERROR, "Internal error")
            }
        }
    }
}

pub fn is_json_rpc_error(value: &Value) -> bool {
    value.get("error").is_some()
}

/// A successful call result whose content signals failure through `isError`.
pub fn tool_failure(message: String) -> Value {
    let result = CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(message, None, None))],
        is_error: Some(true),
        meta: None,
        structured_content: None,
    };
    serde_json::to_value(result).unwrap_or_else(|_| json!({ "isError": true, "content": [] }))
}

pub fn json_rpc_error(id: Option<Value>, code: i32, message: &str) -> Value {
    json_rpc_error_with_data(id, code, message, None)
}

pub fn json_rpc_error_with_data(
    id: Option<Value>,
    code: i32,
    message: &str,
    data: Option<Value>,
) -> Value {
    let request_id = id.as_ref().and_then(value_to_request_id);
    // Ids that `RequestId` cannot hold are echoed as sent.
    if id.is_none() || request_id.is_some() {
        let response = JsonrpcErrorResponse::new(
            RpcError {
                code: i64::from(code),
                data: data.clone(),
                message: message.to_string(),
            },
            request_id,
        );
        if let Ok(value) = serde_json::to_value(response) {
            return value;
        }
    }

    let mut error = json!({ "code": code, "message": message });
    if let Some(data) = data {
        error["data"] = data;
    }
    json!({ "jsonrpc": "2.0", "id": id, "error": error })
}

pub fn json_rpc_result(id: Option<Value>, result: Value) -> Value {
    if let Some(request_id) = id.as_ref().and_then(value_to_request_id) {
        let extra = result.as_object().cloned();
        let response = JsonrpcResultResponse::new(request_id, McpResult { meta: None, extra });
        if let Ok(value) = serde_json::to_value(response) {
            return value;
        }
    }

    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

pub fn value_to_request_id(value: &Value) -> Option<RequestId> {
    if let Some(string_id) = value.as_str() {
        return Some(RequestId::String(string_id.to_string()));
    }

    value.as_i64().map(RequestId::Integer)
}
