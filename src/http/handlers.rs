//! Axum HTTP handlers for the web server
//!
//! `GET /mcp` attaches an event stream to a session, `POST /mcp` submits one
//! message, `DELETE /mcp` ends a session. Health and discovery endpoints are public.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::TypedHeader;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::AppError;
use crate::http::headers::{McpProtocolVersion, McpSessionId};
use crate::http::sse::open_stream;
use crate::mcp::message::{classify, is_initialize_request, MessageKind};
use crate::session::{InstallError, Session, SessionTransport};
use crate::AppState;

pub const MCP_ENDPOINT: &str = "/mcp";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sessions: usize,
}

#[derive(Debug, Serialize)]
pub struct DiscoveryResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub mcp_endpoint: &'static str,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        sessions: state.sessions.len(),
    })
}

pub async fn discovery() -> Json<DiscoveryResponse> {
    Json(DiscoveryResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        mcp_endpoint: MCP_ENDPOINT,
    })
}

pub async fn stream_attach(
    State(state): State<AppState>,
    session_id: Option<TypedHeader<McpSessionId>>,
) -> Result<Response, AppError> {
    let session = lookup_session(&state, session_id)?;
    Ok(open_stream(&session.transport).into_response())
}

pub async fn message_submit(
    State(state): State<AppState>,
    session_id: Option<TypedHeader<McpSessionId>>,
    protocol_version: Option<TypedHeader<McpProtocolVersion>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let message: Value = serde_json::from_slice(&body).map_err(|_| AppError::parse_error())?;
    let kind = classify(&message);

    if let Some(TypedHeader(McpProtocolVersion(version))) = &protocol_version {
        debug!(protocol_version = %version, kind = kind.as_str(), "message received");
    }

    if session_id.is_none() {
        if !is_initialize_request(&message) {
            return Err(AppError::bad_request("missing session identifier"));
        }
        return Ok(bootstrap_session(&state, message));
    }

    let session = lookup_session(&state, session_id)?;
    match kind {
        MessageKind::Notification | MessageKind::Response => {
            session.transport.deliver_inbound(message);
            Ok(StatusCode::ACCEPTED.into_response())
        }
        MessageKind::Request | MessageKind::Initialize => {
            let response = await_response(&state, &session.transport, message).await?;
            Ok(Json(response).into_response())
        }
        MessageKind::Invalid => Err(AppError::bad_request("invalid message")),
    }
}

pub async fn session_close(
    State(state): State<AppState>,
    session_id: Option<TypedHeader<McpSessionId>>,
) -> Result<StatusCode, AppError> {
    let session = lookup_session(&state, session_id)?;
    state.sessions.remove(&session.id);
    Ok(StatusCode::NO_CONTENT)
}

fn lookup_session(
    state: &AppState,
    session_id: Option<TypedHeader<McpSessionId>>,
) -> Result<Arc<Session>, AppError> {
    let Some(TypedHeader(McpSessionId(id))) = session_id else {
        return Err(AppError::bad_request("missing session identifier"));
    };

    state
        .sessions
        .get(&id)
        .ok_or_else(AppError::session_not_found)
}

/// Creates a session and answers with its event stream; the engine's reply to
/// `initialize` arrives as the first event after the priming one.
fn bootstrap_session(state: &AppState, initialize: Value) -> Response {
    let session = state.sessions.create();
    let stream = open_stream(&session.transport);
    session.transport.deliver_inbound(initialize);

    (TypedHeader(McpSessionId(session.id.clone())), stream).into_response()
}

async fn await_response(
    state: &AppState,
    transport: &Arc<SessionTransport>,
    request: Value,
) -> Result<Value, AppError> {
    let pending = transport
        .install_pending_responder(&request)
        .map_err(|err| match err {
            InstallError::MissingId => AppError::bad_request("invalid message"),
            InstallError::DuplicateId => {
                AppError::conflict("a request with this id is already in flight")
            }
            InstallError::AtCapacity => {
                AppError::conflict("too many requests in flight for this session")
            }
        })?;

    transport.deliver_inbound(request);

    let outcome = match state.response_timeout {
        Some(limit) => tokio::time::timeout(limit, pending)
            .await
            .map_err(|_| AppError::internal("timed out waiting for engine response"))?,
        None => pending.await,
    };

    outcome.map_err(|_| AppError::internal("session closed before the engine responded"))
}
