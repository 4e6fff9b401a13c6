use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::mcp::rpc::{
    json_rpc_error, INTERNAL_ERROR, INVALID_REQUEST, PARSE_ERROR, REQUEST_CONFLICT, SERVER_ERROR,
    SESSION_NOT_FOUND,
};

/// Transport-level failures, reported as HTTP errors before any stream starts.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {message}")]
    BadRequest { code: i32, message: &'static str },
    #[error("not found: {message}")]
    NotFound { message: &'static str },
    #[error("forbidden: {message}")]
    Forbidden { message: String },
    #[error("conflict: {message}")]
    Conflict { message: &'static str },
    #[error("internal error")]
    Internal { message: String },
}

impl AppError {
    pub fn bad_request(message: &'static str) -> Self {
        Self::BadRequest {
            code: INVALID_REQUEST,
            message,
        }
    }

    pub fn parse_error() -> Self {
        Self::BadRequest {
            code: PARSE_ERROR,
            message: "Parse error",
        }
    }

    pub fn session_not_found() -> Self {
        Self::NotFound {
            message: "session not found",
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn conflict(message: &'static str) -> Self {
        Self::Conflict { message }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::BadRequest { code, message } => json_rpc_error(None, code, message),
            Self::NotFound { message } => json_rpc_error(None, SESSION_NOT_FOUND, message),
            Self::Forbidden { message } => json_rpc_error(None, SERVER_ERROR, &message),
            Self::Conflict { message } => json_rpc_error(None, REQUEST_CONFLICT, message),
            Self::Internal { message } => {
                tracing::error!(error = %message, "request failed with internal error");
                json_rpc_error(None, INTERNAL_ERROR, "Internal error")
            }
        };

        (status, Json(body)).into_response()
    }
}
