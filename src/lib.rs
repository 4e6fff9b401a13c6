use std::{sync::Arc, time::Duration};

use axum::{middleware, routing::get, Router};

pub mod config;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod origin;
pub mod session;
pub mod stdio;

use crate::http::handlers::MCP_ENDPOINT;
use origin::AllowedOrigins;
use session::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub allowed_origins: AllowedOrigins,
    pub response_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(sessions: Arc<SessionRegistry>, allowed_origins: AllowedOrigins) -> Self {
        Self {
            sessions,
            allowed_origins,
            response_timeout: None,
        }
    }

    pub fn with_response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.response_timeout = timeout;
        self
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(http::handlers::health))
        .route("/.well-known/mcp", get(http::handlers::discovery))
        .route(
            MCP_ENDPOINT,
            get(http::handlers::stream_attach)
                .post(http::handlers::message_submit)
                .delete(http::handlers::session_close),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            origin::enforce_origin_allowlist,
        ))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
