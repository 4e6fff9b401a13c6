use std::sync::Arc;

use mcp_session_transport::{
    build_app,
    config::{Config, TransportMode},
    logging,
    mcp::server::Dispatcher,
    session::SessionRegistry,
    stdio, AppState,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let dispatcher = Dispatcher::default();

    if config.transport == TransportMode::Stdio {
        info!("serving on stdio");
        stdio::run_stdio(Arc::new(dispatcher)).await?;
        return Ok(());
    }

    let sessions = Arc::new(SessionRegistry::new(
        dispatcher.into_factory(),
        config.responder_policy,
    ));
    let state = AppState::new(sessions, config.allowed_origins.clone())
        .with_response_timeout(config.response_timeout);
    let app = build_app(state);
    let bind_socket = config.bind_socket()?;
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        correlation = ?config.responder_policy.correlation,
        "server starting"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
