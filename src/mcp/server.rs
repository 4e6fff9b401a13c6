//! The built-in Model Context Protocol engine
//!
//! Routes requests and notifications to method handlers keyed by method name,
//! negotiates `initialize`, and audits every call.

use std::{collections::HashMap, future::Future, sync::Arc};

use async_trait::async_trait;
use rust_mcp_sdk::schema::{Implementation, InitializeResult, ServerCapabilities};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::mcp::engine::{EngineFactory, Peer, ProtocolEngine};
use crate::mcp::message::{classify, method_of, MessageKind, INITIALIZE_METHOD};
use crate::mcp::rpc::{
    is_json_rpc_error, json_rpc_error, json_rpc_result, HandlerError, INVALID_REQUEST,
    METHOD_NOT_FOUND,
};
use crate::session::SessionId;

pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];
pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";

#[async_trait]
pub trait MethodHandler: Send + Sync {
    async fn call(&self, params: Option<Value>) -> Result<Value, HandlerError>;
}

#[async_trait]
impl<F, Fut> MethodHandler for F
where
    F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    async fn call(&self, params: Option<Value>) -> Result<Value, HandlerError> {
        self(params).await
    }
}

struct InitializeHandler {
    server_name: String,
    server_version: String,
    instructions: Option<String>,
}

#[async_trait]
impl MethodHandler for InitializeHandler {
    async fn call(&self, params: Option<Value>) -> Result<Value, HandlerError> {
        let protocol_version = negotiate_protocol_version(params.as_ref())?;

        let initialize_result = InitializeResult {
            server_info: Implementation {
                name: self.server_name.clone(),
                version: self.server_version.clone(),
                title: None,
                description: None,
                icons: vec![],
                website_url: None,
            },
            capabilities: ServerCapabilities::default(),
            protocol_version: protocol_version.to_string(),
            instructions: self.instructions.clone(),
            meta: None,
        };

        serde_json::to_value(initialize_result)
            .map_err(|err| HandlerError::Internal(format!("initialize result: {err}")))
    }
}

/// Method-name keyed engine shared by every session it serves.
pub struct Dispatcher {
    handlers: HashMap<String, Arc<dyn MethodHandler>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }
}

impl Dispatcher {
    pub fn new(server_name: impl Into<String>, server_version: impl Into<String>) -> Self {
        let mut dispatcher = Self {
            handlers: HashMap::new(),
        };
        dispatcher.register(
            INITIALIZE_METHOD,
            InitializeHandler {
                server_name: server_name.into(),
                server_version: server_version.into(),
                instructions: None,
            },
        );
        dispatcher.register("ping", |_params: Option<Value>| async {
            Ok::<_, HandlerError>(json!({}))
        });
        dispatcher.register("notifications/initialized", |_params: Option<Value>| async {
            Ok::<_, HandlerError>(Value::Null)
        });
        dispatcher
    }

    pub fn with_handler(mut self, method: &str, handler: impl MethodHandler + 'static) -> Self {
        self.register(method, handler);
        self
    }

    pub fn register(&mut self, method: &str, handler: impl MethodHandler + 'static) {
        self.handlers.insert(method.to_string(), Arc::new(handler));
    }

    /// A factory handing the same dispatcher to every new session.
    pub fn into_factory(self) -> Arc<dyn EngineFactory> {
        let engine: Arc<dyn ProtocolEngine> = Arc::new(self);
        Arc::new(move |_: &SessionId| -> Arc<dyn ProtocolEngine> { engine.clone() })
    }

    pub async fn handle_request(&self, id: Option<Value>, method: &str, params: Option<Value>) -> Value {
        let audit_params = redact_audit_params(params.as_ref());

        let response = match self.handlers.get(method) {
            Some(handler) => match handler.call(params).await {
                Ok(result) => json_rpc_result(id, result),
                Err(err) => err.into_response(id),
            },
            None => json_rpc_error(id, METHOD_NOT_FOUND, "Method not found"),
        };

        info!(
            method = %method,
            params = %audit_params,
            outcome = if is_json_rpc_error(&response) { "failure" } else { "success" },
            "mcp action audited"
        );

        response
    }

    async fn handle_notification(&self, method: &str, params: Option<Value>) {
        let Some(handler) = self.handlers.get(method) else {
            debug!(method = %method, "ignoring unknown notification");
            return;
        };

        if let Err(err) = handler.call(params).await {
            warn!(method = %method, error = %err, "notification handler failed");
        }
    }
}

#[async_trait]
impl ProtocolEngine for Dispatcher {
    async fn on_message(&self, message: Value, peer: Peer) {
        let params = message.get("params").cloned();
        let method = method_of(&message).unwrap_or_default().to_string();

        match classify(&message) {
            MessageKind::Initialize | MessageKind::Request => {
                let id = message.get("id").cloned();
                if method.trim().is_empty() {
                    peer.send(json_rpc_error(id, INVALID_REQUEST, "Invalid Request"));
                    return;
                }
                let response = self.handle_request(id, &method, params).await;
                peer.send(response);
            }
            MessageKind::Notification => self.handle_notification(&method, params).await,
            MessageKind::Response => {
                let id = message.get("id").cloned().unwrap_or(Value::Null);
                debug!(id = %id, "dropping client response with no outstanding request");
            }
            MessageKind::Invalid => {
                warn!("engine received a message it cannot classify");
            }
        }
    }
}

/// Picks the version to answer `initialize` with.
///
/// A supported offer is echoed back; anything else gets the latest supported version.
pub fn negotiate_protocol_version(params: Option<&Value>) -> Result<&'static str, HandlerError> {
    let offered_version = params
        .and_then(Value::as_object)
        .and_then(|object| object.get("protocolVersion"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|version| !version.is_empty())
        .ok_or_else(|| {
            HandlerError::InvalidParams("initialize params.protocolVersion is required".to_string())
        })?;

    Ok(SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .copied()
        .find(|version| *version == offered_version)
        .unwrap_or(LATEST_PROTOCOL_VERSION))
}

pub fn redact_audit_params(params: Option<&Value>) -> Value {
    params.map(redact_audit_value).unwrap_or(Value::Null)
}

pub fn redact_audit_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), redact_audit_value(item))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        _ => value.clone(),
    }
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "authorization" | "bearer" | "credential" | "credentials" | "api_key" | "apikey"
    ) || normalized.contains("token")
        || normalized.contains("secret")
        || normalized.contains("password")
}
