//! Seam between transports and the protocol engine
//!
//! A transport hands every inbound message to a [`ProtocolEngine`] together with a
//! [`Peer`]; the engine answers, now or later, by pushing messages through that peer.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::session::SessionId;

/// Destination for messages produced by an engine.
pub trait Outbound: Send + Sync {
    fn send_outbound(&self, message: Value);
}

/// Cloneable handle an engine uses to push messages back to its client.
#[derive(Clone)]
pub struct Peer {
    outbound: Arc<dyn Outbound>,
}

impl Peer {
    pub fn new(outbound: Arc<dyn Outbound>) -> Self {
        Self { outbound }
    }

    pub fn send(&self, message: Value) {
        self.outbound.send_outbound(message);
    }
}

#[async_trait]
pub trait ProtocolEngine: Send + Sync {
    async fn on_message(&self, message: Value, peer: Peer);

    /// Called once when the owning session or channel closes.
    fn on_close(&self) {}
}

/// Builds one engine per session.
pub trait EngineFactory: Send + Sync {
    fn create(&self, session_id: &SessionId) -> Arc<dyn ProtocolEngine>;
}

impl<F> EngineFactory for F
where
    F: Fn(&SessionId) -> Arc<dyn ProtocolEngine> + Send + Sync,
{
    fn create(&self, session_id: &SessionId) -> Arc<dyn ProtocolEngine> {
        self(session_id)
    }
}
