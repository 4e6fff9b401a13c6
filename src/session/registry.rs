use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::info;

use crate::mcp::engine::{EngineFactory, ProtocolEngine};
use crate::session::{ResponderPolicy, SessionId, SessionTransport};

pub struct Session {
    pub id: SessionId,
    pub engine: Arc<dyn ProtocolEngine>,
    pub transport: Arc<SessionTransport>,
    pub created_at: DateTime<Utc>,
}

/// Process-wide map of live sessions. State is in memory only and does not
/// survive a restart.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
    engines: Arc<dyn EngineFactory>,
    policy: ResponderPolicy,
}

impl SessionRegistry {
    pub fn new(engines: Arc<dyn EngineFactory>, policy: ResponderPolicy) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            engines,
            policy,
        }
    }

    /// Creates and registers a session with a fresh identifier.
    pub fn create(&self) -> Arc<Session> {
        let id = SessionId::generate();
        let engine = self.engines.create(&id);
        let transport = SessionTransport::new(id.clone(), engine.clone(), self.policy);
        let session = Arc::new(Session {
            id: id.clone(),
            engine,
            transport,
            created_at: Utc::now(),
        });

        self.sessions.write().insert(id.clone(), session.clone());
        info!(session_id = %id, "session created");
        session
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    /// Unregisters and closes a session.
    pub fn remove(&self, id: &SessionId) -> Option<Arc<Session>> {
        let session = self.sessions.write().remove(id)?;
        session.transport.close();

        let age_secs = (Utc::now() - session.created_at).num_seconds();
        info!(session_id = %id, age_secs, "session removed");
        Some(session)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::mcp::engine::Peer;

    struct Silent;

    #[async_trait]
    impl ProtocolEngine for Silent {
        async fn on_message(&self, _message: Value, _peer: Peer) {}
    }

    fn registry() -> SessionRegistry {
        let factory: Arc<dyn EngineFactory> =
            Arc::new(|_: &SessionId| -> Arc<dyn ProtocolEngine> { Arc::new(Silent) });
        SessionRegistry::new(factory, ResponderPolicy::default())
    }

    #[test]
    fn created_sessions_are_retrievable_by_id() {
        let registry = registry();
        let session = registry.create();

        let found = registry.get(&session.id).expect("session registered");
        assert_eq!(found.id, session.id);
        assert_eq!(found.transport.session_id(), &session.id);
        assert!(registry.get(&SessionId::from("unknown")).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_closes_and_forgets_session() {
        let registry = registry();
        let session = registry.create();

        let removed = registry.remove(&session.id).expect("session removed");
        assert!(removed.transport.is_closed());
        assert!(registry.get(&session.id).is_none());
        assert!(registry.remove(&session.id).is_none());
        assert!(registry.is_empty());
    }
}
