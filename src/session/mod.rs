//! Per-session state for the streamable HTTP transport
//!
//! A session pairs one protocol engine with one [`SessionTransport`]; the
//! [`SessionRegistry`] owns every live session for the process.

use std::{fmt, sync::Arc};

use uuid::Uuid;

pub mod registry;
pub mod responder;
pub mod transport;

pub use registry::{Session, SessionRegistry};
pub use responder::{Correlation, InstallError, ResponderPolicy};
pub use transport::{SessionState, SessionTransport};

/// Opaque session token, generated server-side on `initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(Arc<str>);

impl SessionId {
    pub fn generate() -> Self {
        Self(Arc::from(Uuid::new_v4().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_uuid_shaped_and_unique() {
        let first = SessionId::generate();
        let second = SessionId::generate();

        assert_ne!(first, second);
        assert!(Uuid::parse_str(first.as_str()).is_ok());
    }
}
