//! One-shot completion handles for synchronous request/response over HTTP
//!
//! A POSTed request installs a responder before it is handed to the engine; the
//! matching outbound message completes it instead of going to the stream.

use std::{collections::VecDeque, str::FromStr};

use serde_json::Value;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::mcp::message::{classify, id_key, MessageKind};

/// How outbound messages are matched to waiting HTTP callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correlation {
    /// Only a response carrying the request's id completes it.
    RequestId,
    /// The next outbound message completes the single outstanding request,
    /// whatever its id.
    FirstOutbound,
}

impl FromStr for Correlation {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "request-id" => Ok(Self::RequestId),
            "first-outbound" => Ok(Self::FirstOutbound),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponderPolicy {
    pub correlation: Correlation,
    pub max_in_flight: usize,
}

impl Default for ResponderPolicy {
    fn default() -> Self {
        Self {
            correlation: Correlation::RequestId,
            max_in_flight: 1,
        }
    }
}

impl ResponderPolicy {
    pub fn first_outbound() -> Self {
        Self {
            correlation: Correlation::FirstOutbound,
            max_in_flight: 1,
        }
    }

    fn capacity(&self) -> usize {
        match self.correlation {
            Correlation::FirstOutbound => 1,
            Correlation::RequestId => self.max_in_flight.max(1),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InstallError {
    #[error("request carries no id")]
    MissingId,
    #[error("a request with this id is already in flight")]
    DuplicateId,
    #[error("too many requests in flight for this session")]
    AtCapacity,
}

struct Slot {
    key: String,
    tx: oneshot::Sender<Value>,
}

pub(crate) struct Responders {
    policy: ResponderPolicy,
    slots: VecDeque<Slot>,
}

impl Responders {
    pub(crate) fn new(policy: ResponderPolicy) -> Self {
        Self {
            policy,
            slots: VecDeque::new(),
        }
    }

    pub(crate) fn install(
        &mut self,
        request: &Value,
    ) -> Result<oneshot::Receiver<Value>, InstallError> {
        let key = id_key(request).ok_or(InstallError::MissingId)?;
        self.prune();

        if self.slots.iter().any(|slot| slot.key == key) {
            return Err(InstallError::DuplicateId);
        }
        if self.slots.len() >= self.policy.capacity() {
            return Err(InstallError::AtCapacity);
        }

        let (tx, rx) = oneshot::channel();
        self.slots.push_back(Slot { key, tx });
        Ok(rx)
    }

    /// Removes and returns the responder that should receive `message`, if any.
    pub(crate) fn take(&mut self, message: &Value) -> Option<oneshot::Sender<Value>> {
        self.prune();

        let position = match self.policy.correlation {
            Correlation::FirstOutbound => 0,
            Correlation::RequestId => {
                if classify(message) != MessageKind::Response {
                    return None;
                }
                let key = id_key(message)?;
                self.slots.iter().position(|slot| slot.key == key)?
            }
        };

        self.slots.remove(position).map(|slot| slot.tx)
    }

    pub(crate) fn is_empty(&mut self) -> bool {
        self.prune();
        self.slots.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
    }

    // A dropped receiver means the HTTP caller went away.
    fn prune(&mut self) {
        self.slots.retain(|slot| !slot.tx.is_closed());
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_id_policy_matches_only_its_response() {
        let mut responders = Responders::new(ResponderPolicy {
            correlation: Correlation::RequestId,
            max_in_flight: 2,
        });
        let _rx = responders
            .install(&json!({"id": 1, "method": "ping"}))
            .expect("installed");

        assert!(responders.take(&json!({"method": "notifications/progress"})).is_none());
        assert!(responders.take(&json!({"id": 2, "result": {}})).is_none());
        assert!(responders.take(&json!({"id": "1", "result": {}})).is_none());
        assert!(responders.take(&json!({"id": 1, "result": {}})).is_some());
        assert!(responders.is_empty());
    }

    #[test]
    fn server_requests_with_same_id_do_not_complete_responders() {
        let mut responders = Responders::new(ResponderPolicy::default());
        let _rx = responders
            .install(&json!({"id": 1, "method": "tools/call"}))
            .expect("installed");

        assert!(responders
            .take(&json!({"id": 1, "method": "sampling/createMessage"}))
            .is_none());
    }

    #[test]
    fn first_outbound_policy_takes_anything() {
        let mut responders = Responders::new(ResponderPolicy::first_outbound());
        let _rx = responders.install(&json!({"id": 1, "method": "ping"})).expect("installed");

        assert!(responders.take(&json!({"method": "notifications/message"})).is_some());
        assert!(responders.take(&json!({"id": 1, "result": {}})).is_none());
    }

    #[test]
    fn capacity_and_duplicates_are_rejected() {
        let mut responders = Responders::new(ResponderPolicy::default());
        let _rx = responders.install(&json!({"id": 1, "method": "a"})).expect("installed");

        assert_eq!(
            responders.install(&json!({"id": 1, "method": "a"})).err(),
            Some(InstallError::DuplicateId)
        );
        assert_eq!(
            responders.install(&json!({"id": 2, "method": "b"})).err(),
            Some(InstallError::AtCapacity)
        );
        assert_eq!(
            responders.install(&json!({"method": "c"})).err(),
            Some(InstallError::MissingId)
        );
    }

    #[test]
    fn dropped_receivers_free_their_slot() {
        let mut responders = Responders::new(ResponderPolicy::default());
        let rx = responders.install(&json!({"id": 1, "method": "a"})).expect("installed");
        drop(rx);

        assert!(responders.is_empty());
        assert!(responders.install(&json!({"id": 2, "method": "b"})).is_ok());
    }

    #[test]
    fn correlation_parses_from_config_text() {
        assert_eq!("request-id".parse(), Ok(Correlation::RequestId));
        assert_eq!(" First-Outbound ".parse(), Ok(Correlation::FirstOutbound));
        assert!("sometimes".parse::<Correlation>().is_err());
    }
}
