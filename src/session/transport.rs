//! The per-session bridge between a protocol engine and HTTP
//!
//! Outbound messages go, in order of preference, to a waiting synchronous
//! responder, to the attached event stream, or to a FIFO queue that is replayed
//! when a stream attaches.

use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::http::sse::EventSink;
use crate::mcp::engine::{Outbound, Peer, ProtocolEngine};
use crate::session::responder::{InstallError, ResponderPolicy, Responders};
use crate::session::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingSynchronousResponse,
    StreamAttached,
}

enum Delivery {
    Queued(VecDeque<Value>),
    Streaming(EventSink),
}

struct TransportState {
    delivery: Delivery,
    responders: Responders,
    inbound: Option<mpsc::UnboundedSender<Value>>,
    closed: bool,
}

pub struct SessionTransport {
    session_id: SessionId,
    engine: Arc<dyn ProtocolEngine>,
    state: Mutex<TransportState>,
}

impl SessionTransport {
    pub fn new(
        session_id: SessionId,
        engine: Arc<dyn ProtocolEngine>,
        policy: ResponderPolicy,
    ) -> Arc<Self> {
        Arc::new(Self {
            session_id,
            engine,
            state: Mutex::new(TransportState {
                delivery: Delivery::Queued(VecDeque::new()),
                responders: Responders::new(policy),
                inbound: None,
                closed: false,
            }),
        })
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Binds `sink` as the outbound destination after replaying the queue into it.
    ///
    /// A previously attached sink is dropped, which ends its stream. Returns the
    /// number of queued messages replayed.
    pub fn attach_sink(&self, sink: EventSink) -> usize {
        let mut state = self.state.lock();
        if state.closed {
            debug!(session_id = %self.session_id, "not attaching stream to closed session");
            return 0;
        }

        let previous = std::mem::replace(&mut state.delivery, Delivery::Queued(VecDeque::new()));
        let mut queue = match previous {
            Delivery::Queued(queue) => queue,
            Delivery::Streaming(_) => {
                debug!(session_id = %self.session_id, "replacing attached event stream");
                VecDeque::new()
            }
        };

        let mut replayed = 0;
        while let Some(message) = queue.pop_front() {
            if !sink.push(&message) {
                queue.push_front(message);
                state.delivery = Delivery::Queued(queue);
                warn!(session_id = %self.session_id, "event stream closed during replay");
                return replayed;
            }
            replayed += 1;
        }

        state.delivery = Delivery::Streaming(sink);
        info!(session_id = %self.session_id, replayed, "event stream attached");
        replayed
    }

    pub fn send_outbound(&self, message: Value) {
        let mut state = self.state.lock();
        if state.closed {
            debug!(session_id = %self.session_id, "dropping outbound message for closed session");
            return;
        }

        let mut message = message;
        while let Some(responder) = state.responders.take(&message) {
            match responder.send(message) {
                Ok(()) => return,
                Err(unclaimed) => message = unclaimed,
            }
        }

        if let Delivery::Streaming(sink) = &state.delivery {
            if sink.push(&message) {
                return;
            }
            warn!(session_id = %self.session_id, "event stream closed, queuing outbound messages");
            state.delivery = Delivery::Queued(VecDeque::new());
        }

        if let Delivery::Queued(queue) = &mut state.delivery {
            queue.push_back(message);
        }
    }

    /// Hands `message` to the engine without waiting for it to be processed.
    ///
    /// Messages of one session reach the engine one at a time, in the order they
    /// were delivered.
    pub fn deliver_inbound(self: &Arc<Self>, message: Value) {
        let mut state = self.state.lock();
        if state.closed {
            warn!(session_id = %self.session_id, "dropping inbound message for closed session");
            return;
        }

        let inbound = state
            .inbound
            .get_or_insert_with(|| self.spawn_inbound_worker());
        if inbound.send(message).is_err() {
            warn!(session_id = %self.session_id, "inbound worker stopped, dropping message");
        }
    }

    fn spawn_inbound_worker(self: &Arc<Self>) -> mpsc::UnboundedSender<Value> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
        let engine = self.engine.clone();
        let transport = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let Some(session) = transport.upgrade() else {
                    break;
                };
                engine.on_message(message, Peer::new(session)).await;
            }
        });
        tx
    }

    /// Registers a one-shot handle for the response to `request`.
    ///
    /// Dropping the receiver cancels the registration.
    pub fn install_pending_responder(
        &self,
        request: &Value,
    ) -> Result<oneshot::Receiver<Value>, InstallError> {
        self.state.lock().responders.install(request)
    }

    /// Notifies the engine and fails every waiting responder.
    ///
    /// The attached sink is dropped as well, so its SSE response ends once the
    /// events already written are flushed. The inbound worker stops after the
    /// messages it already holds.
    pub fn close(&self) {
        {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.responders.clear();
            state.inbound = None;
            state.delivery = Delivery::Queued(VecDeque::new());
        }

        self.engine.on_close();
        info!(session_id = %self.session_id, "session transport closed");
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn state(&self) -> SessionState {
        let mut state = self.state.lock();
        if !state.responders.is_empty() {
            return SessionState::AwaitingSynchronousResponse;
        }
        match &state.delivery {
            Delivery::Streaming(sink) if !sink.is_closed() => SessionState::StreamAttached,
            _ => SessionState::Idle,
        }
    }

    pub fn queued_len(&self) -> usize {
        match &self.state.lock().delivery {
            Delivery::Queued(queue) => queue.len(),
            Delivery::Streaming(_) => 0,
        }
    }
}

impl Outbound for SessionTransport {
    fn send_outbound(&self, message: Value) {
        SessionTransport::send_outbound(self, message);
    }
}
