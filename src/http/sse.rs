//! Server-Sent Events framing and sinks
//!
//! Every outbound message becomes one `id: <uuid>` / `event: message` / `data: <json>`
//! event. A stream opens with an empty priming event so intermediaries flush headers.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::Stream;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};
use uuid::Uuid;

use crate::session::SessionTransport;

pub const MESSAGE_EVENT: &str = "message";

pub fn message_event(message: &Value) -> Event {
    framed_event(&message.to_string())
}

pub fn priming_event() -> Event {
    framed_event("")
}

fn framed_event(data: &str) -> Event {
    Event::default()
        .id(Uuid::new_v4().to_string())
        .event(MESSAGE_EVENT)
        .data(data)
}

/// Writable end of an open event stream.
#[derive(Debug)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Returns false once the client side of the stream is gone.
    pub fn push(&self, message: &Value) -> bool {
        self.tx.send(message_event(message)).is_ok()
    }

    pub fn prime(&self) -> bool {
        self.tx.send(priming_event()).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Opens an event stream bound to `transport`: priming event first, then any
/// queued messages, then live traffic.
pub fn open_stream(
    transport: &SessionTransport,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (sink, rx) = EventSink::channel();
    sink.prime();
    transport.attach_sink(sink);

    let stream = UnboundedReceiverStream::new(rx).map(Ok::<Event, Infallible>);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn push_fails_after_receiver_drops() {
        let (sink, rx) = EventSink::channel();
        assert!(sink.push(&json!({"jsonrpc": "2.0", "method": "x"})));

        drop(rx);
        assert!(sink.is_closed());
        assert!(!sink.push(&json!({"jsonrpc": "2.0", "method": "y"})));
    }
}
