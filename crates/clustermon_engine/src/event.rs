//! Events delivered to the client loops.

use bytes::Bytes;
use tokio::sync::mpsc;

/// Something that happened on a service connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Notification on a subscribed topic.
    Notify {
        /// Topic name.
        topic: String,
        /// Encoded update event.
        payload: Bytes,
    },
    /// Inbound message on the controller channel.
    Reply(Bytes),
    /// The connection was closed by the peer.
    Disconnect,
}

impl Event {
    /// Creates a notification event.
    pub fn notify(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Event::Notify {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Creates a reply event.
    pub fn reply(payload: impl Into<Bytes>) -> Self {
        Event::Reply(payload.into())
    }
}

/// Sending half of an event stream.
pub type EventSender = mpsc::UnboundedSender<Event>;

/// Receiving half of an event stream.
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// Creates a new event stream.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
