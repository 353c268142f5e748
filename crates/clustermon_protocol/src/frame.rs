//! Wire frames exchanged with cluster services.

use crate::codec::{frame, from_cbor, to_cbor};
use crate::document::ConfigDocument;
use crate::error::ProtocolResult;
use crate::message::{AdminRequest, HelloMessage};
use crate::result::ResultCode;
use serde::{Deserialize, Serialize};

/// What a client intends to do with a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectMode {
    /// Read-only access: queries and notifications.
    Query,
    /// Read-write access.
    Command,
}

/// Visibility of a full document query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryScope {
    /// Answered from the local replica without cluster round trips.
    Local,
    /// Answered by the authoritative instance.
    Cluster,
}

/// One message on a service connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Frame {
    /// Client sign-on.
    Signon {
        /// Client identity.
        identity: String,
        /// Requested access.
        mode: ConnectMode,
    },
    /// Service answer to a sign-on.
    SignonResult {
        /// Outcome.
        rc: ResultCode,
    },
    /// Client greeting to the controller.
    Hello(HelloMessage),
    /// Subscribe to a notification topic.
    Subscribe {
        /// Topic name.
        topic: String,
    },
    /// Request for the complete document.
    Query {
        /// Visibility.
        scope: QueryScope,
    },
    /// Answer to a [`Frame::Query`].
    QueryResult {
        /// Outcome.
        rc: ResultCode,
        /// The document, when `rc` is a success.
        #[serde(default)]
        document: Option<ConfigDocument>,
    },
    /// Notification on a subscribed topic; the payload is an encoded
    /// [`crate::UpdateEvent`].
    Notify {
        /// Topic name.
        topic: String,
        /// Encoded event.
        payload: Vec<u8>,
    },
    /// Administrative command.
    Request(AdminRequest),
    /// Inbound message on the controller channel; the payload is an encoded
    /// [`crate::AdminReply`].
    Reply {
        /// Encoded reply.
        payload: Vec<u8>,
    },
}

impl Frame {
    /// Short name of the frame kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Signon { .. } => "signon",
            Frame::SignonResult { .. } => "signon_result",
            Frame::Hello(_) => "hello",
            Frame::Subscribe { .. } => "subscribe",
            Frame::Query { .. } => "query",
            Frame::QueryResult { .. } => "query_result",
            Frame::Notify { .. } => "notify",
            Frame::Request(_) => "request",
            Frame::Reply { .. } => "reply",
        }
    }

    /// Encodes the frame body without the length header.
    pub fn encode_body(&self) -> ProtocolResult<Vec<u8>> {
        to_cbor(self)
    }

    /// Encodes the frame with its length header.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        frame(&self.encode_body()?)
    }

    /// Decodes a frame body.
    pub fn decode_body(body: &[u8]) -> ProtocolResult<Self> {
        from_cbor(body)
    }
}
