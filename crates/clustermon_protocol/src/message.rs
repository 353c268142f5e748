//! Administrative request and reply messages.

use crate::codec::{from_cbor, to_cbor};
use crate::document::ConfigNode;
use crate::error::ProtocolResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Message type of an outbound command.
pub const MSG_TYPE_REQUEST: &str = "request";
/// Message type a command reply must declare.
pub const MSG_TYPE_RESPONSE: &str = "response";

/// Ping data attribute naming the replying subsystem.
pub const PING_ATTR_SYSFROM: &str = "crm_subsystem";
/// Ping data attribute holding the controller state.
pub const PING_ATTR_STATE: &str = "crmd_state";
/// Ping data attribute holding the overall result.
pub const PING_ATTR_STATUS: &str = "result";

/// Cluster role a request is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemRole {
    /// Whichever node currently coordinates the cluster.
    Dc,
    /// The controller on a specific (or the local) node.
    Controller,
}

impl SystemRole {
    /// Returns the wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemRole::Dc => "dc",
            SystemRole::Controller => "crmd",
        }
    }
}

impl fmt::Display for SystemRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation requested from the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminOperation {
    /// Report controller state.
    Ping,
    /// Start an election for the cluster coordinator.
    Vote,
    /// Stop the controller on the destination node.
    LocalShutdown,
}

impl AdminOperation {
    /// Returns the wire name of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminOperation::Ping => "ping",
            AdminOperation::Vote => "vote",
            AdminOperation::LocalShutdown => "local_shutdown",
        }
    }
}

impl fmt::Display for AdminOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Greeting sent once after connecting to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloMessage {
    /// Origin id of this client process.
    pub origin: String,
    /// System name of the client.
    pub client_name: String,
    /// Protocol major version.
    pub major_version: u16,
    /// Protocol minor version.
    pub minor_version: u16,
}

impl HelloMessage {
    /// Creates a hello for protocol version 1.0.
    pub fn new(origin: impl Into<String>, client_name: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            client_name: client_name.into(),
            major_version: 1,
            minor_version: 0,
        }
    }
}

/// A single administrative command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRequest {
    /// Always [`MSG_TYPE_REQUEST`].
    pub msg_type: String,
    /// Requested operation.
    pub operation: AdminOperation,
    /// Addressed role.
    pub sys_to: SystemRole,
    /// Destination node; the local node when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_to: Option<String>,
    /// System name of the originator.
    pub sys_from: String,
    /// Origin id of the originating process.
    pub origin: String,
    /// Correlation reference echoed by replies.
    pub reference: String,
    /// Optional operation payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ConfigNode>,
}

impl AdminRequest {
    /// Creates a request.
    pub fn new(
        operation: AdminOperation,
        sys_to: SystemRole,
        host_to: Option<String>,
        sys_from: impl Into<String>,
        origin: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            msg_type: MSG_TYPE_REQUEST.to_string(),
            operation,
            sys_to,
            host_to,
            sys_from: sys_from.into(),
            origin: origin.into(),
            reference: reference.into(),
            data: None,
        }
    }
}

/// Why a reply was not counted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplyRejection {
    /// No message type.
    #[error("no message type defined")]
    MissingType,
    /// Message type differs from the expected one.
    #[error("expecting a ({expected}) message but received a ({actual})")]
    UnexpectedType {
        /// Expected type.
        expected: String,
        /// Received type.
        actual: String,
    },
    /// No correlation reference.
    #[error("no message reference defined")]
    MissingReference,
    /// Reference belongs to another request.
    #[error("reference {actual} does not match outstanding request {expected}")]
    ReferenceMismatch {
        /// Outstanding reference.
        expected: String,
        /// Received reference.
        actual: String,
    },
}

/// An inbound message on the controller channel.
///
/// All fields are optional on the wire; [`AdminReply::validate`] decides
/// whether a message answers the outstanding request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminReply {
    /// Declared message type.
    #[serde(default)]
    pub msg_type: Option<String>,
    /// Correlation reference.
    #[serde(default)]
    pub reference: Option<String>,
    /// Node that produced the reply.
    #[serde(default)]
    pub host_from: Option<String>,
    /// Subsystem that produced the reply.
    #[serde(default)]
    pub sys_from: Option<String>,
    /// Reply payload.
    #[serde(default)]
    pub data: Option<ConfigNode>,
}

impl AdminReply {
    /// Creates a response to `reference`.
    pub fn response(reference: impl Into<String>) -> Self {
        Self {
            msg_type: Some(MSG_TYPE_RESPONSE.to_string()),
            reference: Some(reference.into()),
            ..Self::default()
        }
    }

    /// Sets the originating host, builder style.
    pub fn from_host(mut self, host: impl Into<String>) -> Self {
        self.host_from = Some(host.into());
        self
    }

    /// Attaches a payload, builder style.
    pub fn with_data(mut self, data: ConfigNode) -> Self {
        self.data = Some(data);
        self
    }

    /// Checks type and correlation.
    ///
    /// The type must equal `expected_type` ignoring ASCII case. A reference
    /// must be present and, when `reference` is given, equal to it.
    pub fn validate(&self, expected_type: &str, reference: Option<&str>) -> Result<(), ReplyRejection> {
        let actual = self.msg_type.as_deref().ok_or(ReplyRejection::MissingType)?;
        if !actual.eq_ignore_ascii_case(expected_type) {
            return Err(ReplyRejection::UnexpectedType {
                expected: expected_type.to_string(),
                actual: actual.to_string(),
            });
        }

        let got = self
            .reference
            .as_deref()
            .ok_or(ReplyRejection::MissingReference)?;
        match reference {
            Some(expected) if expected != got => Err(ReplyRejection::ReferenceMismatch {
                expected: expected.to_string(),
                actual: got.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn ping_attr(&self, name: &str) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.attr(name))
    }

    /// Subsystem named in ping data.
    pub fn ping_system(&self) -> Option<&str> {
        self.ping_attr(PING_ATTR_SYSFROM)
    }

    /// Controller state named in ping data.
    pub fn ping_state(&self) -> Option<&str> {
        self.ping_attr(PING_ATTR_STATE)
    }

    /// Overall result named in ping data.
    pub fn ping_status(&self) -> Option<&str> {
        self.ping_attr(PING_ATTR_STATUS)
    }

    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        to_cbor(self)
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        from_cbor(bytes)
    }
}
