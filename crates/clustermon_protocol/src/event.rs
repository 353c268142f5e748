//! Update notifications pushed by the configuration service.

use crate::codec::{from_cbor, to_cbor};
use crate::document::ConfigNode;
use crate::error::ProtocolResult;
use crate::patch::Patchset;
use crate::result::ResultCode;
use serde::{Deserialize, Serialize};

/// Topic carrying one notification per committed configuration change.
pub const DIFF_NOTIFY_TOPIC: &str = "cib_diff_notify";

/// A single change to the authoritative document.
///
/// Update events are emitted after the service has committed (or rejected)
/// an operation. They are consumed once and discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEvent {
    /// Notification topic the event was delivered on.
    pub event: String,
    /// Name of the operation that produced the change.
    #[serde(default)]
    pub operation: Option<String>,
    /// Outcome of the operation. Absent means failure.
    #[serde(default)]
    pub rc: Option<ResultCode>,
    /// Incremental patch from the previous version.
    #[serde(default)]
    pub diff: Option<Patchset>,
    /// The raw update as submitted, for logging only.
    #[serde(default)]
    pub update: Option<ConfigNode>,
}

impl UpdateEvent {
    /// Creates an event on the diff topic.
    pub fn new(operation: impl Into<String>, rc: ResultCode) -> Self {
        Self {
            event: DIFF_NOTIFY_TOPIC.to_string(),
            operation: Some(operation.into()),
            rc: Some(rc),
            diff: None,
            update: None,
        }
    }

    /// Attaches an incremental patch.
    pub fn with_diff(mut self, diff: Patchset) -> Self {
        self.diff = Some(diff);
        self
    }

    /// Attaches the raw update.
    pub fn with_update(mut self, update: ConfigNode) -> Self {
        self.update = Some(update);
        self
    }

    /// Returns the status, treating a missing code as a generic failure.
    pub fn status(&self) -> ResultCode {
        self.rc.unwrap_or(ResultCode::GENERIC_FAILURE)
    }

    /// Returns true if the change was committed and may be applied.
    pub fn is_accepted(&self) -> bool {
        self.status().is_ok()
    }

    /// Returns the operation name for logging.
    pub fn operation_name(&self) -> &str {
        self.operation.as_deref().unwrap_or("<unknown>")
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Version;

    #[test]
    fn missing_rc_is_failure() {
        let mut event = UpdateEvent::new("cib_modify", ResultCode::OK);
        assert!(event.is_accepted());

        event.rc = None;
        assert_eq!(event.status(), ResultCode::GENERIC_FAILURE);
        assert!(!event.is_accepted());
    }

    #[test]
    fn operation_name_fallback() {
        let mut event = UpdateEvent::new("cib_replace", ResultCode::OK);
        assert_eq!(event.operation_name(), "cib_replace");
        event.operation = None;
        assert_eq!(event.operation_name(), "<unknown>");
    }

    #[test]
    fn encode_decode_with_payloads() {
        let event = UpdateEvent::new("cib_apply_diff", ResultCode::OK)
            .with_diff(Patchset::new(Version::new(0, 1, 0), Version::new(0, 1, 1)))
            .with_update(ConfigNode::new("status"));
        let bytes = event.encode().unwrap();
        assert_eq!(UpdateEvent::decode(&bytes).unwrap(), event);
    }

    #[test]
    fn garbage_does_not_decode() {
        assert!(UpdateEvent::decode(&[0xff, 0x00, 0x13]).is_err());
    }
}
