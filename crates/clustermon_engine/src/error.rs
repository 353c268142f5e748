//! Error types for the client engine.

use crate::exit::ExitStatus;
use clustermon_protocol::{ProtocolError, ResultCode};
use std::time::Duration;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to cluster services.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The service is not reachable (yet).
    #[error("not connected to service")]
    NotConnected,

    /// The service refused access.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Protocol error (unexpected or undecodable message).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// No answer within the allowed time.
    #[error("no messages received in {} seconds", .waited.as_secs())]
    Timeout {
        /// How long the client waited.
        waited: Duration,
    },

    /// The connection was lost.
    #[error("connection to {0} was terminated")]
    Disconnected(String),

    /// The requested command cannot be turned into a message.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// The service answered a query with an error code.
    #[error("query failed: {0}")]
    QueryFailed(ResultCode),

    /// Codec error.
    #[error("codec error: {0}")]
    Codec(#[from] ProtocolError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Maps a failure code reported by a service to an error.
    pub fn from_result_code(rc: ResultCode) -> Self {
        match rc {
            ResultCode::PERMISSION_DENIED => Self::PermissionDenied(rc.description().to_string()),
            ResultCode::NOT_CONNECTED => Self::NotConnected,
            _ => Self::QueryFailed(rc),
        }
    }

    /// Returns true if a new sign-on attempt may succeed.
    ///
    /// Only an unreachable service qualifies; a refusal or a broken
    /// exchange will not go away by retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::NotConnected)
    }

    /// Returns the service result code closest to this error.
    pub fn result_code(&self) -> ResultCode {
        match self {
            ClientError::QueryFailed(rc) => *rc,
            ClientError::NotConnected | ClientError::Disconnected(_) => ResultCode::NOT_CONNECTED,
            ClientError::PermissionDenied(_) => ResultCode::PERMISSION_DENIED,
            ClientError::Timeout { .. } => ResultCode::TIMED_OUT,
            ClientError::Protocol(_) | ClientError::Codec(_) => ResultCode::PROTOCOL,
            ClientError::InvalidCommand(_) => ResultCode::INVALID_ARGUMENT,
            ClientError::Io(_) => ResultCode::GENERIC_FAILURE,
        }
    }

    /// Returns the process exit status this error terminates with.
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            ClientError::PermissionDenied(_) => ExitStatus::InsufficientPrivilege,
            ClientError::Timeout { .. } => ExitStatus::Timeout,
            ClientError::Disconnected(_) => ExitStatus::Disconnect,
            ClientError::NotConnected => ExitStatus::Unavailable,
            _ => ExitStatus::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(ClientError::NotConnected.is_retryable());
        assert!(!ClientError::Disconnected("controller".into()).is_retryable());
        assert!(!ClientError::Protocol("unexpected frame".into()).is_retryable());
        assert!(!ClientError::PermissionDenied("no".into()).is_retryable());
        assert!(!ClientError::QueryFailed(ResultCode::GENERIC_FAILURE).is_retryable());
    }

    #[test]
    fn result_codes_map_to_errors() {
        assert!(matches!(
            ClientError::from_result_code(ResultCode::PERMISSION_DENIED),
            ClientError::PermissionDenied(_)
        ));
        assert!(matches!(
            ClientError::from_result_code(ResultCode::NOT_CONNECTED),
            ClientError::NotConnected
        ));
        let err = ClientError::from_result_code(ResultCode::NO_SUCH_ENTRY);
        assert_eq!(err.result_code(), ResultCode::NO_SUCH_ENTRY);
    }

    #[test]
    fn exit_statuses() {
        assert_eq!(
            ClientError::PermissionDenied("x".into()).exit_status(),
            ExitStatus::InsufficientPrivilege
        );
        assert_eq!(
            ClientError::Timeout {
                waited: Duration::from_secs(30)
            }
            .exit_status(),
            ExitStatus::Timeout
        );
        assert_eq!(
            ClientError::Disconnected("controller".into()).exit_status(),
            ExitStatus::Disconnect
        );
        assert_eq!(ClientError::NotConnected.exit_status(), ExitStatus::Unavailable);
        assert_eq!(
            ClientError::InvalidCommand("x".into()).exit_status(),
            ExitStatus::Error
        );
    }

    #[test]
    fn error_display() {
        let err = ClientError::Timeout {
            waited: Duration::from_millis(30_000),
        };
        assert_eq!(err.to_string(), "no messages received in 30 seconds");
        assert_eq!(ClientError::NotConnected.to_string(), "not connected to service");
    }
}
