//! Operation result codes carried in notifications and query replies.
//!
//! Codes follow the errno convention: zero or positive means success, a
//! negative value is the negated error number.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A status code reported by the configuration service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultCode(pub i32);

impl ResultCode {
    /// Success.
    pub const OK: ResultCode = ResultCode(0);
    /// Generic failure, also used when a notification carries no code.
    pub const GENERIC_FAILURE: ResultCode = ResultCode(-1);
    /// No such entry.
    pub const NO_SUCH_ENTRY: ResultCode = ResultCode(-2);
    /// Permission denied.
    pub const PERMISSION_DENIED: ResultCode = ResultCode(-13);
    /// Invalid argument.
    pub const INVALID_ARGUMENT: ResultCode = ResultCode(-22);
    /// Protocol error.
    pub const PROTOCOL: ResultCode = ResultCode(-71);
    /// Not connected.
    pub const NOT_CONNECTED: ResultCode = ResultCode(-107);
    /// Timed out.
    pub const TIMED_OUT: ResultCode = ResultCode(-110);
    /// The update was computed against a different document version.
    pub const DIFF_FAILED: ResultCode = ResultCode(-206);
    /// The update could not be re-sequenced.
    pub const DIFF_RESYNC: ResultCode = ResultCode(-207);

    /// Returns true if the code signals success.
    pub fn is_ok(self) -> bool {
        self.0 >= 0
    }

    /// Returns a short human-readable description.
    pub fn description(self) -> &'static str {
        match self {
            c if c.is_ok() => "OK",
            ResultCode::GENERIC_FAILURE => "Operation not permitted",
            ResultCode::NO_SUCH_ENTRY => "No such object",
            ResultCode::PERMISSION_DENIED => "Permission denied",
            ResultCode::INVALID_ARGUMENT => "Invalid argument",
            ResultCode::PROTOCOL => "Protocol error",
            ResultCode::NOT_CONNECTED => "Transport endpoint is not connected",
            ResultCode::TIMED_OUT => "Timer expired",
            ResultCode::DIFF_FAILED => "Application of update diff failed",
            ResultCode::DIFF_RESYNC => "Application of update diff failed, requesting full refresh",
            _ => "Unknown error",
        }
    }
}

impl Default for ResultCode {
    fn default() -> Self {
        ResultCode::OK
    }
}

impl From<i32> for ResultCode {
    fn from(code: i32) -> Self {
        ResultCode(code)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_decides_success() {
        assert!(ResultCode::OK.is_ok());
        assert!(ResultCode(3).is_ok());
        assert!(!ResultCode::GENERIC_FAILURE.is_ok());
        assert!(!ResultCode::PERMISSION_DENIED.is_ok());
    }

    #[test]
    fn display_includes_code() {
        assert_eq!(
            ResultCode::PERMISSION_DENIED.to_string(),
            "Permission denied (-13)"
        );
        assert_eq!(ResultCode(-9999).description(), "Unknown error");
    }
}
