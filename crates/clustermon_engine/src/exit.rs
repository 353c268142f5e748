//! Process exit statuses.

use std::fmt;
use std::process::ExitCode;

/// How a client run ended.
///
/// Numeric values follow the conventions shared by cluster tooling so scripts
/// can tell a timeout from a lost connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitStatus {
    /// Success.
    Ok,
    /// Generic error.
    Error,
    /// The service refused access.
    InsufficientPrivilege,
    /// Incorrect command-line usage.
    Usage,
    /// The service could not be reached during initialisation.
    Unavailable,
    /// The connection was lost.
    Disconnect,
    /// No reply within the timeout.
    Timeout,
}

impl ExitStatus {
    /// Returns the numeric exit code.
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Ok => 0,
            ExitStatus::Error => 1,
            ExitStatus::InsufficientPrivilege => 4,
            ExitStatus::Usage => 64,
            ExitStatus::Unavailable => 69,
            ExitStatus::Disconnect => 102,
            ExitStatus::Timeout => 124,
        }
    }

    /// Returns true for [`ExitStatus::Ok`].
    pub fn is_success(self) -> bool {
        self == ExitStatus::Ok
    }

    /// Returns a short description.
    pub fn description(self) -> &'static str {
        match self {
            ExitStatus::Ok => "OK",
            ExitStatus::Error => "Error occurred",
            ExitStatus::InsufficientPrivilege => "Insufficient privileges",
            ExitStatus::Usage => "Incorrect usage",
            ExitStatus::Unavailable => "Network unreachable",
            ExitStatus::Disconnect => "Lost connection to something",
            ExitStatus::Timeout => "Timeout occurred",
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}
