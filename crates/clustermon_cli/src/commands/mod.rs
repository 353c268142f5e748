//! CLI command implementations.

pub mod admin;
pub mod monitor;

use clustermon_engine::{ClientError, ExitStatus};

/// Exit status when a service cannot be reached at startup.
fn startup_failure(e: &ClientError, otherwise: ExitStatus) -> ExitStatus {
    match e {
        ClientError::PermissionDenied(_) => ExitStatus::InsufficientPrivilege,
        _ => otherwise,
    }
}
