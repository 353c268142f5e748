//! Replica monitor.

use super::startup_failure;
use crate::signals::shutdown_signal;
use clustermon_engine::{
    event_channel, run_monitor, start_monitor, Channel, Endpoints, ExitStatus, IpcChannel,
    MonitorConfig, ReplicaSync,
};
use tracing::{error, info};

/// Runs the monitor until shutdown or disconnection.
pub async fn run(endpoints: &Endpoints, config: MonitorConfig) -> ExitStatus {
    let (tx, mut events) = event_channel();
    let mut channel = IpcChannel::new(&endpoints.config_service, tx);

    if let Err(e) = start_monitor(&mut channel, &config).await {
        error!(error = %e, "could not monitor configuration changes");
        eprintln!("Could not monitor configuration changes: {e}");
        return startup_failure(&e, ExitStatus::Error);
    }

    let mut sync = ReplicaSync::new(config);
    let status = match run_monitor(&mut sync, &mut channel, &mut events, shutdown_signal()).await {
        Ok(status) => status,
        Err(e) => {
            error!(error = %e, "monitor stopped");
            e.exit_status()
        }
    };

    let stats = sync.stats();
    info!(
        events = stats.events,
        applied = stats.applied,
        refreshes = stats.refreshes,
        rejected = stats.rejected,
        status = %status,
        "monitor finished"
    );
    // the service may already be gone
    let _ = channel.close().await;
    status
}
