//! Bridging of termination signals into the client loops.

use std::future;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{info, warn};

/// Returns a receiver that turns `true` on SIGINT or SIGTERM.
///
/// Must be called inside a Tokio runtime.
pub fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("received termination signal");
        // no receiver left means the loop already finished
        let _ = tx.send(true);
    });
    rx
}

async fn wait_for_signal() {
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "cannot listen for SIGTERM");
            interrupt().await;
            return;
        }
    };

    tokio::select! {
        _ = interrupt() => {}
        _ = terminate.recv() => {}
    }
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for SIGINT");
        future::pending::<()>().await;
    }
}
