//! Connection establishment with retries.

use crate::channel::Channel;
use crate::config::RetryConfig;
use crate::error::ClientResult;
use clustermon_protocol::ConnectMode;
use tracing::{debug, warn};

/// Signs on to a service, retrying while it is not reachable.
///
/// Each attempt waits [`RetryConfig::delay_for_attempt`] first. Errors that
/// are not [`ClientError::is_retryable`] are returned immediately; when the
/// attempts run out the last error is returned.
pub async fn connect_with_retry<C: Channel>(
    channel: &mut C,
    identity: &str,
    mode: ConnectMode,
    retry: &RetryConfig,
) -> ClientResult<()> {
    let mut attempt = 0;
    loop {
        let delay = retry.delay_for_attempt(attempt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        debug!(identity, attempt = attempt + 1, "signing on");
        match channel.connect(identity, mode).await {
            Ok(()) => {
                debug!(identity, attempts = attempt + 1, "signed on");
                return Ok(());
            }
            Err(e) if e.is_retryable() && retry.should_retry(attempt) => {
                debug!(identity, attempt = attempt + 1, "service not available yet");
                attempt += 1;
            }
            Err(e) => {
                warn!(identity, attempts = attempt + 1, error = %e, "sign-on failed");
                return Err(e);
            }
        }
    }
}
