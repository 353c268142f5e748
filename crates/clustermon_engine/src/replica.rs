//! Replica synchronization state machine.
//!
//! The monitor keeps one local copy of the configuration document. Each
//! update notification either patches that copy in place or, when patching
//! is impossible, causes the copy to be discarded and fetched again in full.

use crate::channel::Channel;
use crate::config::MonitorConfig;
use crate::error::{ClientError, ClientResult};
use crate::store::ReplicaStore;
use clustermon_protocol::{
    ConfigDocument, PatchApplier, PatchError, QueryScope, ResultCode, UpdateEvent, Version,
    VersionedApplier,
};
use tracing::{debug, error, info, trace, warn};

/// What handling one update notification did to the replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The notification could not be decoded. The replica is untouched.
    Malformed,
    /// The service reported the change as failed. The replica is untouched.
    Rejected(ResultCode),
    /// The patch applied; the replica is now at this version.
    Applied(Version),
    /// The replica was fetched in full and is now at this version.
    Refreshed(Version),
    /// The full fetch failed; no replica is held.
    RefreshFailed(ResultCode),
}

impl UpdateOutcome {
    /// Returns true if the replica changed.
    pub fn changed_replica(&self) -> bool {
        matches!(
            self,
            UpdateOutcome::Applied(_) | UpdateOutcome::Refreshed(_) | UpdateOutcome::RefreshFailed(_)
        )
    }
}

/// Whether a replica is currently held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicaState {
    /// No replica; the next accepted update triggers a full fetch.
    Empty,
    /// A replica at the given version is held.
    Synced(Version),
}

/// Statistics about replica maintenance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Notifications handled.
    pub events: u64,
    /// Notifications that could not be decoded.
    pub malformed: u64,
    /// Notifications reporting a failed change.
    pub rejected: u64,
    /// Patches applied.
    pub applied: u64,
    /// Patches that failed to apply.
    pub apply_failures: u64,
    /// Full fetches attempted.
    pub refreshes: u64,
    /// Full fetches that failed.
    pub refresh_failures: u64,
}

/// Maintains the local replica from update notifications.
#[derive(Debug)]
pub struct ReplicaSync<P: PatchApplier = VersionedApplier> {
    config: MonitorConfig,
    applier: P,
    store: ReplicaStore,
    stats: SyncStats,
}

impl ReplicaSync<VersionedApplier> {
    /// Creates a synchronizer using version-checked patch application.
    pub fn new(config: MonitorConfig) -> Self {
        Self::with_applier(config, VersionedApplier)
    }
}

impl<P: PatchApplier> ReplicaSync<P> {
    /// Creates a synchronizer with a custom patch applier.
    pub fn with_applier(config: MonitorConfig, applier: P) -> Self {
        Self {
            config,
            applier,
            store: ReplicaStore::new(),
            stats: SyncStats::default(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Returns the held replica, if any.
    pub fn document(&self) -> Option<&ConfigDocument> {
        self.store.get()
    }

    /// Returns the replica store.
    pub fn store(&self) -> &ReplicaStore {
        &self.store
    }

    /// Returns the current state.
    pub fn state(&self) -> ReplicaState {
        match self.store.version() {
            Some(version) => ReplicaState::Synced(version),
            None => ReplicaState::Empty,
        }
    }

    /// Returns the statistics.
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Decodes a raw notification payload and handles it.
    pub async fn handle_notification<C: Channel>(
        &mut self,
        payload: &[u8],
        channel: &mut C,
    ) -> ClientResult<UpdateOutcome> {
        match UpdateEvent::decode(payload) {
            Ok(event) => self.on_update(Some(&event), channel).await,
            Err(e) => {
                debug!(error = %e, "could not decode update notification");
                self.on_update(None, channel).await
            }
        }
    }

    /// Handles one update notification.
    ///
    /// `None` stands for a notification without a usable payload. An accepted
    /// update is applied to the held replica; if that is impossible, or no
    /// replica is held, the document is fetched in full. A fetch refused for
    /// lack of privilege is returned as an error; any other fetch failure
    /// leaves the replica empty until the next notification.
    pub async fn on_update<C: Channel>(
        &mut self,
        event: Option<&UpdateEvent>,
        channel: &mut C,
    ) -> ClientResult<UpdateOutcome> {
        self.stats.events += 1;

        let Some(event) = event else {
            error!("received an update notification without a payload");
            self.stats.malformed += 1;
            return Ok(UpdateOutcome::Malformed);
        };

        let operation = event.operation_name();
        let rc = event.status();
        if !rc.is_ok() {
            warn!(
                event = %event.event,
                operation,
                rc = %rc,
                "[{}] {} ABORTED: {}",
                event.event,
                operation,
                rc.description()
            );
            self.stats.rejected += 1;
            return Ok(UpdateOutcome::Rejected(rc));
        }

        if self.config.log_diffs {
            if let Some(diff) = &event.diff {
                info!(operation, "[{}] {} applied patch\n{}", event.event, operation, diff);
            }
        }
        if self.config.log_updates {
            if let Some(update) = &event.update {
                trace!(operation, "[{}] {} raw update\n{}", event.event, operation, update);
            }
        }

        if let Some(base) = self.store.take() {
            let patched = match &event.diff {
                Some(diff) => self.applier.apply_patch(base, diff),
                None => Err(PatchError::MissingPatch),
            };
            match patched {
                Ok(document) => {
                    let version = document.version();
                    self.store.replace(document);
                    self.stats.applied += 1;
                    debug!(operation, version = %version, "update applied to replica");
                    return Ok(UpdateOutcome::Applied(version));
                }
                Err(e) => {
                    debug!(operation, error = %e, "update didn't apply, requesting full copy");
                    self.stats.apply_failures += 1;
                }
            }
        }

        self.refresh(channel).await
    }

    /// Replaces the replica with a full copy from the service.
    pub async fn refresh<C: Channel>(&mut self, channel: &mut C) -> ClientResult<UpdateOutcome> {
        self.stats.refreshes += 1;
        self.store.clear();

        match channel.query(QueryScope::Local).await {
            Ok(document) => {
                let version = document.version();
                self.store.replace(document);
                debug!(version = %version, "fetched full copy of the configuration");
                Ok(UpdateOutcome::Refreshed(version))
            }
            Err(ClientError::PermissionDenied(reason)) => {
                error!(%reason, "not authorized to read the configuration");
                self.stats.refresh_failures += 1;
                Err(ClientError::PermissionDenied(reason))
            }
            Err(e) => {
                let rc = e.result_code();
                warn!(rc = %rc, error = %e, "full copy of the configuration failed");
                self.stats.refresh_failures += 1;
                Ok(UpdateOutcome::RefreshFailed(rc))
            }
        }
    }
}
