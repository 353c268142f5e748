//! Integration tests for replica synchronization.

use clustermon_engine::{
    event_channel, run_monitor, start_monitor, Channel, ClientError, ClientResult, Event,
    ExitStatus, MockChannel, MonitorConfig, ReplicaState, ReplicaSync, RetryConfig,
    UpdateOutcome,
};
use clustermon_protocol::{
    ConfigDocument, PatchApplier, PatchError, Patchset, ResultCode, Version, VersionedApplier,
    DIFF_NOTIFY_TOPIC,
};
use clustermon_testkit::prelude::*;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// An applier that counts how often it is asked to patch.
#[derive(Debug, Default, Clone)]
struct CountingApplier {
    calls: Arc<AtomicUsize>,
}

impl PatchApplier for CountingApplier {
    fn apply_patch(
        &self,
        base: ConfigDocument,
        patch: &Patchset,
    ) -> Result<ConfigDocument, PatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        VersionedApplier.apply_patch(base, patch)
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn next(v: Version) -> Version {
    Version::new(v.admin_epoch, v.epoch, v.num_updates + 1)
}

async fn synced(doc: ConfigDocument) -> (ReplicaSync, MockChannel) {
    let mut channel = MockChannel::connected();
    channel.set_document(doc);
    let mut sync = ReplicaSync::new(MonitorConfig::default());
    sync.refresh(&mut channel).await.unwrap();
    (sync, channel)
}

#[tokio::test]
async fn failed_status_update_is_ignored() {
    let (mut sync, mut channel) = synced(sample_document(version(0, 10, 0))).await;

    let payload = encode_update(&rejected_update(ResultCode::DIFF_FAILED));
    let outcome = sync.handle_notification(&payload, &mut channel).await.unwrap();

    assert_eq!(outcome, UpdateOutcome::Rejected(ResultCode::DIFF_FAILED));
    assert_eq!(sync.state(), ReplicaState::Synced(version(0, 10, 0)));
    assert_eq!(channel.query_count(), 1);
}

#[tokio::test]
async fn mismatched_patch_refetches_exactly_once() {
    let (mut sync, mut channel) = synced(sample_document(version(0, 10, 0))).await;
    channel.set_document(sample_document(version(0, 12, 0)));

    let stale = add_node_patch(version(0, 11, 0), version(0, 11, 1), "1", "alpha");
    let payload = encode_update(&accepted_update(Some(stale)));
    let outcome = sync.handle_notification(&payload, &mut channel).await.unwrap();

    assert_eq!(outcome, UpdateOutcome::Refreshed(version(0, 12, 0)));
    assert_eq!(sync.document(), Some(&sample_document(version(0, 12, 0))));
    assert_eq!(channel.query_count(), 2);
}

#[tokio::test]
async fn patch_applies_in_place() {
    let (mut sync, mut channel) =
        synced(document_with_nodes(version(0, 10, 0), &[("1", "alpha")])).await;

    let patch = add_node_patch(version(0, 10, 0), version(0, 10, 1), "2", "beta");
    let payload = encode_update(&accepted_update(Some(patch)));
    let outcome = sync.handle_notification(&payload, &mut channel).await.unwrap();

    assert_eq!(outcome, UpdateOutcome::Applied(version(0, 10, 1)));
    assert_eq!(
        sync.document(),
        Some(&document_with_nodes(
            version(0, 10, 1),
            &[("1", "alpha"), ("2", "beta")]
        ))
    );
    assert_eq!(channel.query_count(), 1);
}

#[tokio::test]
async fn permission_denied_fetch_stops_the_monitor() {
    let mut channel = MockChannel::connected();
    channel.push_query_result(Err(ClientError::PermissionDenied("denied".into())));
    let mut sync = ReplicaSync::new(MonitorConfig::default());

    let (tx, mut rx) = event_channel();
    let (_shutdown_tx, shutdown) = watch::channel(false);
    tx.send(Event::notify(DIFF_NOTIFY_TOPIC, encode_update(&accepted_update(None))))
        .unwrap();
    tx.send(Event::notify(DIFF_NOTIFY_TOPIC, encode_update(&accepted_update(None))))
        .unwrap();

    let result = run_monitor(&mut sync, &mut channel, &mut rx, shutdown).await;
    let err = result.unwrap_err();
    assert_eq!(err.exit_status(), ExitStatus::InsufficientPrivilege);
    // the second notification is never handled
    assert_eq!(channel.query_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn monitor_exits_on_disconnect() {
    let mut channel = MockChannel::new();
    channel.set_document(sample_document(version(0, 1, 0)));
    let config = MonitorConfig::default();
    start_monitor(&mut channel, &config).await.unwrap();
    assert_eq!(channel.subscriptions(), &[DIFF_NOTIFY_TOPIC.to_string()]);

    let mut sync = ReplicaSync::new(config);
    let (tx, mut rx) = event_channel();
    let (_shutdown_tx, shutdown) = watch::channel(false);
    tx.send(Event::notify(DIFF_NOTIFY_TOPIC, encode_update(&accepted_update(None))))
        .unwrap();
    tx.send(Event::notify("st_notify_fence", vec![1, 2, 3])).unwrap();
    tx.send(Event::Disconnect).unwrap();

    let status = run_monitor(&mut sync, &mut channel, &mut rx, shutdown).await.unwrap();
    assert_eq!(status, ExitStatus::Disconnect);
    assert_eq!(sync.state(), ReplicaState::Synced(version(0, 1, 0)));
    assert_eq!(sync.stats().events, 1);
    assert!(!channel.is_connected());
}

#[tokio::test]
async fn monitor_exits_cleanly_on_shutdown() {
    let mut channel = MockChannel::connected();
    let mut sync = ReplicaSync::new(MonitorConfig::default());
    let (_tx, mut rx) = event_channel();
    let (shutdown_tx, shutdown) = watch::channel(false);

    let stopper = tokio::spawn(async move {
        tokio::task::yield_now().await;
        shutdown_tx.send(true).unwrap();
        shutdown_tx
    });

    let status = run_monitor(&mut sync, &mut channel, &mut rx, shutdown).await.unwrap();
    assert_eq!(status, ExitStatus::Ok);
    drop(stopper.await.unwrap());
}

#[tokio::test]
async fn monitor_gives_up_when_service_never_appears() {
    let mut channel = MockChannel::new();
    for _ in 0..3 {
        channel.push_connect_result(Err(ClientError::NotConnected));
    }
    let config = MonitorConfig::default()
        .with_connect_retry(RetryConfig::no_retry())
        .with_max_connect_failures(2);
    // with_max_connect_failures only changes the attempt count
    assert_eq!(config.connect_retry.max_attempts, 3);

    let result: ClientResult<()> = start_monitor(&mut channel, &config).await;
    assert!(matches!(result, Err(ClientError::NotConnected)));
    assert_eq!(channel.connect_attempts(), 3);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn failures_never_abort_the_monitor(kinds in prop::collection::vec(
        prop_oneof![
            ignored_update_strategy(),
            Just(UpdateKind::MissingDiff),
            Just(UpdateKind::StalePatch),
        ],
        1..24,
    )) {
        runtime().block_on(async {
            let service_doc = document_with_nodes(version(0, 50, 0), &[("1", "alpha")]);
            let (mut sync, mut channel) = synced(service_doc).await;

            for kind in &kinds {
                let replica = sync.store().version().unwrap_or_default();
                let outcome = sync.handle_notification(&kind.payload(replica), &mut channel).await;
                prop_assert!(outcome.is_ok());
            }

            // still able to apply a well-formed patch afterwards
            let current = sync.store().version().unwrap();
            let payload = UpdateKind::Bump.payload(current);
            let outcome = sync.handle_notification(&payload, &mut channel).await.unwrap();
            prop_assert_eq!(outcome, UpdateOutcome::Applied(next(current)));
            Ok(())
        })?;
    }

    #[test]
    fn replica_is_always_a_whole_version(kinds in update_sequence_strategy(32)) {
        runtime().block_on(async {
            let service_doc = document_with_nodes(version(1, 0, 0), &[("1", "alpha")]);
            let mut channel = MockChannel::connected();
            channel.set_document(service_doc.clone());
            let applier = CountingApplier::default();
            let mut sync = ReplicaSync::with_applier(MonitorConfig::default(), applier.clone());

            for kind in &kinds {
                let before = sync.document().cloned();
                let queries_before = channel.query_count();
                let applies_before = applier.calls.load(Ordering::SeqCst);
                let replica = before.as_ref().map(ConfigDocument::version).unwrap_or_default();

                let outcome = sync
                    .handle_notification(&kind.payload(replica), &mut channel)
                    .await
                    .unwrap();
                let fetches = channel.query_count() - queries_before;
                let applies = applier.calls.load(Ordering::SeqCst) - applies_before;

                if kind.is_ignored() {
                    prop_assert_eq!(sync.document(), before.as_ref());
                    prop_assert_eq!(fetches, 0);
                    prop_assert_eq!(applies, 0);
                    continue;
                }

                prop_assert!(fetches <= 1);
                match outcome {
                    UpdateOutcome::Applied(v) => {
                        prop_assert_eq!(v, next(replica));
                        prop_assert_eq!(fetches, 0);
                        prop_assert_eq!(sync.store().version(), Some(v));
                    }
                    UpdateOutcome::Refreshed(_) => {
                        prop_assert_eq!(fetches, 1);
                        prop_assert_eq!(sync.document(), Some(&service_doc));
                    }
                    other => prop_assert!(false, "unexpected outcome {:?}", other),
                }
            }
            Ok(())
        })?;
    }
}
