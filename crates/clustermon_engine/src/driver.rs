//! Event loops of the monitor and the admin client.
//!
//! Both loops are single-threaded: they wait on the event stream, the reply
//! timer and the shutdown signal, and handle one thing at a time.

use crate::channel::Channel;
use crate::command::{AdminClient, AdminCommand, Dispatch};
use crate::config::MonitorConfig;
use crate::connect::connect_with_retry;
use crate::correlator::{Correlator, ReplyExpectation, ReplyOutcome};
use crate::error::{ClientError, ClientResult};
use crate::event::{Event, EventReceiver};
use crate::exit::ExitStatus;
use crate::replica::ReplicaSync;
use clustermon_protocol::{
    AdminReply, AdminRequest, ConnectMode, Frame, PatchApplier, DIFF_NOTIFY_TOPIC,
};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, trace};

/// Signs the monitor on and subscribes to update notifications.
pub async fn start_monitor<C: Channel>(channel: &mut C, config: &MonitorConfig) -> ClientResult<()> {
    connect_with_retry(channel, &config.identity, ConnectMode::Query, &config.connect_retry)
        .await?;
    channel.subscribe(DIFF_NOTIFY_TOPIC).await?;
    info!(topic = DIFF_NOTIFY_TOPIC, "monitoring configuration updates");
    Ok(())
}

/// Runs the monitor until shutdown or disconnection.
///
/// Returns [`ExitStatus::Ok`] on a shutdown request and
/// [`ExitStatus::Disconnect`] when the service goes away. A refused full
/// fetch ends the loop with an error.
pub async fn run_monitor<C, P>(
    sync: &mut ReplicaSync<P>,
    channel: &mut C,
    events: &mut EventReceiver,
    mut shutdown: watch::Receiver<bool>,
) -> ClientResult<ExitStatus>
where
    C: Channel,
    P: PatchApplier,
{
    let mut watching = true;
    loop {
        if *shutdown.borrow() {
            info!("shutdown requested");
            return Ok(ExitStatus::Ok);
        }

        tokio::select! {
            biased;

            changed = shutdown.changed(), if watching => {
                if changed.is_err() {
                    watching = false;
                }
            }

            event = events.recv() => match event {
                Some(Event::Notify { topic, payload }) if topic == DIFF_NOTIFY_TOPIC => {
                    let outcome = sync.handle_notification(&payload, channel).await?;
                    trace!(?outcome, "handled update notification");
                }
                Some(Event::Notify { topic, .. }) => debug!(%topic, "ignoring notification"),
                Some(Event::Reply(_)) => debug!("ignoring unexpected reply"),
                Some(Event::Disconnect) | None => {
                    error!("connection to the configuration service terminated");
                    // best effort, the peer is already gone
                    let _ = channel.close().await;
                    return Ok(ExitStatus::Disconnect);
                }
            },
        }
    }
}

/// Carries out one admin command against the controller.
///
/// Sends the hello and the request, then waits for replies. `on_reply` sees
/// every reply that counted towards completion.
pub async fn run_command<C, F>(
    client: &mut AdminClient,
    command: &AdminCommand,
    channel: &mut C,
    events: &mut EventReceiver,
    shutdown: watch::Receiver<bool>,
    on_reply: F,
) -> ClientResult<ExitStatus>
where
    C: Channel,
    F: FnMut(&AdminReply),
{
    let plan = match command.dispatch()? {
        Dispatch::Controller(plan) => plan,
        Dispatch::ConfigQuery => {
            return Err(ClientError::InvalidCommand(format!(
                "{command} is not a controller command"
            )))
        }
    };

    let mut correlator = client.correlator();
    if let Err(e) = channel.send(client.hello()).await {
        return disconnect_or(e, &mut correlator);
    }

    let request = client.build_request(&plan);
    debug!(command = %command, reference = %request.reference, "sending request");
    run_admin(
        &mut correlator,
        channel,
        request,
        plan.expectation,
        events,
        shutdown,
        on_reply,
    )
    .await
}

/// Sends a request and waits for its replies.
pub async fn run_admin<C, F>(
    correlator: &mut Correlator,
    channel: &mut C,
    request: AdminRequest,
    expectation: ReplyExpectation,
    events: &mut EventReceiver,
    mut shutdown: watch::Receiver<bool>,
    mut on_reply: F,
) -> ClientResult<ExitStatus>
where
    C: Channel,
    F: FnMut(&AdminReply),
{
    let reference = request.reference.clone();
    if let Err(e) = channel.send(Frame::Request(request)).await {
        return disconnect_or(e, correlator);
    }

    if !correlator.begin(Some(reference), expectation, Instant::now()) {
        debug!("no reply expected");
        return Ok(ExitStatus::Ok);
    }

    let mut watching = true;
    loop {
        if *shutdown.borrow() {
            info!("shutdown requested");
            return Ok(ExitStatus::Ok);
        }
        let Some(deadline) = correlator.deadline() else {
            return Ok(ExitStatus::Ok);
        };

        tokio::select! {
            biased;

            changed = shutdown.changed(), if watching => {
                if changed.is_err() {
                    watching = false;
                }
            }

            event = events.recv() => match event {
                Some(Event::Reply(payload)) => {
                    if let ReplyOutcome::Accepted { reply, complete } =
                        correlator.on_reply(&payload, Instant::now())
                    {
                        on_reply(&reply);
                        if complete {
                            return Ok(ExitStatus::Ok);
                        }
                    }
                }
                Some(Event::Notify { topic, .. }) => debug!(%topic, "ignoring notification"),
                Some(Event::Disconnect) | None => return Ok(correlator.on_disconnect()),
            },

            _ = tokio::time::sleep_until(deadline) => {
                return Ok(correlator.on_timeout());
            }
        }
    }
}

fn disconnect_or(e: ClientError, correlator: &mut Correlator) -> ClientResult<ExitStatus> {
    match e {
        ClientError::NotConnected | ClientError::Disconnected(_) => Ok(correlator.on_disconnect()),
        e => Err(e),
    }
}
