//! Admin client commands.

use super::startup_failure;
use crate::output::{node_entries, render_nodes, Format, ReplyPrinter};
use crate::signals::shutdown_signal;
use clustermon_engine::{
    connect_with_retry, event_channel, run_command, AdminClient, AdminCommand, AdminConfig,
    Channel, ClientError, Dispatch, Endpoints, ExitStatus, IpcChannel,
};
use clustermon_protocol::{AdminReply, ConnectMode, QueryScope};
use tracing::{debug, error};

/// How results are printed.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    /// Also write the bare answer to stderr.
    pub quiet: bool,
    /// Print node listings as shell exports.
    pub bash_export: bool,
    /// Listing format.
    pub format: Format,
}

/// Carries out one admin command.
pub async fn run(
    command: AdminCommand,
    endpoints: &Endpoints,
    config: AdminConfig,
    output: OutputOptions,
) -> ExitStatus {
    debug!(command = %command, "running admin command");
    match command.dispatch() {
        Ok(Dispatch::ConfigQuery) => list_nodes(endpoints, &config, output).await,
        Ok(Dispatch::Controller(_)) => controller_command(command, endpoints, config, output).await,
        Err(e) => fail(&e),
    }
}

async fn controller_command(
    command: AdminCommand,
    endpoints: &Endpoints,
    config: AdminConfig,
    output: OutputOptions,
) -> ExitStatus {
    let (tx, mut events) = event_channel();
    let mut channel = IpcChannel::new(&endpoints.controller, tx);
    if let Err(e) =
        connect_with_retry(&mut channel, &config.identity, ConnectMode::Command, &config.connect_retry)
            .await
    {
        error!(error = %e, "could not connect to the controller");
        eprintln!("Could not connect to the controller: {e}");
        return startup_failure(&e, ExitStatus::Unavailable);
    }

    let mut client = AdminClient::new(config);
    let printer = ReplyPrinter {
        quiet: output.quiet,
    };
    let result = run_command(
        &mut client,
        &command,
        &mut channel,
        &mut events,
        shutdown_signal(),
        |reply: &AdminReply| printer.print(&command, reply),
    )
    .await;

    let status = match result {
        Ok(status) => status,
        Err(e) => fail(&e),
    };
    // the controller may already be gone
    let _ = channel.close().await;
    status
}

async fn list_nodes(endpoints: &Endpoints, config: &AdminConfig, output: OutputOptions) -> ExitStatus {
    let (tx, _events) = event_channel();
    let mut channel = IpcChannel::new(&endpoints.config_service, tx);
    if let Err(e) =
        connect_with_retry(&mut channel, &config.identity, ConnectMode::Query, &config.connect_retry)
            .await
    {
        error!(error = %e, "could not connect to the configuration service");
        eprintln!("Could not connect to the configuration service: {e}");
        return startup_failure(&e, ExitStatus::Unavailable);
    }

    let document = match channel.query(QueryScope::Local).await {
        Ok(document) => document,
        Err(e) => {
            let _ = channel.close().await;
            return fail(&e);
        }
    };
    let _ = channel.close().await;

    match render_nodes(&node_entries(&document), output.bash_export, output.format) {
        Ok(text) => {
            print!("{text}");
            ExitStatus::Ok
        }
        Err(e) => {
            error!(error = %e, "could not render node list");
            ExitStatus::Error
        }
    }
}

fn fail(e: &ClientError) -> ExitStatus {
    error!(error = %e, "command failed");
    eprintln!("{e}");
    e.exit_status()
}
