//! clustermon
//!
//! Keeps a local replica of the cluster configuration up to date by applying
//! the patchsets the configuration service publishes.

use clustermon_cli::args::{parse_args, MonitorArgs};
use clustermon_cli::{commands, logging};
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args: MonitorArgs = match parse_args() {
        Ok(args) => args,
        Err(status) => return status.into(),
    };
    logging::init(args.verbose);

    commands::monitor::run(&args.endpoints(), args.config())
        .await
        .into()
}
