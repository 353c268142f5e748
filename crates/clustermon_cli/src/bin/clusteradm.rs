//! clusteradm
//!
//! Sends one command to the cluster controller and prints the replies.

use clustermon_cli::args::{parse_args, AdminArgs};
use clustermon_cli::commands::admin::{self, OutputOptions};
use clustermon_cli::logging;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args: AdminArgs = match parse_args() {
        Ok(args) => args,
        Err(status) => return status.into(),
    };
    logging::init(args.verbose);

    let output = OutputOptions {
        quiet: args.quiet,
        bash_export: args.bash_export,
        format: args.format,
    };
    admin::run(args.command(), &args.endpoints(), args.config(), output)
        .await
        .into()
}
