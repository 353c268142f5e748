//! Command-line arguments of both binaries.

use crate::output::Format;
use clap::error::ErrorKind;
use clap::{Arg, ArgAction, ArgGroup, CommandFactory, FromArgMatches, Parser};
use clustermon_engine::{
    AdminCommand, AdminConfig, Endpoints, ExitStatus, MonitorConfig, DEFAULT_CONFIG_SOCKET,
    DEFAULT_CONTROLLER_SOCKET, DEFAULT_MAX_CONNECT_FAILURES,
};
use std::ffi::OsString;
use std::path::PathBuf;

/// Keep a live replica of the cluster configuration.
#[derive(Parser, Debug)]
#[command(name = "clustermon")]
#[command(author, version, about, long_about = None)]
pub struct MonitorArgs {
    /// Increase debug output (may be repeated)
    #[arg(short = 'V', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log every received patchset
    #[arg(short = 'd', long)]
    pub log_diffs: bool,

    /// Log the raw update payload (needs -VV to show)
    #[arg(short = 'u', long)]
    pub log_updates: bool,

    /// Number of failed connection attempts tolerated before giving up
    #[arg(short = 'm', long = "max-conn-fail", default_value_t = DEFAULT_MAX_CONNECT_FAILURES)]
    pub max_conn_fail: u32,

    /// Socket of the configuration service
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_SOCKET)]
    pub socket: PathBuf,
}

impl MonitorArgs {
    /// Builds the monitor configuration.
    pub fn config(&self) -> MonitorConfig {
        MonitorConfig::default()
            .with_log_diffs(self.log_diffs)
            .with_log_updates(self.log_updates)
            .with_max_connect_failures(self.max_conn_fail)
    }

    /// Builds the service endpoints.
    pub fn endpoints(&self) -> Endpoints {
        Endpoints::default().with_config_service(&self.socket)
    }
}

/// Query and manage the cluster controller.
#[derive(Parser, Debug)]
#[command(name = "clusteradm")]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("command")
        .required(true)
        .args(["status", "dc_lookup", "nodes", "election", "kill", "health"])
))]
pub struct AdminArgs {
    /// Display the status of the controller on the given node
    #[arg(short = 'S', long, value_name = "NODE")]
    pub status: Option<String>,

    /// Display the uname of the node co-ordinating the cluster
    #[arg(short = 'D', long = "dc_lookup")]
    pub dc_lookup: bool,

    /// Display the uname of all member nodes
    #[arg(short = 'N', long)]
    pub nodes: bool,

    /// (Advanced) Start an election for the cluster co-ordinator
    #[arg(short = 'E', long)]
    pub election: bool,

    /// (Advanced) Stop the controller on the given node
    #[arg(short = 'K', long, value_name = "NODE")]
    pub kill: Option<String>,

    /// Check controller health on every node
    #[arg(short = 'H', long, hide = true)]
    pub health: bool,

    /// Time (in milliseconds) to wait before declaring the operation failed
    #[arg(short = 't', long, default_value_t = 30_000, allow_negative_numbers = true)]
    pub timeout: i64,

    /// Create Bash export entries of the form 'export uname=uuid'
    #[arg(short = 'B', long = "bash-export")]
    pub bash_export: bool,

    /// Display only the essential query information
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format of the node listing (text, json)
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    /// Increase debug output (may be repeated)
    #[arg(short = 'V', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Socket of the controller
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONTROLLER_SOCKET)]
    pub controller_socket: PathBuf,

    /// Socket of the configuration service
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_SOCKET)]
    pub config_socket: PathBuf,
}

impl AdminArgs {
    /// Returns the selected command.
    pub fn command(&self) -> AdminCommand {
        if let Some(node) = &self.status {
            AdminCommand::Status { node: node.clone() }
        } else if let Some(node) = &self.kill {
            AdminCommand::Shutdown { node: node.clone() }
        } else if self.dc_lookup {
            AdminCommand::WhoIsDc
        } else if self.nodes {
            AdminCommand::ListNodes
        } else if self.election {
            AdminCommand::Election
        } else {
            AdminCommand::Health
        }
    }

    /// Builds the admin configuration.
    pub fn config(&self) -> AdminConfig {
        AdminConfig::default().with_timeout_ms(self.timeout)
    }

    /// Builds the service endpoints.
    pub fn endpoints(&self) -> Endpoints {
        Endpoints::default()
            .with_controller(&self.controller_socket)
            .with_config_service(&self.config_socket)
    }
}

/// Parses the process arguments.
///
/// `-V` is taken by verbosity, so the version is only available as
/// `--version`. Help and version output yield [`ExitStatus::Ok`], any other
/// parse failure [`ExitStatus::Usage`]; the message is printed in both cases.
pub fn parse_args<P: Parser>() -> Result<P, ExitStatus> {
    parse_args_from(std::env::args_os())
}

/// Parses arguments from an iterator. The first item is the program name.
pub fn parse_args_from<P, I, T>(args: I) -> Result<P, ExitStatus>
where
    P: Parser,
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let command = <P as CommandFactory>::command().disable_version_flag(true).arg(
        Arg::new("version")
            .long("version")
            .action(ArgAction::Version)
            .help("Print version"),
    );
    let matches = command.try_get_matches_from(args).map_err(report)?;
    <P as FromArgMatches>::from_arg_matches(&matches).map_err(report)
}

fn report(err: clap::Error) -> ExitStatus {
    // nothing sensible left to do if stderr is gone
    let _ = err.print();
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitStatus::Ok,
        _ => ExitStatus::Usage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn admin(args: &[&str]) -> Result<AdminArgs, ExitStatus> {
        parse_args_from(std::iter::once("clusteradm").chain(args.iter().copied()))
    }

    fn monitor(args: &[&str]) -> Result<MonitorArgs, ExitStatus> {
        parse_args_from(std::iter::once("clustermon").chain(args.iter().copied()))
    }

    #[test]
    fn monitor_defaults() {
        let args = monitor(&[]).unwrap();
        assert_eq!(args.verbose, 0);
        let config = args.config();
        assert!(!config.log_diffs);
        assert_eq!(config.connect_retry.max_attempts, 31);
        assert_eq!(
            args.endpoints().config_service,
            PathBuf::from(DEFAULT_CONFIG_SOCKET)
        );
    }

    #[test]
    fn monitor_flags() {
        let args = monitor(&["-VV", "-d", "-u", "-m", "5", "--socket", "/tmp/cib.sock"]).unwrap();
        assert_eq!(args.verbose, 2);
        let config = args.config();
        assert!(config.log_diffs);
        assert!(config.log_updates);
        assert_eq!(config.connect_retry.max_attempts, 6);
        assert_eq!(args.endpoints().config_service, PathBuf::from("/tmp/cib.sock"));
    }

    #[test]
    fn admin_commands() {
        assert_eq!(
            admin(&["-S", "alpha"]).unwrap().command(),
            AdminCommand::Status {
                node: "alpha".into()
            }
        );
        assert_eq!(admin(&["-D"]).unwrap().command(), AdminCommand::WhoIsDc);
        assert_eq!(admin(&["--nodes"]).unwrap().command(), AdminCommand::ListNodes);
        assert_eq!(admin(&["-E"]).unwrap().command(), AdminCommand::Election);
        assert_eq!(
            admin(&["-K", "beta"]).unwrap().command(),
            AdminCommand::Shutdown {
                node: "beta".into()
            }
        );
        assert_eq!(admin(&["-H"]).unwrap().command(), AdminCommand::Health);
    }

    #[test]
    fn admin_requires_exactly_one_command() {
        assert_eq!(admin(&[]).unwrap_err(), ExitStatus::Usage);
        assert_eq!(admin(&["-D", "-N"]).unwrap_err(), ExitStatus::Usage);
        assert_eq!(admin(&["-S"]).unwrap_err(), ExitStatus::Usage);
    }

    #[test]
    fn admin_timeout() {
        let args = admin(&["-D", "-t", "1500"]).unwrap();
        assert_eq!(args.config().timeout, Duration::from_millis(1500));

        let args = admin(&["-D", "-t", "-5"]).unwrap();
        assert_eq!(args.config().timeout, Duration::from_millis(30_000));
    }

    #[test]
    fn admin_output_flags() {
        let args = admin(&["-N", "-B", "-q", "--format", "json", "-V"]).unwrap();
        assert!(args.bash_export);
        assert!(args.quiet);
        assert_eq!(args.format, Format::Json);
        assert_eq!(args.verbose, 1);
    }

    #[test]
    fn help_and_version_are_not_errors() {
        assert_eq!(admin(&["--help"]).unwrap_err(), ExitStatus::Ok);
        assert_eq!(admin(&["--version"]).unwrap_err(), ExitStatus::Ok);
        assert_eq!(monitor(&["--version"]).unwrap_err(), ExitStatus::Ok);
    }
}
