//! Admin commands and the requests they turn into.

use crate::config::AdminConfig;
use crate::correlator::{Correlator, ReplyExpectation};
use crate::error::{ClientError, ClientResult};
use clustermon_protocol::{AdminOperation, AdminRequest, Frame, HelloMessage, SystemRole};
use std::fmt;
use uuid::Uuid;

/// A command selected by the admin client user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    /// Query the controller state of a node.
    Status {
        /// Node to query.
        node: String,
    },
    /// Query controller health on every node. Not supported without a node.
    Health,
    /// Ask which node is the designated coordinator.
    WhoIsDc,
    /// Force a coordinator election.
    Election,
    /// Stop the controller on a node.
    Shutdown {
        /// Node to stop.
        node: String,
    },
    /// List the nodes of the configuration.
    ListNodes,
}

impl AdminCommand {
    /// Short name of the command, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            AdminCommand::Status { .. } => "status",
            AdminCommand::Health => "health",
            AdminCommand::WhoIsDc => "dc_lookup",
            AdminCommand::Election => "election",
            AdminCommand::Shutdown { .. } => "shutdown",
            AdminCommand::ListNodes => "nodes",
        }
    }

    /// Returns how the command is carried out.
    pub fn dispatch(&self) -> ClientResult<Dispatch> {
        let plan = match self {
            AdminCommand::ListNodes => return Ok(Dispatch::ConfigQuery),
            AdminCommand::Health => {
                return Err(ClientError::InvalidCommand(
                    "cluster-wide health check is not supported, no message to send".into(),
                ))
            }
            AdminCommand::Status { node } => CommandPlan {
                operation: AdminOperation::Ping,
                sys_to: SystemRole::Controller,
                host_to: Some(node.clone()),
                expectation: ReplyExpectation::Replies(1),
            },
            AdminCommand::WhoIsDc => CommandPlan {
                operation: AdminOperation::Ping,
                sys_to: SystemRole::Dc,
                host_to: None,
                expectation: ReplyExpectation::Replies(1),
            },
            AdminCommand::Election => CommandPlan {
                operation: AdminOperation::Vote,
                sys_to: SystemRole::Controller,
                host_to: None,
                expectation: ReplyExpectation::None,
            },
            AdminCommand::Shutdown { node } => CommandPlan {
                operation: AdminOperation::LocalShutdown,
                sys_to: SystemRole::Controller,
                host_to: Some(node.clone()),
                expectation: ReplyExpectation::None,
            },
        };
        Ok(Dispatch::Controller(plan))
    }
}

impl fmt::Display for AdminCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminCommand::Status { node } | AdminCommand::Shutdown { node } => {
                write!(f, "{} {}", self.name(), node)
            }
            _ => f.write_str(self.name()),
        }
    }
}

/// How a command is carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// One request to the controller.
    Controller(CommandPlan),
    /// A read of the configuration document.
    ConfigQuery,
}

/// The controller request a command produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPlan {
    /// Operation.
    pub operation: AdminOperation,
    /// Addressed role.
    pub sys_to: SystemRole,
    /// Destination node; the local node when absent.
    pub host_to: Option<String>,
    /// Replies to wait for.
    pub expectation: ReplyExpectation,
}

/// Builds requests on behalf of one admin client process.
#[derive(Debug, Clone)]
pub struct AdminClient {
    config: AdminConfig,
    origin: String,
    counter: u64,
}

impl AdminClient {
    /// Creates a client with a fresh origin id.
    pub fn new(config: AdminConfig) -> Self {
        Self::with_origin(config, Uuid::new_v4().to_string())
    }

    /// Creates a client with a given origin id.
    pub fn with_origin(config: AdminConfig, origin: impl Into<String>) -> Self {
        Self {
            config,
            origin: origin.into(),
            counter: 0,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &AdminConfig {
        &self.config
    }

    /// Returns the origin id.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Greeting sent after connecting to the controller.
    pub fn hello(&self) -> Frame {
        Frame::Hello(HelloMessage::new(&self.origin, &self.config.identity))
    }

    /// Builds the request for a plan with a new correlation reference.
    pub fn build_request(&mut self, plan: &CommandPlan) -> AdminRequest {
        self.counter += 1;
        let reference = format!("{}-{}-{}", plan.operation, self.origin, self.counter);
        AdminRequest::new(
            plan.operation,
            plan.sys_to,
            plan.host_to.clone(),
            &self.config.identity,
            &self.origin,
            reference,
        )
    }

    /// Creates a correlator using the configured timeout.
    pub fn correlator(&self) -> Correlator {
        Correlator::new(self.config.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn plan(command: AdminCommand) -> CommandPlan {
        match command.dispatch().unwrap() {
            Dispatch::Controller(plan) => plan,
            Dispatch::ConfigQuery => panic!("expected a controller request"),
        }
    }

    #[test]
    fn status_targets_one_node() {
        let plan = plan(AdminCommand::Status {
            node: "alpha".into(),
        });
        assert_eq!(plan.operation, AdminOperation::Ping);
        assert_eq!(plan.sys_to, SystemRole::Controller);
        assert_eq!(plan.host_to.as_deref(), Some("alpha"));
        assert_eq!(plan.expectation, ReplyExpectation::Replies(1));
    }

    #[test]
    fn dc_lookup_goes_to_dc() {
        let plan = plan(AdminCommand::WhoIsDc);
        assert_eq!(plan.sys_to, SystemRole::Dc);
        assert!(plan.host_to.is_none());
        assert_eq!(plan.expectation, ReplyExpectation::Replies(1));
    }

    #[test]
    fn election_and_shutdown_expect_nothing() {
        let election = plan(AdminCommand::Election);
        assert_eq!(election.operation, AdminOperation::Vote);
        assert_eq!(election.expectation, ReplyExpectation::None);

        let shutdown = plan(AdminCommand::Shutdown {
            node: "beta".into(),
        });
        assert_eq!(shutdown.operation, AdminOperation::LocalShutdown);
        assert_eq!(shutdown.host_to.as_deref(), Some("beta"));
        assert_eq!(shutdown.expectation, ReplyExpectation::None);
    }

    #[test]
    fn health_without_node_is_invalid() {
        let result = AdminCommand::Health.dispatch();
        assert!(matches!(result, Err(ClientError::InvalidCommand(_))));
    }

    #[test]
    fn node_listing_reads_configuration() {
        assert_eq!(AdminCommand::ListNodes.dispatch().unwrap(), Dispatch::ConfigQuery);
    }

    #[test]
    fn references_are_unique_per_request() {
        let mut client = AdminClient::with_origin(
            AdminConfig::default().with_timeout(Duration::from_secs(5)),
            "o1",
        );
        let plan = plan(AdminCommand::WhoIsDc);
        let first = client.build_request(&plan);
        let second = client.build_request(&plan);
        assert_eq!(first.reference, "ping-o1-1");
        assert_eq!(second.reference, "ping-o1-2");
        assert_eq!(first.sys_from, "clusteradm");
        assert_eq!(first.origin, "o1");
        assert_eq!(client.correlator().timeout(), Duration::from_secs(5));
    }

    #[test]
    fn hello_carries_identity() {
        let client = AdminClient::with_origin(AdminConfig::default(), "o1");
        match client.hello() {
            Frame::Hello(hello) => {
                assert_eq!(hello.client_name, "clusteradm");
                assert_eq!(hello.origin, "o1");
                assert_eq!((hello.major_version, hello.minor_version), (1, 0));
            }
            other => panic!("unexpected frame {}", other.kind()),
        }
    }

    #[test]
    fn display_names() {
        assert_eq!(AdminCommand::Status { node: "a".into() }.to_string(), "status a");
        assert_eq!(AdminCommand::WhoIsDc.to_string(), "dc_lookup");
    }
}
