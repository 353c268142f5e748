//! # clustermon engine
//!
//! Client-side state machines and event loops for clustermon.
//!
//! This crate provides:
//! - Replica synchronization: apply incremental patches, fall back to a full fetch
//! - Request/reply correlation with a re-armed inactivity timeout
//! - Admin command planning and request building
//! - The `Channel` abstraction with a Unix socket and a mock implementation
//! - Connection retry and process exit statuses
//!
//! ## Architecture
//!
//! Both clients run a single-threaded loop over one event stream:
//! 1. A channel delivers notifications, replies and disconnects as [`Event`]s
//! 2. The loop hands each event to a pure state machine
//! 3. The state machine decides the outcome and, for the admin client,
//!    the next timer deadline
//!
//! ## Key Invariants
//!
//! - At most one replica document is held at any time
//! - A patch either fully applies or the replica is fetched again
//! - Only valid replies count towards completion or re-arm the timer

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod channel;
mod command;
mod config;
mod connect;
mod correlator;
mod driver;
mod error;
mod event;
mod exit;
mod ipc;
mod replica;
mod store;

pub use channel::{Channel, MockChannel};
pub use command::{AdminClient, AdminCommand, CommandPlan, Dispatch};
pub use config::{
    AdminConfig, Endpoints, MonitorConfig, RetryConfig, DEFAULT_ADMIN_TIMEOUT,
    DEFAULT_CONFIG_SOCKET, DEFAULT_CONTROLLER_SOCKET, DEFAULT_MAX_CONNECT_FAILURES,
};
pub use connect::connect_with_retry;
pub use correlator::{Correlator, PendingRequest, Phase, ReplyExpectation, ReplyOutcome};
pub use driver::{run_admin, run_command, run_monitor, start_monitor};
pub use error::{ClientError, ClientResult};
pub use event::{event_channel, Event, EventReceiver, EventSender};
pub use exit::ExitStatus;
pub use ipc::{IpcChannel, DEFAULT_REQUEST_TIMEOUT};
pub use replica::{ReplicaState, ReplicaSync, SyncStats, UpdateOutcome};
pub use store::ReplicaStore;
