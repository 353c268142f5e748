//! # clustermon CLI
//!
//! Shared pieces of the `clustermon` and `clusteradm` binaries.
//!
//! # Binaries
//!
//! - `clustermon` - Keep a live replica of the cluster configuration
//! - `clusteradm` - Query and manage the cluster controller

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod args;
pub mod commands;
pub mod logging;
pub mod output;
pub mod signals;
