//! # clustermon testkit
//!
//! Test utilities for clustermon.
//!
//! This crate provides:
//! - Sample configuration documents, patches and messages
//! - Property-based test generators using proptest
//! - A scripted configuration/controller service on a Unix socket
//!
//! ## Usage
//!
//! ```rust,ignore
//! use clustermon_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn signs_on() {
//!     let service = FakeService::start();
//!     service.set_document(document_with_nodes(version(0, 1, 0), &[("1", "alpha")]));
//!     // ... connect an IpcChannel to service.path()
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod service;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::service::*;
}

pub use fixtures::*;
pub use generators::*;
pub use service::*;
