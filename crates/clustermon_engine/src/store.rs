//! Holder of the local replica.

use clustermon_protocol::{ConfigDocument, Version};

/// The single replica document held by the monitor.
///
/// Replacing the document drops the previous one; there is never more than
/// one version held.
#[derive(Debug, Default)]
pub struct ReplicaStore {
    document: Option<ConfigDocument>,
}

impl ReplicaStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the held document.
    pub fn get(&self) -> Option<&ConfigDocument> {
        self.document.as_ref()
    }

    /// Returns the version of the held document.
    pub fn version(&self) -> Option<Version> {
        self.document.as_ref().map(ConfigDocument::version)
    }

    /// Returns true if no document is held.
    pub fn is_empty(&self) -> bool {
        self.document.is_none()
    }

    /// Installs a document, returning the one it replaced.
    pub fn replace(&mut self, document: ConfigDocument) -> Option<ConfigDocument> {
        self.document.replace(document)
    }

    /// Removes the held document.
    pub fn take(&mut self) -> Option<ConfigDocument> {
        self.document.take()
    }

    /// Drops the held document.
    pub fn clear(&mut self) {
        self.document = None;
    }
}
