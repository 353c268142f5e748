//! Error types for the protocol crate.

use crate::document::Version;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding, decoding or addressing documents.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Failed to encode a value to CBOR.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode CBOR bytes.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// A node path could not be parsed.
    #[error("invalid node path '{path}': {reason}")]
    InvalidPath {
        /// The offending path.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A frame exceeds the maximum allowed size.
    #[error("frame of {size} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge {
        /// Size of the frame.
        size: usize,
        /// Maximum frame size.
        limit: usize,
    },

    /// A patchset could not be applied.
    #[error("patch failed: {0}")]
    Patch(#[from] PatchError),
}

impl ProtocolError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Create an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Reasons a patchset cannot be applied to a base document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// The patch was computed against a different document version.
    #[error("version mismatch: base is {base}, patch expects {expected}")]
    VersionMismatch {
        /// Version of the base document.
        base: Version,
        /// Source version the patch was computed against.
        expected: Version,
    },

    /// A change addresses a node that does not exist.
    #[error("no node at {path}")]
    MissingTarget {
        /// Path of the missing node.
        path: String,
    },

    /// A create change names a parent that does not exist.
    #[error("no parent node at {path}")]
    MissingParent {
        /// Path of the missing parent.
        path: String,
    },

    /// A create change would introduce a second node with the same tag and id.
    #[error("node {tag} with id '{id}' already exists under {parent}")]
    DuplicateNode {
        /// Parent path.
        parent: String,
        /// Tag of the duplicate.
        tag: String,
        /// Id of the duplicate.
        id: String,
    },

    /// A create or move change names a position past the end of the children.
    #[error("position {position} out of range under {parent} ({len} children)")]
    InvalidPosition {
        /// Parent path.
        parent: String,
        /// Requested position.
        position: usize,
        /// Number of children.
        len: usize,
    },

    /// The root node cannot be deleted or moved.
    #[error("cannot {action} the document root")]
    RootChange {
        /// The rejected action.
        action: &'static str,
    },

    /// The notification carried no patch at all.
    #[error("no patch supplied")]
    MissingPatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_error_converts() {
        let err: ProtocolError = PatchError::MissingPatch.into();
        assert!(matches!(err, ProtocolError::Patch(PatchError::MissingPatch)));
        assert_eq!(err.to_string(), "patch failed: no patch supplied");
    }

    #[test]
    fn version_mismatch_display() {
        let err = PatchError::VersionMismatch {
            base: Version::new(0, 5, 2),
            expected: Version::new(0, 5, 1),
        };
        let msg = err.to_string();
        assert!(msg.contains("0.5.2"));
        assert!(msg.contains("0.5.1"));
    }
}
