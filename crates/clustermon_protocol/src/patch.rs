//! Structural patchsets and their application.
//!
//! A [`Patchset`] transforms a document at its `source` version into the
//! document at its `target` version. Application takes ownership of the base
//! document: on success the patched document is returned, on failure the base
//! is consumed and nothing partially patched escapes.

use crate::document::{ConfigDocument, ConfigNode, Version};
use crate::error::PatchError;
use crate::path::NodePath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single structural change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Change {
    /// Insert `node` under `parent`, at `position` or at the end.
    Create {
        /// Parent of the new node.
        parent: NodePath,
        /// Child index to insert at; appended when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<usize>,
        /// The node to insert, with its subtree.
        node: ConfigNode,
    },
    /// Remove the node at `path` and its subtree.
    Delete {
        /// Node to remove.
        path: NodePath,
    },
    /// Set and unset attributes of the node at `path`.
    Modify {
        /// Node to edit.
        path: NodePath,
        /// Attributes to set, in order.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        set: Vec<(String, String)>,
        /// Attributes to remove.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        unset: Vec<String>,
    },
    /// Move the node at `path` to another index among its siblings.
    Move {
        /// Node to move.
        path: NodePath,
        /// New child index.
        position: usize,
    },
}

/// An ordered list of changes between two document versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patchset {
    /// Version the patch was computed against.
    pub source: Version,
    /// Version after application.
    pub target: Version,
    /// Changes, applied in order.
    #[serde(default)]
    pub changes: Vec<Change>,
}

impl Patchset {
    /// Creates an empty patchset.
    pub fn new(source: Version, target: Version) -> Self {
        Self {
            source,
            target,
            changes: Vec::new(),
        }
    }

    /// Appends a change, builder style.
    pub fn with_change(mut self, change: Change) -> Self {
        self.changes.push(change);
        self
    }

    /// Returns true if the patch carries no structural changes.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Renders the patch as a readable diff, one line per change.
impl fmt::Display for Patchset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- {}", self.source)?;
        writeln!(f, "+++ {}", self.target)?;
        for change in &self.changes {
            match change {
                Change::Create {
                    parent,
                    position,
                    node,
                } => {
                    write!(f, "++ {}: ", parent)?;
                    write_open_tag(f, node)?;
                    if let Some(pos) = position {
                        write!(f, " @{}", pos)?;
                    }
                    writeln!(f)?;
                }
                Change::Delete { path } => writeln!(f, "-- {}", path)?,
                Change::Modify { path, set, unset } => {
                    write!(f, "+  {}:", path)?;
                    for (name, value) in set {
                        write!(f, " @{}={}", name, value)?;
                    }
                    for name in unset {
                        write!(f, " -@{}", name)?;
                    }
                    writeln!(f)?;
                }
                Change::Move { path, position } => writeln!(f, "<> {} -> {}", path, position)?,
            }
        }
        Ok(())
    }
}

fn write_open_tag(f: &mut fmt::Formatter<'_>, node: &ConfigNode) -> fmt::Result {
    write!(f, "<{}", node.tag())?;
    for (name, value) in node.attrs() {
        write!(f, " {}=\"{}\"", name, value)?;
    }
    match node.children().len() {
        0 => write!(f, "/>"),
        n => write!(f, "> ({} children)", n),
    }
}

/// Applies patchsets to documents.
///
/// Implementations take ownership of the base. The engine never observes a
/// document between the first and the last change of a patch.
pub trait PatchApplier {
    /// Applies `patch` to `base`, returning the patched document.
    fn apply_patch(&self, base: ConfigDocument, patch: &Patchset) -> Result<ConfigDocument, PatchError>;
}

/// The default applier.
///
/// Rejects any patch whose source version differs from the base version, so a
/// skipped or reordered notification always surfaces as a failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionedApplier;

impl PatchApplier for VersionedApplier {
    fn apply_patch(&self, mut base: ConfigDocument, patch: &Patchset) -> Result<ConfigDocument, PatchError> {
        let version = base.version();
        if version != patch.source {
            return Err(PatchError::VersionMismatch {
                base: version,
                expected: patch.source,
            });
        }

        for change in &patch.changes {
            apply_change(base.root_mut(), change)?;
        }

        base.set_version(patch.target);
        Ok(base)
    }
}

/// Applies `patch` to `base` with the [`VersionedApplier`].
pub fn apply_patch(base: ConfigDocument, patch: &Patchset) -> Result<ConfigDocument, PatchError> {
    VersionedApplier.apply_patch(base, patch)
}

fn apply_change(root: &mut ConfigNode, change: &Change) -> Result<(), PatchError> {
    match change {
        Change::Create {
            parent,
            position,
            node,
        } => {
            let target = root.find_mut(parent).ok_or_else(|| PatchError::MissingParent {
                path: parent.to_string(),
            })?;
            if let Some(id) = node.id() {
                let duplicate = target
                    .children_named(node.tag())
                    .any(|c| c.id() == Some(id));
                if duplicate {
                    return Err(PatchError::DuplicateNode {
                        parent: parent.to_string(),
                        tag: node.tag().to_string(),
                        id: id.to_string(),
                    });
                }
            }
            let children = target.children_mut();
            match *position {
                None => children.push(node.clone()),
                Some(pos) if pos <= children.len() => children.insert(pos, node.clone()),
                Some(pos) => {
                    return Err(PatchError::InvalidPosition {
                        parent: parent.to_string(),
                        position: pos,
                        len: children.len(),
                    })
                }
            }
        }
        Change::Delete { path } => {
            let (parent_path, idx) = locate_child(root, path, "delete")?;
            if let Some(parent) = root.find_mut(&parent_path) {
                parent.children_mut().remove(idx);
            }
        }
        Change::Modify { path, set, unset } => {
            let node = root.find_mut(path).ok_or_else(|| PatchError::MissingTarget {
                path: path.to_string(),
            })?;
            for (name, value) in set {
                node.set_attr(name.clone(), value.clone());
            }
            for name in unset {
                node.remove_attr(name);
            }
        }
        Change::Move { path, position } => {
            let (parent_path, idx) = locate_child(root, path, "move")?;
            if let Some(parent) = root.find_mut(&parent_path) {
                let children = parent.children_mut();
                if *position >= children.len() {
                    return Err(PatchError::InvalidPosition {
                        parent: parent_path.to_string(),
                        position: *position,
                        len: children.len(),
                    });
                }
                let node = children.remove(idx);
                children.insert(*position, node);
            }
        }
    }
    Ok(())
}

/// Finds the parent path and child index of a non-root node.
fn locate_child(
    root: &ConfigNode,
    path: &NodePath,
    action: &'static str,
) -> Result<(NodePath, usize), PatchError> {
    let missing = || PatchError::MissingTarget {
        path: path.to_string(),
    };
    let parent_path = path.parent().ok_or(PatchError::RootChange { action })?;
    let parent = root.find(&parent_path).ok_or_else(missing)?;
    let idx = parent.position_of(path.last()).ok_or_else(missing)?;
    Ok((parent_path, idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ATTR_ADMIN_EPOCH, ATTR_EPOCH, ATTR_NUM_UPDATES};

    fn path(raw: &str) -> NodePath {
        NodePath::parse(raw).unwrap()
    }

    fn base() -> ConfigDocument {
        ConfigDocument::new(
            ConfigNode::new("cib")
                .with_attr(ATTR_ADMIN_EPOCH, "0")
                .with_attr(ATTR_EPOCH, "4")
                .with_attr(ATTR_NUM_UPDATES, "0")
                .with_child(
                    ConfigNode::new("configuration").with_child(
                        ConfigNode::new("nodes")
                            .with_child(ConfigNode::new("node").with_attr("id", "1"))
                            .with_child(ConfigNode::new("node").with_attr("id", "2")),
                    ),
                ),
        )
    }

    fn patch() -> Patchset {
        Patchset::new(Version::new(0, 4, 0), Version::new(0, 5, 0))
    }

    #[test]
    fn create_appends_and_stamps_target_version() {
        let p = patch().with_change(Change::Create {
            parent: path("/cib/configuration/nodes"),
            position: None,
            node: ConfigNode::new("node").with_attr("id", "3"),
        });
        let doc = apply_patch(base(), &p).unwrap();

        let nodes = doc.find(&path("/cib/configuration/nodes")).unwrap();
        let ids: Vec<_> = nodes.children().iter().filter_map(|n| n.id()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(doc.version(), Version::new(0, 5, 0));
    }

    #[test]
    fn create_at_position() {
        let p = patch().with_change(Change::Create {
            parent: path("/cib/configuration/nodes"),
            position: Some(0),
            node: ConfigNode::new("node").with_attr("id", "0"),
        });
        let doc = apply_patch(base(), &p).unwrap();
        let nodes = doc.find(&path("/cib/configuration/nodes")).unwrap();
        assert_eq!(nodes.children()[0].id(), Some("0"));
    }

    #[test]
    fn create_duplicate_fails() {
        let p = patch().with_change(Change::Create {
            parent: path("/cib/configuration/nodes"),
            position: None,
            node: ConfigNode::new("node").with_attr("id", "2"),
        });
        assert!(matches!(
            apply_patch(base(), &p),
            Err(PatchError::DuplicateNode { .. })
        ));
    }

    #[test]
    fn create_past_end_fails() {
        let p = patch().with_change(Change::Create {
            parent: path("/cib/configuration/nodes"),
            position: Some(5),
            node: ConfigNode::new("node").with_attr("id", "9"),
        });
        assert!(matches!(
            apply_patch(base(), &p),
            Err(PatchError::InvalidPosition { position: 5, len: 2, .. })
        ));
    }

    #[test]
    fn delete_and_modify() {
        let p = patch()
            .with_change(Change::Delete {
                path: path("/cib/configuration/nodes/node[@id='1']"),
            })
            .with_change(Change::Modify {
                path: path("/cib/configuration/nodes/node[@id='2']"),
                set: vec![("uname".into(), "beta".into())],
                unset: vec!["missing".into()],
            });
        let doc = apply_patch(base(), &p).unwrap();
        let nodes = doc.find(&path("/cib/configuration/nodes")).unwrap();
        assert_eq!(nodes.children().len(), 1);
        assert_eq!(nodes.children()[0].attr("uname"), Some("beta"));
    }

    #[test]
    fn move_reorders_siblings() {
        let p = patch().with_change(Change::Move {
            path: path("/cib/configuration/nodes/node[@id='2']"),
            position: 0,
        });
        let doc = apply_patch(base(), &p).unwrap();
        let nodes = doc.find(&path("/cib/configuration/nodes")).unwrap();
        assert_eq!(nodes.children()[0].id(), Some("2"));
        assert_eq!(nodes.children()[1].id(), Some("1"));
    }

    #[test]
    fn version_mismatch_rejects_patch() {
        let p = Patchset::new(Version::new(0, 3, 9), Version::new(0, 4, 0));
        assert_eq!(
            apply_patch(base(), &p),
            Err(PatchError::VersionMismatch {
                base: Version::new(0, 4, 0),
                expected: Version::new(0, 3, 9),
            })
        );
    }

    #[test]
    fn missing_target_fails() {
        let p = patch().with_change(Change::Delete {
            path: path("/cib/configuration/nodes/node[@id='7']"),
        });
        assert!(matches!(
            apply_patch(base(), &p),
            Err(PatchError::MissingTarget { .. })
        ));
    }

    #[test]
    fn root_cannot_be_deleted() {
        let p = patch().with_change(Change::Delete { path: path("/cib") });
        assert_eq!(
            apply_patch(base(), &p),
            Err(PatchError::RootChange { action: "delete" })
        );
    }

    #[test]
    fn display_lists_each_change() {
        let p = patch()
            .with_change(Change::Create {
                parent: path("/cib/configuration/nodes"),
                position: None,
                node: ConfigNode::new("node").with_attr("id", "3"),
            })
            .with_change(Change::Delete {
                path: path("/cib/configuration/nodes/node[@id='1']"),
            });
        let text = p.to_string();
        assert!(text.starts_with("--- 0.4.0\n+++ 0.5.0\n"));
        assert!(text.contains("++ /cib/configuration/nodes: <node id=\"3\"/>"));
        assert!(text.contains("-- /cib/configuration/nodes/node[@id='1']"));
    }
}
