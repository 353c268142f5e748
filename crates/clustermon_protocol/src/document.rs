//! The replicated configuration document.
//!
//! A document is a tree of [`ConfigNode`]s. Each node has a tag, an ordered
//! set of uniquely named attributes and an ordered list of children. The
//! root node carries the document [`Version`] in its `admin_epoch`, `epoch`
//! and `num_updates` attributes.

use crate::path::{NodePath, PathSegment};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Root attribute holding the administrative epoch.
pub const ATTR_ADMIN_EPOCH: &str = "admin_epoch";
/// Root attribute holding the epoch.
pub const ATTR_EPOCH: &str = "epoch";
/// Root attribute holding the update counter.
pub const ATTR_NUM_UPDATES: &str = "num_updates";
/// Attribute used to address nodes by identity.
pub const ATTR_ID: &str = "id";

/// A single element of the configuration tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigNode {
    tag: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    attributes: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<ConfigNode>,
}

impl ConfigNode {
    /// Creates an empty node with the given tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Sets an attribute, builder style.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Appends a child, builder style.
    pub fn with_child(mut self, child: ConfigNode) -> Self {
        self.children.push(child);
        self
    }

    /// Returns the element tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over attributes in insertion order.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Sets an attribute. An existing attribute keeps its position.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Removes an attribute, returning its previous value.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let idx = self.attributes.iter().position(|(k, _)| k == name)?;
        Some(self.attributes.remove(idx).1)
    }

    /// Returns the `id` attribute.
    pub fn id(&self) -> Option<&str> {
        self.attr(ATTR_ID)
    }

    /// Returns the children in document order.
    pub fn children(&self) -> &[ConfigNode] {
        &self.children
    }

    /// Returns the children for in-place editing.
    pub fn children_mut(&mut self) -> &mut Vec<ConfigNode> {
        &mut self.children
    }

    /// Appends a child.
    pub fn push_child(&mut self, child: ConfigNode) {
        self.children.push(child);
    }

    /// Iterates over children with the given tag.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a ConfigNode> {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Returns true if this node matches a path segment.
    pub fn matches(&self, segment: &PathSegment) -> bool {
        self.tag == segment.tag
            && match &segment.id {
                Some(id) => self.id() == Some(id.as_str()),
                None => true,
            }
    }

    /// Returns the index of the first child matching `segment`.
    pub fn position_of(&self, segment: &PathSegment) -> Option<usize> {
        self.children.iter().position(|c| c.matches(segment))
    }

    /// Resolves a path relative to this node, which must match the first segment.
    pub fn find(&self, path: &NodePath) -> Option<&ConfigNode> {
        let (first, rest) = path.segments().split_first()?;
        if !self.matches(first) {
            return None;
        }
        rest.iter().try_fold(self, |node, segment| {
            node.children.iter().find(|c| c.matches(segment))
        })
    }

    /// Mutable variant of [`ConfigNode::find`].
    pub fn find_mut(&mut self, path: &NodePath) -> Option<&mut ConfigNode> {
        let (first, rest) = path.segments().split_first()?;
        if !self.matches(first) {
            return None;
        }
        let mut node = self;
        for segment in rest {
            node = node.children.iter_mut().find(|c| c.matches(segment))?;
        }
        Some(node)
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:width$}<{}", "", self.tag, width = depth * 2)?;
        for (name, value) in &self.attributes {
            write!(f, " {}=\"{}\"", name, escape(value))?;
        }
        if self.children.is_empty() {
            return writeln!(f, "/>");
        }
        writeln!(f, ">")?;
        for child in &self.children {
            child.write_indented(f, depth + 1)?;
        }
        writeln!(f, "{:width$}</{}>", "", self.tag, width = depth * 2)
    }
}

/// Renders the node as indented XML-like text.
impl fmt::Display for ConfigNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Version triple of a configuration document.
///
/// Ordered lexicographically: `admin_epoch`, then `epoch`, then `num_updates`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Version {
    /// Administrative epoch, bumped only by explicit administrator action.
    pub admin_epoch: u64,
    /// Epoch, bumped on every configuration change.
    pub epoch: u64,
    /// Update counter, bumped on every status change.
    pub num_updates: u64,
}

impl Version {
    /// Creates a version.
    pub const fn new(admin_epoch: u64, epoch: u64, num_updates: u64) -> Self {
        Self {
            admin_epoch,
            epoch,
            num_updates,
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.admin_epoch, self.epoch, self.num_updates).cmp(&(
            other.admin_epoch,
            other.epoch,
            other.num_updates,
        ))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.admin_epoch, self.epoch, self.num_updates)
    }
}

/// A complete, self-consistent snapshot of the configuration tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigDocument {
    root: ConfigNode,
}

impl ConfigDocument {
    /// Wraps a root node.
    pub fn new(root: ConfigNode) -> Self {
        Self { root }
    }

    /// Returns the root node.
    pub fn root(&self) -> &ConfigNode {
        &self.root
    }

    /// Returns the root node for editing.
    pub fn root_mut(&mut self) -> &mut ConfigNode {
        &mut self.root
    }

    /// Unwraps the root node.
    pub fn into_root(self) -> ConfigNode {
        self.root
    }

    /// Reads the version from the root attributes. Missing or unparsable
    /// counters read as zero.
    pub fn version(&self) -> Version {
        let read = |name: &str| {
            self.root
                .attr(name)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0)
        };
        Version::new(read(ATTR_ADMIN_EPOCH), read(ATTR_EPOCH), read(ATTR_NUM_UPDATES))
    }

    /// Stamps a version onto the root attributes.
    pub fn set_version(&mut self, version: Version) {
        self.root
            .set_attr(ATTR_ADMIN_EPOCH, version.admin_epoch.to_string());
        self.root.set_attr(ATTR_EPOCH, version.epoch.to_string());
        self.root
            .set_attr(ATTR_NUM_UPDATES, version.num_updates.to_string());
    }

    /// Resolves a path against the root.
    pub fn find(&self, path: &NodePath) -> Option<&ConfigNode> {
        self.root.find(path)
    }
}

impl fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.fmt(f)
    }
}
