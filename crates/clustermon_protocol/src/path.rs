//! Node addressing within a configuration document.
//!
//! Paths use a small XPath subset: `/cib/configuration/nodes/node[@id='1']`.
//! Every segment names a tag and may pin the node's `id` attribute. The
//! first segment always matches the document root.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One step of a [`NodePath`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSegment {
    /// Element tag to match.
    pub tag: String,
    /// Required value of the `id` attribute, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl PathSegment {
    /// Creates a segment matching any node with `tag`.
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: None,
        }
    }

    /// Creates a segment matching the node with `tag` and `id`.
    pub fn with_id(tag: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: Some(id.into()),
        }
    }

    fn parse(raw: &str, whole: &str) -> ProtocolResult<Self> {
        let Some(open) = raw.find('[') else {
            if raw.is_empty() {
                return Err(ProtocolError::invalid_path(whole, "empty segment"));
            }
            return Ok(Self::tag(raw));
        };

        let tag = &raw[..open];
        let predicate = raw[open..]
            .strip_prefix("[@id=")
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| ProtocolError::invalid_path(whole, "only [@id='..'] predicates are supported"))?;
        let id = predicate
            .strip_prefix('\'')
            .and_then(|p| p.strip_suffix('\''))
            .or_else(|| predicate.strip_prefix('"').and_then(|p| p.strip_suffix('"')))
            .ok_or_else(|| ProtocolError::invalid_path(whole, "id predicate must be quoted"))?;

        if tag.is_empty() {
            return Err(ProtocolError::invalid_path(whole, "segment has no tag"));
        }
        Ok(Self::with_id(tag, id))
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}[@id='{}']", self.tag, id),
            None => f.write_str(&self.tag),
        }
    }
}

/// An absolute path to a node, starting at the document root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodePath {
    segments: Vec<PathSegment>,
}

impl NodePath {
    /// Creates a path from segments. Returns `None` if `segments` is empty.
    pub fn from_segments(segments: Vec<PathSegment>) -> Option<Self> {
        if segments.is_empty() {
            None
        } else {
            Some(Self { segments })
        }
    }

    /// Parses a path such as `/cib/status/node_state[@id='2']`.
    pub fn parse(raw: &str) -> ProtocolResult<Self> {
        let body = raw
            .strip_prefix('/')
            .ok_or_else(|| ProtocolError::invalid_path(raw, "path must be absolute"))?;
        let segments = body
            .split('/')
            .map(|seg| PathSegment::parse(seg, raw))
            .collect::<ProtocolResult<Vec<_>>>()?;
        Self::from_segments(segments).ok_or_else(|| ProtocolError::invalid_path(raw, "empty path"))
    }

    /// Returns the path segments, root first.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns the last segment.
    pub fn last(&self) -> &PathSegment {
        // Construction guarantees at least one segment.
        &self.segments[self.segments.len() - 1]
    }

    /// Returns the parent path, or `None` for the root.
    pub fn parent(&self) -> Option<NodePath> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Returns a new path with `segment` appended.
    pub fn join(&self, segment: PathSegment) -> NodePath {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// Returns true if this path addresses the document root.
    pub fn is_root(&self) -> bool {
        self.segments.len() == 1
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for NodePath {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for NodePath {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NodePath> for String {
    fn from(path: NodePath) -> Self {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_and_predicated_segments() {
        let path = NodePath::parse("/cib/configuration/nodes/node[@id='1']").unwrap();
        assert_eq!(path.segments().len(), 4);
        assert_eq!(path.segments()[0], PathSegment::tag("cib"));
        assert_eq!(path.last(), &PathSegment::with_id("node", "1"));
    }

    #[test]
    fn display_matches_input() {
        let raw = "/cib/status/node_state[@id='node-2']";
        assert_eq!(NodePath::parse(raw).unwrap().to_string(), raw);
    }

    #[test]
    fn double_quoted_id_is_accepted() {
        let path = NodePath::parse("/cib/node[@id=\"7\"]").unwrap();
        assert_eq!(path.last().id.as_deref(), Some("7"));
    }

    #[test]
    fn rejects_bad_paths() {
        assert!(NodePath::parse("cib/configuration").is_err());
        assert!(NodePath::parse("/").is_err());
        assert!(NodePath::parse("/cib//nodes").is_err());
        assert!(NodePath::parse("/cib/node[@uname='a']").is_err());
        assert!(NodePath::parse("/cib/node[@id=1]").is_err());
        assert!(NodePath::parse("/cib/[@id='1']").is_err());
    }

    #[test]
    fn parent_and_join() {
        let path = NodePath::parse("/cib/configuration").unwrap();
        assert!(!path.is_root());
        let parent = path.parent().unwrap();
        assert!(parent.is_root());
        assert!(parent.parent().is_none());

        let joined = path.join(PathSegment::tag("nodes"));
        assert_eq!(joined.to_string(), "/cib/configuration/nodes");
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        fn segment_strategy() -> impl Strategy<Value = PathSegment> {
            ("[a-z_]{1,8}", proptest::option::of("[a-z0-9-]{1,6}")).prop_map(|(tag, id)| {
                match id {
                    Some(id) => PathSegment::with_id(tag, id),
                    None => PathSegment::tag(tag),
                }
            })
        }

        proptest! {
            #[test]
            fn printed_paths_parse_back(segments in proptest::collection::vec(segment_strategy(), 1..6)) {
                let path = NodePath::from_segments(segments).unwrap();
                let parsed = NodePath::parse(&path.to_string()).unwrap();
                prop_assert_eq!(parsed, path);
            }
        }
    }
}
