//! Property-based test generators using proptest.
//!
//! Provides strategies for documents and for sequences of update
//! notifications, including every kind the monitor must survive.

use crate::fixtures::{
    accepted_update, add_node_patch, document_with_nodes, encode_update, rejected_update,
    version_bump,
};
use clustermon_protocol::{ConfigDocument, ResultCode, Version};
use proptest::prelude::*;

/// Version that no generated document ever carries.
pub const UNREACHABLE_VERSION: Version = Version::new(u64::MAX, 0, 0);

/// Strategy for node names.
pub fn uname_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,15}").expect("Invalid regex")
}

/// Strategy for document versions.
pub fn version_strategy() -> impl Strategy<Value = Version> {
    (0u64..3, 0u64..100, 0u64..100).prop_map(|(a, e, n)| Version::new(a, e, n))
}

/// Strategy for documents with up to eight nodes.
pub fn document_strategy() -> impl Strategy<Value = ConfigDocument> {
    (
        version_strategy(),
        prop::collection::btree_set(uname_strategy(), 0..8),
    )
        .prop_map(|(version, unames)| {
            let ids: Vec<String> = (1..=unames.len()).map(|i| i.to_string()).collect();
            let nodes: Vec<(&str, &str)> = ids
                .iter()
                .map(String::as_str)
                .zip(unames.iter().map(String::as_str))
                .collect();
            document_with_nodes(version, &nodes)
        })
}

/// One kind of update notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateKind {
    /// Bytes that do not decode as an update.
    Malformed(Vec<u8>),
    /// A failed change with this (negative) code.
    Rejected(i32),
    /// An accepted change without a patch.
    MissingDiff,
    /// An accepted change whose patch does not match any replica.
    StalePatch,
    /// An accepted change bumping the replica version.
    Bump,
    /// An accepted change adding a node.
    AddNode(String),
}

impl UpdateKind {
    /// Returns true if the monitor must leave its replica alone.
    pub fn is_ignored(&self) -> bool {
        matches!(self, UpdateKind::Malformed(_) | UpdateKind::Rejected(_))
    }

    /// Encodes the notification against the replica version the sender assumes.
    pub fn payload(&self, replica: Version) -> Vec<u8> {
        let next = Version::new(replica.admin_epoch, replica.epoch, replica.num_updates + 1);
        match self {
            UpdateKind::Malformed(bytes) => {
                // 0xff is a stray break code and never starts a valid item
                let mut out = vec![0xff];
                out.extend_from_slice(bytes);
                out
            }
            UpdateKind::Rejected(rc) => encode_update(&rejected_update(ResultCode(*rc))),
            UpdateKind::MissingDiff => encode_update(&accepted_update(None)),
            UpdateKind::StalePatch => encode_update(&accepted_update(Some(version_bump(
                UNREACHABLE_VERSION,
                next,
            )))),
            UpdateKind::Bump => encode_update(&accepted_update(Some(version_bump(replica, next)))),
            UpdateKind::AddNode(uname) => encode_update(&accepted_update(Some(add_node_patch(
                replica,
                next,
                &format!("n-{uname}"),
                uname,
            )))),
        }
    }
}

/// Strategy for any update kind.
pub fn update_kind_strategy() -> impl Strategy<Value = UpdateKind> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..32).prop_map(UpdateKind::Malformed),
        (-300i32..0).prop_map(UpdateKind::Rejected),
        Just(UpdateKind::MissingDiff),
        Just(UpdateKind::StalePatch),
        Just(UpdateKind::Bump),
        uname_strategy().prop_map(UpdateKind::AddNode),
    ]
}

/// Strategy for update kinds that must never change the replica.
pub fn ignored_update_strategy() -> impl Strategy<Value = UpdateKind> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..32).prop_map(UpdateKind::Malformed),
        (-300i32..0).prop_map(UpdateKind::Rejected),
    ]
}

/// Strategy for sequences of update kinds.
pub fn update_sequence_strategy(max_len: usize) -> impl Strategy<Value = Vec<UpdateKind>> {
    prop::collection::vec(update_kind_strategy(), 1..max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clustermon_protocol::UpdateEvent;

    proptest! {
        #[test]
        fn documents_have_unique_node_ids(doc in document_strategy()) {
            let nodes = doc.find(&crate::fixtures::path(crate::fixtures::NODES_PATH)).unwrap();
            let mut ids: Vec<_> = nodes.children().iter().filter_map(|n| n.id()).collect();
            let total = ids.len();
            ids.sort_unstable();
            ids.dedup();
            prop_assert_eq!(ids.len(), total);
        }

        #[test]
        fn malformed_payloads_never_decode(kind in ignored_update_strategy(), v in version_strategy()) {
            let decoded = UpdateEvent::decode(&kind.payload(v));
            match kind {
                UpdateKind::Malformed(_) => prop_assert!(decoded.is_err()),
                _ => prop_assert!(!decoded.unwrap().is_accepted()),
            }
        }
    }
}
