//! Sample documents, patches and messages.
//!
//! Documents follow the usual layout: a `cib` root holding
//! `configuration/nodes` and `status`.

use clustermon_protocol::{
    AdminReply, Change, ConfigDocument, ConfigNode, NodePath, Patchset, ResultCode, UpdateEvent,
    Version, PING_ATTR_STATE, PING_ATTR_STATUS, PING_ATTR_SYSFROM,
};

/// Path of the node list.
pub const NODES_PATH: &str = "/cib/configuration/nodes";

/// Operation name carried by accepted sample updates.
pub const APPLY_OPERATION: &str = "cib_apply_diff";

/// Shorthand for [`Version::new`].
pub fn version(admin_epoch: u64, epoch: u64, num_updates: u64) -> Version {
    Version::new(admin_epoch, epoch, num_updates)
}

/// Parses a path, panicking on invalid input.
pub fn path(text: &str) -> NodePath {
    NodePath::parse(text).expect("invalid fixture path")
}

/// A `node` entry.
pub fn node(id: &str, uname: &str) -> ConfigNode {
    ConfigNode::new("node")
        .with_attr("id", id)
        .with_attr("uname", uname)
        .with_attr("type", "member")
}

/// An empty document at `version`.
pub fn sample_document(version: Version) -> ConfigDocument {
    document_with_nodes(version, &[])
}

/// A document at `version` listing the given `(id, uname)` nodes.
pub fn document_with_nodes(version: Version, nodes: &[(&str, &str)]) -> ConfigDocument {
    let mut list = ConfigNode::new("nodes");
    for (id, uname) in nodes {
        list.push_child(node(id, uname));
    }
    let root = ConfigNode::new("cib")
        .with_attr("validate-with", "pacemaker-3.9")
        .with_child(
            ConfigNode::new("configuration")
                .with_child(ConfigNode::new("crm_config"))
                .with_child(list)
                .with_child(ConfigNode::new("resources"))
                .with_child(ConfigNode::new("constraints")),
        )
        .with_child(ConfigNode::new("status"));
    let mut doc = ConfigDocument::new(root);
    doc.set_version(version);
    doc
}

/// A patch adding a node.
pub fn add_node_patch(from: Version, to: Version, id: &str, uname: &str) -> Patchset {
    Patchset::new(from, to).with_change(Change::Create {
        parent: path(NODES_PATH),
        position: None,
        node: node(id, uname),
    })
}

/// A patch removing a node by id.
pub fn remove_node_patch(from: Version, to: Version, id: &str) -> Patchset {
    Patchset::new(from, to).with_change(Change::Delete {
        path: path(&format!("{NODES_PATH}/node[@id='{id}']")),
    })
}

/// A patch that only bumps the version.
pub fn version_bump(from: Version, to: Version) -> Patchset {
    Patchset::new(from, to)
}

/// An accepted update notification, optionally carrying a patch.
pub fn accepted_update(diff: Option<Patchset>) -> UpdateEvent {
    let event = UpdateEvent::new(APPLY_OPERATION, ResultCode::OK);
    match diff {
        Some(diff) => event.with_diff(diff),
        None => event,
    }
}

/// An update notification reporting a failed change.
pub fn rejected_update(rc: ResultCode) -> UpdateEvent {
    UpdateEvent::new(APPLY_OPERATION, rc)
}

/// Encodes an update notification payload.
pub fn encode_update(event: &UpdateEvent) -> Vec<u8> {
    event.encode().expect("failed to encode update")
}

/// A ping reply from `host` reporting controller `state`.
pub fn ping_reply(reference: &str, host: &str, state: &str) -> AdminReply {
    AdminReply::response(reference).from_host(host).with_data(
        ConfigNode::new("ping_response")
            .with_attr(PING_ATTR_SYSFROM, "crmd")
            .with_attr(PING_ATTR_STATE, state)
            .with_attr(PING_ATTR_STATUS, "ok"),
    )
}

/// Encodes a reply payload.
pub fn encode_reply(reply: &AdminReply) -> Vec<u8> {
    reply.encode().expect("failed to encode reply")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clustermon_protocol::apply_patch;

    #[test]
    fn sample_document_layout() {
        let doc = document_with_nodes(version(0, 3, 1), &[("1", "alpha"), ("2", "beta")]);
        assert_eq!(doc.version(), version(0, 3, 1));
        let nodes = doc.find(&path(NODES_PATH)).unwrap();
        assert_eq!(nodes.children().len(), 2);
        assert_eq!(nodes.children()[1].attr("uname"), Some("beta"));
    }

    #[test]
    fn node_patches_apply() {
        let doc = document_with_nodes(version(0, 3, 1), &[("1", "alpha")]);
        let doc = apply_patch(doc, &add_node_patch(version(0, 3, 1), version(0, 3, 2), "2", "beta"))
            .unwrap();
        let doc = apply_patch(doc, &remove_node_patch(version(0, 3, 2), version(0, 3, 3), "1"))
            .unwrap();

        let nodes = doc.find(&path(NODES_PATH)).unwrap();
        assert_eq!(nodes.children().len(), 1);
        assert_eq!(nodes.children()[0].id(), Some("2"));
        assert_eq!(doc.version(), version(0, 3, 3));
    }
}
