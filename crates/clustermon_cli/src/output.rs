//! Human-readable and machine-readable output.

use clap::ValueEnum;
use clustermon_engine::AdminCommand;
use clustermon_protocol::{AdminReply, ConfigDocument, NodePath};
use serde::Serialize;
use std::fmt::Write;

/// Location of the node list in the configuration.
pub const NODES_PATH: &str = "/cib/configuration/nodes";

const MISSING: &str = "(null)";

/// Output format of listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// One line per entry.
    #[default]
    Text,
    /// A pretty-printed JSON array.
    Json,
}

/// One configured node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeEntry {
    /// Node id.
    pub id: Option<String>,
    /// Node name.
    pub uname: Option<String>,
    /// Node type.
    #[serde(rename = "type")]
    pub node_type: Option<String>,
}

/// Extracts the configured nodes, in document order.
pub fn node_entries(document: &ConfigDocument) -> Vec<NodeEntry> {
    let Ok(path) = NodePath::parse(NODES_PATH) else {
        return Vec::new();
    };
    let Some(nodes) = document.find(&path) else {
        return Vec::new();
    };
    nodes
        .children_named("node")
        .map(|node| NodeEntry {
            id: node.attr("id").map(str::to_string),
            uname: node.attr("uname").map(str::to_string),
            node_type: node.attr("type").map(str::to_string),
        })
        .collect()
}

/// Renders a node listing.
pub fn render_nodes(
    entries: &[NodeEntry],
    bash_export: bool,
    format: Format,
) -> serde_json::Result<String> {
    if format == Format::Json {
        return Ok(format!("{}\n", serde_json::to_string_pretty(entries)?));
    }

    let mut out = String::new();
    for entry in entries {
        let id = entry.id.as_deref().unwrap_or(MISSING);
        let uname = entry.uname.as_deref().unwrap_or(MISSING);
        // writing to a String cannot fail
        let _ = if bash_export {
            writeln!(out, "export {uname}={id}")
        } else {
            let node_type = entry.node_type.as_deref().unwrap_or(MISSING);
            writeln!(out, "{node_type} node: {uname} ({id})")
        };
    }
    if entries.is_empty() {
        out.push_str("NO nodes configured\n");
    }
    Ok(out)
}

/// Status line of a ping reply.
pub fn status_line(reply: &AdminReply) -> String {
    format!(
        "Status of {}@{}: {} ({})",
        reply.ping_system().unwrap_or(MISSING),
        reply.host_from.as_deref().unwrap_or(MISSING),
        reply.ping_state().unwrap_or(MISSING),
        reply.ping_status().unwrap_or(MISSING),
    )
}

/// Designated controller line of a ping reply.
pub fn dc_line(reply: &AdminReply) -> String {
    format!(
        "Designated Controller is: {}",
        reply.host_from.as_deref().unwrap_or(MISSING)
    )
}

/// Prints controller replies for a command.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplyPrinter {
    /// Also write the bare answer to stderr.
    pub quiet: bool,
}

impl ReplyPrinter {
    /// Prints one counted reply.
    pub fn print(&self, command: &AdminCommand, reply: &AdminReply) {
        let (line, essential) = match command {
            AdminCommand::Status { .. } => (status_line(reply), reply.ping_state()),
            AdminCommand::WhoIsDc => (dc_line(reply), reply.host_from.as_deref()),
            _ => return,
        };
        println!("{line}");
        if self.quiet {
            if let Some(essential) = essential {
                eprintln!("{essential}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clustermon_testkit::{document_with_nodes, ping_reply, sample_document, version};

    #[test]
    fn nodes_text() {
        let doc = document_with_nodes(version(0, 1, 0), &[("1", "alpha"), ("2", "beta")]);
        let entries = node_entries(&doc);
        assert_eq!(entries.len(), 2);
        assert_eq!(
            render_nodes(&entries, false, Format::Text).unwrap(),
            "member node: alpha (1)\nmember node: beta (2)\n"
        );
    }

    #[test]
    fn nodes_bash_export() {
        let doc = document_with_nodes(version(0, 1, 0), &[("1", "alpha")]);
        assert_eq!(
            render_nodes(&node_entries(&doc), true, Format::Text).unwrap(),
            "export alpha=1\n"
        );
    }

    #[test]
    fn nodes_json() {
        let doc = document_with_nodes(version(0, 1, 0), &[("1", "alpha")]);
        let json = render_nodes(&node_entries(&doc), false, Format::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["uname"], "alpha");
        assert_eq!(value[0]["type"], "member");
    }

    #[test]
    fn no_nodes() {
        let entries = node_entries(&sample_document(version(0, 1, 0)));
        assert!(entries.is_empty());
        assert_eq!(
            render_nodes(&entries, false, Format::Text).unwrap(),
            "NO nodes configured\n"
        );
    }

    #[test]
    fn reply_lines() {
        let reply = ping_reply("ping-1", "alpha", "S_IDLE");
        assert_eq!(status_line(&reply), "Status of crmd@alpha: S_IDLE (ok)");
        assert_eq!(dc_line(&reply), "Designated Controller is: alpha");

        let bare = AdminReply::response("ping-1");
        assert_eq!(
            status_line(&bare),
            "Status of (null)@(null): (null) ((null))"
        );
    }
}
