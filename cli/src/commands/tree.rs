use super::open_directory;
use crate::output::emit_structured;
use anyhow::Result;
use colored::*;
use directory::NodeKind;
use reconciler::{ReconcilePolicy, ReconcileSession};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct TreeEntry<'a> {
    id: &'a str,
    name: &'a str,
    kind: NodeKind,
    depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<&'a str>,
    /// Slash-separated names from the root down to this node
    path: String,
}

/// Print the org hierarchy held by a snapshot
pub async fn execute(path: &Path, format: &str) -> Result<()> {
    let directory = open_directory(path)?;
    let session = ReconcileSession::new(directory, ReconcilePolicy::default());
    let tree = session.org_tree().await?;

    let entries: Vec<TreeEntry<'_>> = tree
        .walk()
        .into_iter()
        .map(|(depth, node)| TreeEntry {
            id: &node.id,
            name: &node.name,
            kind: node.kind,
            depth,
            parent_id: tree.parent_of(node).map(|p| p.id.as_str()),
            path: tree
                .ancestors_of(node)
                .into_iter()
                .rev()
                .chain(std::iter::once(node))
                .map(|n| n.name.as_str())
                .collect::<Vec<_>>()
                .join("/"),
        })
        .collect();

    if emit_structured(&entries, format)? {
        return Ok(());
    }

    for entry in &entries {
        let indent = "  ".repeat(entry.depth);
        let label = match entry.kind {
            NodeKind::Root => entry.name.bold(),
            NodeKind::Ou => format!("{}/", entry.name).cyan(),
            NodeKind::Account => entry.name.normal(),
        };
        println!("{}{} {}", indent, label, format!("[{}]", entry.id).dimmed());
    }
    println!();
    println!(
        "{}",
        format!("{} nodes, {} active accounts", tree.len(), tree.accounts().len()).green()
    );
    Ok(())
}
