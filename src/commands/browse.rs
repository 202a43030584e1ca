//! Read-only commands: folder listings and breadcrumbs.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use filenest_core::config::AppConfig;
use filenest_core::error::AppError;
use filenest_core::types::FolderId;
use filenest_entity::{Folder, Node};

use crate::output::{self, OutputFormat};

/// Arguments for `ls`
#[derive(Debug, Args)]
pub struct LsArgs {
    /// Folder to list (omit for the root level)
    pub folder: Option<FolderId>,
}

/// Arguments for `crumbs`
#[derive(Debug, Args)]
pub struct CrumbsArgs {
    /// Folder whose trail to show
    pub folder: FolderId,
}

/// One listing row
#[derive(Debug, Serialize, Tabled)]
struct NodeRow {
    /// Kind
    kind: String,
    /// Node ID
    id: String,
    /// Name
    name: String,
    /// Item count for folders, size for files
    contents: String,
    /// Last modification
    modified: String,
}

impl From<Node> for NodeRow {
    fn from(node: Node) -> Self {
        let contents = match &node {
            Node::Folder(f) => format!("{} items", f.items),
            Node::File(f) => format!("{} ({})", f.size, f.file_type),
        };
        Self {
            kind: node.kind().to_string(),
            id: node.node_ref().to_string(),
            name: node.name().to_string(),
            contents,
            modified: node.modified().format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// One breadcrumb row
#[derive(Debug, Serialize, Tabled)]
struct CrumbRow {
    /// Depth below the root level
    depth: usize,
    /// Folder ID
    id: String,
    /// Name
    name: String,
    /// Item count
    items: i32,
}

/// List the immediate children of a folder.
pub async fn ls(args: &LsArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let service = super::build_service(config).await?;
    let listing = service.list_children(args.folder).await?;

    let rows: Vec<NodeRow> = listing.into_nodes().into_iter().map(NodeRow::from).collect();
    output::print_list(&rows, format, "Folder is empty.");
    Ok(())
}

/// Print the root-first trail ending at a folder.
pub async fn crumbs(
    args: &CrumbsArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let service = super::build_service(config).await?;
    let chain = service.ancestor_chain(Some(args.folder)).await?;
    if chain.is_empty() {
        return Err(AppError::not_found(format!("Folder {} not found", args.folder)));
    }

    let rows: Vec<CrumbRow> = chain
        .into_iter()
        .enumerate()
        .map(|(i, f): (usize, Folder)| CrumbRow {
            depth: i + 1,
            id: f.id.to_string(),
            name: f.name,
            items: f.items,
        })
        .collect();
    output::print_list(&rows, format, "No breadcrumbs.");
    Ok(())
}
