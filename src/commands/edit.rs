//! Commands that change the tree.

use std::path::PathBuf;

use bytes::Bytes;
use clap::Args;

use filenest_core::config::AppConfig;
use filenest_core::error::{AppError, ErrorKind};
use filenest_core::types::{FolderId, NodeRef};

use crate::output::{self, OutputFormat};

/// Arguments for `mkdir`
#[derive(Debug, Args)]
pub struct MkdirArgs {
    /// Folder name
    pub name: String,
    /// Parent folder (omit for the root level)
    #[arg(short, long)]
    pub parent: Option<FolderId>,
}

/// Arguments for `upload`
#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Local file to upload
    pub path: PathBuf,
    /// Destination folder (omit for the root level)
    #[arg(short, long)]
    pub parent: Option<FolderId>,
    /// Name to store the file under (defaults to the local file name)
    #[arg(short, long)]
    pub name: Option<String>,
}

/// Arguments for `rename`
#[derive(Debug, Args)]
pub struct RenameArgs {
    /// Node to rename, as `folder:<id>` or `file:<id>`
    pub node: NodeRef,
    /// New name
    pub name: String,
}

/// Arguments for `mv`
#[derive(Debug, Args)]
pub struct MoveArgs {
    /// Node to move, as `folder:<id>` or `file:<id>`
    pub node: NodeRef,
    /// Destination folder (omit for the root level)
    #[arg(short, long)]
    pub to: Option<FolderId>,
}

/// Arguments for `rm`
#[derive(Debug, Args)]
pub struct RemoveArgs {
    /// Node to delete, as `folder:<id>` or `file:<id>`
    pub node: NodeRef,
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

pub async fn mkdir(
    args: &MkdirArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let service = super::build_service(config).await?;
    let folder = service.create_folder(&args.name, args.parent).await?;
    output::print_result(
        &folder,
        format,
        &format!("Created folder '{}' ({})", folder.name, folder.id),
    );
    Ok(())
}

pub async fn upload(
    args: &UploadArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let name = match &args.name {
        Some(name) => name.clone(),
        None => args
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                AppError::validation(format!("'{}' has no file name", args.path.display()))
            })?,
    };
    let data = tokio::fs::read(&args.path).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to read {}", args.path.display()),
            e,
        )
    })?;

    let service = super::build_service(config).await?;
    let file = service
        .upload_file(&name, Bytes::from(data), args.parent)
        .await?;
    output::print_result(
        &file,
        format,
        &format!("Uploaded '{}' ({}, {})", file.name, file.size, file.id),
    );
    Ok(())
}

pub async fn rename(
    args: &RenameArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let service = super::build_service(config).await?;
    service.rename_node(args.node, &args.name).await?;
    let node = service.get_node(args.node).await?;
    output::print_result(&node, format, &format!("Renamed {} to '{}'", args.node, node.name()));
    Ok(())
}

pub async fn mv(args: &MoveArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let service = super::build_service(config).await?;
    service.move_node(args.node, args.to).await?;
    let node = service.get_node(args.node).await?;
    let destination = args
        .to
        .map_or_else(|| "the root level".to_string(), |id| format!("folder {id}"));
    output::print_result(&node, format, &format!("Moved {} to {destination}", args.node));
    Ok(())
}

pub async fn rm(
    args: &RemoveArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let service = super::build_service(config).await?;
    let node = service.get_node(args.node).await?;

    if !args.yes {
        let prompt = match args.node {
            NodeRef::Folder(_) => format!(
                "Delete folder '{}' and everything inside it? This cannot be undone.",
                node.name()
            ),
            NodeRef::File(_) => format!("Delete file '{}'? This cannot be undone.", node.name()),
        };
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| AppError::internal(format!("Input error: {e}")))?;
        if !confirmed {
            output::print_warning("Aborted.");
            return Ok(());
        }
    }

    let deletion = service.delete_node(args.node).await?;
    output::print_result(
        &deletion,
        format,
        &format!(
            "Deleted '{}' ({} folders, {} files)",
            node.name(),
            deletion.removed_folders.len(),
            deletion.removed_files.len()
        ),
    );
    for url in &deletion.leaked_blobs {
        output::print_warning(&format!("Could not remove blob {url}"));
    }
    Ok(())
}
