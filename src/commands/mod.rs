//! CLI command definitions and dispatch.

pub mod browse;
pub mod edit;
pub mod fsck;
pub mod migrate;
pub mod seed;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use filenest_core::config::AppConfig;
use filenest_core::error::AppError;
use filenest_database::{DatabasePool, PgTreeStore};
use filenest_service::TreeService;

use crate::output::OutputFormat;

/// FileNest: a folder tree whose counters never drift
#[derive(Debug, Parser)]
#[command(name = "filenest", version, about, long_about = None)]
pub struct Cli {
    /// Directory holding default.toml and environment overlays
    #[arg(short, long, default_value = "config")]
    pub config: String,

    /// Environment overlay to apply (config/<env>.toml)
    #[arg(long, env = "FILENEST_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create sample folders and files in an empty tree
    Seed,
    /// List the contents of a folder
    Ls(browse::LsArgs),
    /// Show the breadcrumb trail of a folder
    Crumbs(browse::CrumbsArgs),
    /// Create a folder
    Mkdir(edit::MkdirArgs),
    /// Upload a local file
    Upload(edit::UploadArgs),
    /// Rename a file or folder
    Rename(edit::RenameArgs),
    /// Move a file or folder
    Mv(edit::MoveArgs),
    /// Delete a file, or a folder with everything inside it
    Rm(edit::RemoveArgs),
    /// Check folder item counts against the real number of children
    Fsck(fsck::FsckArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: &AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate => migrate::execute(config).await,
            Commands::Seed => seed::execute(config, self.format).await,
            Commands::Ls(args) => browse::ls(args, config, self.format).await,
            Commands::Crumbs(args) => browse::crumbs(args, config, self.format).await,
            Commands::Mkdir(args) => edit::mkdir(args, config, self.format).await,
            Commands::Upload(args) => edit::upload(args, config, self.format).await,
            Commands::Rename(args) => edit::rename(args, config, self.format).await,
            Commands::Mv(args) => edit::mv(args, config, self.format).await,
            Commands::Rm(args) => edit::rm(args, config, self.format).await,
            Commands::Fsck(args) => fsck::execute(args, config, self.format).await,
        }
    }
}

/// Helper: wire the tree service to PostgreSQL and the configured blob store
pub async fn build_service(config: &AppConfig) -> Result<TreeService, AppError> {
    let pool = DatabasePool::connect(&config.database).await?;
    let store = PgTreeStore::new(pool.into_pool(), config.tree.max_depth);
    let blobs = filenest_storage::build_blob_store(&config.storage).await?;
    Ok(TreeService::new(Arc::new(store), blobs, config.tree.max_depth))
}
