//! Folder item-count audit.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use filenest_core::config::AppConfig;
use filenest_core::error::AppError;
use filenest_database::CountMismatch;

use crate::output::{self, OutputFormat};

/// Arguments for `fsck`
#[derive(Debug, Args)]
pub struct FsckArgs {
    /// Rewrite wrong counters from the real child counts
    #[arg(long)]
    pub repair: bool,
}

/// One audit row
#[derive(Debug, Serialize, Tabled)]
struct MismatchRow {
    /// Folder ID
    folder_id: String,
    /// Name
    name: String,
    /// Stored item count
    cached: i32,
    /// Real number of immediate children
    actual: i64,
}

impl From<CountMismatch> for MismatchRow {
    fn from(m: CountMismatch) -> Self {
        Self {
            folder_id: m.folder_id.to_string(),
            name: m.name,
            cached: m.cached,
            actual: m.actual,
        }
    }
}

pub async fn execute(
    args: &FsckArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let service = super::build_service(config).await?;
    let mismatches = if args.repair {
        service.repair_counts().await?
    } else {
        service.verify_counts().await?
    };

    let count = mismatches.len();
    let rows: Vec<MismatchRow> = mismatches.into_iter().map(MismatchRow::from).collect();
    output::print_list(&rows, format, "All folder item counts are consistent.");

    if count > 0 && format == OutputFormat::Table {
        if args.repair {
            output::print_success(&format!("Repaired {count} folder counts."));
        } else {
            output::print_warning(&format!(
                "{count} folder counts are wrong; run with --repair to fix them."
            ));
        }
    }
    Ok(())
}
