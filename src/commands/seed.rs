//! Sample data command.

use filenest_core::config::AppConfig;
use filenest_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Seed an empty tree with sample content.
pub async fn execute(config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let service = super::build_service(config).await?;
    let report = service.seed().await?;

    if report.skipped {
        output::print_warning("Tree is not empty, nothing seeded.");
        return Ok(());
    }
    output::print_result(
        &report,
        format,
        &format!(
            "Seeded {} folders and {} files.",
            report.folders, report.files
        ),
    );
    Ok(())
}
