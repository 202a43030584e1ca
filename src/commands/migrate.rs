//! Database migration command.

use filenest_core::config::AppConfig;
use filenest_core::error::AppError;
use filenest_database::DatabasePool;

use crate::output;

/// Apply every pending migration.
pub async fn execute(config: &AppConfig) -> Result<(), AppError> {
    let pool = DatabasePool::connect(&config.database).await?;
    filenest_database::migration::run_migrations(pool.pool()).await?;
    pool.close().await;
    output::print_success("All migrations applied.");
    Ok(())
}
