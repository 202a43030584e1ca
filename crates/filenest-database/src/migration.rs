//! Database migration runner.

use sqlx::PgPool;
use tracing::info;

use filenest_core::error::{AppError, ErrorKind};

/// Apply every pending migration under `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    info!("Applying folder tree migrations");

    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to apply migrations: {e}"),
                e,
            )
        })?;

    info!("Folder tree schema is up to date");
    Ok(())
}
