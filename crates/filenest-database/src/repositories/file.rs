//! File reads.

use sqlx::PgPool;

use filenest_core::error::{AppError, ErrorKind};
use filenest_core::result::AppResult;
use filenest_core::types::{FileId, FolderId};
use filenest_entity::File;

const FILE_COLUMNS: &str = "id, name, file_type, size, modified, parent_id, url";

/// Read access to the `files` table.
#[derive(Debug, Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a file by ID.
    pub async fn find_by_id(&self, id: FileId) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>(&format!("SELECT {FILE_COLUMNS} FROM files WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file", e))
    }

    /// Files directly inside `parent`, sorted by name.
    pub async fn find_children(&self, parent: Option<FolderId>) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(&format!(
            "SELECT {FILE_COLUMNS} FROM files \
             WHERE parent_id IS NOT DISTINCT FROM $1 ORDER BY name ASC, id ASC"
        ))
        .bind(parent)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list files", e))
    }

    pub async fn count(&self) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count files", e))?;
        Ok(count as u64)
    }
}
