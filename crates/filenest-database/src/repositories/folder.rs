//! Folder reads and tree walks.

use sqlx::PgPool;

use filenest_core::error::{AppError, ErrorKind};
use filenest_core::result::AppResult;
use filenest_core::types::FolderId;
use filenest_entity::Folder;

use crate::store::{CountMismatch, FolderLink};

const FOLDER_COLUMNS: &str = "id, name, items, modified, parent_id";

/// Cached counts next to the real number of immediate children.
const COUNT_AUDIT: &str = "SELECT f.id AS folder_id, f.name, f.items AS cached, \
        (SELECT COUNT(*) FROM folders c WHERE c.parent_id = f.id) \
      + (SELECT COUNT(*) FROM files c WHERE c.parent_id = f.id) AS actual \
     FROM folders f";

/// Read access to the `folders` table.
#[derive(Debug, Clone)]
pub struct FolderRepository {
    pool: PgPool,
}

impl FolderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a folder by ID.
    pub async fn find_by_id(&self, id: FolderId) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find folder", e))
    }

    /// Immediate child folders, sorted by name.
    pub async fn find_children(&self, parent: Option<FolderId>) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders \
             WHERE parent_id IS NOT DISTINCT FROM $1 ORDER BY name ASC, id ASC"
        ))
        .bind(parent)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list child folders", e))
    }

    /// The folder followed by its ancestors, nearest first, at most `limit` rows.
    pub async fn find_ancestors(&self, id: FolderId, limit: i32) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(&format!(
            "WITH RECURSIVE chain AS ( \
                SELECT {FOLDER_COLUMNS}, 1 AS depth FROM folders WHERE id = $1 \
                UNION ALL \
                SELECT f.id, f.name, f.items, f.modified, f.parent_id, c.depth + 1 \
                FROM folders f INNER JOIN chain c ON f.id = c.parent_id \
                WHERE c.depth < $2 \
             ) SELECT {FOLDER_COLUMNS} FROM chain ORDER BY depth ASC"
        ))
        .bind(id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to walk ancestors", e))
    }

    /// Parent links below `id` down to depth `limit`, shallowest first.
    pub async fn find_descendant_links(
        &self,
        id: FolderId,
        limit: i32,
    ) -> AppResult<Vec<FolderLink>> {
        sqlx::query_as::<_, FolderLink>(
            "WITH RECURSIVE below AS ( \
                SELECT id, parent_id, 1 AS depth FROM folders WHERE parent_id = $1 \
                UNION ALL \
                SELECT f.id, f.parent_id, b.depth + 1 \
                FROM folders f INNER JOIN below b ON f.parent_id = b.id \
                WHERE b.depth < $2 \
             ) SELECT id, parent_id, depth FROM below ORDER BY depth ASC, id ASC",
        )
        .bind(id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to walk descendants", e))
    }

    /// Folders whose cached count is wrong.
    pub async fn find_count_mismatches(&self) -> AppResult<Vec<CountMismatch>> {
        sqlx::query_as::<_, CountMismatch>(&format!(
            "SELECT folder_id, name, cached, actual FROM ({COUNT_AUDIT}) audit \
             WHERE cached <> actual ORDER BY folder_id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to audit folder counts", e))
    }

    /// Overwrite every wrong counter with the real child count in one statement.
    pub async fn repair_counts(&self) -> AppResult<Vec<CountMismatch>> {
        sqlx::query_as::<_, CountMismatch>(&format!(
            "UPDATE folders f SET items = audit.actual::INT \
             FROM ({COUNT_AUDIT}) audit \
             WHERE f.id = audit.folder_id AND audit.cached <> audit.actual \
             RETURNING audit.folder_id, audit.name, audit.cached, audit.actual"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to repair folder counts", e))
    }

    pub async fn count(&self) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM folders")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count folders", e))?;
        Ok(count as u64)
    }
}
