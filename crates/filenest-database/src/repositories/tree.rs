//! [`TreeStore`] over PostgreSQL.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use filenest_core::error::{AppError, ErrorKind};
use filenest_core::result::AppResult;
use filenest_core::types::{FileId, FolderId, NodeRef};
use filenest_entity::{File, Folder};

use super::{FileRepository, FolderRepository};
use crate::plan::{CommitOutcome, CountDelta, MutationPlan, RowOp};
use crate::store::{CountMismatch, FolderLink, TreeStore};

/// Name of the check constraint keeping `folders.items` non-negative.
const ITEMS_NON_NEGATIVE: &str = "folders_items_non_negative";

/// Advisory lock key serialising folder re-parenting, so two concurrent
/// moves cannot each pass the cycle check and together close a loop.
const FOLDER_MOVE_LOCK: i64 = 0x0066_6e5f_6d6f_7665;

/// PostgreSQL-backed tree store.
#[derive(Debug, Clone)]
pub struct PgTreeStore {
    pool: PgPool,
    folders: FolderRepository,
    files: FileRepository,
    /// Bound on every recursive walk issued inside a commit.
    max_depth: i32,
}

impl PgTreeStore {
    pub fn new(pool: PgPool, max_depth: u32) -> Self {
        Self {
            folders: FolderRepository::new(pool.clone()),
            files: FileRepository::new(pool.clone()),
            pool,
            max_depth: i32::try_from(max_depth).unwrap_or(i32::MAX),
        }
    }
}

#[async_trait]
impl TreeStore for PgTreeStore {
    async fn find_folder(&self, id: FolderId) -> AppResult<Option<Folder>> {
        self.folders.find_by_id(id).await
    }

    async fn find_file(&self, id: FileId) -> AppResult<Option<File>> {
        self.files.find_by_id(id).await
    }

    async fn child_folders(&self, parent: Option<FolderId>) -> AppResult<Vec<Folder>> {
        self.folders.find_children(parent).await
    }

    async fn child_files(&self, parent: Option<FolderId>) -> AppResult<Vec<File>> {
        self.files.find_children(parent).await
    }

    async fn ancestor_rows(&self, id: FolderId, limit: u32) -> AppResult<Vec<Folder>> {
        self.folders
            .find_ancestors(id, i32::try_from(limit).unwrap_or(i32::MAX))
            .await
    }

    async fn descendant_links(&self, id: FolderId, limit: u32) -> AppResult<Vec<FolderLink>> {
        self.folders
            .find_descendant_links(id, i32::try_from(limit).unwrap_or(i32::MAX))
            .await
    }

    async fn commit(&self, plan: MutationPlan) -> AppResult<CommitOutcome> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let outcome = match &plan.op {
            RowOp::InsertFolder(folder) => {
                insert_folder(&mut tx, folder).await?;
                CommitOutcome::default()
            }
            RowOp::InsertFile(file) => {
                insert_file(&mut tx, file).await?;
                CommitOutcome::default()
            }
            RowOp::Rename { node, name } => {
                rename(&mut tx, *node, name, &plan).await?;
                CommitOutcome::default()
            }
            RowOp::Move { node, from, to } => {
                if let (NodeRef::Folder(id), Some(target)) = (node, to) {
                    guard_folder_move(&mut tx, *id, *target, self.max_depth).await?;
                }
                reparent(&mut tx, *node, *from, *to, &plan).await?;
                CommitOutcome::default()
            }
            RowOp::DeleteFile { id, parent } => delete_file(&mut tx, *id, *parent).await?,
            RowOp::DeleteFolder { id, parent } => {
                delete_folder(&mut tx, *id, *parent, self.max_depth).await?
            }
        };

        for delta in plan.deltas() {
            apply_delta(&mut tx, delta).await?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e)
        })?;

        debug!(node = %plan.op.node(), deltas = plan.deltas().len(), "Tree mutation committed");
        Ok(outcome)
    }

    async fn count_mismatches(&self) -> AppResult<Vec<CountMismatch>> {
        self.folders.find_count_mismatches().await
    }

    async fn repair_counts(&self) -> AppResult<Vec<CountMismatch>> {
        self.folders.repair_counts().await
    }

    async fn is_empty(&self) -> AppResult<bool> {
        Ok(self.folders.count().await? == 0 && self.files.count().await? == 0)
    }
}

/// Map a write failure, turning known constraint violations into domain errors.
fn write_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| match e {
        sqlx::Error::Database(ref db_err) if db_err.constraint() == Some(ITEMS_NON_NEGATIVE) => {
            AppError::integrity(format!("{context}: folder item count would become negative"))
        }
        sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
            AppError::not_found(format!("{context}: parent folder does not exist"))
        }
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::conflict(format!("{context}: row already exists"))
        }
        _ => AppError::with_source(ErrorKind::Database, context, e),
    }
}

fn vanished(node: NodeRef) -> AppError {
    AppError::conflict(format!("{node} changed or was removed concurrently"))
}

async fn insert_folder(conn: &mut PgConnection, folder: &Folder) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO folders (id, name, items, modified, parent_id) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(folder.id)
    .bind(&folder.name)
    .bind(folder.items)
    .bind(folder.modified)
    .bind(folder.parent_id)
    .execute(&mut *conn)
    .await
    .map_err(write_error("Failed to insert folder"))?;
    Ok(())
}

async fn insert_file(conn: &mut PgConnection, file: &File) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO files (id, name, file_type, size, modified, parent_id, url) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(file.id)
    .bind(&file.name)
    .bind(file.file_type)
    .bind(&file.size)
    .bind(file.modified)
    .bind(file.parent_id)
    .bind(&file.url)
    .execute(&mut *conn)
    .await
    .map_err(write_error("Failed to insert file"))?;
    Ok(())
}

async fn rename(
    conn: &mut PgConnection,
    node: NodeRef,
    name: &str,
    plan: &MutationPlan,
) -> AppResult<()> {
    let (sql, id): (&str, Uuid) = match node {
        NodeRef::Folder(id) => (
            "UPDATE folders SET name = $2, modified = $3 WHERE id = $1",
            id.into_uuid(),
        ),
        NodeRef::File(id) => (
            "UPDATE files SET name = $2, modified = $3 WHERE id = $1",
            id.into_uuid(),
        ),
    };
    let result = sqlx::query(sql)
        .bind(id)
        .bind(name)
        .bind(plan.at)
        .execute(&mut *conn)
        .await
        .map_err(write_error("Failed to rename node"))?;
    if result.rows_affected() == 0 {
        return Err(vanished(node));
    }
    Ok(())
}

/// Reject a folder move whose target lies inside the moved folder.
async fn guard_folder_move(
    conn: &mut PgConnection,
    id: FolderId,
    target: FolderId,
    max_depth: i32,
) -> AppResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(FOLDER_MOVE_LOCK)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to take move lock", e))?;

    let inside: bool = sqlx::query_scalar(
        "WITH RECURSIVE chain AS ( \
            SELECT id, parent_id, 1 AS depth FROM folders WHERE id = $1 \
            UNION ALL \
            SELECT f.id, f.parent_id, c.depth + 1 \
            FROM folders f INNER JOIN chain c ON f.id = c.parent_id \
            WHERE c.depth <= $3 \
         ) SELECT EXISTS (SELECT 1 FROM chain WHERE id = $2)",
    )
    .bind(target)
    .bind(id)
    .bind(max_depth)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to check move target", e))?;

    if inside {
        return Err(AppError::integrity(format!(
            "Cannot move folder {id} into itself or one of its descendants"
        )));
    }
    Ok(())
}

async fn reparent(
    conn: &mut PgConnection,
    node: NodeRef,
    from: Option<FolderId>,
    to: Option<FolderId>,
    plan: &MutationPlan,
) -> AppResult<()> {
    let (sql, id): (&str, Uuid) = match node {
        NodeRef::Folder(id) => (
            "UPDATE folders SET parent_id = $3, modified = $4 \
             WHERE id = $1 AND parent_id IS NOT DISTINCT FROM $2",
            id.into_uuid(),
        ),
        NodeRef::File(id) => (
            "UPDATE files SET parent_id = $3, modified = $4 \
             WHERE id = $1 AND parent_id IS NOT DISTINCT FROM $2",
            id.into_uuid(),
        ),
    };
    let result = sqlx::query(sql)
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(plan.at)
        .execute(&mut *conn)
        .await
        .map_err(write_error("Failed to move node"))?;
    if result.rows_affected() == 0 {
        return Err(vanished(node));
    }
    Ok(())
}

async fn delete_file(
    conn: &mut PgConnection,
    id: FileId,
    parent: Option<FolderId>,
) -> AppResult<CommitOutcome> {
    let url: Option<String> = sqlx::query_scalar(
        "DELETE FROM files WHERE id = $1 AND parent_id IS NOT DISTINCT FROM $2 RETURNING url",
    )
    .bind(id)
    .bind(parent)
    .fetch_optional(&mut *conn)
    .await
    .map_err(write_error("Failed to delete file"))?;

    let url = url.ok_or_else(|| vanished(NodeRef::File(id)))?;
    Ok(CommitOutcome {
        removed_folders: Vec::new(),
        removed_files: vec![id],
        orphaned_blobs: vec![url],
    })
}

/// Delete a folder, every folder below it, and every file inside any of them.
async fn delete_folder(
    conn: &mut PgConnection,
    id: FolderId,
    parent: Option<FolderId>,
    max_depth: i32,
) -> AppResult<CommitOutcome> {
    let current: Option<(Option<FolderId>,)> =
        sqlx::query_as("SELECT parent_id FROM folders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(write_error("Failed to lock folder"))?;
    match current {
        Some((observed,)) if observed == parent => {}
        _ => return Err(vanished(NodeRef::Folder(id))),
    }

    // Walks one level past the bound: a row there means the subtree is too
    // deep or loops, and the cascade would drop files we never saw.
    let subtree: Vec<(FolderId, i32)> = sqlx::query_as(
        "WITH RECURSIVE subtree AS ( \
            SELECT id, 0 AS depth FROM folders WHERE id = $1 \
            UNION ALL \
            SELECT f.id, s.depth + 1 \
            FROM folders f INNER JOIN subtree s ON f.parent_id = s.id \
            WHERE s.depth <= $2 \
         ) SELECT id, MAX(depth) FROM subtree GROUP BY id ORDER BY MIN(depth), id",
    )
    .bind(id)
    .bind(max_depth)
    .fetch_all(&mut *conn)
    .await
    .map_err(write_error("Failed to collect subtree"))?;

    if subtree.iter().any(|(_, depth)| *depth > max_depth) {
        return Err(AppError::integrity(format!(
            "Subtree of folder {id} is deeper than {max_depth} levels"
        )));
    }

    let mut removed_folders = vec![id];
    removed_folders.extend(subtree.into_iter().map(|(f, _)| f).filter(|f| *f != id));
    let ids: Vec<Uuid> = removed_folders.iter().map(|f| f.into_uuid()).collect();

    let files: Vec<(FileId, String)> =
        sqlx::query_as("DELETE FROM files WHERE parent_id = ANY($1) RETURNING id, url")
            .bind(&ids)
            .fetch_all(&mut *conn)
            .await
            .map_err(write_error("Failed to delete files in subtree"))?;

    sqlx::query("DELETE FROM folders WHERE id = ANY($1)")
        .bind(&ids)
        .execute(&mut *conn)
        .await
        .map_err(write_error("Failed to delete folders in subtree"))?;

    let (removed_files, orphaned_blobs) = files.into_iter().unzip();
    Ok(CommitOutcome {
        removed_folders,
        removed_files,
        orphaned_blobs,
    })
}

/// Atomic in-place increment; the check constraint rejects negative results.
async fn apply_delta(conn: &mut PgConnection, delta: &CountDelta) -> AppResult<()> {
    let result = sqlx::query("UPDATE folders SET items = items + $2 WHERE id = $1")
        .bind(delta.folder_id)
        .bind(delta.delta)
        .execute(&mut *conn)
        .await
        .map_err(write_error("Failed to update folder item count"))?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found(format!(
            "Folder {} not found",
            delta.folder_id
        )));
    }
    Ok(())
}
