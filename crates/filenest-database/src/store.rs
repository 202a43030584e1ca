//! The storage seam for the folder tree.

use std::fmt::Debug;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::FromRow;

use filenest_core::result::AppResult;
use filenest_core::types::{FileId, FolderId};
use filenest_entity::{File, Folder};

use crate::plan::{CommitOutcome, MutationPlan};

/// One edge of the parent relation found by a downward walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct FolderLink {
    pub id: FolderId,
    pub parent_id: FolderId,
    /// Distance from the starting folder (children are at depth 1).
    pub depth: i32,
}

/// A folder whose cached `items` disagrees with its real child count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct CountMismatch {
    pub folder_id: FolderId,
    pub name: String,
    pub cached: i32,
    pub actual: i64,
}

/// Owner of the folder and file tables.
///
/// Reads return plain rows. Walks are bounded by the caller-supplied
/// `limit` and return raw results without judging them; the query engine
/// in the service layer decides whether a walk revealed corruption. The only
/// write path is [`commit`](Self::commit).
#[async_trait]
pub trait TreeStore: Send + Sync + Debug + 'static {
    async fn find_folder(&self, id: FolderId) -> AppResult<Option<Folder>>;

    async fn find_file(&self, id: FileId) -> AppResult<Option<File>>;

    /// Folders whose parent is `parent` (`None` = root level), sorted by name.
    async fn child_folders(&self, parent: Option<FolderId>) -> AppResult<Vec<Folder>>;

    /// Files whose parent is `parent` (`None` = root level), sorted by name.
    async fn child_files(&self, parent: Option<FolderId>) -> AppResult<Vec<File>>;

    /// Follow `parent_id` upward starting with the folder itself.
    ///
    /// Returns at most `limit` rows, nearest first. A corrupted cycle shows
    /// up as repeated rows rather than an endless walk.
    async fn ancestor_rows(&self, id: FolderId, limit: u32) -> AppResult<Vec<Folder>>;

    /// Breadth-first links below `id`, down to depth `limit`.
    async fn descendant_links(&self, id: FolderId, limit: u32) -> AppResult<Vec<FolderLink>>;

    /// Apply the row operation and every counter delta of `plan` atomically.
    ///
    /// Fails with `NotFound` when a referenced parent is missing, `Conflict`
    /// when the row no longer matches what the plan observed, and
    /// `IntegrityViolation` when a counter would go negative or a folder
    /// would become its own ancestor. Nothing is applied on failure.
    async fn commit(&self, plan: MutationPlan) -> AppResult<CommitOutcome>;

    /// Every folder whose cached count differs from its real child count.
    async fn count_mismatches(&self) -> AppResult<Vec<CountMismatch>>;

    /// Rewrite mismatched counters from real child counts, returning what
    /// was fixed.
    async fn repair_counts(&self) -> AppResult<Vec<CountMismatch>>;

    /// Whether both tables are empty.
    async fn is_empty(&self) -> AppResult<bool>;
}
