//! Ancestor and descendant queries over the parent relation.
//!
//! The store performs each walk as one bounded bulk query; this module
//! checks what came back. A repeated folder, a broken parent link, or a walk
//! deeper than the configured bound means the parent relation is corrupted
//! and is reported as an integrity violation instead of being repaired.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use filenest_core::error::AppError;
use filenest_core::result::AppResult;
use filenest_core::types::FolderId;
use filenest_database::TreeStore;
use filenest_entity::Folder;

/// Read-only traversals of the folder tree.
#[derive(Debug, Clone)]
pub struct TreeQuery {
    store: Arc<dyn TreeStore>,
    max_depth: u32,
}

impl TreeQuery {
    pub fn new(store: Arc<dyn TreeStore>, max_depth: u32) -> Self {
        Self { store, max_depth }
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// The folder and its ancestors, root first (breadcrumbs).
    ///
    /// `None` (the root level) and unknown folders yield an empty chain.
    pub async fn ancestor_chain(&self, folder_id: Option<FolderId>) -> AppResult<Vec<Folder>> {
        let Some(start) = folder_id else {
            return Ok(Vec::new());
        };

        let rows = self
            .store
            .ancestor_rows(start, self.max_depth.saturating_add(1))
            .await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::with_capacity(rows.len());
        let mut expected = Some(start);
        for row in &rows {
            if expected != Some(row.id) {
                return Err(AppError::integrity(format!(
                    "Ancestor walk from folder {start} left the parent chain at {}",
                    row.id
                )));
            }
            if !seen.insert(row.id) {
                return Err(AppError::integrity(format!(
                    "Folder {} is its own ancestor",
                    row.id
                )));
            }
            expected = row.parent_id;
        }

        if let Some(dangling) = expected {
            return Err(if rows.len() > self.max_depth as usize {
                AppError::integrity(format!(
                    "Folder {start} is nested deeper than {} levels",
                    self.max_depth
                ))
            } else {
                AppError::integrity(format!(
                    "Folder {} references missing parent {dangling}",
                    rows[rows.len() - 1].id
                ))
            });
        }

        debug!(folder_id = %start, depth = rows.len(), "Resolved ancestor chain");
        let mut chain = rows;
        chain.reverse();
        Ok(chain)
    }

    /// Every folder below `folder_id`, excluding itself, shallowest first.
    ///
    /// Unknown folders yield an empty set.
    pub async fn descendant_folder_ids(&self, folder_id: FolderId) -> AppResult<Vec<FolderId>> {
        let links = self
            .store
            .descendant_links(folder_id, self.max_depth.saturating_add(1))
            .await?;

        let mut seen = HashSet::with_capacity(links.len());
        let mut ids = Vec::with_capacity(links.len());
        for link in links {
            if link.id == folder_id || !seen.insert(link.id) {
                return Err(AppError::integrity(format!(
                    "Folder {} is reachable from itself",
                    link.id
                )));
            }
            if link.depth > i32::try_from(self.max_depth).unwrap_or(i32::MAX) {
                return Err(AppError::integrity(format!(
                    "Subtree of folder {folder_id} is deeper than {} levels",
                    self.max_depth
                )));
            }
            ids.push(link.id);
        }

        debug!(folder_id = %folder_id, descendants = ids.len(), "Resolved descendant folders");
        Ok(ids)
    }

    /// Check that `folder_id` may be re-parented under `target`.
    ///
    /// Fails with `NotFound` when the target does not exist and with
    /// `IntegrityViolation` when it is the folder itself or lies inside it.
    pub async fn ensure_move_target(
        &self,
        folder_id: FolderId,
        target: Option<FolderId>,
    ) -> AppResult<()> {
        let Some(target_id) = target else {
            return Ok(());
        };
        if target_id == folder_id {
            return Err(AppError::integrity(format!(
                "Cannot move folder {folder_id} into itself"
            )));
        }

        let chain = self.ancestor_chain(Some(target_id)).await?;
        if chain.is_empty() {
            return Err(AppError::not_found(format!("Folder {target_id} not found")));
        }
        if chain.iter().any(|f| f.id == folder_id) {
            return Err(AppError::integrity(format!(
                "Cannot move folder {folder_id} into its own descendant {target_id}"
            )));
        }
        Ok(())
    }
}
