//! Mutation plans: one row operation plus the counter deltas that must land
//! with it in the same transaction.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use filenest_core::types::{FileId, FolderId, NodeRef};
use filenest_entity::{File, Folder};

/// Signed change to one folder's `items` counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountDelta {
    pub folder_id: FolderId,
    pub delta: i32,
}

/// The row-level part of a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOp {
    /// Insert a new folder row.
    InsertFolder(Folder),
    /// Insert a new file row.
    InsertFile(File),
    /// Change a node's name.
    Rename { node: NodeRef, name: String },
    /// Re-parent a node. `from` is the parent observed while planning; the
    /// commit fails with a conflict if the row no longer has it.
    Move {
        node: NodeRef,
        from: Option<FolderId>,
        to: Option<FolderId>,
    },
    /// Remove a file row. `parent` is the parent observed while planning.
    DeleteFile { id: FileId, parent: Option<FolderId> },
    /// Remove a folder row with its whole subtree of folders and files.
    DeleteFolder { id: FolderId, parent: Option<FolderId> },
}

impl RowOp {
    /// The node this operation writes.
    pub fn node(&self) -> NodeRef {
        match self {
            Self::InsertFolder(folder) => NodeRef::Folder(folder.id),
            Self::InsertFile(file) => NodeRef::File(file.id),
            Self::Rename { node, .. } | Self::Move { node, .. } => *node,
            Self::DeleteFile { id, .. } => NodeRef::File(*id),
            Self::DeleteFolder { id, .. } => NodeRef::Folder(*id),
        }
    }
}

/// A row operation and its counter deltas, applied atomically by
/// [`TreeStore::commit`](crate::store::TreeStore::commit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationPlan {
    pub op: RowOp,
    /// Merged per folder, without zero entries, sorted by folder id.
    deltas: Vec<CountDelta>,
    /// Timestamp written to `modified` on touched rows.
    pub at: DateTime<Utc>,
}

impl MutationPlan {
    pub fn new(op: RowOp, deltas: impl IntoIterator<Item = CountDelta>, at: DateTime<Utc>) -> Self {
        Self {
            op,
            deltas: normalize(deltas),
            at,
        }
    }

    /// Counter deltas in lock order.
    pub fn deltas(&self) -> &[CountDelta] {
        &self.deltas
    }

    /// Net delta for one folder (zero when untouched).
    pub fn delta_for(&self, folder_id: FolderId) -> i32 {
        self.deltas
            .iter()
            .find(|d| d.folder_id == folder_id)
            .map_or(0, |d| d.delta)
    }
}

/// What a commit removed, so the caller can clean up blobs and publish
/// events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitOutcome {
    pub removed_folders: Vec<FolderId>,
    pub removed_files: Vec<FileId>,
    /// Blob URLs of every removed file.
    pub orphaned_blobs: Vec<String>,
}

fn normalize(deltas: impl IntoIterator<Item = CountDelta>) -> Vec<CountDelta> {
    let mut merged: BTreeMap<FolderId, i32> = BTreeMap::new();
    for d in deltas {
        *merged.entry(d.folder_id).or_default() += d.delta;
    }
    merged
        .into_iter()
        .filter(|(_, delta)| *delta != 0)
        .map(|(folder_id, delta)| CountDelta { folder_id, delta })
        .collect()
}
