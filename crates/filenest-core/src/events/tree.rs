//! Folder-tree domain events.

use serde::{Deserialize, Serialize};

use crate::types::{FolderId, NodeRef};

/// Events related to folder-tree mutations.
///
/// Parent ids are `None` for the root level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TreeEvent {
    /// A file or folder was created.
    Created {
        /// The new node.
        node: NodeRef,
        /// The folder it was created in.
        parent_id: Option<FolderId>,
    },
    /// A node was renamed.
    Renamed {
        /// The renamed node.
        node: NodeRef,
        /// The folder containing it.
        parent_id: Option<FolderId>,
        /// The new name.
        name: String,
    },
    /// A node moved to another folder.
    Moved {
        /// The moved node.
        node: NodeRef,
        /// The source folder.
        from_parent_id: Option<FolderId>,
        /// The destination folder.
        to_parent_id: Option<FolderId>,
    },
    /// A node and, for folders, its whole subtree were deleted.
    Deleted {
        /// The deleted node.
        node: NodeRef,
        /// The folder it was in.
        parent_id: Option<FolderId>,
        /// Folders removed, the node itself first when it is a folder.
        removed_folders: Vec<FolderId>,
        /// File rows removed.
        removed_files: u64,
    },
    /// Cached child counts were rewritten from the real row counts.
    CountsRepaired {
        /// Folders whose listings show a repaired counter.
        parent_ids: Vec<Option<FolderId>>,
    },
}

impl TreeEvent {
    /// Folder listings whose contents changed because of this event.
    ///
    /// A renamed, moved or deleted folder also appears here itself, since a
    /// view opened on it shows its name in the breadcrumbs.
    pub fn touched_listings(&self) -> Vec<Option<FolderId>> {
        let mut touched = match self {
            Self::Created { parent_id, .. } => vec![*parent_id],
            Self::Renamed { parent_id, .. } => vec![*parent_id],
            Self::Moved {
                from_parent_id,
                to_parent_id,
                ..
            } => vec![*from_parent_id, *to_parent_id],
            Self::Deleted {
                parent_id,
                removed_folders,
                ..
            } => std::iter::once(*parent_id)
                .chain(removed_folders.iter().copied().map(Some))
                .collect(),
            Self::CountsRepaired { parent_ids } => parent_ids.clone(),
        };

        if let Some(folder) = self.node().and_then(|n| n.as_folder()) {
            if !matches!(self, Self::Created { .. }) && !touched.contains(&Some(folder)) {
                touched.push(Some(folder));
            }
        }

        touched.dedup();
        touched
    }

    /// Whether a listing of `folder` (`None` = root) is stale after this event.
    pub fn touches(&self, folder: Option<FolderId>) -> bool {
        self.touched_listings().contains(&folder)
    }

    /// The node this event is about, if it concerns a single node.
    pub fn node(&self) -> Option<NodeRef> {
        match self {
            Self::Created { node, .. }
            | Self::Renamed { node, .. }
            | Self::Moved { node, .. }
            | Self::Deleted { node, .. } => Some(*node),
            Self::CountsRepaired { .. } => None,
        }
    }
}
