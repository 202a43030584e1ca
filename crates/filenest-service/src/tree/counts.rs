//! Item-count maintenance rules.
//!
//! A folder's `items` counts its immediate children only, files and folders
//! alike. Every mutation therefore touches at most the one or two parents
//! whose set of immediate children changed, by exactly one per node, no
//! matter how large the node's own subtree is. Ancestors further up never
//! change: their immediate children are the same before and after.

use filenest_core::types::FolderId;
use filenest_database::CountDelta;

/// How much one node contributes to its parent's count.
const CHILD_WEIGHT: i32 = 1;

/// The shape of a tree mutation, as far as counters are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeChange {
    /// A file or folder was added under `parent`.
    Create { parent: Option<FolderId> },
    /// A file, or a folder with its whole subtree, was removed from `parent`.
    Delete { parent: Option<FolderId> },
    /// A node changed parent.
    Move {
        from: Option<FolderId>,
        to: Option<FolderId>,
    },
    /// A node changed name.
    Rename,
}

impl TreeChange {
    /// Counter deltas that keep every folder's `items` equal to its number
    /// of immediate children. Root-level parents (`None`) have no counter.
    pub fn deltas(self) -> Vec<CountDelta> {
        let change = |parent: Option<FolderId>, delta: i32| {
            parent.map(|folder_id| CountDelta { folder_id, delta })
        };

        match self {
            Self::Create { parent } => change(parent, CHILD_WEIGHT).into_iter().collect(),
            Self::Delete { parent } => change(parent, -CHILD_WEIGHT).into_iter().collect(),
            Self::Move { from, to } if from == to => Vec::new(),
            Self::Move { from, to } => change(from, -CHILD_WEIGHT)
                .into_iter()
                .chain(change(to, CHILD_WEIGHT))
                .collect(),
            Self::Rename => Vec::new(),
        }
    }
}
