//! Folder entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use filenest_core::types::FolderId;

/// A folder in the file hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Folder {
    /// Unique folder identifier.
    pub id: FolderId,
    /// Folder name.
    pub name: String,
    /// Number of immediate children (files and folders). Never negative.
    pub items: i32,
    /// When the folder was last modified.
    pub modified: DateTime<Utc>,
    /// Parent folder ID (null for root-level folders).
    pub parent_id: Option<FolderId>,
}

impl Folder {
    /// Check if this is a root-level folder (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Check if the folder has no children.
    pub fn is_empty(&self) -> bool {
        self.items == 0
    }
}

/// Data required to create a new folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFolder {
    /// Folder name.
    pub name: String,
    /// Parent folder (None for root level).
    pub parent_id: Option<FolderId>,
}

impl NewFolder {
    /// Build the row to insert: fresh id, no children yet.
    pub fn into_folder(self, modified: DateTime<Utc>) -> Folder {
        Folder {
            id: FolderId::new(),
            name: self.name,
            items: 0,
            modified,
            parent_id: self.parent_id,
        }
    }
}
