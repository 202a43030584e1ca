//! File entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use filenest_core::types::{FileId, FolderId};

use super::kind::FileType;

/// A file stored in FileNest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct File {
    /// Unique file identifier.
    pub id: FileId,
    /// The file name (including extension).
    pub name: String,
    /// Content category, used to pick an icon and a previewer.
    pub file_type: FileType,
    /// Human-readable size (e.g. `2.4 MB`).
    pub size: String,
    /// When the file was last modified.
    pub modified: DateTime<Utc>,
    /// The folder containing this file (null at the root level).
    pub parent_id: Option<FolderId>,
    /// Where the blob storage keeps the bytes.
    pub url: String,
}

impl File {
    /// Get the file extension (lowercase), if any.
    pub fn extension(&self) -> Option<String> {
        super::kind::extension_of(&self.name)
    }
}

/// Data required to register a new file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFile {
    /// The file name.
    pub name: String,
    /// Content category.
    pub file_type: FileType,
    /// Human-readable size.
    pub size: String,
    /// The folder to place the file in (None for root level).
    pub parent_id: Option<FolderId>,
    /// Blob URL returned by the storage backend.
    pub url: String,
}

impl NewFile {
    /// Build the row to insert with a fresh id.
    pub fn into_file(self, modified: DateTime<Utc>) -> File {
        File {
            id: FileId::new(),
            name: self.name,
            file_type: self.file_type,
            size: self.size,
            modified,
            parent_id: self.parent_id,
            url: self.url,
        }
    }
}
