//! Closed references to the two node kinds of the folder tree.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::id::{FileId, FolderId};
use crate::error::AppError;

/// The kind of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A folder, which may hold children.
    Folder,
    /// A file, always a leaf.
    File,
}

impl NodeKind {
    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::File => "file",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifies one node of the tree together with its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum NodeRef {
    /// A folder node.
    Folder(FolderId),
    /// A file node.
    File(FileId),
}

impl NodeRef {
    /// Return the node kind.
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Folder(_) => NodeKind::Folder,
            Self::File(_) => NodeKind::File,
        }
    }

    /// Return the folder id when this references a folder.
    pub fn as_folder(&self) -> Option<FolderId> {
        match self {
            Self::Folder(id) => Some(*id),
            Self::File(_) => None,
        }
    }
}

impl From<FolderId> for NodeRef {
    fn from(id: FolderId) -> Self {
        Self::Folder(id)
    }
}

impl From<FileId> for NodeRef {
    fn from(id: FileId) -> Self {
        Self::File(id)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Folder(id) => write!(f, "folder:{id}"),
            Self::File(id) => write!(f, "file:{id}"),
        }
    }
}

impl FromStr for NodeRef {
    type Err = AppError;

    /// Parse the `folder:<uuid>` / `file:<uuid>` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::validation(format!("Invalid node reference '{s}'"));
        let (kind, id) = s.split_once(':').ok_or_else(invalid)?;
        match kind {
            "folder" => id.parse().map(Self::Folder).map_err(|_| invalid()),
            "file" => id.parse().map(Self::File).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}
