//! The closed union of the two tree node kinds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use filenest_core::types::{FolderId, NodeKind, NodeRef};

use crate::file::File;
use crate::folder::Folder;

/// Either a folder or a file row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    /// A folder row.
    Folder(Folder),
    /// A file row.
    File(File),
}

impl Node {
    /// Reference to this node.
    pub fn node_ref(&self) -> NodeRef {
        match self {
            Self::Folder(f) => NodeRef::Folder(f.id),
            Self::File(f) => NodeRef::File(f.id),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.node_ref().kind()
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Folder(f) => &f.name,
            Self::File(f) => &f.name,
        }
    }

    /// The containing folder, or `None` at the root level.
    pub fn parent_id(&self) -> Option<FolderId> {
        match self {
            Self::Folder(f) => f.parent_id,
            Self::File(f) => f.parent_id,
        }
    }

    pub fn modified(&self) -> DateTime<Utc> {
        match self {
            Self::Folder(f) => f.modified,
            Self::File(f) => f.modified,
        }
    }
}

impl From<Folder> for Node {
    fn from(folder: Folder) -> Self {
        Self::Folder(folder)
    }
}

impl From<File> for Node {
    fn from(file: File) -> Self {
        Self::File(file)
    }
}
