//! Contents of one folder as shown to a browsing user.

use serde::{Deserialize, Serialize};

use crate::file::File;
use crate::folder::Folder;
use crate::node::Node;

/// The immediate children of a folder (or of the root level).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Child folders, sorted by name.
    pub folders: Vec<Folder>,
    /// Child files, sorted by name.
    pub files: Vec<File>,
}

impl Listing {
    /// Total number of children.
    pub fn len(&self) -> usize {
        self.folders.len() + self.files.len()
    }

    /// Whether the listing has no children.
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.files.is_empty()
    }

    /// Children in display order: folders first, then files.
    pub fn into_nodes(self) -> Vec<Node> {
        self.folders
            .into_iter()
            .map(Node::Folder)
            .chain(self.files.into_iter().map(Node::File))
            .collect()
    }
}
