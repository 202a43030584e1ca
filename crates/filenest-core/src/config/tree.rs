//! Folder-tree traversal configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Bounds applied to every ancestor and descendant walk.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TreeConfig {
    /// Deepest nesting level a walk will follow before reporting the tree
    /// as corrupt. A chain longer than this is treated as a cycle.
    #[serde(default = "default_max_depth")]
    #[validate(range(min = 1, max = 10000))]
    pub max_depth: u32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

fn default_max_depth() -> u32 {
    256
}
