//! Core type definitions used across the FileNest workspace.

pub mod id;
pub mod node;

pub use id::*;
pub use node::{NodeKind, NodeRef};
