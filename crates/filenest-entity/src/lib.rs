//! # filenest-entity
//!
//! Domain entity models for FileNest. `Folder` and `File` each map to one
//! database table row; `Node` is the closed union of the two used wherever
//! a caller handles "a file or a folder". Database entities derive
//! `sqlx::FromRow`.

pub mod file;
pub mod folder;
pub mod node;

pub use file::{File, FileType, NewFile};
pub use folder::{Folder, Listing, NewFolder};
pub use node::Node;
