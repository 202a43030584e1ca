//! File domain entities.

pub mod kind;
pub mod model;

pub use kind::{FileType, display_size};
pub use model::{File, NewFile};
