//! Folder domain entities.

pub mod listing;
pub mod model;

pub use listing::Listing;
pub use model::{Folder, NewFolder};
