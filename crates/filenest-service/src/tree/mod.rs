//! Folder tree operations.

pub mod counts;
pub mod names;
pub mod query;
pub mod seed;
pub mod service;

pub use counts::TreeChange;
pub use names::validate_name;
pub use query::TreeQuery;
pub use seed::SeedReport;
pub use service::{Deletion, TreeService};
