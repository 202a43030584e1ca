//! # filenest-database
//!
//! Persistence for the folder tree. [`TreeStore`] is the seam the service
//! layer talks to; [`PgTreeStore`] implements it over PostgreSQL with
//! recursive CTEs and transactional commits, and [`MemoryTreeStore`] keeps
//! the same contract in process.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod plan;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryTreeStore;
pub use plan::{CommitOutcome, CountDelta, MutationPlan, RowOp};
pub use repositories::PgTreeStore;
pub use store::{CountMismatch, FolderLink, TreeStore};
