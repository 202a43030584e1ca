//! # filenest-service
//!
//! Business logic for the FileNest folder tree. [`TreeService`] is the single
//! writer: it reads through [`TreeQuery`], derives counter deltas from
//! [`TreeChange`], and hands one [`MutationPlan`](filenest_database::MutationPlan)
//! per operation to the store.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod tree;

pub use tree::{Deletion, SeedReport, TreeChange, TreeQuery, TreeService, validate_name};
