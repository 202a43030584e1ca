//! # filenest-core
//!
//! Core crate for FileNest. Contains the blob-storage collaborator trait,
//! configuration schemas, typed identifiers, folder-tree domain events,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other FileNest crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
