//! Core traits defined in `filenest-core` and implemented by other crates.

pub mod storage;

pub use storage::BlobStore;
