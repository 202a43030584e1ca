//! PostgreSQL implementations.

pub mod file;
pub mod folder;
pub mod tree;

pub use file::FileRepository;
pub use folder::FolderRepository;
pub use tree::PgTreeStore;
