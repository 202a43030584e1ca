//! Blob storage collaborator for uploaded file contents.

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;

/// Trait for blob storage backends.
///
/// The folder tree only ever keeps the URL returned by [`BlobStore::write`];
/// the bytes live behind this trait. Implementations exist for the local
/// filesystem and for process memory in `filenest-storage`.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "memory").
    fn provider_type(&self) -> &str;

    /// Store `data` under a fresh key derived from `name` and return the URL
    /// that addresses it.
    async fn write(&self, name: &str, data: Bytes) -> AppResult<String>;

    /// Read the full contents addressed by `url`.
    async fn read(&self, url: &str) -> AppResult<Bytes>;

    /// Delete the blob addressed by `url`.
    ///
    /// Callers treat failures as best-effort cleanup: the database row is the
    /// source of truth, an orphaned blob is left for garbage collection.
    async fn delete(&self, url: &str) -> AppResult<()>;

    /// Check whether a blob exists at `url`.
    async fn exists(&self, url: &str) -> AppResult<bool>;
}
