//! Blob storage configuration.

use serde::{Deserialize, Serialize};

/// Which blob backend holds uploaded file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BlobProvider {
    /// Files on the local filesystem under `local.root_path`.
    #[default]
    Local,
    /// Process memory; contents vanish on exit.
    Memory,
}

/// Top-level storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend to use.
    #[serde(default)]
    pub provider: BlobProvider,
    /// Prefix of every blob URL handed out (e.g. `/uploads/<key>`).
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
    /// Local filesystem storage configuration.
    #[serde(default)]
    pub local: LocalStorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: BlobProvider::default(),
            url_prefix: default_url_prefix(),
            local: LocalStorageConfig::default(),
        }
    }
}

/// Local filesystem storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStorageConfig {
    /// Root path for local file storage.
    #[serde(default = "default_local_root")]
    pub root_path: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            root_path: default_local_root(),
        }
    }
}

fn default_url_prefix() -> String {
    "/uploads".to_string()
}

fn default_local_root() -> String {
    "./data/uploads".to_string()
}
