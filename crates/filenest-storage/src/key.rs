//! Blob keys and the URLs that address them.

use uuid::Uuid;

use filenest_core::error::AppError;
use filenest_core::result::AppResult;

/// Longest file name most filesystems accept, in bytes.
pub const MAX_KEY_LEN: usize = 255;

/// Longest extension kept when a long name is shortened.
const MAX_EXTENSION_LEN: usize = 16;

/// A fresh key for a blob uploaded as `name`.
///
/// Path separators and anything outside a conservative character set are
/// replaced so the key is always a single path segment. Long names are cut
/// to fit [`MAX_KEY_LEN`], keeping a short extension.
pub fn new_key(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    let id = Uuid::new_v4().to_string();
    if cleaned.is_empty() {
        return id;
    }
    let budget = MAX_KEY_LEN - id.len() - 1;
    format!("{id}-{}", shorten(cleaned, budget))
}

/// Cut an ASCII name to `budget` bytes, keeping its extension when short.
fn shorten(name: &str, budget: usize) -> String {
    if name.len() <= budget {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() <= MAX_EXTENSION_LEN => {
            format!("{}.{ext}", &stem[..budget - ext.len() - 1])
        }
        _ => name[..budget].to_string(),
    }
}

/// Join a URL prefix and a key.
pub fn url_for(prefix: &str, key: &str) -> String {
    format!("{}/{key}", prefix.trim_end_matches('/'))
}

/// Extract the key from a URL issued under `prefix`.
pub fn key_from_url<'a>(prefix: &str, url: &'a str) -> AppResult<&'a str> {
    let prefix = prefix.trim_end_matches('/');
    let key = url
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .ok_or_else(|| AppError::validation(format!("Blob URL '{url}' is outside '{prefix}'")))?;

    if key.is_empty() || key.contains('/') || key.contains('\\') || key.starts_with('.') {
        return Err(AppError::validation(format!("Invalid blob URL '{url}'")));
    }
    Ok(key)
}
