//! Node name rules.

use filenest_core::error::AppError;
use filenest_core::result::AppResult;

/// Longest accepted name, matching the `VARCHAR(255)` columns.
pub const MAX_NAME_LEN: usize = 255;

/// Trim a proposed file or folder name and reject unusable ones.
pub fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Name cannot be empty"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(AppError::validation(format!(
            "Name '{name}' cannot contain path separators"
        )));
    }
    if name == "." || name == ".." {
        return Err(AppError::validation(format!("Name '{name}' is reserved")));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation(format!(
            "Name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}
