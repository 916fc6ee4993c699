//! Field rules for goods.

use super::error::DomainError;

/// Matches `goods.name VARCHAR(128)`.
pub const MAX_NAME_CHARS: usize = 128;

/// Trim a good name and check it fits the `goods.name` column.
pub fn validate_name(raw: &str) -> Result<String, DomainError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name must not be empty"));
    }
    if name.contains('\0') {
        return Err(DomainError::validation("name must not contain NUL characters"));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(DomainError::validation(format!(
            "name must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}
