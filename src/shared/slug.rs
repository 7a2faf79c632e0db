//! Slug derivation shared by categories and products.

use crate::core::error::{AppError, Result};
use crate::shared::validation::SLUG_REGEX;

/// Derive a URL-safe slug from a display name.
///
/// Non-ASCII characters are transliterated, the result is lowercased, every run
/// of characters outside `[a-z0-9]` becomes a single hyphen, and leading or
/// trailing hyphens are dropped. May return an empty string for names with no
/// transliterable content.
pub fn normalize(name: &str) -> String {
    ::slug::slugify(name)
}

/// Slug for a record about to be saved. Rejects names that normalize to nothing.
pub fn slug_for(name: &str) -> Result<String> {
    let slug = normalize(name);
    if !SLUG_REGEX.is_match(&slug) {
        return Err(AppError::Validation(format!(
            "Name '{}' must contain at least one letter or digit",
            name
        )));
    }
    Ok(slug)
}
