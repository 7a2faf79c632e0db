use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::shared::constants::PRODUCT_IMAGE_DIR;

/// Database model for product
#[derive(Debug, Clone, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub value: Decimal,
    /// Asset key of the uploaded image
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values written by a product save
#[derive(Debug, Clone)]
pub struct ProductChanges {
    pub category_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub value: Decimal,
}

/// Destination of an uploaded product image: `{slug}/product/{base}{extension}`
pub fn image_path(product_slug: &str, filename: &str) -> String {
    let (base, extension) = split_extension(filename);
    format!(
        "{}/{}/{}{}",
        product_slug, PRODUCT_IMAGE_DIR, base, extension
    )
}

/// Split a filename at its final period. The extension keeps the period and its
/// original case; dotfiles such as `.env` have no extension.
pub fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(idx) if !filename[..idx].trim_start_matches('.').is_empty() => {
            filename.split_at(idx)
        }
        _ => (filename, ""),
    }
}

/// Last path component of a client-supplied filename
pub fn base_filename(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim()
}
