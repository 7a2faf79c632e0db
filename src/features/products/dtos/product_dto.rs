use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::products::models::Product;
use crate::shared::constants::DEFAULT_PAGE_SIZE;
use crate::shared::types::PaginationQuery;

/// Request DTO for creating or replacing a product
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SaveProductDto {
    /// Display name; the slug is derived from it
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    #[schema(example = "Blue Shirt")]
    pub name: String,
    /// Category the product is filed under
    #[serde(default)]
    pub category_id: Option<Uuid>,
    /// Price, non-negative with at most two decimal places
    #[schema(value_type = String, example = "49.90")]
    pub value: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

/// Response DTO for product
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductResponseDto {
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    /// Category ancestry, e.g. "Roupas -> Camisetas"
    pub category_path: Option<String>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    #[schema(value_type = String, example = "49.90")]
    pub value: Decimal,
    /// Asset key of the product image
    pub image: Option<String>,
    /// Retrievable URL of the product image
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductResponseDto {
    pub fn new(product: Product, category_path: Option<String>, image_url: Option<String>) -> Self {
        Self {
            id: product.id,
            category_id: product.category_id,
            category_path,
            name: product.name,
            slug: product.slug,
            description: product.description,
            value: product.value,
            image: product.image,
            image_url,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// Query params for listing products
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListProductsQuery {
    /// Page number (1-indexed, default: 1)
    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,

    /// Number of items per page (default: 10, max: 100)
    #[serde(default = "default_page_size")]
    #[param(minimum = 1, maximum = 100)]
    pub page_size: i64,

    /// Only products filed directly under this category
    pub category_id: Option<Uuid>,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl ListProductsQuery {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Upload image request DTO for OpenAPI documentation
/// Note: the handler reads axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadImageDto {
    /// The image to upload
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
}

/// Response DTO for delete operations
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteProductResponseDto {
    pub deleted: bool,
}

/// Allowed MIME types for product images
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Maximum image size in bytes (5 MiB)
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// Check if a content type is an allowed image type, ignoring parameters
pub fn is_image_type_allowed(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_IMAGE_TYPES.contains(&essence.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image_type_allowed() {
        assert!(is_image_type_allowed("image/jpeg"));
        assert!(is_image_type_allowed("IMAGE/PNG"));
        assert!(is_image_type_allowed("image/webp; charset=binary"));
        assert!(!is_image_type_allowed("application/pdf"));
        assert!(!is_image_type_allowed("image/svg+xml"));
        assert!(!is_image_type_allowed(""));
    }

    #[test]
    fn test_save_dto_parses_string_and_number_values() {
        let dto: SaveProductDto =
            serde_json::from_str(r#"{"name": "Mug", "value": "12.50"}"#).unwrap();
        assert_eq!(dto.value, Decimal::new(1250, 2));
        assert!(dto.category_id.is_none());

        let dto: SaveProductDto = serde_json::from_str(r#"{"name": "Mug", "value": 3}"#).unwrap();
        assert_eq!(dto.value, Decimal::from(3));
    }

    #[test]
    fn test_save_dto_validation() {
        let dto = SaveProductDto {
            name: "x".repeat(101),
            category_id: None,
            value: Decimal::ONE,
            description: None,
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_list_query_defaults() {
        let query: ListProductsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(query.pagination().offset(), 0);
    }
}
