//! Catalog persistence
//!
//! `CatalogStore` is the storage collaborator behind the category and product
//! services. Two backends exist:
//! - `PgCatalogStore`: PostgreSQL, relies on unique indices and native
//!   `ON DELETE CASCADE`.
//! - `MemoryCatalogStore`: process-local, enforces the same constraints itself and
//!   walks the category arena to cascade deletes.

mod memory;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::categories::models::{Category, CategoryChanges};
use crate::features::products::models::{Product, ProductChanges};

pub use memory::MemoryCatalogStore;
pub use postgres::PgCatalogStore;

/// Filter and window for product listings
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

/// What a cascading category delete removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeSummary {
    pub categories: u64,
    pub products: u64,
    /// Asset keys of the removed products' images
    pub image_keys: Vec<String>,
}

/// Error for a re-parent that would make a category its own ancestor
fn cycle_error(id: Uuid, parent_id: Uuid) -> AppError {
    AppError::Validation(format!(
        "Category {} cannot be moved under itself or its descendant {}",
        id, parent_id
    ))
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert a category. Conflict on duplicate slug, BadRequest on missing parent.
    async fn insert_category(&self, changes: CategoryChanges) -> Result<Category>;

    /// Overwrite a category's name, slug and parent. `None` if the id is unknown.
    /// Validation error if the new parent is the category or one of its
    /// descendants; the check and the write are atomic.
    async fn update_category(&self, id: Uuid, changes: CategoryChanges)
        -> Result<Option<Category>>;

    async fn find_category(&self, id: Uuid) -> Result<Option<Category>>;

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// All categories ordered by name
    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// Delete a category, its descendants and every product referencing them.
    /// `None` if the id is unknown.
    async fn delete_category(&self, id: Uuid) -> Result<Option<CascadeSummary>>;

    /// Insert a product. Conflict on duplicate slug, BadRequest on missing category.
    async fn insert_product(&self, changes: ProductChanges) -> Result<Product>;

    async fn update_product(&self, id: Uuid, changes: ProductChanges) -> Result<Option<Product>>;

    async fn set_product_image(&self, id: Uuid, image: Option<String>)
        -> Result<Option<Product>>;

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>>;

    async fn find_product_by_slug(&self, slug: &str) -> Result<Option<Product>>;

    /// Products matching the filter ordered by name, plus the unpaginated total
    async fn list_products(&self, filter: &ProductFilter) -> Result<(Vec<Product>, i64)>;

    /// Delete a product, returning it if it existed
    async fn delete_product(&self, id: Uuid) -> Result<Option<Product>>;
}
