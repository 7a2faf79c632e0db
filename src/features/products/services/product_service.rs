use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::categories::tree::CategoryTree;
use crate::features::products::dtos::{ProductResponseDto, SaveProductDto};
use crate::features::products::models::{base_filename, image_path, Product, ProductChanges};
use crate::modules::persistence::{CatalogStore, ProductFilter};
use crate::modules::storage::AssetStorage;
use crate::shared::constants::{PRODUCT_VALUE_DECIMAL_PLACES, PRODUCT_VALUE_MAX_DIGITS};
use crate::shared::slug;
use crate::shared::types::{Meta, PaginationQuery};

/// Check a product value against the `NUMERIC(22, 2)` column and return it
/// rescaled to two decimal places.
pub fn validate_value(value: Decimal) -> Result<Decimal> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AppError::Validation(
            "value must not be negative".to_string(),
        ));
    }

    let mut value = value.normalize();
    if value.scale() > PRODUCT_VALUE_DECIMAL_PLACES {
        return Err(AppError::Validation(format!(
            "value must have at most {} decimal places",
            PRODUCT_VALUE_DECIMAL_PLACES
        )));
    }

    let integer_digits = PRODUCT_VALUE_MAX_DIGITS - PRODUCT_VALUE_DECIMAL_PLACES;
    let limit = Decimal::from_i128_with_scale(10i128.pow(integer_digits), 0);
    if value.trunc() >= limit {
        return Err(AppError::Validation(format!(
            "value must have at most {} integer digits",
            integer_digits
        )));
    }

    value.set_sign_positive(true);
    value.rescale(PRODUCT_VALUE_DECIMAL_PLACES);
    Ok(value)
}

/// Service for product operations
pub struct ProductService {
    store: Arc<dyn CatalogStore>,
    assets: Arc<dyn AssetStorage>,
}

impl ProductService {
    pub fn new(store: Arc<dyn CatalogStore>, assets: Arc<dyn AssetStorage>) -> Self {
        Self { store, assets }
    }

    async fn load_tree(&self) -> Result<CategoryTree> {
        Ok(CategoryTree::new(self.store.list_categories().await?))
    }

    fn respond(&self, tree: &CategoryTree, product: Product) -> Result<ProductResponseDto> {
        let category_path = match product.category_id {
            Some(category_id) if tree.contains(category_id) => {
                Some(tree.render_path(category_id)?)
            }
            _ => None,
        };
        let image_url = product.image.as_deref().map(|key| self.assets.url_for(key));

        Ok(ProductResponseDto::new(product, category_path, image_url))
    }

    async fn respond_one(&self, product: Product) -> Result<ProductResponseDto> {
        let tree = self.load_tree().await?;
        self.respond(&tree, product)
    }

    fn changes(dto: SaveProductDto) -> Result<ProductChanges> {
        Ok(ProductChanges {
            slug: slug::slug_for(&dto.name)?,
            value: validate_value(dto.value)?,
            name: dto.name,
            category_id: dto.category_id,
            description: dto.description.filter(|d| !d.trim().is_empty()),
        })
    }

    /// Create a product, deriving its slug from the name
    pub async fn create(&self, dto: SaveProductDto) -> Result<ProductResponseDto> {
        let product = self.store.insert_product(Self::changes(dto)?).await?;
        info!(
            "Product created: id={}, slug={}, category={:?}",
            product.id, product.slug, product.category_id
        );

        self.respond_one(product).await
    }

    /// Replace a product's fields; the slug follows the new name
    pub async fn update(&self, id: Uuid, dto: SaveProductDto) -> Result<ProductResponseDto> {
        let product = self
            .store
            .update_product(id, Self::changes(dto)?)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {} not found", id)))?;
        info!("Product updated: id={}, slug={}", product.id, product.slug);

        self.respond_one(product).await
    }

    pub async fn get(&self, id: Uuid) -> Result<ProductResponseDto> {
        let product = self
            .store
            .find_product(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {} not found", id)))?;

        self.respond_one(product).await
    }

    /// Get product by slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<ProductResponseDto> {
        let product = self
            .store
            .find_product_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product '{}' not found", slug)))?;

        self.respond_one(product).await
    }

    /// List products ordered by name, optionally filtered by category
    pub async fn list(
        &self,
        pagination: &PaginationQuery,
        category_id: Option<Uuid>,
    ) -> Result<(Vec<ProductResponseDto>, Meta)> {
        let filter = ProductFilter {
            category_id,
            limit: pagination.limit(),
            offset: pagination.offset(),
        };
        let (products, total) = self.store.list_products(&filter).await?;

        let tree = self.load_tree().await?;
        let items = products
            .into_iter()
            .map(|p| self.respond(&tree, p))
            .collect::<Result<Vec<_>>>()?;

        Ok((items, Meta { total }))
    }

    /// Delete a product and its stored image
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let product = self
            .store
            .delete_product(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {} not found", id)))?;

        if let Some(key) = product.image.as_deref() {
            self.discard_image(key).await;
        }

        info!("Product deleted: id={}, slug={}", product.id, product.slug);
        Ok(())
    }

    /// Store an image at `{slug}/product/{filename}` and record its key on the
    /// product. Uploading the same filename again overwrites the object.
    pub async fn upload_image(
        &self,
        id: Uuid,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<ProductResponseDto> {
        let product = self
            .store
            .find_product(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {} not found", id)))?;

        let filename = base_filename(filename);
        if filename.is_empty() {
            return Err(AppError::BadRequest("Filename is required".to_string()));
        }

        let path = image_path(&product.slug, filename);
        let size = data.len();
        let key = self.assets.put(&path, data, content_type).await?;
        debug!("Stored product image '{}' ({} bytes)", key, size);

        let updated = self
            .store
            .set_product_image(id, Some(key.clone()))
            .await?;
        let Some(updated) = updated else {
            // Product vanished while uploading
            self.discard_image(&key).await;
            return Err(AppError::NotFound(format!("Product {} not found", id)));
        };

        if let Some(previous) = product.image.as_deref().filter(|prev| *prev != key) {
            self.discard_image(previous).await;
        }

        info!("Product {} image set: {}", id, key);
        self.respond_one(updated).await
    }

    async fn discard_image(&self, key: &str) {
        if let Err(e) = self.assets.delete(key).await {
            warn!("Failed to delete product image '{}': {}", key, e);
        }
    }
}
