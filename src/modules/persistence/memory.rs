use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{cycle_error, CascadeSummary, CatalogStore, ProductFilter};
use crate::core::error::{AppError, Result};
use crate::features::categories::models::{Category, CategoryChanges};
use crate::features::categories::tree::CategoryTree;
use crate::features::products::models::{Product, ProductChanges};

#[derive(Default)]
struct CatalogState {
    categories: CategoryTree,
    products: HashMap<Uuid, Product>,
}

impl CatalogState {
    fn ensure_category_slug_free(&self, slug: &str, owner: Option<Uuid>) -> Result<()> {
        match self.categories.find_by_slug(slug) {
            Some(existing) if Some(existing.id) != owner => Err(AppError::Conflict(format!(
                "Category with slug '{}' already exists",
                slug
            ))),
            _ => Ok(()),
        }
    }

    fn ensure_product_slug_free(&self, slug: &str, owner: Option<Uuid>) -> Result<()> {
        let taken = self
            .products
            .values()
            .any(|p| p.slug == slug && Some(p.id) != owner);
        if taken {
            return Err(AppError::Conflict(format!(
                "Product with slug '{}' already exists",
                slug
            )));
        }
        Ok(())
    }

    fn ensure_category_exists(&self, id: Option<Uuid>, what: &str) -> Result<()> {
        match id {
            Some(id) if !self.categories.contains(id) => Err(AppError::BadRequest(format!(
                "{} {} does not exist",
                what, id
            ))),
            _ => Ok(()),
        }
    }
}

/// Process-local catalog store
///
/// Writes take the state lock exclusively, so the slug check and the insert
/// are atomic with respect to other writers.
#[derive(Default)]
pub struct MemoryCatalogStore {
    state: RwLock<CatalogState>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn insert_category(&self, changes: CategoryChanges) -> Result<Category> {
        let mut state = self.state.write().await;
        state.ensure_category_exists(changes.parent_id, "Parent category")?;
        state.ensure_category_slug_free(&changes.slug, None)?;

        let now = Utc::now();
        let category = Category {
            id: Uuid::now_v7(),
            parent_id: changes.parent_id,
            name: changes.name,
            slug: changes.slug,
            created_at: now,
            updated_at: now,
        };
        state.categories.insert(category.clone());

        Ok(category)
    }

    async fn update_category(
        &self,
        id: Uuid,
        changes: CategoryChanges,
    ) -> Result<Option<Category>> {
        let mut state = self.state.write().await;
        let Some(current) = state.categories.get(id).cloned() else {
            return Ok(None);
        };
        state.ensure_category_exists(changes.parent_id, "Parent category")?;
        if let Some(parent_id) = changes.parent_id {
            if state.categories.would_create_cycle(id, parent_id)? {
                return Err(cycle_error(id, parent_id));
            }
        }
        state.ensure_category_slug_free(&changes.slug, Some(id))?;

        let category = Category {
            parent_id: changes.parent_id,
            name: changes.name,
            slug: changes.slug,
            updated_at: Utc::now(),
            ..current
        };
        state.categories.insert(category.clone());

        Ok(Some(category))
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self.state.read().await.categories.get(id).cloned())
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        Ok(self.state.read().await.categories.find_by_slug(slug).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let state = self.state.read().await;
        let mut categories: Vec<Category> = state.categories.iter().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn delete_category(&self, id: Uuid) -> Result<Option<CascadeSummary>> {
        let mut state = self.state.write().await;
        let removed = state.categories.remove_subtree(id);
        if removed.is_empty() {
            return Ok(None);
        }

        let removed_ids: Vec<Uuid> = removed.iter().map(|c| c.id).collect();
        let doomed: Vec<Uuid> = state
            .products
            .values()
            .filter(|p| p.category_id.is_some_and(|c| removed_ids.contains(&c)))
            .map(|p| p.id)
            .collect();

        let mut summary = CascadeSummary {
            categories: removed.len() as u64,
            ..Default::default()
        };
        for product_id in doomed {
            if let Some(product) = state.products.remove(&product_id) {
                summary.products += 1;
                summary.image_keys.extend(product.image);
            }
        }

        debug!(
            "Cascade delete of category {} removed {} categories and {} products",
            id, summary.categories, summary.products
        );

        Ok(Some(summary))
    }

    async fn insert_product(&self, changes: ProductChanges) -> Result<Product> {
        let mut state = self.state.write().await;
        state.ensure_category_exists(changes.category_id, "Category")?;
        state.ensure_product_slug_free(&changes.slug, None)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::now_v7(),
            category_id: changes.category_id,
            name: changes.name,
            slug: changes.slug,
            description: changes.description,
            value: changes.value,
            image: None,
            created_at: now,
            updated_at: now,
        };
        state.products.insert(product.id, product.clone());

        Ok(product)
    }

    async fn update_product(&self, id: Uuid, changes: ProductChanges) -> Result<Option<Product>> {
        let mut state = self.state.write().await;
        if !state.products.contains_key(&id) {
            return Ok(None);
        }
        state.ensure_category_exists(changes.category_id, "Category")?;
        state.ensure_product_slug_free(&changes.slug, Some(id))?;

        let Some(product) = state.products.get_mut(&id) else {
            return Ok(None);
        };
        product.category_id = changes.category_id;
        product.name = changes.name;
        product.slug = changes.slug;
        product.description = changes.description;
        product.value = changes.value;
        product.updated_at = Utc::now();

        Ok(Some(product.clone()))
    }

    async fn set_product_image(
        &self,
        id: Uuid,
        image: Option<String>,
    ) -> Result<Option<Product>> {
        let mut state = self.state.write().await;
        Ok(state.products.get_mut(&id).map(|product| {
            product.image = image;
            product.updated_at = Utc::now();
            product.clone()
        }))
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn find_product_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        let state = self.state.read().await;
        Ok(state.products.values().find(|p| p.slug == slug).cloned())
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<(Vec<Product>, i64)> {
        let state = self.state.read().await;
        let mut matching: Vec<&Product> = state
            .products
            .values()
            .filter(|p| filter.category_id.is_none() || p.category_id == filter.category_id)
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn delete_product(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.state.write().await.products.remove(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn category_changes(name: &str, parent_id: Option<Uuid>) -> CategoryChanges {
        CategoryChanges {
            name: name.to_string(),
            slug: crate::shared::slug::normalize(name),
            parent_id,
        }
    }

    fn product_changes(name: &str, category_id: Option<Uuid>) -> ProductChanges {
        ProductChanges {
            category_id,
            name: name.to_string(),
            slug: crate::shared::slug::normalize(name),
            description: None,
            value: Decimal::new(1999, 2),
        }
    }

    #[tokio::test]
    async fn test_duplicate_category_slug_conflicts() {
        let store = MemoryCatalogStore::new();
        store
            .insert_category(category_changes("Shoes", None))
            .await
            .unwrap();

        let err = store
            .insert_category(category_changes("SHOES!", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_reparent_into_own_subtree_is_rejected() {
        let store = MemoryCatalogStore::new();
        let a = store
            .insert_category(category_changes("A", None))
            .await
            .unwrap();
        let b = store
            .insert_category(category_changes("B", Some(a.id)))
            .await
            .unwrap();

        let err = store
            .update_category(a.id, category_changes("A", Some(b.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = store
            .update_category(a.id, category_changes("A", Some(a.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Nothing was written
        let a = store.find_category(a.id).await.unwrap().unwrap();
        assert_eq!(a.parent_id, None);
    }

    #[tokio::test]
    async fn test_missing_parent_is_rejected() {
        let store = MemoryCatalogStore::new();
        let err = store
            .insert_category(category_changes("Orphan", Some(Uuid::now_v7())))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_update_keeps_own_slug() {
        let store = MemoryCatalogStore::new();
        let shoes = store
            .insert_category(category_changes("Shoes", None))
            .await
            .unwrap();

        let updated = store
            .update_category(shoes.id, category_changes("shoes", None))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "shoes");
        assert_eq!(updated.created_at, shoes.created_at);

        let missing = store
            .update_category(Uuid::now_v7(), category_changes("Other", None))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_cascade_delete_removes_descendants_and_products() {
        let store = MemoryCatalogStore::new();
        let a = store.insert_category(category_changes("A", None)).await.unwrap();
        let b = store
            .insert_category(category_changes("B", Some(a.id)))
            .await
            .unwrap();
        let keep = store.insert_category(category_changes("Keep", None)).await.unwrap();

        let p = store
            .insert_product(product_changes("P", Some(b.id)))
            .await
            .unwrap();
        store
            .set_product_image(p.id, Some("p/product/p.png".to_string()))
            .await
            .unwrap();
        let q = store
            .insert_product(product_changes("Q", Some(keep.id)))
            .await
            .unwrap();
        let loose = store.insert_product(product_changes("Loose", None)).await.unwrap();

        let summary = store.delete_category(a.id).await.unwrap().unwrap();
        assert_eq!(summary.categories, 2);
        assert_eq!(summary.products, 1);
        assert_eq!(summary.image_keys, vec!["p/product/p.png".to_string()]);

        assert!(store.find_category(b.id).await.unwrap().is_none());
        assert!(store.find_product(p.id).await.unwrap().is_none());
        assert!(store.find_product(q.id).await.unwrap().is_some());
        assert!(store.find_product(loose.id).await.unwrap().is_some());
        assert!(store.delete_category(a.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_products_filter_and_window() {
        let store = MemoryCatalogStore::new();
        let cat = store.insert_category(category_changes("Cat", None)).await.unwrap();
        for name in ["Delta", "Alpha", "Charlie", "Bravo"] {
            store
                .insert_product(product_changes(name, Some(cat.id)))
                .await
                .unwrap();
        }
        store.insert_product(product_changes("Echo", None)).await.unwrap();

        let filter = ProductFilter {
            category_id: Some(cat.id),
            limit: 2,
            offset: 1,
        };
        let (page, total) = store.list_products(&filter).await.unwrap();
        assert_eq!(total, 4);
        let names: Vec<&str> = page.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Bravo", "Charlie"]);
    }

    #[tokio::test]
    async fn test_duplicate_product_slug_conflicts() {
        let store = MemoryCatalogStore::new();
        store.insert_product(product_changes("Blue Shirt", None)).await.unwrap();
        let err = store
            .insert_product(product_changes("blue  shirt", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
