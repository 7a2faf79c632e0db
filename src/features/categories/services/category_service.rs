use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::categories::dtos::{
    CategoryPathDto, CategoryResponseDto, CategoryTreeDto, DeleteCategoryResponseDto,
    SaveCategoryDto,
};
use crate::features::categories::models::{Category, CategoryChanges};
use crate::features::categories::tree::CategoryTree;
use crate::modules::persistence::CatalogStore;
use crate::modules::storage::AssetStorage;
use crate::shared::slug;

/// Service for category operations
pub struct CategoryService {
    store: Arc<dyn CatalogStore>,
    assets: Arc<dyn AssetStorage>,
}

impl CategoryService {
    pub fn new(store: Arc<dyn CatalogStore>, assets: Arc<dyn AssetStorage>) -> Self {
        Self { store, assets }
    }

    async fn load_tree(&self) -> Result<CategoryTree> {
        Ok(CategoryTree::new(self.store.list_categories().await?))
    }

    fn respond(tree: &CategoryTree, category: Category) -> Result<CategoryResponseDto> {
        let path = tree.render_path(category.id)?;
        Ok(CategoryResponseDto::new(category, path))
    }

    /// Create a category, deriving its slug from the name
    pub async fn create(&self, dto: SaveCategoryDto) -> Result<CategoryResponseDto> {
        let changes = CategoryChanges {
            slug: slug::slug_for(&dto.name)?,
            name: dto.name,
            parent_id: dto.parent_id,
        };

        let category = self.store.insert_category(changes).await?;
        info!(
            "Category created: id={}, slug={}, parent={:?}",
            category.id, category.slug, category.parent_id
        );

        let mut tree = self.load_tree().await?;
        tree.insert(category.clone());
        Self::respond(&tree, category)
    }

    /// Rename and/or re-parent a category; the slug follows the new name.
    /// The store rejects a parent that lies inside the category's own subtree.
    pub async fn update(&self, id: Uuid, dto: SaveCategoryDto) -> Result<CategoryResponseDto> {
        let changes = CategoryChanges {
            slug: slug::slug_for(&dto.name)?,
            name: dto.name,
            parent_id: dto.parent_id,
        };

        let category = self
            .store
            .update_category(id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))?;
        info!("Category updated: id={}, slug={}", category.id, category.slug);

        let tree = self.load_tree().await?;
        Self::respond(&tree, category)
    }

    pub async fn get(&self, id: Uuid) -> Result<CategoryResponseDto> {
        let category = self
            .store
            .find_category(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))?;

        let tree = self.load_tree().await?;
        Self::respond(&tree, category)
    }

    /// Get category by slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<CategoryResponseDto> {
        let category = self
            .store
            .find_category_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category '{}' not found", slug)))?;

        let tree = self.load_tree().await?;
        Self::respond(&tree, category)
    }

    /// List all categories (flat list, ordered by name)
    pub async fn list(&self) -> Result<Vec<CategoryResponseDto>> {
        let categories = self.store.list_categories().await?;
        let tree = CategoryTree::new(categories.clone());

        categories
            .into_iter()
            .map(|c| Self::respond(&tree, c))
            .collect()
    }

    /// List all categories as tree structure
    pub async fn list_tree(&self) -> Result<Vec<CategoryTreeDto>> {
        let tree = self.load_tree().await?;
        Ok(CategoryTreeDto::build_tree(&tree))
    }

    /// Ancestry of a category, root first
    pub async fn path(&self, id: Uuid) -> Result<CategoryPathDto> {
        let tree = self.load_tree().await?;
        let segments: Vec<String> = tree
            .ancestry(id)?
            .into_iter()
            .map(|c| c.name.clone())
            .collect();

        Ok(CategoryPathDto {
            id,
            path: tree.render_path(id)?,
            segments,
        })
    }

    /// Delete a category together with its descendants and their products
    pub async fn delete(&self, id: Uuid) -> Result<DeleteCategoryResponseDto> {
        let summary = self
            .store
            .delete_category(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))?;

        for key in &summary.image_keys {
            if let Err(e) = self.assets.delete(key).await {
                warn!("Orphaned product image '{}' after cascade: {}", key, e);
            }
        }

        info!(
            "Category {} deleted: categories={}, products={}",
            id, summary.categories, summary.products
        );

        Ok(DeleteCategoryResponseDto {
            deleted_categories: summary.categories,
            deleted_products: summary.products,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::TestCatalog;

    fn save(name: &str, parent_id: Option<Uuid>) -> SaveCategoryDto {
        SaveCategoryDto {
            name: name.to_string(),
            parent_id,
        }
    }

    #[tokio::test]
    async fn test_create_derives_slug_and_path() {
        let catalog = TestCatalog::new();
        let service = &catalog.categories;

        let root = service.create(save("Roupas Masculinas", None)).await.unwrap();
        assert_eq!(root.slug, "roupas-masculinas");
        assert_eq!(root.path, "Roupas Masculinas");

        let child = service
            .create(save("Camisetas Básicas", Some(root.id)))
            .await
            .unwrap();
        assert_eq!(child.slug, "camisetas-basicas");
        assert_eq!(child.path, "Roupas Masculinas -> Camisetas Básicas");
    }

    #[tokio::test]
    async fn test_second_save_with_same_slug_conflicts() {
        let catalog = TestCatalog::new();
        let service = &catalog.categories;

        service.create(save("Café", None)).await.unwrap();
        let err = service.create(save("CAFE!", None)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_name_without_slug_content_is_rejected() {
        let catalog = TestCatalog::new();
        let err = catalog.categories.create(save("!!!", None)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_missing_parent_is_bad_request() {
        let catalog = TestCatalog::new();
        let err = catalog
            .categories
            .create(save("Orphan", Some(Uuid::now_v7())))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_path_for_chain_and_root() {
        let catalog = TestCatalog::new();
        let service = &catalog.categories;

        let a = service.create(save("A", None)).await.unwrap();
        let b = service.create(save("B", Some(a.id))).await.unwrap();
        let c = service.create(save("C", Some(b.id))).await.unwrap();

        let path = service.path(c.id).await.unwrap();
        assert_eq!(path.path, "A -> B -> C");
        assert_eq!(path.segments, vec!["A", "B", "C"]);

        assert_eq!(service.path(a.id).await.unwrap().path, "A");

        let err = service.path(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_rederives_slug() {
        let catalog = TestCatalog::new();
        let service = &catalog.categories;

        let shoes = service.create(save("Shoes", None)).await.unwrap();
        let renamed = service
            .update(shoes.id, save("Running Shoes", None))
            .await
            .unwrap();
        assert_eq!(renamed.slug, "running-shoes");

        let found = service.get_by_slug("running-shoes").await.unwrap();
        assert_eq!(found.id, shoes.id);
        assert!(matches!(
            service.get_by_slug("shoes").await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_update_rejects_cycles() {
        let catalog = TestCatalog::new();
        let service = &catalog.categories;

        let a = service.create(save("A", None)).await.unwrap();
        let b = service.create(save("B", Some(a.id))).await.unwrap();
        let c = service.create(save("C", Some(b.id))).await.unwrap();

        let err = service.update(a.id, save("A", Some(c.id))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = service.update(b.id, save("B", Some(b.id))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Moving a subtree elsewhere is fine
        let other = service.create(save("Other", None)).await.unwrap();
        let moved = service.update(b.id, save("B", Some(other.id))).await.unwrap();
        assert_eq!(moved.path, "Other -> B");
        assert_eq!(service.path(c.id).await.unwrap().path, "Other -> B -> C");
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let catalog = TestCatalog::new();
        let err = catalog
            .categories
            .update(Uuid::now_v7(), save("X", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_and_tree() {
        let catalog = TestCatalog::new();
        let service = &catalog.categories;

        let b = service.create(save("Books", None)).await.unwrap();
        service.create(save("Fiction", Some(b.id))).await.unwrap();
        service.create(save("Art", None)).await.unwrap();

        let flat = service.list().await.unwrap();
        let paths: Vec<&str> = flat.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["Art", "Books", "Books -> Fiction"]);

        let tree = service.list_tree().await.unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[1].children[0].name, "Fiction");
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_found() {
        let catalog = TestCatalog::new();
        let err = catalog.categories.delete(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
