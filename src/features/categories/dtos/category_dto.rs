use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::categories::models::Category;
use crate::features::categories::tree::CategoryTree;

/// Request DTO for creating or replacing a category
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SaveCategoryDto {
    /// Display name; the slug is derived from it
    #[validate(length(min = 1, max = 60, message = "name must be 1-60 characters"))]
    #[schema(example = "Camisetas")]
    pub name: String,
    /// Parent category, omitted for a root
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

/// Response DTO for category
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponseDto {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    /// Ancestry rendered from the root, e.g. "Roupas -> Camisetas"
    pub path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CategoryResponseDto {
    pub fn new(category: Category, path: String) -> Self {
        Self {
            id: category.id,
            parent_id: category.parent_id,
            name: category.name,
            slug: category.slug,
            path,
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }
}

/// Rendered ancestry of one category
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryPathDto {
    pub id: Uuid,
    /// Names joined with " -> ", root first
    pub path: String,
    /// Names from the root down to the category itself
    pub segments: Vec<String>,
}

/// Result of a cascading delete
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteCategoryResponseDto {
    /// The category itself plus its descendants
    pub deleted_categories: u64,
    pub deleted_products: u64,
}

/// Response DTO for category tree (hierarchical structure)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(no_recursion)]
pub struct CategoryTreeDto {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub children: Vec<CategoryTreeDto>,
}

impl CategoryTreeDto {
    /// Build the nested forest, roots and siblings sorted by name
    pub fn build_tree(tree: &CategoryTree) -> Vec<CategoryTreeDto> {
        tree.children_of(None)
            .into_iter()
            .map(|root| Self::build_node(root, tree, 0))
            .collect()
    }

    fn build_node(category: &Category, tree: &CategoryTree, depth: usize) -> CategoryTreeDto {
        // A node deeper than the arena is large can only be reached through a loop
        let children = if depth >= tree.len() {
            Vec::new()
        } else {
            tree.children_of(Some(category.id))
                .into_iter()
                .map(|child| Self::build_node(child, tree, depth + 1))
                .collect()
        };

        CategoryTreeDto {
            id: category.id,
            name: category.name.clone(),
            slug: category.slug.clone(),
            children,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(name: &str, parent_id: Option<Uuid>) -> Category {
        let now = Utc::now();
        Category {
            id: Uuid::now_v7(),
            parent_id,
            name: name.to_string(),
            slug: crate::shared::slug::normalize(name),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_build_tree_nests_children() {
        let clothing = category("Clothing", None);
        let shirts = category("Shirts", Some(clothing.id));
        let hats = category("Hats", Some(clothing.id));
        let polo = category("Polo", Some(shirts.id));
        let books = category("Books", None);
        let tree = CategoryTree::new([clothing, shirts, hats, polo, books]);

        let forest = CategoryTreeDto::build_tree(&tree);
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].name, "Books");
        assert!(forest[0].children.is_empty());

        let clothing = &forest[1];
        let names: Vec<&str> = clothing.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Hats", "Shirts"]);
        assert_eq!(clothing.children[1].children[0].slug, "polo");
    }

    #[test]
    fn test_save_dto_validation() {
        let ok = SaveCategoryDto {
            name: "Shoes".to_string(),
            parent_id: None,
        };
        assert!(ok.validate().is_ok());

        let empty = SaveCategoryDto {
            name: String::new(),
            parent_id: None,
        };
        assert!(empty.validate().is_err());

        let long = SaveCategoryDto {
            name: "x".repeat(61),
            parent_id: None,
        };
        assert!(long.validate().is_err());
    }
}
