use async_trait::async_trait;
use sqlx::error::ErrorKind;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::{cycle_error, CascadeSummary, CatalogStore, ProductFilter};
use crate::core::error::{AppError, Result};
use crate::features::categories::models::{Category, CategoryChanges};
use crate::features::products::models::{Product, ProductChanges};

const CATEGORY_COLUMNS: &str = "id, parent_id, name, slug, created_at, updated_at";

const PRODUCT_COLUMNS: &str =
    "id, category_id, name, slug, description, value, image, created_at, updated_at";

/// Convert a write failure into the catalog's error kinds
///
/// Unique violations (23505) become conflicts naming the slug; foreign key
/// violations (23503) become bad requests.
fn handle_db_error(e: sqlx::Error, entity: &str, slug: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        match db_err.kind() {
            ErrorKind::UniqueViolation => {
                return AppError::Conflict(format!(
                    "{} with slug '{}' already exists",
                    entity, slug
                ));
            }
            ErrorKind::ForeignKeyViolation => {
                let referenced = match entity {
                    "Category" => "Parent category",
                    _ => "Category",
                };
                return AppError::BadRequest(format!("{} does not exist", referenced));
            }
            _ => {}
        }
    }

    tracing::error!("{} write failed: {:?}", entity, e);
    AppError::Database(e)
}

/// PostgreSQL-backed catalog store
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn insert_category(&self, changes: CategoryChanges) -> Result<Category> {
        let query = format!(
            r#"
            INSERT INTO categories (id, parent_id, name, slug)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        );

        sqlx::query_as::<_, Category>(&query)
            .bind(Uuid::now_v7())
            .bind(changes.parent_id)
            .bind(&changes.name)
            .bind(&changes.slug)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| handle_db_error(e, "Category", &changes.slug))
    }

    async fn update_category(
        &self,
        id: Uuid,
        changes: CategoryChanges,
    ) -> Result<Option<Category>> {
        let mut tx = self.pool.begin().await?;

        // Serializes re-parenting so two moves cannot each pass the ancestry check
        sqlx::query("LOCK TABLE categories IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        if let Some(parent_id) = changes.parent_id {
            let creates_cycle: bool = sqlx::query_scalar(
                r#"
                WITH RECURSIVE ancestors AS (
                    SELECT id, parent_id FROM categories WHERE id = $1
                    UNION
                    SELECT c.id, c.parent_id
                    FROM categories c JOIN ancestors a ON c.id = a.parent_id
                )
                SELECT EXISTS (SELECT 1 FROM ancestors WHERE id = $2)
                "#,
            )
            .bind(parent_id)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            if creates_cycle {
                return Err(cycle_error(id, parent_id));
            }
        }

        let query = format!(
            r#"
            UPDATE categories
            SET parent_id = $2, name = $3, slug = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        );

        let category = sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .bind(changes.parent_id)
            .bind(&changes.name)
            .bind(&changes.slug)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| handle_db_error(e, "Category", &changes.slug))?;

        tx.commit().await?;
        Ok(category)
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<Category>> {
        let query = format!("SELECT {} FROM categories WHERE id = $1", CATEGORY_COLUMNS);

        Ok(sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let query = format!("SELECT {} FROM categories WHERE slug = $1", CATEGORY_COLUMNS);

        Ok(sqlx::query_as::<_, Category>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let query = format!(
            "SELECT {} FROM categories ORDER BY name, id",
            CATEGORY_COLUMNS
        );

        sqlx::query_as::<_, Category>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list categories: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn delete_category(&self, id: Uuid) -> Result<Option<CascadeSummary>> {
        let mut tx = self.pool.begin().await?;

        // UNION (not UNION ALL) keeps the walk finite on a corrupt cyclic chain
        let (categories, products, image_keys): (i64, i64, Vec<String>) = sqlx::query_as(
            r#"
            WITH RECURSIVE subtree AS (
                SELECT id FROM categories WHERE id = $1
                UNION
                SELECT c.id FROM categories c JOIN subtree s ON c.parent_id = s.id
            ),
            doomed AS (
                SELECT image FROM products WHERE category_id IN (SELECT id FROM subtree)
            )
            SELECT
                (SELECT COUNT(*) FROM subtree),
                (SELECT COUNT(*) FROM doomed),
                COALESCE(
                    (SELECT ARRAY_AGG(image) FROM doomed WHERE image IS NOT NULL),
                    ARRAY[]::TEXT[]
                )
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if categories == 0 {
            return Ok(None);
        }

        // Descendant categories and their products go through ON DELETE CASCADE
        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            "Category {} deleted with {} descendants and {} products",
            id,
            categories - 1,
            products
        );

        Ok(Some(CascadeSummary {
            categories: categories as u64,
            products: products as u64,
            image_keys,
        }))
    }

    async fn insert_product(&self, changes: ProductChanges) -> Result<Product> {
        let query = format!(
            r#"
            INSERT INTO products (id, category_id, name, slug, description, value)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        );

        sqlx::query_as::<_, Product>(&query)
            .bind(Uuid::now_v7())
            .bind(changes.category_id)
            .bind(&changes.name)
            .bind(&changes.slug)
            .bind(&changes.description)
            .bind(changes.value)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| handle_db_error(e, "Product", &changes.slug))
    }

    async fn update_product(&self, id: Uuid, changes: ProductChanges) -> Result<Option<Product>> {
        let query = format!(
            r#"
            UPDATE products
            SET category_id = $2, name = $3, slug = $4, description = $5, value = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        );

        sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .bind(changes.category_id)
            .bind(&changes.name)
            .bind(&changes.slug)
            .bind(&changes.description)
            .bind(changes.value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| handle_db_error(e, "Product", &changes.slug))
    }

    async fn set_product_image(
        &self,
        id: Uuid,
        image: Option<String>,
    ) -> Result<Option<Product>> {
        let query = format!(
            r#"
            UPDATE products
            SET image = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        );

        let product = sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .bind(&image)
            .fetch_optional(&self.pool)
            .await?;

        debug!("Product {} image set to {:?}", id, image);
        Ok(product)
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>> {
        let query = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);

        Ok(sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_product_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        let query = format!("SELECT {} FROM products WHERE slug = $1", PRODUCT_COLUMNS);

        Ok(sqlx::query_as::<_, Product>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<(Vec<Product>, i64)> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE ($1::uuid IS NULL OR category_id = $1)",
        )
        .bind(filter.category_id)
        .fetch_one(&self.pool)
        .await?;

        let query = format!(
            r#"
            SELECT {}
            FROM products
            WHERE ($1::uuid IS NULL OR category_id = $1)
            ORDER BY name, id
            LIMIT $2 OFFSET $3
            "#,
            PRODUCT_COLUMNS
        );

        let products = sqlx::query_as::<_, Product>(&query)
            .bind(filter.category_id)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list products: {:?}", e);
                AppError::Database(e)
            })?;

        Ok((products, total))
    }

    async fn delete_product(&self, id: Uuid) -> Result<Option<Product>> {
        let query = format!("DELETE FROM products WHERE id = $1 RETURNING {}", PRODUCT_COLUMNS);

        Ok(sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::fmt;

    use rust_decimal::Decimal;
    use sqlx::error::DatabaseError;
    use sqlx::postgres::PgPoolOptions;

    use super::*;
    use crate::core::database;

    #[derive(Debug)]
    struct FakeDbError {
        code: &'static str,
        kind: ErrorKind,
    }

    impl fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "fake database error {}", self.code)
        }
    }

    impl std::error::Error for FakeDbError {}

    impl DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "fake database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.kind {
                ErrorKind::UniqueViolation => ErrorKind::UniqueViolation,
                ErrorKind::ForeignKeyViolation => ErrorKind::ForeignKeyViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn db_error(code: &'static str, kind: ErrorKind) -> sqlx::Error {
        sqlx::Error::Database(Box::new(FakeDbError { code, kind }))
    }

    #[test]
    fn test_handle_db_error_mapping() {
        let err = handle_db_error(
            db_error("23505", ErrorKind::UniqueViolation),
            "Category",
            "shoes",
        );
        assert!(matches!(err, AppError::Conflict(ref msg) if msg.contains("'shoes'")));

        let err = handle_db_error(
            db_error("23503", ErrorKind::ForeignKeyViolation),
            "Category",
            "shoes",
        );
        assert!(matches!(err, AppError::BadRequest(ref msg) if msg.starts_with("Parent category")));

        let err = handle_db_error(
            db_error("23503", ErrorKind::ForeignKeyViolation),
            "Product",
            "mug",
        );
        assert!(matches!(err, AppError::BadRequest(ref msg) if msg.starts_with("Category")));

        let err = handle_db_error(db_error("23514", ErrorKind::CheckViolation), "Product", "mug");
        assert!(matches!(err, AppError::Database(_)));

        let err = handle_db_error(sqlx::Error::RowNotFound, "Product", "mug");
        assert!(matches!(err, AppError::Database(_)));
    }

    /// Store backed by `TEST_DATABASE_URL`, or `None` when no database is configured
    async fn test_store() -> Option<PgCatalogStore> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .unwrap();
        database::run_migrations(&pool).await.unwrap();
        Some(PgCatalogStore::new(pool))
    }

    fn category(name: &str, parent_id: Option<Uuid>) -> CategoryChanges {
        CategoryChanges {
            name: name.to_string(),
            slug: crate::shared::slug::normalize(name),
            parent_id,
        }
    }

    #[tokio::test]
    async fn test_postgres_constraints_and_cascade() {
        let Some(store) = test_store().await else {
            eprintln!("TEST_DATABASE_URL not set, skipping");
            return;
        };
        let run = Uuid::now_v7().simple().to_string();

        let a = store
            .insert_category(category(&format!("A {}", run), None))
            .await
            .unwrap();
        let b = store
            .insert_category(category(&format!("B {}", run), Some(a.id)))
            .await
            .unwrap();

        let err = store
            .insert_category(category(&format!("a {}", run), None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = store
            .insert_category(category(&format!("C {}", run), Some(Uuid::now_v7())))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = store
            .update_category(a.id, category(&format!("A {}", run), Some(b.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let product_slug = format!("p-{}", run);
        let product = store
            .insert_product(ProductChanges {
                category_id: Some(b.id),
                name: "P".to_string(),
                slug: product_slug.clone(),
                description: None,
                value: Decimal::new(1000, 2),
            })
            .await
            .unwrap();
        let image = format!("{}/product/p.png", product_slug);
        store
            .set_product_image(product.id, Some(image.clone()))
            .await
            .unwrap();

        let summary = store.delete_category(a.id).await.unwrap().unwrap();
        assert_eq!(summary.categories, 2);
        assert_eq!(summary.products, 1);
        assert_eq!(summary.image_keys, vec![image]);

        assert!(store.find_category(b.id).await.unwrap().is_none());
        assert!(store.find_product(product.id).await.unwrap().is_none());
        assert!(store.delete_category(a.id).await.unwrap().is_none());
    }
}
