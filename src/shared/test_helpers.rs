#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use axum::Router;

#[cfg(test)]
use crate::features::categories::{self, CategoryService};
#[cfg(test)]
use crate::features::products::{self, ProductService};
#[cfg(test)]
use crate::modules::persistence::MemoryCatalogStore;
#[cfg(test)]
use crate::modules::storage::MemoryAssetStorage;

/// Services wired to the in-memory store and asset storage
#[cfg(test)]
pub struct TestCatalog {
    pub assets: Arc<MemoryAssetStorage>,
    pub categories: Arc<CategoryService>,
    pub products: Arc<ProductService>,
}

#[cfg(test)]
impl TestCatalog {
    pub fn new() -> Self {
        let store = Arc::new(MemoryCatalogStore::new());
        let assets = Arc::new(MemoryAssetStorage::new());

        Self {
            categories: Arc::new(CategoryService::new(store.clone(), assets.clone())),
            products: Arc::new(ProductService::new(store, assets.clone())),
            assets,
        }
    }

    /// Category and product routes, as mounted by the server
    pub fn router(&self) -> Router {
        Router::new()
            .merge(categories::routes::routes(Arc::clone(&self.categories)))
            .merge(products::routes::routes(Arc::clone(&self.products)))
    }
}
