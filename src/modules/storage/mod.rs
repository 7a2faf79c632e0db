//! Asset storage for product images
//!
//! `AssetStorage` is the seam the product service writes through; `MinIOClient`
//! is the S3-compatible implementation used in deployments.

#[cfg(test)]
mod memory;
mod minio_client;

use async_trait::async_trait;

use crate::core::error::AppError;

#[cfg(test)]
pub use memory::MemoryAssetStorage;
pub use minio_client::MinIOClient;

#[async_trait]
pub trait AssetStorage: Send + Sync {
    /// Store `data` at `path`, overwriting any existing object, and return the
    /// key to record on the product. The key is the catalog path itself; any
    /// bucket prefix stays inside the implementation.
    async fn put(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<String, AppError>;

    async fn delete(&self, key: &str) -> Result<(), AppError>;

    /// Retrievable URL for a stored key
    fn url_for(&self, key: &str) -> String;
}
