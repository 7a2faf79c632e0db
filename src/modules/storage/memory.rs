use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::AssetStorage;
use crate::core::error::AppError;

/// Stored object: bytes and content type
pub type StoredAsset = (Vec<u8>, String);

/// Asset storage kept in a map, for tests
#[derive(Default)]
pub struct MemoryAssetStorage {
    objects: Mutex<HashMap<String, StoredAsset>>,
}

impl MemoryAssetStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<StoredAsset> {
        self.objects.lock().ok()?.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[async_trait]
impl AssetStorage for MemoryAssetStorage {
    async fn put(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<String, AppError> {
        let key = path.to_string();
        self.objects
            .lock()
            .map_err(|_| AppError::Internal("asset map poisoned".to_string()))?
            .insert(key.clone(), (data, content_type.to_string()));
        Ok(key)
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.objects
            .lock()
            .map_err(|_| AppError::Internal("asset map poisoned".to_string()))?
            .remove(key);
        Ok(())
    }

    fn url_for(&self, key: &str) -> String {
        format!("http://assets.test/public/{}", key)
    }
}
