// src/store/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::Store;
use crate::error::AppError;

/// In-process store. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put_raw(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), AppError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
