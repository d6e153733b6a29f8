// src/store/mod.rs

//! Keyed JSON collections.
//!
//! Every collection lives under one key as a JSON-encoded array (or a single
//! JSON value for slots). Mutations rewrite the whole value; readers tolerate
//! missing keys and malformed data by falling back to an empty collection.

pub mod memory;
pub mod sqlite;

use std::{marker::PhantomData, sync::Arc};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;

use crate::error::AppError;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Storage keys, kept identical to the browser build so exported data loads as-is.
pub mod keys {
    pub const EXAMS: &str = "generatedExams";
    pub const RESPONSES: &str = "examResponses";
    pub const USERS: &str = "users";
    pub const SESSION: &str = "authUser";
    pub const PANEL_COLLAPSED: &str = "panelCollapsed";
    pub const REMEMBERED_EMAIL: &str = "rememberedEmail";
}

/// Raw key/value backend holding JSON text.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn put_raw(&self, key: &str, value: &str) -> Result<(), AppError>;
    async fn remove(&self, key: &str) -> Result<(), AppError>;
}

/// Shared handle to a backend plus the write lock serializing read-modify-write cycles.
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn Store>,
    write_lock: Arc<Mutex<()>>,
}

impl Storage {
    pub fn new(backend: impl Store + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Ephemeral storage, used by tests and throwaway runs.
    pub fn memory() -> Self {
        Self::new(MemoryStore::default())
    }

    pub fn backend(&self) -> &dyn Store {
        self.backend.as_ref()
    }

    pub fn collection<T>(&self, key: &'static str) -> Collection<T> {
        Collection {
            storage: self.clone(),
            key,
            _marker: PhantomData,
        }
    }

    pub fn slot<T>(&self, key: &'static str) -> Slot<T> {
        Slot {
            storage: self.clone(),
            key,
            _marker: PhantomData,
        }
    }
}

/// Typed repository over one JSON array.
pub struct Collection<T> {
    storage: Storage,
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            key: self.key,
            _marker: PhantomData,
        }
    }
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn key(&self) -> &'static str {
        self.key
    }

    pub async fn load(&self) -> Result<Vec<T>, AppError> {
        let raw = self.storage.backend.get_raw(self.key).await?;
        Ok(decode_list(self.key, raw.as_deref()))
    }

    pub async fn save(&self, items: &[T]) -> Result<(), AppError> {
        let _guard = self.storage.write_lock.lock().await;
        self.write(items).await
    }

    /// Loads, applies `f`, and rewrites the collection while holding the write lock.
    /// Nothing is written when `f` returns an error.
    pub async fn update<R, F>(&self, f: F) -> Result<R, AppError>
    where
        F: FnOnce(&mut Vec<T>) -> Result<R, AppError>,
    {
        let _guard = self.storage.write_lock.lock().await;
        let mut items = self.load().await?;
        let out = f(&mut items)?;
        self.write(&items).await?;
        Ok(out)
    }

    async fn write(&self, items: &[T]) -> Result<(), AppError> {
        let json = serde_json::to_string(items)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        self.storage.backend.put_raw(self.key, &json).await
    }
}

/// Typed repository over a single JSON value.
pub struct Slot<T> {
    storage: Storage,
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            key: self.key,
            _marker: PhantomData,
        }
    }
}

impl<T> Slot<T>
where
    T: Serialize + DeserializeOwned,
{
    pub async fn get(&self) -> Result<Option<T>, AppError> {
        let Some(raw) = self.storage.backend.get_raw(self.key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::warn!("Ignoring malformed value under '{}': {}", self.key, e);
                Ok(None)
            }
        }
    }

    pub async fn set(&self, value: &T) -> Result<(), AppError> {
        let json = serde_json::to_string(value)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        let _guard = self.storage.write_lock.lock().await;
        self.storage.backend.put_raw(self.key, &json).await
    }

    pub async fn clear(&self) -> Result<(), AppError> {
        let _guard = self.storage.write_lock.lock().await;
        self.storage.backend.remove(self.key).await
    }
}

/// Decodes a stored array, skipping elements that do not fit `T`.
fn decode_list<T: DeserializeOwned>(key: &str, raw: Option<&str>) -> Vec<T> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    let values: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(values) => values,
        Err(e) => {
            tracing::warn!("Treating malformed collection '{}' as empty: {}", key, e);
            return Vec::new();
        }
    };

    values
        .into_iter()
        .enumerate()
        .filter_map(|(idx, value)| match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!("Skipping record {} of '{}': {}", idx, key, e);
                None
            }
        })
        .collect()
}
