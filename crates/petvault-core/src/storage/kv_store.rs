use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

/// Errors produced by key-value storage backends.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// Backend refused the write because it is full.
    #[error("storage quota exceeded for key: {key}")]
    QuotaExceeded { key: String },
    /// Underlying storage failure.
    #[error("storage failure: {reason}")]
    Backend { reason: String },
}

/// String-keyed store holding string values. Stands in for browser local
/// storage; every operation may suspend and may fail.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value for a key, `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value under a key, overwriting any existing entry.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key and its value (idempotent).
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        (**self).delete(key).await
    }
}

/// In-memory store for tests and ephemeral sessions. Clones share the same map.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKeyValueStore {
    inner: Arc<Mutex<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects values longer than `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            inner: Arc::default(),
            quota: Some(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.inner.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(limit) = self.quota {
            if value.len() > limit {
                debug!(key, len = value.len(), limit, "value over quota");
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                });
            }
        }
        self.inner.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.inner.lock().remove(key);
        Ok(())
    }
}
