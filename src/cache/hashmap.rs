// Copyright 2025 Cowboy AI, LLC.

//! Process-local cache service

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::info;

use super::{CacheError, CacheService};

/// Class name of [`HashMapCacheService`]
pub const HASHMAP_CACHE_SERVICE_CLASS: &str = "HashMapCacheService";

/// Cache held in nested hash maps, one per namespace
#[derive(Debug, Default)]
pub struct HashMapCacheService {
    namespaces: RwLock<HashMap<String, HashMap<String, Bytes>>>,
    shut_down: AtomicBool,
}

impl HashMapCacheService {
    /// Empty, running service
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry and refuse further calls
    pub async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        self.namespaces.write().await.clear();
        info!("hash map cache service shut down");
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn ensure_running(&self) -> Result<(), CacheError> {
        if self.is_shut_down() {
            Err(CacheError::Unavailable)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheService for HashMapCacheService {
    async fn put(&self, namespace: &str, key: &str, value: Bytes) -> Result<(), CacheError> {
        self.ensure_running()?;
        self.namespaces
            .write()
            .await
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Bytes>, CacheError> {
        self.ensure_running()?;
        Ok(self
            .namespaces
            .read()
            .await
            .get(namespace)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn get_all_keys(&self, namespace: &str) -> Result<BTreeSet<String>, CacheError> {
        self.ensure_running()?;
        Ok(self
            .namespaces
            .read()
            .await
            .get(namespace)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<(), CacheError> {
        self.ensure_running()?;
        if let Some(entries) = self.namespaces.write().await.get_mut(namespace) {
            entries.remove(key);
        }
        Ok(())
    }
}
