// Copyright 2025 Cowboy AI, LLC.

//! Cache services persisting registered graphs
//!
//! A [`CacheService`] is a namespaced key/value store. The store picks one by
//! class name through a [`CacheServiceLoader`] owned by the store instance.

pub mod hashmap;
pub mod nats_kv;

pub use hashmap::{HashMapCacheService, HASHMAP_CACHE_SERVICE_CLASS};
pub use nats_kv::{NatsConfig, NatsKvCacheService, NATS_KV_CACHE_SERVICE_CLASS};

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::FederatedStoreProperties;
use crate::errors::FederationError;

/// Errors raised by cache services
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// Service has been shut down or was never set
    #[error("Cache service is unavailable")]
    Unavailable,

    /// Backend failure
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// Service could not be constructed
    #[error("Failed to instantiate cache using class {class}: {reason}")]
    Instantiation {
        /// Requested class name
        class: String,
        /// Why construction failed
        reason: String,
    },
}

impl From<CacheError> for FederationError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Unavailable => FederationError::CacheUnavailable,
            CacheError::Backend(message) => FederationError::Cache(message),
            instantiation @ CacheError::Instantiation { .. } => {
                FederationError::Configuration(instantiation.to_string())
            }
        }
    }
}

/// Namespaced key/value storage
#[async_trait]
pub trait CacheService: Send + Sync + fmt::Debug {
    /// Store a value
    async fn put(&self, namespace: &str, key: &str, value: Bytes) -> Result<(), CacheError>;

    /// Fetch a value
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Bytes>, CacheError>;

    /// Every key in a namespace
    async fn get_all_keys(&self, namespace: &str) -> Result<BTreeSet<String>, CacheError>;

    /// Delete a key. Missing keys are not an error.
    async fn remove(&self, namespace: &str, key: &str) -> Result<(), CacheError>;
}

/// Builds a cache service from the store properties
pub type CacheConstructor = Arc<
    dyn Fn(&FederatedStoreProperties) -> BoxFuture<'static, Result<Arc<dyn CacheService>, CacheError>>
        + Send
        + Sync,
>;

/// Resolves a cache service class name to a constructor
#[derive(Clone)]
pub struct CacheServiceLoader {
    constructors: HashMap<String, CacheConstructor>,
}

impl CacheServiceLoader {
    /// Loader knowing the hash map and NATS key/value services
    pub fn new() -> Self {
        let mut loader = Self::empty();
        loader.register(HASHMAP_CACHE_SERVICE_CLASS, |_| {
            Box::pin(async {
                Ok::<_, CacheError>(Arc::new(HashMapCacheService::new()) as Arc<dyn CacheService>)
            })
        });
        loader.register(NATS_KV_CACHE_SERVICE_CLASS, |properties| {
            let config = NatsConfig::from_extra(properties.extra());
            Box::pin(async move {
                let service = NatsKvCacheService::connect(config).await?;
                Ok::<_, CacheError>(Arc::new(service) as Arc<dyn CacheService>)
            })
        });
        loader
    }

    /// Loader with no classes
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register or replace a class
    pub fn register<F>(&mut self, class: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&FederatedStoreProperties) -> BoxFuture<'static, Result<Arc<dyn CacheService>, CacheError>>
            + Send
            + Sync
            + 'static,
    {
        self.constructors.insert(class.into(), Arc::new(constructor));
        self
    }

    /// Build the configured service. `None` when no class is configured.
    pub async fn load(
        &self,
        properties: &FederatedStoreProperties,
    ) -> Result<Option<Arc<dyn CacheService>>, CacheError> {
        let Some(class) = properties.cache_service_class() else {
            info!("no cache service configured, graphs will not persist");
            return Ok(None);
        };
        let constructor = self
            .constructors
            .get(class)
            .ok_or_else(|| CacheError::Instantiation {
                class: class.to_string(),
                reason: "unknown cache service class".to_string(),
            })?;
        let service = constructor(properties)
            .await
            .map_err(|e| match e {
                instantiation @ CacheError::Instantiation { .. } => instantiation,
                other => CacheError::Instantiation {
                    class: class.to_string(),
                    reason: other.to_string(),
                },
            })?;
        info!(class, "cache service loaded");
        Ok(Some(service))
    }
}

impl Default for CacheServiceLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CacheServiceLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut classes: Vec<_> = self.constructors.keys().collect();
        classes.sort();
        f.debug_struct("CacheServiceLoader")
            .field("classes", &classes)
            .finish()
    }
}
