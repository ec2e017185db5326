// Copyright 2025 Cowboy AI, LLC.

//! Registry of member graphs with cache write-through
//!
//! The in-memory index is guarded by a read/write lock that is only held for
//! map access. Writes to one graph id are serialised by a per-id mutex that
//! is held across the cache write, so unrelated ids never wait on each other.

use bytes::Bytes;
use futures::future::join_all;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::cache::CacheService;
use crate::errors::{FederationError, FederationResult};
use crate::graph::{FederatedGraph, GraphRegistryEntry, StoreFactory};
use crate::operation::GraphIdSelection;

/// Read-only list of graph ids
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GraphIds(Arc<[String]>);

impl GraphIds {
    /// Whether the id is listed
    pub fn contains(&self, graph_id: &str) -> bool {
        self.0.iter().any(|id| id == graph_id)
    }

    /// Copy out into an owned vector
    pub fn to_vec(&self) -> Vec<String> {
        self.0.to_vec()
    }
}

impl Deref for GraphIds {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a GraphIds {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<String> for GraphIds {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// What an add did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// New id registered
    Added,
    /// Same id with an identical definition, nothing changed
    Unchanged,
    /// Existing id replaced under the overwrite flag
    Replaced,
}

/// Graphs selected for one operation, with the registry generation they
/// were read at
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    /// Generation the selection was read at
    pub generation: u64,
    /// Selected graphs, in selection order
    pub graphs: Vec<Arc<FederatedGraph>>,
}

/// Member graphs keyed by id
#[derive(Debug)]
pub struct GraphCacheRegistry {
    index: RwLock<IndexMap<String, Arc<FederatedGraph>>>,
    write_guards: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
    cache: Option<Arc<dyn CacheService>>,
    namespace: String,
    generation: AtomicU64,
}

impl GraphCacheRegistry {
    /// Registry writing through to `cache` under `namespace`. Without a
    /// cache the registry is in-memory only.
    pub fn new(cache: Option<Arc<dyn CacheService>>, namespace: impl Into<String>) -> Self {
        Self {
            index: RwLock::new(IndexMap::new()),
            write_guards: StdMutex::new(HashMap::new()),
            cache,
            namespace: namespace.into(),
            generation: AtomicU64::new(0),
        }
    }

    /// Whether graphs persist to a cache service
    pub fn is_cache_backed(&self) -> bool {
        self.cache.is_some()
    }

    /// Bumped on every add or remove that changes the index
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    // Guard clones are only taken and dropped under the map lock, so the
    // strong count seen there is exact.
    fn write_guard(&self, graph_id: &str) -> Arc<Mutex<()>> {
        let mut guards = self
            .write_guards
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // entries left behind by cancelled writers
        guards.retain(|_, guard| Arc::strong_count(guard) > 1);
        guards
            .entry(graph_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn release_guard(&self, graph_id: &str, guard: Arc<Mutex<()>>) {
        let mut guards = self
            .write_guards
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        drop(guard);
        if guards
            .get(graph_id)
            .is_some_and(|remaining| Arc::strong_count(remaining) == 1)
        {
            guards.remove(graph_id);
        }
    }

    #[cfg(test)]
    fn pending_write_guards(&self) -> usize {
        self.write_guards
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Register a graph.
    ///
    /// Re-adding an id with the same schema and store properties does
    /// nothing. A different definition is a conflict unless `overwrite` is
    /// set. The entry reaches the cache before it becomes visible.
    pub async fn add(
        &self,
        graph: FederatedGraph,
        overwrite: bool,
    ) -> FederationResult<AddOutcome> {
        let graph_id = graph.graph_id().to_string();
        let guard = self.write_guard(&graph_id);
        let outcome = {
            let _held = guard.lock().await;
            self.add_locked(graph, overwrite).await
        };
        self.release_guard(&graph_id, guard);
        outcome
    }

    async fn add_locked(
        &self,
        graph: FederatedGraph,
        overwrite: bool,
    ) -> FederationResult<AddOutcome> {
        let graph_id = graph.graph_id().to_string();
        let existing = self.index.read().await.get(&graph_id).cloned();

        let outcome = match existing {
            Some(current) if current.descriptor().same_definition(graph.descriptor()) => {
                debug!(graph_id = %graph_id, "graph already registered with identical definition");
                return Ok(AddOutcome::Unchanged);
            }
            Some(_) if !overwrite => return Err(FederationError::conflict(&graph_id)),
            Some(_) => AddOutcome::Replaced,
            None => AddOutcome::Added,
        };

        self.write_through(graph.entry()).await?;

        {
            let mut index = self.index.write().await;
            index.insert(graph_id.clone(), Arc::new(graph));
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        info!(graph_id = %graph_id, ?outcome, "graph registered");
        Ok(outcome)
    }

    async fn write_through(&self, entry: &GraphRegistryEntry) -> FederationResult<()> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };
        let value = Bytes::from(serde_json::to_vec(entry)?);
        cache
            .put(&self.namespace, entry.graph_id(), value)
            .await
            .map_err(|e| {
                error!(graph_id = %entry.graph_id(), error = %e, "cache write-through failed");
                FederationError::from(e)
            })
    }

    /// Register several graphs. Each id succeeds or fails on its own;
    /// results come back in input order.
    pub async fn add_all(
        &self,
        graphs: Vec<FederatedGraph>,
        overwrite: bool,
    ) -> Vec<(String, FederationResult<AddOutcome>)> {
        let adds = graphs.into_iter().map(|graph| async move {
            let graph_id = graph.graph_id().to_string();
            let outcome = self.add(graph, overwrite).await;
            (graph_id, outcome)
        });
        join_all(adds).await
    }

    /// Unregister a graph and evict it from the cache. Returns whether
    /// anything was removed.
    pub async fn remove(&self, graph_id: &str) -> FederationResult<bool> {
        let guard = self.write_guard(graph_id);
        let outcome = {
            let _held = guard.lock().await;
            self.remove_locked(graph_id).await
        };
        self.release_guard(graph_id, guard);
        outcome
    }

    async fn remove_locked(&self, graph_id: &str) -> FederationResult<bool> {
        if !self.index.read().await.contains_key(graph_id) {
            return Ok(false);
        }

        if let Some(cache) = &self.cache {
            cache.remove(&self.namespace, graph_id).await.map_err(|e| {
                error!(graph_id, error = %e, "cache eviction failed");
                FederationError::from(e)
            })?;
        }

        let removed = {
            let mut index = self.index.write().await;
            let removed = index.shift_remove(graph_id).is_some();
            if removed {
                self.generation.fetch_add(1, Ordering::SeqCst);
            }
            removed
        };
        if removed {
            info!(graph_id, "graph removed");
        }
        Ok(removed)
    }

    /// Graphs for a selection. Default selects graphs enabled by default in
    /// registration order; an explicit list keeps request order and skips
    /// unknown ids.
    pub async fn get(&self, selection: &GraphIdSelection) -> Vec<Arc<FederatedGraph>> {
        self.snapshot(selection).await.graphs
    }

    /// Like [`get`](Self::get), also returning the generation read
    pub async fn snapshot(&self, selection: &GraphIdSelection) -> RegistrySnapshot {
        let index = self.index.read().await;
        let graphs = match selection {
            GraphIdSelection::Default => index
                .values()
                .filter(|graph| graph.entry().enabled_by_default)
                .cloned()
                .collect(),
            GraphIdSelection::Explicit(ids) => ids
                .iter()
                .filter_map(|id| index.get(id).cloned())
                .collect(),
        };
        RegistrySnapshot {
            generation: self.generation(),
            graphs,
        }
    }

    /// Every registered graph in registration order
    pub async fn all(&self) -> Vec<Arc<FederatedGraph>> {
        self.index.read().await.values().cloned().collect()
    }

    /// Whether the id is registered
    pub async fn contains(&self, graph_id: &str) -> bool {
        self.index.read().await.contains_key(graph_id)
    }

    /// Repopulate the index from the cache, building each backend with
    /// `factory`. Returns how many graphs were restored.
    pub async fn restore_from_cache(&self, factory: &StoreFactory) -> FederationResult<usize> {
        let Some(cache) = &self.cache else {
            return Ok(0);
        };

        let keys = cache.get_all_keys(&self.namespace).await?;
        let mut restored = 0;
        for key in keys {
            let Some(bytes) = cache.get(&self.namespace, &key).await? else {
                continue;
            };
            let entry: GraphRegistryEntry = match serde_json::from_slice(&bytes) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(graph_id = %key, error = %e, "skipping unreadable cached graph");
                    continue;
                }
            };
            let backend = match factory.create(&entry.descriptor) {
                Ok(backend) => backend,
                Err(e) => {
                    warn!(graph_id = %key, error = %e, "skipping cached graph with unusable store");
                    continue;
                }
            };
            let mut index = self.index.write().await;
            index.insert(entry.graph_id().to_string(), Arc::new(FederatedGraph::new(entry, backend)));
            self.generation.fetch_add(1, Ordering::SeqCst);
            restored += 1;
        }

        info!(restored, namespace = %self.namespace, "restored graphs from cache");
        Ok(restored)
    }
}
