// Copyright 2025 Cowboy AI, LLC.

//! Builds backend graphs from their store class

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::backend::{BackendGraph, GraphError};
use super::memory::{InMemoryGraph, IN_MEMORY_STORE_CLASS};
use super::GraphDescriptor;
use crate::errors::{FederationError, FederationResult};
use crate::store_properties::STORE_CLASS_KEY;

/// Constructor for one store class
pub type StoreConstructor =
    Arc<dyn Fn(&GraphDescriptor) -> Result<Arc<dyn BackendGraph>, GraphError> + Send + Sync>;

/// Maps store class names to backend constructors
#[derive(Clone)]
pub struct StoreFactory {
    constructors: HashMap<String, StoreConstructor>,
}

impl StoreFactory {
    /// Factory knowing only the in-memory store
    pub fn new() -> Self {
        let mut factory = Self::empty();
        factory.register(IN_MEMORY_STORE_CLASS, |descriptor| {
            Ok(Arc::new(InMemoryGraph::from_descriptor(descriptor)?) as Arc<dyn BackendGraph>)
        });
        factory
    }

    /// Factory with no store classes
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register or replace a store class
    pub fn register<F>(&mut self, store_class: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&GraphDescriptor) -> Result<Arc<dyn BackendGraph>, GraphError> + Send + Sync + 'static,
    {
        self.constructors
            .insert(store_class.into(), Arc::new(constructor));
        self
    }

    /// Whether the store class is known
    pub fn supports(&self, store_class: &str) -> bool {
        self.constructors.contains_key(store_class)
    }

    /// Build the backend for a descriptor
    pub fn create(&self, descriptor: &GraphDescriptor) -> FederationResult<Arc<dyn BackendGraph>> {
        let add_graph_error = |message: String| FederationError::AddGraph {
            graph_id: descriptor.graph_id.clone(),
            message,
        };
        let store_class = descriptor
            .store_properties
            .store_class()
            .ok_or_else(|| add_graph_error(format!("Store properties do not define {STORE_CLASS_KEY}")))?;
        let constructor = self
            .constructors
            .get(store_class)
            .ok_or_else(|| add_graph_error(format!("Unknown store class {store_class}")))?;
        constructor(descriptor).map_err(|e| add_graph_error(e.to_string()))
    }
}

impl Default for StoreFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StoreFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut classes: Vec<_> = self.constructors.keys().collect();
        classes.sort();
        f.debug_struct("StoreFactory")
            .field("store_classes", &classes)
            .finish()
    }
}
