// Copyright 2025 Cowboy AI, LLC.

//! # CIM Federated Store
//!
//! A federation layer that presents many independently configured backend
//! graphs as one logical graph.
//!
//! Each member graph keeps its own schema, store properties and storage
//! engine. The federated store:
//! - **Registers** graphs in a [`GraphCacheRegistry`], writing each one
//!   through to a [`CacheService`] so graphs survive a restart
//! - **Filters** graphs per caller with a [`VisibilityFilter`] over graph
//!   auths, ownership and an optional admin auth
//! - **Merges** the selected graphs' schemas with a [`SchemaMerger`] that
//!   names every conflicting graph
//! - **Aggregates** traits with a [`TraitAggregator`]
//! - **Dispatches** reads and writes to every selected graph concurrently
//!   and merges the results into one lazy [`ElementStream`]
//!
//! ## Example
//!
//! ```no_run
//! use cim_federated_store::{
//!     Context, FederatedStore, FederatedStoreProperties, GetAllElements, GraphDefinition,
//!     Operation, Schema, StoreProperties, StoreServices,
//! };
//! use futures::StreamExt;
//! use std::collections::BTreeSet;
//!
//! # async fn run(schema: Schema) -> Result<(), cim_federated_store::FederationError> {
//! let store = FederatedStore::initialise(
//!     "federated",
//!     None,
//!     FederatedStoreProperties::default(),
//!     StoreServices::default(),
//! )
//! .await?;
//!
//! store
//!     .add_graphs(
//!         BTreeSet::new(),
//!         "alice",
//!         true,
//!         None,
//!         vec![GraphDefinition::new("g1", schema, StoreProperties::new("InMemoryStore"))],
//!     )
//!     .await
//!     .into_result()?;
//!
//! let op = Operation::from(GetAllElements::default()).graph_ids("g1");
//! if let Some(mut elements) = store.execute(&op, &Context::default()).await?.into_elements() {
//!     while let Some(element) = elements.next().await {
//!         println!("{element:?}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod context;
mod element;
mod errors;
mod operation;
mod registry;
mod store;
mod store_properties;
mod store_traits;
mod user;
mod visibility;
pub mod cache;
pub mod dispatch;
pub mod graph;
pub mod library;
pub mod schema;

pub use cache::{CacheError, CacheService, CacheServiceLoader, HashMapCacheService};
pub use config::{
    FederatedStoreProperties, DEFAULT_CACHE_NAMESPACE, KEY_ADMIN_AUTH, KEY_ALWAYS_ON_TRAITS,
    KEY_CACHE_NAMESPACE, KEY_CACHE_SERVICE_CLASS, KEY_GRAPH_TIMEOUT_MILLIS,
    KEY_MAX_CONCURRENT_GRAPHS, KEY_SKIP_INVALID_GRAPHS,
};
pub use context::Context;
pub use dispatch::{
    DispatchConfig, ElementStream, FederatedOutput, GraphFailure, OperationDispatcher,
    WriteReport,
};
pub use element::{Element, ElementGroupKind};
pub use errors::{FederationError, FederationResult};
pub use graph::{
    BackendGraph, FederatedGraph, GraphAccess, GraphDefinition, GraphDescriptor, GraphError,
    GraphOutput, GraphRegistryEntry, InMemoryGraph, StoreFactory, IN_MEMORY_STORE_CLASS,
};
pub use library::{GraphLibrary, HashMapGraphLibrary, LibraryEntry, LibraryError};
pub use operation::{
    AddElements, AddGraph, GetAllElements, GetElements, GetSchema, GetTraits, GraphIdSelection,
    Operation, OperationKind, RemoveGraph, KEY_OPERATION_OPTIONS_GRAPH_IDS,
};
pub use registry::{AddOutcome, GraphCacheRegistry, GraphIds, RegistrySnapshot};
pub use schema::{
    Schema, SchemaElementDefinition, SchemaMerger, TypeDefinition, View, ViewElementDefinition,
};
pub use store::{BatchReport, FederatedStore, StoreServices};
pub use store_properties::{StoreProperties, STORE_CLASS_KEY};
pub use store_traits::{parse_traits, StoreTrait, TraitAggregator};
pub use user::{MutableUser, User, UNKNOWN_USER_ID};
pub use visibility::VisibilityFilter;
