// Copyright 2025 Cowboy AI, LLC.

//! Member graphs of a federated store

pub mod backend;
pub mod factory;
pub mod memory;

pub use backend::{BackendGraph, ElementCursor, GraphError, GraphOutput};
pub use factory::StoreFactory;
pub use memory::{InMemoryGraph, IN_MEMORY_STORE_CLASS};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::schema::Schema;
use crate::store_properties::StoreProperties;
use crate::user::UNKNOWN_USER_ID;

/// Identity and configuration of one backend graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GraphDescriptor {
    /// Unique graph id
    pub graph_id: String,
    /// Groups and types the graph holds
    pub schema: Schema,
    /// Backend engine configuration
    pub store_properties: StoreProperties,
}

impl GraphDescriptor {
    /// Describe a graph
    pub fn new(
        graph_id: impl Into<String>,
        schema: Schema,
        store_properties: StoreProperties,
    ) -> Self {
        Self {
            graph_id: graph_id.into(),
            schema,
            store_properties,
        }
    }

    /// Whether `other` has the same schema and store properties
    pub fn same_definition(&self, other: &GraphDescriptor) -> bool {
        self.schema == other.schema && self.store_properties == other.store_properties
    }
}

/// Who may see and use a graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GraphAccess {
    /// Auths granting access. Empty means no restriction.
    #[serde(default)]
    pub graph_auths: BTreeSet<String>,
    /// Visible to every user
    #[serde(default)]
    pub is_public: bool,
    /// User that added the graph
    pub owner_user_id: String,
}

impl Default for GraphAccess {
    fn default() -> Self {
        Self {
            graph_auths: BTreeSet::new(),
            is_public: false,
            owner_user_id: UNKNOWN_USER_ID.to_string(),
        }
    }
}

/// A descriptor as held by the registry and written to the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GraphRegistryEntry {
    /// Graph identity and configuration
    pub descriptor: GraphDescriptor,
    /// Access rules
    pub access: GraphAccess,
    /// Participates when an operation names no graph ids
    pub enabled_by_default: bool,
    /// The graph library entry for this id was written by the store and
    /// is removed with the graph
    #[serde(default)]
    pub recorded_in_library: bool,
}

impl GraphRegistryEntry {
    /// Entry enabled by default with default access
    pub fn new(descriptor: GraphDescriptor) -> Self {
        Self {
            descriptor,
            access: GraphAccess::default(),
            enabled_by_default: true,
            recorded_in_library: false,
        }
    }

    /// Graph id
    pub fn graph_id(&self) -> &str {
        &self.descriptor.graph_id
    }
}

/// A requested graph, before schema and properties are resolved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphDefinition {
    /// Id to register the graph under
    pub graph_id: String,
    /// Inline schema, merged after any parent schemas
    pub schema: Option<Schema>,
    /// Inline properties, laid over any parent properties
    pub store_properties: Option<StoreProperties>,
    /// Library schema ids merged in order
    pub parent_schema_ids: Vec<String>,
    /// Library properties id used as the base
    pub parent_properties_id: Option<String>,
}

impl GraphDefinition {
    /// Definition with inline schema and properties
    pub fn new(
        graph_id: impl Into<String>,
        schema: Schema,
        store_properties: StoreProperties,
    ) -> Self {
        Self {
            graph_id: graph_id.into(),
            schema: Some(schema),
            store_properties: Some(store_properties),
            ..Default::default()
        }
    }

    /// Definition resolved entirely from the graph library
    pub fn from_library(graph_id: impl Into<String>) -> Self {
        Self {
            graph_id: graph_id.into(),
            ..Default::default()
        }
    }
}

/// A registered graph with its live backend
#[derive(Debug, Clone)]
pub struct FederatedGraph {
    entry: GraphRegistryEntry,
    backend: Arc<dyn BackendGraph>,
}

impl FederatedGraph {
    /// Pair an entry with its backend
    pub fn new(entry: GraphRegistryEntry, backend: Arc<dyn BackendGraph>) -> Self {
        Self { entry, backend }
    }

    /// Graph id
    pub fn graph_id(&self) -> &str {
        self.entry.graph_id()
    }

    /// Registry entry
    pub fn entry(&self) -> &GraphRegistryEntry {
        &self.entry
    }

    /// Identity and configuration
    pub fn descriptor(&self) -> &GraphDescriptor {
        &self.entry.descriptor
    }

    /// Access rules
    pub fn access(&self) -> &GraphAccess {
        &self.entry.access
    }

    /// Declared schema
    pub fn schema(&self) -> &Schema {
        &self.entry.descriptor.schema
    }

    /// Store properties
    pub fn store_properties(&self) -> &StoreProperties {
        &self.entry.descriptor.store_properties
    }

    /// Backend executing operations for this graph
    pub fn backend(&self) -> &Arc<dyn BackendGraph> {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaElementDefinition, TypeDefinition};

    fn descriptor(store_class: &str) -> GraphDescriptor {
        GraphDescriptor::new(
            "g1",
            Schema::new()
                .entity("BasicEntity", SchemaElementDefinition::entity("vertex.string"))
                .type_definition("vertex.string", TypeDefinition::new("String")),
            StoreProperties::new(store_class),
        )
    }

    #[test]
    fn test_same_definition_compares_schema_and_properties() {
        assert!(descriptor("InMemoryStore").same_definition(&descriptor("InMemoryStore")));
        assert!(!descriptor("InMemoryStore").same_definition(&descriptor("OtherStore")));
    }

    #[test]
    fn test_entry_serialises_for_the_cache() {
        let mut entry = GraphRegistryEntry::new(descriptor("InMemoryStore"));
        entry.access.graph_auths.insert("team".to_string());
        entry.access.owner_user_id = "alice".to_string();

        let bytes = serde_json::to_vec(&entry).unwrap();
        let back: GraphRegistryEntry = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, entry);
        assert_eq!(back.graph_id(), "g1");
    }
}
