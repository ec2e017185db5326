// Copyright 2025 Cowboy AI, LLC.

//! Shared library of schemas and store properties
//!
//! A library lets graphs be added by id, or built from named parent schemas
//! and properties, instead of carrying their definitions inline.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::errors::FederationError;
use crate::schema::Schema;
use crate::store_properties::StoreProperties;

/// Errors raised by a graph library
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LibraryError {
    /// Id is unknown to the library
    #[error("{0}")]
    NotFound(String),

    /// Graph id already maps to a different definition
    #[error("Graph: {graph_id} already exists so you cannot use a different {component}")]
    Overwrite {
        /// Graph id being redefined
        graph_id: String,
        /// `Schema` or `StoreProperties`
        component: String,
    },

    /// Library backend failure
    #[error("Graph library error: {0}")]
    Backend(String),
}

impl From<LibraryError> for FederationError {
    fn from(err: LibraryError) -> Self {
        let message = err.to_string();
        match err {
            LibraryError::NotFound(_) => FederationError::NotFound(message),
            LibraryError::Overwrite { graph_id, .. } => FederationError::Conflict {
                graph_id,
                reason: format!(". {message}"),
            },
            LibraryError::Backend(cause) => FederationError::Library(cause),
        }
    }
}

/// Ids of the schema and properties a graph id was registered with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    /// Schema id
    pub schema_id: String,
    /// Store properties id
    pub properties_id: String,
}

/// Storage for named schemas and properties
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GraphLibrary: Send + Sync {
    /// Schema and properties ids registered for a graph id
    async fn get(&self, graph_id: &str) -> Result<Option<LibraryEntry>, LibraryError>;

    /// Schema by id
    async fn get_schema(&self, schema_id: &str) -> Result<Option<Schema>, LibraryError>;

    /// Store properties by id
    async fn get_properties(
        &self,
        properties_id: &str,
    ) -> Result<Option<StoreProperties>, LibraryError>;

    /// Record a graph's definition under its own id. Fails if the id is
    /// already known with a different definition.
    async fn add(
        &self,
        graph_id: &str,
        schema: &Schema,
        properties: &StoreProperties,
    ) -> Result<(), LibraryError>;

    /// Forget a graph id
    async fn remove(&self, graph_id: &str) -> Result<(), LibraryError>;
}

#[derive(Debug, Default)]
struct LibraryTables {
    graphs: HashMap<String, LibraryEntry>,
    schemas: HashMap<String, Schema>,
    properties: HashMap<String, StoreProperties>,
}

/// Process-local graph library
#[derive(Debug, Default)]
pub struct HashMapGraphLibrary {
    tables: RwLock<LibraryTables>,
}

impl HashMapGraphLibrary {
    /// Empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a schema under an id
    pub async fn add_schema(&self, schema_id: impl Into<String>, schema: Schema) {
        self.tables
            .write()
            .await
            .schemas
            .insert(schema_id.into(), schema);
    }

    /// Store properties under an id
    pub async fn add_properties(&self, properties_id: impl Into<String>, properties: StoreProperties) {
        self.tables
            .write()
            .await
            .properties
            .insert(properties_id.into(), properties);
    }

    /// Whether a graph id is known
    pub async fn exists(&self, graph_id: &str) -> bool {
        self.tables.read().await.graphs.contains_key(graph_id)
    }

    /// Drop everything
    pub async fn clear(&self) {
        *self.tables.write().await = LibraryTables::default();
    }
}

#[async_trait]
impl GraphLibrary for HashMapGraphLibrary {
    async fn get(&self, graph_id: &str) -> Result<Option<LibraryEntry>, LibraryError> {
        Ok(self.tables.read().await.graphs.get(graph_id).cloned())
    }

    async fn get_schema(&self, schema_id: &str) -> Result<Option<Schema>, LibraryError> {
        Ok(self.tables.read().await.schemas.get(schema_id).cloned())
    }

    async fn get_properties(
        &self,
        properties_id: &str,
    ) -> Result<Option<StoreProperties>, LibraryError> {
        Ok(self.tables.read().await.properties.get(properties_id).cloned())
    }

    async fn add(
        &self,
        graph_id: &str,
        schema: &Schema,
        properties: &StoreProperties,
    ) -> Result<(), LibraryError> {
        let mut tables = self.tables.write().await;
        if let Some(entry) = tables.graphs.get(graph_id) {
            if tables.properties.get(&entry.properties_id) != Some(properties) {
                return Err(LibraryError::Overwrite {
                    graph_id: graph_id.to_string(),
                    component: "StoreProperties".to_string(),
                });
            }
            if tables.schemas.get(&entry.schema_id) != Some(schema) {
                return Err(LibraryError::Overwrite {
                    graph_id: graph_id.to_string(),
                    component: "Schema".to_string(),
                });
            }
            return Ok(());
        }

        tables.schemas.insert(graph_id.to_string(), schema.clone());
        tables
            .properties
            .insert(graph_id.to_string(), properties.clone());
        tables.graphs.insert(
            graph_id.to_string(),
            LibraryEntry {
                schema_id: graph_id.to_string(),
                properties_id: graph_id.to_string(),
            },
        );
        Ok(())
    }

    async fn remove(&self, graph_id: &str) -> Result<(), LibraryError> {
        self.tables.write().await.graphs.remove(graph_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_registers_schema_and_properties_under_graph_id() {
        let library = HashMapGraphLibrary::new();
        let props = StoreProperties::new("InMemoryStore");
        library.add("g1", &Schema::default(), &props).await.unwrap();

        let entry = library.get("g1").await.unwrap().unwrap();
        assert_eq!(library.get_properties(&entry.properties_id).await.unwrap(), Some(props));
        assert!(library.exists("g1").await);
    }

    #[tokio::test]
    async fn test_redefining_a_graph_is_rejected() {
        let library = HashMapGraphLibrary::new();
        let props = StoreProperties::new("InMemoryStore");
        library.add("g1", &Schema::default(), &props).await.unwrap();
        library.add("g1", &Schema::default(), &props).await.unwrap();

        let err = library
            .add("g1", &Schema::default(), &StoreProperties::new("Other"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Graph: g1 already exists so you cannot use a different StoreProperties"
        );
    }

    #[tokio::test]
    async fn test_clear() {
        let library = HashMapGraphLibrary::new();
        library.add_schema("s1", Schema::default()).await;
        library.clear().await;
        assert_eq!(library.get_schema("s1").await.unwrap(), None);
    }

    #[test]
    fn test_not_found_keeps_message() {
        let err: FederationError =
            LibraryError::NotFound("Schema could not be found in the graphLibrary with id: [s9]".into())
                .into();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Schema could not be found in the graphLibrary with id: [s9]");

        let err: FederationError = LibraryError::Backend("disk full".into()).into();
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn test_overwrite_becomes_a_conflict() {
        let err: FederationError = LibraryError::Overwrite {
            graph_id: "acc2".into(),
            component: "Schema".into(),
        }
        .into();
        assert!(err.is_conflict());
        assert_eq!(
            err.to_string(),
            "User is attempting to overwrite a graph within FederatedStore. GraphId: acc2. \
             Graph: acc2 already exists so you cannot use a different Schema"
        );
    }
}
