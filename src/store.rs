// Copyright 2025 Cowboy AI, LLC.

//! The federated store: many backend graphs presented as one
//!
//! [`FederatedStore`] owns its registry, visibility filter and dispatcher.
//! Graph management (add, remove, list) is handled here; every other
//! operation is handed to the [`OperationDispatcher`] with the graphs the
//! caller selected and may see.

use futures::future::join_all;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::cache::CacheServiceLoader;
use crate::config::FederatedStoreProperties;
use crate::context::Context;
use crate::dispatch::{FederatedOutput, OperationDispatcher};
use crate::errors::{FederationError, FederationResult};
use crate::graph::{
    FederatedGraph, GraphAccess, GraphDefinition, GraphDescriptor, GraphRegistryEntry,
    StoreFactory,
};
use crate::library::{GraphLibrary, LibraryEntry, LibraryError};
use crate::operation::{AddGraph, GraphIdSelection, Operation, OperationKind};
use crate::registry::{AddOutcome, GraphCacheRegistry, GraphIds, RegistrySnapshot};
use crate::schema::Schema;
use crate::store_properties::StoreProperties;
use crate::store_traits::{StoreTrait, TraitAggregator};
use crate::user::User;
use crate::visibility::VisibilityFilter;

/// Collaborators a store is built with
#[derive(Clone, Default)]
pub struct StoreServices {
    /// Library used to resolve graphs by id
    pub library: Option<Arc<dyn GraphLibrary>>,
    /// Cache service classes
    pub cache_loader: CacheServiceLoader,
    /// Backend store classes
    pub store_factory: StoreFactory,
}

impl StoreServices {
    /// Services with the given library
    pub fn with_library(mut self, library: Arc<dyn GraphLibrary>) -> Self {
        self.library = Some(library);
        self
    }
}

impl fmt::Debug for StoreServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreServices")
            .field("library", &self.library.is_some())
            .field("cache_loader", &self.cache_loader)
            .field("store_factory", &self.store_factory)
            .finish()
    }
}

/// Per-graph outcome of a batch add
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Ids registered or already present with the same definition
    pub added: Vec<String>,
    /// Ids that failed, with why
    pub failed: Vec<(String, FederationError)>,
}

impl BatchReport {
    /// Whether every graph was added
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// The added ids, or the first failure
    pub fn into_result(self) -> FederationResult<Vec<String>> {
        match self.failed.into_iter().next() {
            Some((_, error)) => Err(error),
            None => Ok(self.added),
        }
    }
}

/// Access settings applied to graphs being added
#[derive(Debug, Clone)]
struct AddRequest {
    access: GraphAccess,
    enabled_by_default: bool,
    record_in_library: bool,
}

/// A federation of backend graphs
pub struct FederatedStore {
    store_id: String,
    properties: FederatedStoreProperties,
    registry: GraphCacheRegistry,
    visibility: VisibilityFilter,
    dispatcher: OperationDispatcher,
    library: Option<Arc<dyn GraphLibrary>>,
    store_factory: StoreFactory,
}

impl fmt::Debug for FederatedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FederatedStore")
            .field("store_id", &self.store_id)
            .field("properties", &self.properties)
            .field("registry", &self.registry)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl FederatedStore {
    /// Build a store, connect its cache service and restore cached graphs.
    ///
    /// A schema passed here is ignored; the federated schema always comes
    /// from the member graphs. An unknown or failing cache service class is
    /// a configuration error.
    #[instrument(skip_all, fields(store_id = %store_id.as_ref()))]
    pub async fn initialise(
        store_id: impl AsRef<str>,
        schema: Option<Schema>,
        properties: FederatedStoreProperties,
        services: StoreServices,
    ) -> FederationResult<Self> {
        if schema.is_some() {
            debug!("ignoring schema supplied to a federated store");
        }

        let cache = services.cache_loader.load(&properties).await?;
        let registry = GraphCacheRegistry::new(cache, properties.cache_namespace());
        let restored = registry.restore_from_cache(&services.store_factory).await?;

        let store = Self {
            store_id: store_id.as_ref().to_string(),
            visibility: VisibilityFilter::new(properties.admin_auth().map(str::to_string)),
            dispatcher: OperationDispatcher::new(
                properties.dispatch().clone(),
                TraitAggregator::new(properties.always_on_traits().clone()),
            ),
            registry,
            library: services.library,
            store_factory: services.store_factory,
            properties,
        };
        info!(
            restored,
            cache_backed = store.registry.is_cache_backed(),
            "federated store initialised"
        );
        Ok(store)
    }

    /// Store id
    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    /// Store properties
    pub fn properties(&self) -> &FederatedStoreProperties {
        &self.properties
    }

    /// Graph library, when one was supplied
    pub fn graph_library(&self) -> Option<&Arc<dyn GraphLibrary>> {
        self.library.as_ref()
    }

    /// Whether graphs persist to a cache service
    pub fn is_cache_backed(&self) -> bool {
        self.registry.is_cache_backed()
    }

    /// Add a batch of graphs owned by `owner_user_id`.
    ///
    /// Each definition is resolved and registered on its own, so one bad
    /// definition does not stop the others. Graphs added this way are not
    /// written to the graph library.
    pub async fn add_graphs(
        &self,
        graph_auths: BTreeSet<String>,
        owner_user_id: &str,
        is_public: bool,
        enabled_by_default: Option<bool>,
        definitions: Vec<GraphDefinition>,
    ) -> BatchReport {
        let request = AddRequest {
            access: GraphAccess {
                graph_auths,
                is_public,
                owner_user_id: owner_user_id.to_string(),
            },
            enabled_by_default: enabled_by_default.unwrap_or(true),
            record_in_library: false,
        };

        let adds = definitions.into_iter().map(|definition| {
            let request = request.clone();
            async move {
                let graph_id = definition.graph_id.clone();
                let outcome = match self.build_graph(definition, request).await {
                    Ok(graph) => self.registry.add(graph, false).await,
                    Err(e) => Err(e),
                };
                (graph_id, outcome)
            }
        });

        let mut report = BatchReport::default();
        for (graph_id, outcome) in join_all(adds).await {
            match outcome {
                Ok(_) => report.added.push(graph_id),
                Err(e) => report.failed.push((graph_id, e)),
            }
        }
        if !report.is_complete() {
            warn!(
                added = report.added.len(),
                failed = report.failed.len(),
                "batch add partially failed"
            );
        }
        report
    }

    /// Add one graph on behalf of `user`, who becomes its owner. The
    /// resolved definition is recorded in the graph library, if any.
    #[instrument(skip_all, fields(graph_id = %op.definition.graph_id))]
    pub async fn add_graph(&self, user: &User, op: AddGraph) -> FederationResult<AddOutcome> {
        let request = AddRequest {
            access: GraphAccess {
                graph_auths: op.graph_auths,
                is_public: op.is_public,
                owner_user_id: user.user_id().to_string(),
            },
            enabled_by_default: op.enabled_by_default.unwrap_or(true),
            record_in_library: self.library.is_some(),
        };
        let graph = self.build_graph(op.definition, request).await?;
        let graph_id = graph.graph_id().to_string();
        let schema = graph.schema().clone();
        let store_properties = graph.store_properties().clone();
        let record = graph.entry().recorded_in_library;

        let outcome = self.registry.add(graph, false).await?;
        if let (true, Some(library)) = (record, &self.library) {
            library.add(&graph_id, &schema, &store_properties).await?;
        }
        Ok(outcome)
    }

    async fn build_graph(
        &self,
        definition: GraphDefinition,
        request: AddRequest,
    ) -> FederationResult<FederatedGraph> {
        let graph_id = definition.graph_id.clone();
        let library_entry = match &self.library {
            Some(library) => library.get(&graph_id).await?,
            None => None,
        };

        let schema = self.resolve_schema(&definition, library_entry.as_ref()).await?;
        let store_properties = self
            .resolve_properties(&definition, library_entry.as_ref())
            .await?;
        let missing = |component: &str| FederationError::MissingGraphComponent {
            graph_id: graph_id.clone(),
            component: component.to_string(),
        };
        let schema = schema.ok_or_else(|| missing("Schema"))?;
        let store_properties = store_properties.ok_or_else(|| missing("StoreProperties"))?;

        if let Some(entry) = &library_entry {
            self.check_library_definition(&graph_id, entry, &schema, &store_properties)
                .await?;
        }

        schema.validate().map_err(|errors| FederationError::AddGraph {
            graph_id: graph_id.clone(),
            message: FederationError::InvalidSchema {
                graph_id: graph_id.clone(),
                errors,
            }
            .to_string(),
        })?;

        let descriptor = GraphDescriptor::new(graph_id, schema, store_properties);
        let backend = self.store_factory.create(&descriptor)?;
        // an existing library entry belongs to whoever wrote it
        let entry = GraphRegistryEntry {
            descriptor,
            access: request.access,
            enabled_by_default: request.enabled_by_default,
            recorded_in_library: request.record_in_library && library_entry.is_none(),
        };
        Ok(FederatedGraph::new(entry, backend))
    }

    /// Parent schemas in order, then the inline schema. With neither, the
    /// library's schema for the graph id.
    async fn resolve_schema(
        &self,
        definition: &GraphDefinition,
        library_entry: Option<&LibraryEntry>,
    ) -> FederationResult<Option<Schema>> {
        let mut parts = Vec::new();
        if !definition.parent_schema_ids.is_empty() {
            let library = self.require_library(&definition.graph_id)?;
            let mut missing = Vec::new();
            for schema_id in &definition.parent_schema_ids {
                match library.get_schema(schema_id).await? {
                    Some(schema) => parts.push(schema),
                    None => missing.push(schema_id.as_str()),
                }
            }
            if !missing.is_empty() {
                return Err(FederationError::NotFound(format!(
                    "Schema could not be found in the graphLibrary with id: [{}]",
                    missing.join(", ")
                )));
            }
        }
        if let Some(schema) = &definition.schema {
            parts.push(schema.clone());
        }

        if parts.is_empty() {
            return match (library_entry, &self.library) {
                (Some(entry), Some(library)) => Ok(library.get_schema(&entry.schema_id).await?),
                _ => Ok(None),
            };
        }

        Schema::merge_parts(&parts)
            .map(Some)
            .map_err(|errors| FederationError::InvalidSchema {
                graph_id: definition.graph_id.clone(),
                errors,
            })
    }

    /// Inline properties laid over the parent properties. With neither,
    /// the library's properties for the graph id.
    async fn resolve_properties(
        &self,
        definition: &GraphDefinition,
        library_entry: Option<&LibraryEntry>,
    ) -> FederationResult<Option<StoreProperties>> {
        let parent = match &definition.parent_properties_id {
            Some(properties_id) => {
                let library = self.require_library(&definition.graph_id)?;
                let found = library.get_properties(properties_id).await?;
                Some(found.ok_or_else(|| {
                    FederationError::NotFound(format!(
                        "Store properties could not be found in the graphLibrary with id: {properties_id}"
                    ))
                })?)
            }
            None => None,
        };

        match (parent, &definition.store_properties) {
            (Some(parent), Some(inline)) => Ok(Some(inline.overlaid_on(&parent))),
            (Some(parent), None) => Ok(Some(parent)),
            (None, Some(inline)) => Ok(Some(inline.clone())),
            (None, None) => match (library_entry, &self.library) {
                (Some(entry), Some(library)) => {
                    Ok(library.get_properties(&entry.properties_id).await?)
                }
                _ => Ok(None),
            },
        }
    }

    async fn check_library_definition(
        &self,
        graph_id: &str,
        entry: &LibraryEntry,
        schema: &Schema,
        store_properties: &StoreProperties,
    ) -> FederationResult<()> {
        let Some(library) = &self.library else {
            return Ok(());
        };
        let overwrite = |component: &str| {
            FederationError::from(LibraryError::Overwrite {
                graph_id: graph_id.to_string(),
                component: component.to_string(),
            })
        };
        if library.get_properties(&entry.properties_id).await?.as_ref() != Some(store_properties) {
            return Err(overwrite("StoreProperties"));
        }
        if library.get_schema(&entry.schema_id).await?.as_ref() != Some(schema) {
            return Err(overwrite("Schema"));
        }
        Ok(())
    }

    fn require_library(&self, graph_id: &str) -> FederationResult<&Arc<dyn GraphLibrary>> {
        self.library.as_ref().ok_or_else(|| {
            FederationError::Library(format!(
                "Graph {graph_id} names library ids but no graph library is configured"
            ))
        })
    }

    /// Remove a graph the user can see. Returns whether anything was
    /// removed; the id may be reused straight away. A library entry the
    /// store wrote when adding the graph is removed with it.
    #[instrument(skip(self, user))]
    pub async fn remove_graph(&self, graph_id: &str, user: &User) -> FederationResult<bool> {
        let selection = GraphIdSelection::Explicit(vec![graph_id.to_string()]);
        let Some(graph) = self.registry.get(&selection).await.into_iter().next() else {
            debug!("no graph to remove");
            return Ok(false);
        };
        if !self.visibility.is_visible(user, graph.access()) {
            return Err(FederationError::Authorization(format!(
                "User {} does not have permission to remove graph {graph_id}",
                user.user_id()
            )));
        }
        let removed = self.registry.remove(graph_id).await?;
        if removed && graph.entry().recorded_in_library {
            if let Some(library) = &self.library {
                library.remove(graph_id).await?;
                debug!("library entry removed");
            }
        }
        Ok(removed)
    }

    /// Graphs selected by a comma separated id list (`None` for the
    /// defaults) that `user` may see, in selection order
    pub async fn get_graphs(&self, user: &User, graph_ids: Option<&str>) -> Vec<Arc<FederatedGraph>> {
        self.visible_snapshot(user, &GraphIdSelection::parse(graph_ids))
            .await
            .graphs
    }

    /// Like [`get_graphs`](Self::get_graphs) with an extra predicate
    pub async fn get_graphs_where<F>(
        &self,
        user: &User,
        graph_ids: Option<&str>,
        filter: F,
    ) -> Vec<Arc<FederatedGraph>>
    where
        F: Fn(&FederatedGraph) -> bool,
    {
        self.get_graphs(user, graph_ids)
            .await
            .into_iter()
            .filter(|graph| filter(graph))
            .collect()
    }

    /// Ids of every registered graph `user` may see, enabled by default or
    /// not, in registration order
    pub async fn get_all_graph_ids(&self, user: &User) -> GraphIds {
        self.visibility
            .filter(user, self.registry.all().await)
            .iter()
            .map(|graph| graph.graph_id().to_string())
            .collect()
    }

    /// Merged schema of the selected visible graphs
    pub async fn get_schema(&self, user: &User, graph_ids: Option<&str>) -> FederationResult<Schema> {
        let snapshot = self
            .visible_snapshot(user, &GraphIdSelection::parse(graph_ids))
            .await;
        self.dispatcher
            .merged_schema(snapshot.generation, &snapshot.graphs)
    }

    /// Traits of the selected visible graphs: shared by all when `current`
    /// is set, offered by any otherwise
    pub async fn get_traits(
        &self,
        user: &User,
        graph_ids: Option<&str>,
        current: bool,
    ) -> BTreeSet<StoreTrait> {
        let graphs = self.get_graphs(user, graph_ids).await;
        self.dispatcher.traits(&graphs, current)
    }

    /// Every trait the federation can route
    pub fn supported_traits(&self) -> BTreeSet<StoreTrait> {
        StoreTrait::all()
    }

    /// Execute an operation for the context's user
    #[instrument(skip_all, fields(store_id = %self.store_id, operation = %operation.name()))]
    pub async fn execute(
        &self,
        operation: &Operation,
        context: &Context,
    ) -> FederationResult<FederatedOutput> {
        let user = context.user();
        match operation.kind() {
            OperationKind::Custom(kind) => Err(FederationError::UnsupportedOperation {
                kind: kind.clone(),
            }),
            OperationKind::AddGraph(op) => {
                self.add_graph(user, (**op).clone()).await?;
                Ok(FederatedOutput::Done)
            }
            OperationKind::RemoveGraph(op) => self
                .remove_graph(&op.graph_id, user)
                .await
                .map(FederatedOutput::Removed),
            OperationKind::GetAllGraphIds => {
                Ok(FederatedOutput::GraphIds(self.get_all_graph_ids(user).await))
            }
            _ => {
                let snapshot = self
                    .visible_snapshot(user, &operation.graph_selection())
                    .await;
                debug!(graphs = snapshot.graphs.len(), "graphs selected");
                self.dispatcher.dispatch(operation, context, snapshot).await
            }
        }
    }

    async fn visible_snapshot(&self, user: &User, selection: &GraphIdSelection) -> RegistrySnapshot {
        let snapshot = self.registry.snapshot(selection).await;
        RegistrySnapshot {
            generation: snapshot.generation,
            graphs: self.visibility.filter(user, snapshot.graphs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::IN_MEMORY_STORE_CLASS;
    use crate::library::{HashMapGraphLibrary, MockGraphLibrary};
    use crate::operation::RemoveGraph;
    use crate::schema::{SchemaElementDefinition, TypeDefinition};
    use pretty_assertions::assert_eq;

    const UNUSUAL_KEY: &str = "unusual.key";

    fn entity_schema() -> Schema {
        Schema::new()
            .entity("BasicEntity", SchemaElementDefinition::entity("vertex.string"))
            .type_definition("vertex.string", TypeDefinition::new("String"))
    }

    fn edge_schema() -> Schema {
        Schema::new()
            .edge(
                "BasicEdge",
                SchemaElementDefinition::edge("vertex.string", "vertex.string", "directed.either"),
            )
            .type_definition("vertex.string", TypeDefinition::new("String"))
            .type_definition("directed.either", TypeDefinition::new("Boolean"))
    }

    fn props() -> StoreProperties {
        StoreProperties::new(IN_MEMORY_STORE_CLASS)
    }

    fn alt_props() -> StoreProperties {
        props().with("memory.note", "alt")
    }

    async fn store_with(library: Arc<dyn GraphLibrary>) -> FederatedStore {
        FederatedStore::initialise(
            "federated",
            None,
            FederatedStoreProperties::default(),
            StoreServices::default().with_library(library),
        )
        .await
        .unwrap()
    }

    async fn seeded_library() -> Arc<HashMapGraphLibrary> {
        let library = Arc::new(HashMapGraphLibrary::new());
        library.add_schema("schemaEntity", entity_schema()).await;
        library.add_schema("schemaEdge", edge_schema()).await;
        library.add_properties("props2", props()).await;
        library.add_properties("propsAlt", alt_props()).await;
        library
    }

    fn add_graph(definition: GraphDefinition) -> AddGraph {
        AddGraph {
            is_public: true,
            ..AddGraph::new(definition)
        }
    }

    #[tokio::test]
    async fn test_add_graph_from_library_ids() {
        let library = seeded_library().await;
        let store = store_with(library.clone()).await;
        let definition = GraphDefinition {
            parent_schema_ids: vec!["schemaEntity".into()],
            parent_properties_id: Some("propsAlt".into()),
            ..GraphDefinition::from_library("acc2")
        };
        store
            .add_graph(&User::unknown(), add_graph(definition))
            .await
            .unwrap();

        let graph = &store.get_graphs(&User::unknown(), Some("acc2")).await[0];
        assert_eq!(graph.schema(), &entity_schema());
        assert_eq!(graph.store_properties(), &alt_props());
        assert!(library.exists("acc2").await);
    }

    #[tokio::test]
    async fn test_whole_graph_from_library() {
        let library = seeded_library().await;
        library.add("acc2", &entity_schema(), &alt_props()).await.unwrap();
        let store = store_with(library).await;

        store
            .add_graph(&User::unknown(), add_graph(GraphDefinition::from_library("acc2")))
            .await
            .unwrap();
        assert_eq!(store.get_graphs(&User::unknown(), None).await.len(), 1);
    }

    #[tokio::test]
    async fn test_removed_graph_id_is_reusable_with_a_library() {
        let library = seeded_library().await;
        let store = store_with(library.clone()).await;
        let context = Context::default();
        let first = add_graph(GraphDefinition::new("g1", entity_schema(), props()));
        store.execute(&first.into(), &context).await.unwrap();
        assert!(library.exists("g1").await);

        let removed = store
            .execute(&RemoveGraph { graph_id: "g1".into() }.into(), &context)
            .await
            .unwrap();
        assert!(matches!(removed, FederatedOutput::Removed(true)));
        assert!(!library.exists("g1").await);

        let second = add_graph(GraphDefinition::new("g1", edge_schema(), props()));
        store.execute(&second.into(), &context).await.unwrap();
        let graph = &store.get_graphs(&User::unknown(), Some("g1")).await[0];
        assert_eq!(graph.schema(), &edge_schema());
        assert_eq!(
            library.get_schema("g1").await.unwrap().as_ref(),
            Some(&edge_schema())
        );
    }

    #[tokio::test]
    async fn test_remove_keeps_library_entries_written_elsewhere() {
        let library = seeded_library().await;
        library.add("acc2", &entity_schema(), &alt_props()).await.unwrap();
        let store = store_with(library.clone()).await;
        store
            .add_graph(&User::unknown(), add_graph(GraphDefinition::from_library("acc2")))
            .await
            .unwrap();

        assert!(store.remove_graph("acc2", &User::unknown()).await.unwrap());
        assert!(library.exists("acc2").await);
    }

    #[tokio::test]
    async fn test_inline_parts_overlay_library_parents() {
        let library = seeded_library().await;
        let store = store_with(library.clone()).await;
        let definition = GraphDefinition {
            graph_id: "acc2".into(),
            schema: Some(edge_schema()),
            store_properties: Some(StoreProperties::default().with(UNUSUAL_KEY, "value")),
            parent_schema_ids: vec!["schemaEntity".into()],
            parent_properties_id: Some("props2".into()),
        };
        store
            .add_graph(&User::unknown(), add_graph(definition))
            .await
            .unwrap();

        let graph = &store.get_graphs(&User::unknown(), None).await[0];
        assert!(graph.store_properties().contains_key(UNUSUAL_KEY));
        assert_eq!(graph.store_properties().store_class(), Some(IN_MEMORY_STORE_CLASS));
        assert!(graph.schema().entities.contains_key("BasicEntity"));
        assert!(graph.schema().edges.contains_key("BasicEdge"));
        let parent = library.get_properties("props2").await.unwrap().unwrap();
        assert!(!parent.contains_key(UNUSUAL_KEY));
    }

    #[tokio::test]
    async fn test_unknown_library_ids() {
        let store = store_with(seeded_library().await).await;

        let bad_schema = GraphDefinition {
            parent_schema_ids: vec!["invalid".into()],
            parent_properties_id: Some("props2".into()),
            ..GraphDefinition::from_library("acc2")
        };
        let err = store
            .add_graph(&User::unknown(), add_graph(bad_schema))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Schema could not be found in the graphLibrary with id: [invalid]"
        );

        let bad_props = GraphDefinition {
            parent_schema_ids: vec!["schemaEdge".into()],
            parent_properties_id: Some("invalid".into()),
            ..GraphDefinition::from_library("acc2")
        };
        let err = store
            .add_graph(&User::unknown(), add_graph(bad_props))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "Store properties could not be found in the graphLibrary with id: invalid"
        );
    }

    #[tokio::test]
    async fn test_missing_components_are_named() {
        let store = store_with(seeded_library().await).await;

        let no_props = GraphDefinition {
            parent_schema_ids: vec!["schemaEdge".into()],
            ..GraphDefinition::from_library("acc2")
        };
        let err = store
            .add_graph(&User::unknown(), add_graph(no_props))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "GraphId acc2 cannot be created without defined/known StoreProperties"
        );

        let no_schema = GraphDefinition {
            parent_properties_id: Some("props2".into()),
            ..GraphDefinition::from_library("acc2")
        };
        let err = store
            .add_graph(&User::unknown(), add_graph(no_schema))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "GraphId acc2 cannot be created without defined/known Schema"
        );
    }

    #[tokio::test]
    async fn test_library_definition_cannot_be_overridden() {
        let library = seeded_library().await;
        library.add("acc2", &entity_schema(), &alt_props()).await.unwrap();
        let store = store_with(library).await;

        let other_props = GraphDefinition {
            parent_properties_id: Some("props2".into()),
            ..GraphDefinition::from_library("acc2")
        };
        let err = store
            .add_graph(&User::unknown(), add_graph(other_props))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(err
            .to_string()
            .contains("Graph: acc2 already exists so you cannot use a different StoreProperties"));

        let other_schema = GraphDefinition {
            parent_schema_ids: vec!["schemaEdge".into()],
            ..GraphDefinition::from_library("acc2")
        };
        let err = store
            .add_graph(&User::unknown(), add_graph(other_schema))
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("Graph: acc2 already exists so you cannot use a different Schema"));
    }

    #[tokio::test]
    async fn test_incomplete_schema_fails_unless_completed_by_another_part() {
        let store = store_with(seeded_library().await).await;
        let incomplete = Schema::new()
            .entity("BasicEntity", SchemaElementDefinition::entity("vertex.string"));
        let err = store
            .add_graph(
                &User::unknown(),
                add_graph(GraphDefinition::new("acc1", incomplete.clone(), props())),
            )
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Error adding graph acc1 to storage due to: "));

        let completed = GraphDefinition {
            parent_schema_ids: vec!["schemaEdge".into()],
            ..GraphDefinition::new("acc1", incomplete, props())
        };
        store
            .add_graph(&User::unknown(), add_graph(completed))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_library_properties_error_propagates_unchanged() {
        let mut library = MockGraphLibrary::new();
        library.expect_get().returning(|_| Ok(None));
        library
            .expect_get_properties()
            .withf(|id: &str| id == "props2")
            .times(1)
            .returning(|_| Err(LibraryError::Backend("test Something went wrong".into())));
        let store = store_with(Arc::new(library)).await;

        let definition = GraphDefinition {
            schema: Some(edge_schema()),
            parent_properties_id: Some("props2".into()),
            ..GraphDefinition::from_library("acc2")
        };
        let err = store
            .add_graph(&User::unknown(), add_graph(definition))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "test Something went wrong");
    }

    #[tokio::test]
    async fn test_library_schema_error_propagates_unchanged() {
        let mut library = MockGraphLibrary::new();
        library.expect_get().returning(|_| Ok(None));
        library
            .expect_get_schema()
            .withf(|id: &str| id == "schemaEntity")
            .times(1)
            .returning(|_| Err(LibraryError::Backend("test Something went wrong".into())));
        let store = store_with(Arc::new(library)).await;

        let definition = GraphDefinition {
            store_properties: Some(alt_props()),
            parent_schema_ids: vec!["schemaEntity".into()],
            ..GraphDefinition::from_library("acc2")
        };
        let err = store
            .add_graph(&User::unknown(), add_graph(definition))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "test Something went wrong");
    }

    #[tokio::test]
    async fn test_unsupported_operation_fails_before_dispatch() {
        let store = store_with(seeded_library().await).await;
        let err = store
            .execute(
                &OperationKind::Custom("OperationImpl".into()).into(),
                &Context::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Operation class OperationImpl is not supported by the FederatedStore."
        );
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn test_supported_traits_are_always_complete() {
        let store = store_with(seeded_library().await).await;
        assert_eq!(store.supported_traits().len(), StoreTrait::ALL.len());
        assert!(store.get_traits(&User::unknown(), None, true).await.is_empty());
    }

    #[tokio::test]
    async fn test_remove_requires_visibility() {
        let store = store_with(seeded_library().await).await;
        let report = store
            .add_graphs(
                BTreeSet::from(["secret".to_string()]),
                "alice",
                false,
                None,
                vec![GraphDefinition::new("g1", entity_schema(), props())],
            )
            .await;
        assert!(report.is_complete());

        let bob = User::with_op_auths("bob", ["public"]);
        let err = store.remove_graph("g1", &bob).await.unwrap_err();
        assert!(matches!(err, FederationError::Authorization(_)));
        assert!(!store.remove_graph("missing", &bob).await.unwrap());

        let alice = User::with_op_auths("alice", Vec::<String>::new());
        assert!(store.remove_graph("g1", &alice).await.unwrap());
        assert!(store.get_all_graph_ids(&alice).await.is_empty());
    }
}
