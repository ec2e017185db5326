// Copyright 2025 Cowboy AI, LLC.

//! Fan-out of operations to member graphs and merging of their results
//!
//! Schema and trait reads are answered from the selected graphs' declared
//! schemas and traits without touching the backends. Element reads and
//! writes run on every selected graph concurrently, bounded by a semaphore,
//! each under its own timeout. Results are always reported in selection
//! order regardless of completion order.

pub mod stream;
mod validation;

pub use stream::{ElementStream, GraphFailure};

use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use crate::context::Context;
use crate::errors::{FederationError, FederationResult};
use crate::graph::{FederatedGraph, GraphOutput};
use crate::operation::{AddElements, Operation, OperationKind};
use crate::registry::{GraphIds, RegistrySnapshot};
use crate::schema::{Schema, SchemaMerger};
use crate::store_traits::{StoreTrait, TraitAggregator};
use validation::{ElementRouting, ViewValidation};

const SCHEMA_CACHE_CAPACITY: usize = 64;

/// Dispatch tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Upper bound on graphs executing at once
    pub max_concurrent_graphs: usize,
    /// Time a graph gets to answer, and to yield each element
    pub graph_timeout: Duration,
    /// Skip graphs a view is invalid for instead of failing the call
    pub skip_invalid_graphs: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_graphs: 8,
            graph_timeout: Duration::from_secs(30),
            skip_invalid_graphs: false,
        }
    }
}

/// Per-graph outcome of a federated write. Graphs that succeeded are not
/// rolled back when others fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Graphs that accepted their elements, in selection order
    pub succeeded: Vec<String>,
    /// Graphs that failed, in selection order
    pub failed: Vec<GraphFailure>,
    /// Elements written across all graphs
    pub written: usize,
}

impl WriteReport {
    /// Whether any graph failed
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Result of a federated operation
#[derive(Debug)]
pub enum FederatedOutput {
    /// Lazy merged elements
    Elements(ElementStream),
    /// Merged schema
    Schema(Schema),
    /// Aggregated traits
    Traits(BTreeSet<StoreTrait>),
    /// Per-graph write outcome
    Write(WriteReport),
    /// Visible graph ids
    GraphIds(GraphIds),
    /// Whether a graph was removed
    Removed(bool),
    /// Operation completed with nothing to return
    Done,
}

impl FederatedOutput {
    /// The element stream, if this is one
    pub fn into_elements(self) -> Option<ElementStream> {
        match self {
            FederatedOutput::Elements(stream) => Some(stream),
            _ => None,
        }
    }

    /// The schema, if this is one
    pub fn into_schema(self) -> Option<Schema> {
        match self {
            FederatedOutput::Schema(schema) => Some(schema),
            _ => None,
        }
    }

    /// The traits, if this is a trait set
    pub fn into_traits(self) -> Option<BTreeSet<StoreTrait>> {
        match self {
            FederatedOutput::Traits(traits) => Some(traits),
            _ => None,
        }
    }

    /// The write report, if this is one
    pub fn into_write_report(self) -> Option<WriteReport> {
        match self {
            FederatedOutput::Write(report) => Some(report),
            _ => None,
        }
    }

    /// The graph ids, if this is a listing
    pub fn into_graph_ids(self) -> Option<GraphIds> {
        match self {
            FederatedOutput::GraphIds(ids) => Some(ids),
            _ => None,
        }
    }
}

type SchemaKey = (u64, Vec<String>);
type Outcome = Result<GraphOutput, GraphFailure>;

/// Executes operations against already selected and visible graphs
pub struct OperationDispatcher {
    config: DispatchConfig,
    semaphore: Arc<Semaphore>,
    traits: TraitAggregator,
    schema_cache: StdMutex<LruCache<SchemaKey, Schema>>,
}

impl std::fmt::Debug for OperationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationDispatcher")
            .field("config", &self.config)
            .field("traits", &self.traits)
            .finish_non_exhaustive()
    }
}

impl OperationDispatcher {
    /// Dispatcher with the given limits and trait aggregation
    pub fn new(config: DispatchConfig, traits: TraitAggregator) -> Self {
        let capacity = NonZeroUsize::new(SCHEMA_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_graphs.max(1))),
            config,
            traits,
            schema_cache: StdMutex::new(LruCache::new(capacity)),
        }
    }

    /// Dispatch settings
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Merged schema of `graphs`, memoised per registry generation and
    /// selection
    pub fn merged_schema(
        &self,
        generation: u64,
        graphs: &[Arc<FederatedGraph>],
    ) -> FederationResult<Schema> {
        let key: SchemaKey = (
            generation,
            graphs.iter().map(|g| g.graph_id().to_string()).collect(),
        );
        if let Some(schema) = self.cached_schema(&key) {
            debug!(generation, "merged schema served from cache");
            return Ok(schema);
        }

        let merged = SchemaMerger::merge(graphs.iter().map(|g| (g.graph_id(), g.schema())))?;
        self.schema_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .put(key, merged.clone());
        Ok(merged)
    }

    fn cached_schema(&self, key: &SchemaKey) -> Option<Schema> {
        self.schema_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    /// Traits every graph supports when `current` is set, otherwise traits
    /// any graph supports
    pub fn traits(&self, graphs: &[Arc<FederatedGraph>], current: bool) -> BTreeSet<StoreTrait> {
        let member_traits = graphs.iter().map(|g| g.backend().traits());
        if current {
            self.traits.intersection(member_traits)
        } else {
            self.traits.union(member_traits)
        }
    }

    /// Run `operation` against the graphs in `snapshot`
    #[instrument(skip_all, fields(operation = %operation.name(), graphs = snapshot.graphs.len()))]
    pub async fn dispatch(
        &self,
        operation: &Operation,
        context: &Context,
        snapshot: RegistrySnapshot,
    ) -> FederationResult<FederatedOutput> {
        match operation.kind() {
            OperationKind::GetSchema(_) => self
                .merged_schema(snapshot.generation, &snapshot.graphs)
                .map(FederatedOutput::Schema),
            OperationKind::GetTraits(op) => Ok(FederatedOutput::Traits(
                self.traits(&snapshot.graphs, op.current_traits),
            )),
            OperationKind::GetAllElements(_) | OperationKind::GetElements(_) => self
                .read(operation, context, snapshot.graphs)
                .await
                .map(FederatedOutput::Elements),
            OperationKind::AddElements(op) => self
                .write(operation, op, context, snapshot.graphs)
                .await
                .map(FederatedOutput::Write),
            other => Err(FederationError::UnsupportedOperation {
                kind: other.name().to_string(),
            }),
        }
    }

    async fn read(
        &self,
        operation: &Operation,
        context: &Context,
        graphs: Vec<Arc<FederatedGraph>>,
    ) -> FederationResult<ElementStream> {
        if graphs.is_empty() {
            return Ok(ElementStream::empty());
        }
        let graphs = self.validated(operation, graphs)?;
        let work = graphs
            .into_iter()
            .map(|graph| (graph, operation.clone()))
            .collect();

        let mut merged = ElementStream::new(self.config.graph_timeout);
        for (graph_id, outcome) in self.fan_out(context, work).await {
            match outcome {
                Ok(GraphOutput::Elements(cursor)) => merged.push_cursor(graph_id, cursor),
                Ok(other) => merged.push_failure(GraphFailure::new(
                    graph_id,
                    format!("expected elements, got {other:?}"),
                )),
                Err(failure) => merged.push_failure(failure),
            }
        }
        Ok(merged)
    }

    fn validated(
        &self,
        operation: &Operation,
        graphs: Vec<Arc<FederatedGraph>>,
    ) -> FederationResult<Vec<Arc<FederatedGraph>>> {
        let outcome = ViewValidation::check(operation.kind().view(), graphs);
        if outcome.failures.is_empty() {
            return Ok(outcome.valid);
        }
        if self.config.skip_invalid_graphs && !outcome.valid.is_empty() {
            warn!(skipped = ?outcome.failed_ids(), "skipping graphs the view is not valid for");
            return Ok(outcome.valid);
        }
        Err(outcome.to_error(operation.name()))
    }

    async fn write(
        &self,
        operation: &Operation,
        op: &AddElements,
        context: &Context,
        graphs: Vec<Arc<FederatedGraph>>,
    ) -> FederationResult<WriteReport> {
        if graphs.is_empty() || op.elements.is_empty() {
            return Ok(WriteReport::default());
        }
        let routing = ElementRouting::route(&op.elements, graphs, op.skip_invalid_elements)?;
        let work = routing
            .per_graph
            .into_iter()
            .map(|(graph, elements)| {
                let narrowed = operation.with_kind(OperationKind::AddElements(AddElements {
                    elements,
                    validate: op.validate,
                    skip_invalid_elements: op.skip_invalid_elements,
                }));
                (graph, narrowed)
            })
            .collect();

        let mut report = WriteReport::default();
        for (graph_id, outcome) in self.fan_out(context, work).await {
            match outcome {
                Ok(output) => {
                    if let GraphOutput::Written(count) = output {
                        report.written += count;
                    }
                    report.succeeded.push(graph_id);
                }
                Err(failure) => report.failed.push(failure),
            }
        }
        if report.has_failures() {
            warn!(
                succeeded = report.succeeded.len(),
                failed = report.failed.len(),
                "federated write partially failed"
            );
        }
        Ok(report)
    }

    /// Execute each graph's operation concurrently and return the outcomes
    /// in the order the work was given
    async fn fan_out(
        &self,
        context: &Context,
        work: Vec<(Arc<FederatedGraph>, Operation)>,
    ) -> Vec<(String, Outcome)> {
        let mut slots: Vec<(String, Outcome)> = work
            .iter()
            .map(|(graph, _)| {
                let graph_id = graph.graph_id().to_string();
                let aborted = GraphFailure::new(graph_id.clone(), "execution task did not complete");
                (graph_id, Err(aborted))
            })
            .collect();

        let mut tasks = JoinSet::new();
        for (position, (graph, operation)) in work.into_iter().enumerate() {
            let semaphore = self.semaphore.clone();
            let context = context.clone();
            let timeout = self.config.graph_timeout;
            tasks.spawn(async move {
                let outcome = execute_one(semaphore, graph, operation, context, timeout).await;
                (position, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, outcome)) => slots[position].1 = outcome,
                Err(e) => warn!(error = %e, "graph execution task failed to join"),
            }
        }
        slots
    }
}

async fn execute_one(
    semaphore: Arc<Semaphore>,
    graph: Arc<FederatedGraph>,
    operation: Operation,
    context: Context,
    timeout: Duration,
) -> Outcome {
    let graph_id = graph.graph_id();
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|_| GraphFailure::new(graph_id, "dispatcher is shut down"))?;

    debug!(graph_id, operation = %operation.name(), "dispatching to graph");
    match tokio::time::timeout(timeout, graph.backend().execute(&operation, &context)).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => {
            warn!(graph_id, error = %e, "graph execution failed");
            Err(GraphFailure::new(graph_id, e.to_string()))
        }
        Err(_) => {
            warn!(graph_id, timeout_ms = timeout.as_millis() as u64, "graph execution timed out");
            Err(GraphFailure::timed_out(graph_id, timeout))
        }
    }
}
