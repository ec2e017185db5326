// Copyright 2025 Cowboy AI, LLC.

//! In-memory reference backend

use async_trait::async_trait;
use futures::stream;
use std::collections::BTreeSet;
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{BackendGraph, GraphError, GraphOutput};
use super::GraphDescriptor;
use crate::context::Context;
use crate::element::Element;
use crate::operation::{AddElements, OperationKind, Operation};
use crate::schema::{Schema, View};
use crate::store_traits::{parse_traits, StoreTrait};

/// Store class served by [`InMemoryGraph`]
pub const IN_MEMORY_STORE_CLASS: &str = "InMemoryStore";

/// Store property listing the traits an in-memory graph advertises
pub const MEMORY_TRAITS_KEY: &str = "memory.traits";

/// A graph holding its elements in a vector
#[derive(Debug)]
pub struct InMemoryGraph {
    graph_id: String,
    schema: Schema,
    traits: BTreeSet<StoreTrait>,
    elements: RwLock<Vec<Element>>,
}

impl InMemoryGraph {
    /// Empty graph with the given traits
    pub fn new(graph_id: impl Into<String>, schema: Schema, traits: BTreeSet<StoreTrait>) -> Self {
        Self {
            graph_id: graph_id.into(),
            schema,
            traits,
            elements: RwLock::new(Vec::new()),
        }
    }

    /// Build from a descriptor, reading traits from `memory.traits`
    pub fn from_descriptor(descriptor: &GraphDescriptor) -> Result<Self, GraphError> {
        let traits = match descriptor.store_properties.get(MEMORY_TRAITS_KEY) {
            Some(csv) => {
                parse_traits(csv).map_err(|e| GraphError::Construction(e.to_string()))?
            }
            None => Self::default_traits(),
        };
        Ok(Self::new(
            descriptor.graph_id.clone(),
            descriptor.schema.clone(),
            traits,
        ))
    }

    /// Traits advertised when none are configured
    pub fn default_traits() -> BTreeSet<StoreTrait> {
        [
            StoreTrait::PreAggregationFiltering,
            StoreTrait::PostAggregationFiltering,
            StoreTrait::Transformation,
            StoreTrait::PostTransformationFiltering,
            StoreTrait::StoreValidation,
        ]
        .into_iter()
        .collect()
    }

    /// Number of stored elements
    pub async fn len(&self) -> usize {
        self.elements.read().await.len()
    }

    /// True when nothing is stored
    pub async fn is_empty(&self) -> bool {
        self.elements.read().await.is_empty()
    }

    async fn select<F>(&self, view: Option<&View>, keep: F) -> Vec<Result<Element, GraphError>>
    where
        F: Fn(&Element) -> bool,
    {
        let elements = self.elements.read().await;
        elements
            .iter()
            .filter(|element| keep(element))
            .filter_map(|element| match view {
                Some(view) => view.apply(element),
                None => Some(element.clone()),
            })
            .map(Ok)
            .collect()
    }

    async fn add(&self, op: &AddElements) -> Result<usize, GraphError> {
        let mut accepted = Vec::with_capacity(op.elements.len());
        for element in &op.elements {
            if op.validate {
                if let Err(reason) = self.schema.validate_element(element) {
                    if op.skip_invalid_elements {
                        debug!(graph_id = %self.graph_id, %reason, "skipping invalid element");
                        continue;
                    }
                    return Err(GraphError::InvalidElement(reason));
                }
            }
            accepted.push(element.clone());
        }
        let written = accepted.len();
        self.elements.write().await.extend(accepted);
        Ok(written)
    }
}

#[async_trait]
impl BackendGraph for InMemoryGraph {
    fn graph_id(&self) -> &str {
        &self.graph_id
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn traits(&self) -> BTreeSet<StoreTrait> {
        self.traits.clone()
    }

    async fn execute(
        &self,
        operation: &Operation,
        _context: &Context,
    ) -> Result<GraphOutput, GraphError> {
        match operation.kind() {
            OperationKind::GetAllElements(op) => {
                let items = self.select(op.view.as_ref(), |_| true).await;
                Ok(GraphOutput::Elements(Box::pin(stream::iter(items))))
            }
            OperationKind::GetElements(op) => {
                let items = self
                    .select(op.view.as_ref(), |e| op.seeds.iter().any(|seed| e.touches(seed)))
                    .await;
                Ok(GraphOutput::Elements(Box::pin(stream::iter(items))))
            }
            OperationKind::AddElements(op) => self.add(op).await.map(GraphOutput::Written),
            OperationKind::GetSchema(_) => Ok(GraphOutput::Schema(self.schema.clone())),
            OperationKind::GetTraits(_) => Ok(GraphOutput::Traits(self.traits.clone())),
            other => Err(GraphError::Unsupported(other.name().to_string())),
        }
    }
}
