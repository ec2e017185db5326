// Copyright 2025 Cowboy AI, LLC.

//! Contract between the federation layer and a single backend graph

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use crate::context::Context;
use crate::element::Element;
use crate::operation::Operation;
use crate::schema::Schema;
use crate::store_traits::StoreTrait;

/// Errors raised by a backend graph
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphError {
    /// Element does not fit the graph's schema
    #[error("Invalid element: {0}")]
    InvalidElement(String),

    /// Backend has no handler for the operation
    #[error("Operation {0} is not supported by this graph")]
    Unsupported(String),

    /// Backend failed while executing
    #[error("Execution failed: {0}")]
    Execution(String),

    /// Backend could not be built from its properties
    #[error("Store construction failed: {0}")]
    Construction(String),
}

/// Lazy sequence of elements from one graph. Dropping it releases the
/// underlying cursor.
pub type ElementCursor = BoxStream<'static, Result<Element, GraphError>>;

/// Result of executing an operation against one graph
pub enum GraphOutput {
    /// Elements, pulled on demand
    Elements(ElementCursor),
    /// The graph's schema
    Schema(Schema),
    /// The graph's traits
    Traits(BTreeSet<StoreTrait>),
    /// Number of elements written
    Written(usize),
}

impl fmt::Debug for GraphOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphOutput::Elements(_) => f.write_str("Elements(..)"),
            GraphOutput::Schema(schema) => f.debug_tuple("Schema").field(schema).finish(),
            GraphOutput::Traits(traits) => f.debug_tuple("Traits").field(traits).finish(),
            GraphOutput::Written(count) => f.debug_tuple("Written").field(count).finish(),
        }
    }
}

/// A backend graph: executes operations against its own storage
#[async_trait]
pub trait BackendGraph: Send + Sync + fmt::Debug {
    /// Id the graph was registered under
    fn graph_id(&self) -> &str;

    /// The graph's own schema
    fn schema(&self) -> &Schema;

    /// Capabilities the graph advertises
    fn traits(&self) -> BTreeSet<StoreTrait>;

    /// Execute an operation on behalf of the context's user
    async fn execute(
        &self,
        operation: &Operation,
        context: &Context,
    ) -> Result<GraphOutput, GraphError>;
}
