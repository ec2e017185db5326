// Copyright 2025 Cowboy AI, LLC.

//! Operations accepted by the federated store
//!
//! The set of operation kinds is closed. Kinds without a federated route are
//! carried as [`OperationKind::Custom`] and rejected by name.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::element::Element;
use crate::graph::GraphDefinition;
use crate::schema::View;

/// Operation option carrying a comma separated graph id restriction
pub const KEY_OPERATION_OPTIONS_GRAPH_IDS: &str = "federatedstore.operation.graphIds";

/// Which graphs an operation targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphIdSelection {
    /// Every graph enabled by default
    Default,
    /// Exactly these ids, deduplicated, in request order
    Explicit(Vec<String>),
}

impl GraphIdSelection {
    /// Parse the graph id option. Empty tokens are ignored and duplicates
    /// keep their first position; an empty string selects nothing.
    pub fn parse(csv: Option<&str>) -> Self {
        let Some(csv) = csv else {
            return GraphIdSelection::Default;
        };
        let mut seen = BTreeSet::new();
        let ids = csv
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .filter(|id| seen.insert(id.to_string()))
            .map(str::to_string)
            .collect();
        GraphIdSelection::Explicit(ids)
    }
}

/// Fetch the merged schema
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetSchema;

/// Fetch the federated traits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetTraits {
    /// `true` for traits every selected graph supports, `false` for any
    pub current_traits: bool,
}

impl Default for GetTraits {
    fn default() -> Self {
        Self {
            current_traits: true,
        }
    }
}

/// Read every element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetAllElements {
    /// Optional projection
    pub view: Option<View>,
}

/// Read elements touching the seeds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetElements {
    /// Vertex values to look up
    pub seeds: Vec<Value>,
    /// Optional projection
    pub view: Option<View>,
}

/// Write elements
#[derive(Debug, Clone, PartialEq)]
pub struct AddElements {
    /// Elements to store
    pub elements: Vec<Element>,
    /// Check elements against the graph schema
    pub validate: bool,
    /// Drop invalid elements instead of failing
    pub skip_invalid_elements: bool,
}

impl AddElements {
    /// Validated write of the given elements
    pub fn new(elements: Vec<Element>) -> Self {
        Self {
            elements,
            validate: true,
            skip_invalid_elements: false,
        }
    }
}

/// Register a graph
#[derive(Debug, Clone, PartialEq)]
pub struct AddGraph {
    /// Graph id plus inline or library-resolved schema and properties
    pub definition: GraphDefinition,
    /// Auths granting access to the graph
    pub graph_auths: BTreeSet<String>,
    /// Visible to every user
    pub is_public: bool,
    /// Participates when no graph ids are given. `None` means enabled.
    pub enabled_by_default: Option<bool>,
}

impl AddGraph {
    /// Private graph with no auths
    pub fn new(definition: GraphDefinition) -> Self {
        Self {
            definition,
            graph_auths: BTreeSet::new(),
            is_public: false,
            enabled_by_default: None,
        }
    }
}

/// Unregister a graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveGraph {
    /// Graph to remove
    pub graph_id: String,
}

/// Every kind of operation the store understands
#[derive(Debug, Clone, PartialEq)]
pub enum OperationKind {
    /// See [`GetSchema`]
    GetSchema(GetSchema),
    /// See [`GetTraits`]
    GetTraits(GetTraits),
    /// See [`GetAllElements`]
    GetAllElements(GetAllElements),
    /// See [`GetElements`]
    GetElements(GetElements),
    /// See [`AddElements`]
    AddElements(AddElements),
    /// See [`AddGraph`]
    AddGraph(Box<AddGraph>),
    /// See [`RemoveGraph`]
    RemoveGraph(RemoveGraph),
    /// List graph ids visible to the caller
    GetAllGraphIds,
    /// Any other kind, by name
    Custom(String),
}

impl OperationKind {
    /// Short name of the kind
    pub fn name(&self) -> &str {
        match self {
            OperationKind::GetSchema(_) => "GetSchema",
            OperationKind::GetTraits(_) => "GetTraits",
            OperationKind::GetAllElements(_) => "GetAllElements",
            OperationKind::GetElements(_) => "GetElements",
            OperationKind::AddElements(_) => "AddElements",
            OperationKind::AddGraph(_) => "AddGraph",
            OperationKind::RemoveGraph(_) => "RemoveGraph",
            OperationKind::GetAllGraphIds => "GetAllGraphIds",
            OperationKind::Custom(name) => name,
        }
    }

    /// View attached to a read, if any
    pub fn view(&self) -> Option<&View> {
        match self {
            OperationKind::GetAllElements(op) => op.view.as_ref(),
            OperationKind::GetElements(op) => op.view.as_ref(),
            _ => None,
        }
    }
}

/// An operation plus its string options
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    kind: OperationKind,
    options: BTreeMap<String, String>,
}

impl Operation {
    /// Operation with no options
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            options: BTreeMap::new(),
        }
    }

    /// Set an option, returning the operation
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Restrict the operation to a comma separated list of graph ids
    pub fn graph_ids(self, csv: impl Into<String>) -> Self {
        self.option(KEY_OPERATION_OPTIONS_GRAPH_IDS, csv)
    }

    /// Operation kind and payload
    pub fn kind(&self) -> &OperationKind {
        &self.kind
    }

    /// Short name of the kind
    pub fn name(&self) -> &str {
        self.kind.name()
    }

    /// All options
    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    /// Look up one option
    pub fn get_option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Graph selection carried by the options
    pub fn graph_selection(&self) -> GraphIdSelection {
        GraphIdSelection::parse(self.get_option(KEY_OPERATION_OPTIONS_GRAPH_IDS))
    }

    /// Same options, different payload
    pub fn with_kind(&self, kind: OperationKind) -> Self {
        Self {
            kind,
            options: self.options.clone(),
        }
    }
}

impl From<OperationKind> for Operation {
    fn from(kind: OperationKind) -> Self {
        Operation::new(kind)
    }
}

impl From<GetSchema> for Operation {
    fn from(op: GetSchema) -> Self {
        Operation::new(OperationKind::GetSchema(op))
    }
}

impl From<GetTraits> for Operation {
    fn from(op: GetTraits) -> Self {
        Operation::new(OperationKind::GetTraits(op))
    }
}

impl From<GetAllElements> for Operation {
    fn from(op: GetAllElements) -> Self {
        Operation::new(OperationKind::GetAllElements(op))
    }
}

impl From<GetElements> for Operation {
    fn from(op: GetElements) -> Self {
        Operation::new(OperationKind::GetElements(op))
    }
}

impl From<AddElements> for Operation {
    fn from(op: AddElements) -> Self {
        Operation::new(OperationKind::AddElements(op))
    }
}

impl From<AddGraph> for Operation {
    fn from(op: AddGraph) -> Self {
        Operation::new(OperationKind::AddGraph(Box::new(op)))
    }
}

impl From<RemoveGraph> for Operation {
    fn from(op: RemoveGraph) -> Self {
        Operation::new(OperationKind::RemoveGraph(op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn explicit(ids: &[&str]) -> GraphIdSelection {
        GraphIdSelection::Explicit(ids.iter().map(|s| s.to_string()).collect())
    }

    #[test_case(None, GraphIdSelection::Default ; "absent option selects defaults")]
    #[test_case(Some(""), explicit(&[]) ; "empty string selects nothing")]
    #[test_case(Some("id1,id2"), explicit(&["id1", "id2"]) ; "plain list")]
    #[test_case(Some(",id2,id4"), explicit(&["id2", "id4"]) ; "leading comma ignored")]
    #[test_case(Some("id1,,id2,"), explicit(&["id1", "id2"]) ; "embedded empty tokens ignored")]
    #[test_case(Some("id2,id1,id2"), explicit(&["id2", "id1"]) ; "duplicates keep first position")]
    #[test_case(Some(" id1 , id2 "), explicit(&["id1", "id2"]) ; "whitespace trimmed")]
    #[test_case(Some(","), explicit(&[]) ; "only separators selects nothing")]
    fn test_graph_id_selection(csv: Option<&str>, expected: GraphIdSelection) {
        assert_eq!(GraphIdSelection::parse(csv), expected);
    }

    #[test]
    fn test_options_travel_with_operation() {
        let op = Operation::from(GetAllElements::default()).graph_ids("a,b");
        assert_eq!(op.get_option(KEY_OPERATION_OPTIONS_GRAPH_IDS), Some("a,b"));
        assert_eq!(op.graph_selection(), explicit(&["a", "b"]));

        let narrowed = op.with_kind(OperationKind::GetSchema(GetSchema));
        assert_eq!(narrowed.name(), "GetSchema");
        assert_eq!(narrowed.options(), op.options());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(OperationKind::GetAllGraphIds.name(), "GetAllGraphIds");
        assert_eq!(OperationKind::Custom("Count".into()).name(), "Count");
        assert_eq!(
            Operation::from(AddElements::new(vec![])).name(),
            "AddElements"
        );
    }
}
