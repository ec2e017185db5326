// Copyright 2025 Cowboy AI, LLC.

//! Per-graph checks run before anything is dispatched

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::element::Element;
use crate::errors::FederationError;
use crate::graph::FederatedGraph;
use crate::schema::View;

const INVALID_CHAIN: &str = "Operation chain is invalid. Validation errors: \n";

/// Outcome of checking a view against every selected graph
#[derive(Debug, Default)]
pub(crate) struct ViewValidation {
    pub valid: Vec<Arc<FederatedGraph>>,
    pub failures: Vec<(String, Vec<String>)>,
}

impl ViewValidation {
    /// Check `view` against each graph's own schema. Every graph is
    /// checked; failures are collected rather than returned early.
    pub fn check(view: Option<&View>, graphs: Vec<Arc<FederatedGraph>>) -> Self {
        let mut outcome = Self::default();
        for graph in graphs {
            let errors = view.map(|v| v.validate(graph.schema())).unwrap_or_default();
            if errors.is_empty() {
                outcome.valid.push(graph);
            } else {
                outcome.failures.push((graph.graph_id().to_string(), errors));
            }
        }
        outcome
    }

    /// Graph ids that failed, in selection order
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failures.iter().map(|(id, _)| id.as_str()).collect()
    }

    /// One error naming every failing graph and each of its reasons
    pub fn to_error(&self, operation_name: &str) -> FederationError {
        let mut message = String::from(INVALID_CHAIN);
        message.push_str(&format!(
            "View is not valid for graphIds:[{}]",
            self.failed_ids().join(",")
        ));
        for (graph_id, errors) in &self.failures {
            message.push_str(&format!(
                "\n(graphId: {graph_id}) View for operation {operation_name} is not valid. "
            ));
            for error in errors {
                message.push_str(&format!("\n(graphId: {graph_id}) {error}"));
            }
        }
        FederationError::Validation(message)
    }
}

/// Elements assigned to the graphs whose schema defines their group
#[derive(Debug)]
pub(crate) struct ElementRouting {
    pub per_graph: Vec<(Arc<FederatedGraph>, Vec<Element>)>,
}

impl ElementRouting {
    /// Route each element to every graph defining its group. Elements no
    /// graph defines are reported together, or dropped when
    /// `skip_unroutable` is set.
    pub fn route(
        elements: &[Element],
        graphs: Vec<Arc<FederatedGraph>>,
        skip_unroutable: bool,
    ) -> Result<Self, FederationError> {
        let mut per_graph: Vec<(Arc<FederatedGraph>, Vec<Element>)> =
            graphs.into_iter().map(|g| (g, Vec::new())).collect();
        let mut unroutable = BTreeSet::new();

        for element in elements {
            let mut routed = false;
            for (graph, assigned) in per_graph.iter_mut() {
                if graph.schema().defines_group_of(element) {
                    assigned.push(element.clone());
                    routed = true;
                }
            }
            if !routed {
                unroutable.insert(format!("{} group {}", element.kind(), element.group()));
            }
        }

        if skip_unroutable && !unroutable.is_empty() {
            debug!(skipped = ?unroutable, "dropping elements no selected graph defines");
        } else if !unroutable.is_empty() {
            let graph_ids: Vec<&str> = per_graph.iter().map(|(g, _)| g.graph_id()).collect();
            let mut message = String::from(INVALID_CHAIN);
            for group in unroutable {
                message.push_str(&format!(
                    "{group} is not defined by any of the graphIds:[{}]\n",
                    graph_ids.join(",")
                ));
            }
            return Err(FederationError::Validation(message.trim_end().to_string()));
        }

        per_graph.retain(|(_, assigned)| !assigned.is_empty());
        Ok(Self { per_graph })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphDescriptor, GraphRegistryEntry, InMemoryGraph, IN_MEMORY_STORE_CLASS};
    use crate::schema::{Schema, SchemaElementDefinition, TypeDefinition};
    use crate::store_properties::StoreProperties;
    use pretty_assertions::assert_eq;

    fn graph(id: &str, group: &str) -> Arc<FederatedGraph> {
        let schema = Schema::new()
            .entity(group, SchemaElementDefinition::entity("vertex.string"))
            .type_definition("vertex.string", TypeDefinition::new("String"));
        let descriptor =
            GraphDescriptor::new(id, schema.clone(), StoreProperties::new(IN_MEMORY_STORE_CLASS));
        Arc::new(FederatedGraph::new(
            GraphRegistryEntry::new(descriptor),
            Arc::new(InMemoryGraph::new(id, schema, BTreeSet::new())),
        ))
    }

    #[test]
    fn test_all_failures_are_reported_together() {
        let view = View::new().entity("entityA");
        let outcome = ViewValidation::check(
            Some(&view),
            vec![graph("graphA", "entityA"), graph("graphB", "entityB"), graph("graphC", "entityB")],
        );
        assert_eq!(outcome.valid.len(), 1);
        assert_eq!(
            outcome.to_error("GetAllElements").to_string(),
            "Operation chain is invalid. Validation errors: \n\
             View is not valid for graphIds:[graphB,graphC]\n\
             (graphId: graphB) View for operation GetAllElements is not valid. \n\
             (graphId: graphB) Entity group entityA does not exist in the schema\n\
             (graphId: graphC) View for operation GetAllElements is not valid. \n\
             (graphId: graphC) Entity group entityA does not exist in the schema"
        );
    }

    #[test]
    fn test_no_view_is_valid_everywhere() {
        let outcome = ViewValidation::check(None, vec![graph("g1", "a"), graph("g2", "b")]);
        assert_eq!(outcome.valid.len(), 2);
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn test_elements_route_by_group() {
        let routing = ElementRouting::route(
            &[Element::entity("entityA", "A"), Element::entity("entityB", 7)],
            vec![graph("g1", "entityA"), graph("g2", "entityB"), graph("g3", "entityC")],
            false,
        )
        .unwrap();
        let routed: Vec<(&str, usize)> = routing
            .per_graph
            .iter()
            .map(|(g, elements)| (g.graph_id(), elements.len()))
            .collect();
        assert_eq!(routed, vec![("g1", 1), ("g2", 1)]);
    }

    #[test]
    fn test_unroutable_element_is_a_validation_error() {
        let err = ElementRouting::route(
            &[Element::entity("entityZ", "Z")],
            vec![graph("g1", "entityA")],
            false,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Operation chain is invalid. Validation errors: \n\
             Entity group entityZ is not defined by any of the graphIds:[g1]"
        );

        let routing = ElementRouting::route(
            &[Element::entity("entityZ", "Z"), Element::entity("entityA", "A")],
            vec![graph("g1", "entityA")],
            true,
        )
        .unwrap();
        assert_eq!(routing.per_graph.len(), 1);
        assert_eq!(routing.per_graph[0].1.len(), 1);
    }
}
