// Copyright 2025 Cowboy AI, LLC.

//! Merging the schemas of selected graphs

use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use super::{Schema, SchemaClash};
use crate::element::ElementGroupKind;
use crate::errors::{FederationError, FederationResult};

/// Combines member graph schemas into one logical schema
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaMerger;

impl SchemaMerger {
    /// Merge schemas in selection order.
    ///
    /// Groups and types defined by one graph pass through; identical
    /// definitions across graphs appear once. Every graph involved in a
    /// differing definition is named in the error, in selection order,
    /// together with the graph that defined it first.
    pub fn merge<'a, I>(graphs: I) -> FederationResult<Schema>
    where
        I: IntoIterator<Item = (&'a str, &'a Schema)>,
    {
        let mut merged = Schema::default();
        let mut owners: HashMap<SchemaClash, usize> = HashMap::new();
        let mut implicated: BTreeSet<usize> = BTreeSet::new();
        let mut graph_ids: Vec<&str> = Vec::new();

        for (position, (graph_id, schema)) in graphs.into_iter().enumerate() {
            graph_ids.push(graph_id);

            for clash in merged.absorb(schema) {
                debug!(graph_id, %clash, "schema clash");
                implicated.insert(position);
                if let Some(owner) = owners.get(&clash) {
                    implicated.insert(*owner);
                }
            }
            for key in Self::keys_of(schema) {
                owners.entry(key).or_insert(position);
            }
        }

        if implicated.is_empty() {
            Ok(merged)
        } else {
            Err(FederationError::SchemaMerge {
                graph_ids: implicated
                    .into_iter()
                    .map(|position| graph_ids[position].to_string())
                    .collect(),
            })
        }
    }

    fn keys_of(schema: &Schema) -> impl Iterator<Item = SchemaClash> + '_ {
        let entities = schema
            .entities
            .keys()
            .map(|name| SchemaClash::Group(ElementGroupKind::Entity, name.clone()));
        let edges = schema
            .edges
            .keys()
            .map(|name| SchemaClash::Group(ElementGroupKind::Edge, name.clone()));
        let types = schema.types.keys().map(|name| SchemaClash::Type(name.clone()));
        let vertex = schema
            .vertex_serialiser
            .as_ref()
            .map(|_| SchemaClash::VertexSerialiser);
        let visibility = schema
            .visibility_property
            .as_ref()
            .map(|_| SchemaClash::VisibilityProperty);

        entities
            .chain(edges)
            .chain(types)
            .chain(vertex)
            .chain(visibility)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaElementDefinition, TypeDefinition};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn entity_a() -> Schema {
        Schema::new()
            .entity("entityA", SchemaElementDefinition::entity("vertex.string"))
            .type_definition("vertex.string", TypeDefinition::new("String"))
            .vertex_serialiser("StringSerialiser")
    }

    fn entity_b() -> Schema {
        Schema::new()
            .entity("entityB", SchemaElementDefinition::entity("vertex.int"))
            .type_definition("vertex.int", TypeDefinition::new("Integer"))
            .vertex_serialiser("IntegerSerialiser")
    }

    fn basic_edge() -> Schema {
        Schema::new()
            .edge(
                "BasicEdge",
                SchemaElementDefinition::edge("vertex.string", "vertex.string", "directed.either"),
            )
            .type_definition("vertex.string", TypeDefinition::new("String"))
            .type_definition("directed.either", TypeDefinition::new("Boolean"))
    }

    #[test]
    fn test_disjoint_schemas_union() {
        let edge = basic_edge();
        let entity = entity_a();
        let merged = SchemaMerger::merge([("g1", &entity), ("g2", &edge)]).unwrap();

        assert_eq!(merged.entity_groups().collect::<Vec<_>>(), vec!["entityA"]);
        assert_eq!(merged.edge_groups().collect::<Vec<_>>(), vec!["BasicEdge"]);
        assert_eq!(merged.types.len(), 2);
        assert_eq!(merged.vertex_serialiser.as_deref(), Some("StringSerialiser"));
    }

    #[test]
    fn test_identical_definitions_collapse() {
        let a = entity_a();
        let b = entity_a();
        let merged = SchemaMerger::merge([("g1", &a), ("g2", &b)]).unwrap();
        assert_eq!(merged, entity_a());
    }

    #[test]
    fn test_vertex_serialiser_clash_names_both_graphs() {
        let a = entity_a();
        let b = entity_b();
        let err = SchemaMerger::merge([("g1", &a), ("g2", &b)]).unwrap_err();
        match err {
            FederationError::SchemaMerge { graph_ids } => assert_eq!(graph_ids, vec!["g1", "g2"]),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_every_conflicting_graph_is_named_in_selection_order() {
        let a = entity_a();
        let edge = basic_edge();
        let b = entity_b();
        let changed = entity_a().entity(
            "entityA",
            SchemaElementDefinition::entity("vertex.string").property("count", "vertex.string"),
        );

        let err = SchemaMerger::merge([
            ("first", &a),
            ("fine", &edge),
            ("second", &b),
            ("third", &changed),
        ])
        .unwrap_err();
        match err {
            FederationError::SchemaMerge { graph_ids } => {
                assert_eq!(graph_ids, vec!["first", "second", "third"])
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_empty_selection_gives_empty_schema() {
        assert_eq!(SchemaMerger::merge(Vec::<(&str, &Schema)>::new()).unwrap(), Schema::default());
    }

    proptest! {
        #[test]
        fn prop_merge_is_deterministic(order in Just(vec![0usize, 1, 2]).prop_shuffle()) {
            let schemas = [entity_a(), basic_edge(), entity_b()];
            let ids = ["ga", "gb", "gc"];
            let selection: Vec<(&str, &Schema)> =
                order.iter().map(|&i| (ids[i], &schemas[i])).collect();

            let first = SchemaMerger::merge(selection.clone()).map_err(|e| e.to_string());
            let second = SchemaMerger::merge(selection).map_err(|e| e.to_string());
            prop_assert_eq!(first, second);
        }
    }
}
