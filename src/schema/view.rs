// Copyright 2025 Cowboy AI, LLC.

//! Query-time projections over entity and edge groups

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::Schema;
use crate::element::{Element, ElementGroupKind};

/// Per-group projection and filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewElementDefinition {
    /// Properties to keep. `None` keeps all of them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeSet<String>>,
    /// Property values an element must carry to be returned
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, Value>,
}

impl ViewElementDefinition {
    /// Keep only the named properties
    pub fn project<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties = Some(properties.into_iter().map(Into::into).collect());
        self
    }

    /// Require a property to equal a value
    pub fn filter(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(property.into(), value.into());
        self
    }

    fn referenced_properties(&self) -> impl Iterator<Item = &String> {
        self.properties
            .iter()
            .flatten()
            .chain(self.filters.keys())
    }

    fn matches(&self, element: &Element) -> bool {
        self.filters
            .iter()
            .all(|(name, expected)| element.properties().get(name) == Some(expected))
    }
}

/// Names which groups a read operation targets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct View {
    /// Entity groups to return
    #[serde(default)]
    pub entities: BTreeMap<String, ViewElementDefinition>,
    /// Edge groups to return
    #[serde(default)]
    pub edges: BTreeMap<String, ViewElementDefinition>,
}

impl View {
    /// View with no groups
    pub fn new() -> Self {
        Self::default()
    }

    /// Include an entity group unfiltered
    pub fn entity(self, group: impl Into<String>) -> Self {
        self.entity_with(group, ViewElementDefinition::default())
    }

    /// Include an entity group with a definition
    pub fn entity_with(mut self, group: impl Into<String>, definition: ViewElementDefinition) -> Self {
        self.entities.insert(group.into(), definition);
        self
    }

    /// Include an edge group unfiltered
    pub fn edge(self, group: impl Into<String>) -> Self {
        self.edge_with(group, ViewElementDefinition::default())
    }

    /// Include an edge group with a definition
    pub fn edge_with(mut self, group: impl Into<String>, definition: ViewElementDefinition) -> Self {
        self.edges.insert(group.into(), definition);
        self
    }

    /// Every problem that makes this view invalid for `schema`
    pub fn validate(&self, schema: &Schema) -> Vec<String> {
        let mut errors = Vec::new();
        let groups = self
            .entities
            .iter()
            .map(|(g, d)| (ElementGroupKind::Entity, g, d))
            .chain(self.edges.iter().map(|(g, d)| (ElementGroupKind::Edge, g, d)));

        for (kind, group, definition) in groups {
            let Some(schema_definition) = schema.group(kind, group) else {
                errors.push(format!("{kind} group {group} does not exist in the schema"));
                continue;
            };
            for property in definition.referenced_properties() {
                if !schema_definition.has_property(property) {
                    errors.push(format!(
                        "Property {property} is not defined for {kind} group {group}"
                    ));
                }
            }
        }
        errors
    }

    fn definition_for(&self, element: &Element) -> Option<&ViewElementDefinition> {
        match element.kind() {
            ElementGroupKind::Entity => self.entities.get(element.group()),
            ElementGroupKind::Edge => self.edges.get(element.group()),
        }
    }

    /// Apply the view, returning the projected element if it is selected
    pub fn apply(&self, element: &Element) -> Option<Element> {
        let definition = self.definition_for(element)?;
        if !definition.matches(element) {
            return None;
        }
        let mut projected = element.clone();
        if let Some(keep) = &definition.properties {
            match &mut projected {
                Element::Entity { properties, .. } | Element::Edge { properties, .. } => {
                    properties.retain(|name, _| keep.contains(name));
                }
            }
        }
        Some(projected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaElementDefinition, TypeDefinition};

    fn schema() -> Schema {
        Schema::new()
            .entity(
                "entityA",
                SchemaElementDefinition::entity("vertex.string").property("count", "count.int"),
            )
            .type_definition("vertex.string", TypeDefinition::new("String"))
            .type_definition("count.int", TypeDefinition::new("Integer"))
    }

    #[test]
    fn test_missing_group_is_reported() {
        let view = View::new().entity("entityB").edge("BasicEdge");
        assert_eq!(
            view.validate(&schema()),
            vec![
                "Entity group entityB does not exist in the schema",
                "Edge group BasicEdge does not exist in the schema",
            ]
        );
    }

    #[test]
    fn test_unknown_property_is_reported() {
        let view = View::new().entity_with(
            "entityA",
            ViewElementDefinition::default().filter("colour", "red"),
        );
        assert_eq!(
            view.validate(&schema()),
            vec!["Property colour is not defined for Entity group entityA"]
        );
        assert!(View::new().entity("entityA").validate(&schema()).is_empty());
    }

    #[test]
    fn test_apply_filters_and_projects() {
        let view = View::new().entity_with(
            "entityA",
            ViewElementDefinition::default()
                .filter("count", 3)
                .project(Vec::<String>::new()),
        );
        let hit = Element::entity("entityA", "A").with_property("count", 3);
        let miss = Element::entity("entityA", "B").with_property("count", 4);

        let projected = view.apply(&hit).unwrap();
        assert!(projected.properties().is_empty());
        assert!(view.apply(&miss).is_none());
        assert!(view.apply(&Element::entity("entityB", 7)).is_none());
    }
}
