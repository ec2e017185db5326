// Copyright 2025 Cowboy AI, LLC.

//! Graph elements exchanged with backend graphs

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Whether a group describes entities or edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub enum ElementGroupKind {
    /// Vertex-attached element
    Entity,
    /// Element linking two vertices
    Edge,
}

impl fmt::Display for ElementGroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementGroupKind::Entity => write!(f, "Entity"),
            ElementGroupKind::Edge => write!(f, "Edge"),
        }
    }
}

/// An entity or an edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "class")]
pub enum Element {
    /// Element attached to a single vertex
    Entity {
        /// Group name
        group: String,
        /// Vertex value
        vertex: Value,
        /// Property values keyed by name
        #[serde(default)]
        properties: BTreeMap<String, Value>,
    },
    /// Element connecting a source and destination vertex
    Edge {
        /// Group name
        group: String,
        /// Source vertex
        source: Value,
        /// Destination vertex
        destination: Value,
        /// Whether the edge is directed
        #[serde(default)]
        directed: bool,
        /// Property values keyed by name
        #[serde(default)]
        properties: BTreeMap<String, Value>,
    },
}

impl Element {
    /// New entity with no properties
    pub fn entity(group: impl Into<String>, vertex: impl Into<Value>) -> Self {
        Element::Entity {
            group: group.into(),
            vertex: vertex.into(),
            properties: BTreeMap::new(),
        }
    }

    /// New directed edge with no properties
    pub fn edge(
        group: impl Into<String>,
        source: impl Into<Value>,
        destination: impl Into<Value>,
    ) -> Self {
        Element::Edge {
            group: group.into(),
            source: source.into(),
            destination: destination.into(),
            directed: true,
            properties: BTreeMap::new(),
        }
    }

    /// Set a property, returning the element
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        match &mut self {
            Element::Entity { properties, .. } | Element::Edge { properties, .. } => {
                properties.insert(name.into(), value.into());
            }
        }
        self
    }

    /// Group name
    pub fn group(&self) -> &str {
        match self {
            Element::Entity { group, .. } | Element::Edge { group, .. } => group,
        }
    }

    /// Entity or edge
    pub fn kind(&self) -> ElementGroupKind {
        match self {
            Element::Entity { .. } => ElementGroupKind::Entity,
            Element::Edge { .. } => ElementGroupKind::Edge,
        }
    }

    /// Property values
    pub fn properties(&self) -> &BTreeMap<String, Value> {
        match self {
            Element::Entity { properties, .. } | Element::Edge { properties, .. } => properties,
        }
    }

    /// Whether the element touches the given vertex
    pub fn touches(&self, seed: &Value) -> bool {
        match self {
            Element::Entity { vertex, .. } => vertex == seed,
            Element::Edge {
                source,
                destination,
                ..
            } => source == seed || destination == seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builders_and_accessors() {
        let edge = Element::edge("BasicEdge", "a", "b").with_property("count", 12);
        assert_eq!(edge.group(), "BasicEdge");
        assert_eq!(edge.kind(), ElementGroupKind::Edge);
        assert_eq!(edge.properties().get("count"), Some(&json!(12)));
        assert!(edge.touches(&json!("b")));
        assert!(!edge.touches(&json!("c")));

        let entity = Element::entity("entityB", 7);
        assert_eq!(entity.kind(), ElementGroupKind::Entity);
        assert!(entity.touches(&json!(7)));
    }

    #[test]
    fn test_json_shape_is_tagged_by_class() {
        let value = serde_json::to_value(Element::entity("entityA", "A")).unwrap();
        assert_eq!(value["class"], json!("Entity"));
        assert_eq!(value["vertex"], json!("A"));
    }
}
