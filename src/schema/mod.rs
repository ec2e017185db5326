// Copyright 2025 Cowboy AI, LLC.

//! Graph schemas
//!
//! A [`Schema`] declares entity and edge groups. Each group names the types of
//! its identifiers and properties, and each type is described once in the
//! schema's `types` table together with its serialiser.

mod merge;
mod view;

pub use merge::SchemaMerger;
pub use view::{View, ViewElementDefinition};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::element::{Element, ElementGroupKind};

/// Definition of one entity or edge group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchemaElementDefinition {
    /// Vertex type, entities only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertex: Option<String>,
    /// Source vertex type, edges only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Destination vertex type, edges only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Directed flag type, edges only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directed: Option<String>,
    /// Property name to type name
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Properties that keep otherwise equal elements apart
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
    /// Free text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SchemaElementDefinition {
    /// An entity group keyed by a vertex of the given type
    pub fn entity(vertex_type: impl Into<String>) -> Self {
        Self {
            vertex: Some(vertex_type.into()),
            ..Default::default()
        }
    }

    /// An edge group between vertices of the given types
    pub fn edge(
        source_type: impl Into<String>,
        destination_type: impl Into<String>,
        directed_type: impl Into<String>,
    ) -> Self {
        Self {
            source: Some(source_type.into()),
            destination: Some(destination_type.into()),
            directed: Some(directed_type.into()),
            ..Default::default()
        }
    }

    /// Add a property, returning the definition
    pub fn property(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.properties.insert(name.into(), type_name.into());
        self
    }

    /// Set the group-by properties, returning the definition
    pub fn group_by<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = properties.into_iter().map(Into::into).collect();
        self
    }

    /// Every type name the definition refers to
    pub fn referenced_types(&self) -> impl Iterator<Item = &str> {
        self.vertex
            .iter()
            .chain(self.source.iter())
            .chain(self.destination.iter())
            .chain(self.directed.iter())
            .chain(self.properties.values())
            .map(String::as_str)
    }

    /// Whether a property with this name is defined
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }
}

/// A value type and how it is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TypeDefinition {
    /// Value class name
    pub class: String,
    /// Serialiser used by backends to persist the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialiser: Option<String>,
    /// Function used to aggregate values of this type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_function: Option<String>,
}

impl TypeDefinition {
    /// Type with a class and no serialiser
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            serialiser: None,
            aggregate_function: None,
        }
    }

    /// Set the serialiser, returning the type
    pub fn serialiser(mut self, serialiser: impl Into<String>) -> Self {
        self.serialiser = Some(serialiser.into());
        self
    }

    /// Set the aggregate function, returning the type
    pub fn aggregate_function(mut self, function: impl Into<String>) -> Self {
        self.aggregate_function = Some(function.into());
        self
    }
}

/// Entity and edge group definitions plus the types they use
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Entity groups by name
    #[serde(default)]
    pub entities: BTreeMap<String, SchemaElementDefinition>,
    /// Edge groups by name
    #[serde(default)]
    pub edges: BTreeMap<String, SchemaElementDefinition>,
    /// Type definitions by name
    #[serde(default)]
    pub types: BTreeMap<String, TypeDefinition>,
    /// Serialiser applied to every vertex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertex_serialiser: Option<String>,
    /// Property holding element level visibility
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_property: Option<String>,
}

impl Schema {
    /// Empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity group, returning the schema
    pub fn entity(mut self, group: impl Into<String>, definition: SchemaElementDefinition) -> Self {
        self.entities.insert(group.into(), definition);
        self
    }

    /// Add an edge group, returning the schema
    pub fn edge(mut self, group: impl Into<String>, definition: SchemaElementDefinition) -> Self {
        self.edges.insert(group.into(), definition);
        self
    }

    /// Add a type, returning the schema
    pub fn type_definition(mut self, name: impl Into<String>, definition: TypeDefinition) -> Self {
        self.types.insert(name.into(), definition);
        self
    }

    /// Set the vertex serialiser, returning the schema
    pub fn vertex_serialiser(mut self, serialiser: impl Into<String>) -> Self {
        self.vertex_serialiser = Some(serialiser.into());
        self
    }

    /// True when the schema defines no groups and no types
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.edges.is_empty() && self.types.is_empty()
    }

    /// Entity group names
    pub fn entity_groups(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Edge group names
    pub fn edge_groups(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    /// Definition of a group of the given kind
    pub fn group(&self, kind: ElementGroupKind, group: &str) -> Option<&SchemaElementDefinition> {
        match kind {
            ElementGroupKind::Entity => self.entities.get(group),
            ElementGroupKind::Edge => self.edges.get(group),
        }
    }

    /// Whether the schema defines the group for this element's kind
    pub fn defines_group_of(&self, element: &Element) -> bool {
        self.group(element.kind(), element.group()).is_some()
    }

    /// Check that every referenced type is defined and every group-by
    /// property exists. Returns each problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let groups = self
            .entities
            .iter()
            .map(|(name, def)| (ElementGroupKind::Entity, name, def))
            .chain(
                self.edges
                    .iter()
                    .map(|(name, def)| (ElementGroupKind::Edge, name, def)),
            );

        for (kind, name, definition) in groups {
            match kind {
                ElementGroupKind::Entity if definition.vertex.is_none() => {
                    errors.push(format!("Entity group {name} does not define a vertex type"));
                }
                ElementGroupKind::Edge
                    if definition.source.is_none() || definition.destination.is_none() =>
                {
                    errors.push(format!(
                        "Edge group {name} must define source and destination types"
                    ));
                }
                _ => {}
            }
            for type_name in definition.referenced_types() {
                if !self.types.contains_key(type_name) {
                    errors.push(format!(
                        "{kind} group {name} references type {type_name} which is not defined"
                    ));
                }
            }
            for property in &definition.group_by {
                if !definition.has_property(property) {
                    errors.push(format!(
                        "{kind} group {name} groups by unknown property {property}"
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Check an element against its group definition
    pub fn validate_element(&self, element: &Element) -> Result<(), String> {
        let kind = element.kind();
        let definition = self
            .group(kind, element.group())
            .ok_or_else(|| format!("{kind} group {} does not exist in the schema", element.group()))?;
        match element
            .properties()
            .keys()
            .find(|name| !definition.has_property(name))
        {
            Some(unknown) => Err(format!(
                "Property {unknown} is not defined for {kind} group {}",
                element.group()
            )),
            None => Ok(()),
        }
    }

    /// Combine schema parts into one. Identical definitions collapse; any
    /// differing redefinition of a group, type or vertex serialiser is
    /// reported.
    pub fn merge_parts<'a, I>(parts: I) -> Result<Schema, Vec<String>>
    where
        I: IntoIterator<Item = &'a Schema>,
    {
        let mut merged = Schema::default();
        let mut errors = Vec::new();
        for part in parts {
            for clash in merged.absorb(part) {
                errors.push(clash.to_string());
            }
        }
        if errors.is_empty() {
            Ok(merged)
        } else {
            Err(errors)
        }
    }

    /// Fold `other` into `self`, keeping the first definition on a clash
    pub(crate) fn absorb(&mut self, other: &Schema) -> Vec<SchemaClash> {
        let mut clashes = Vec::new();

        for (name, definition) in &other.entities {
            match self.entities.get(name) {
                Some(existing) if existing != definition => {
                    clashes.push(SchemaClash::Group(ElementGroupKind::Entity, name.clone()));
                }
                Some(_) => {}
                None => {
                    self.entities.insert(name.clone(), definition.clone());
                }
            }
        }
        for (name, definition) in &other.edges {
            match self.edges.get(name) {
                Some(existing) if existing != definition => {
                    clashes.push(SchemaClash::Group(ElementGroupKind::Edge, name.clone()));
                }
                Some(_) => {}
                None => {
                    self.edges.insert(name.clone(), definition.clone());
                }
            }
        }
        for (name, definition) in &other.types {
            match self.types.get(name) {
                Some(existing) if existing != definition => {
                    clashes.push(SchemaClash::Type(name.clone()));
                }
                Some(_) => {}
                None => {
                    self.types.insert(name.clone(), definition.clone());
                }
            }
        }
        match (&self.vertex_serialiser, &other.vertex_serialiser) {
            (Some(mine), Some(theirs)) if mine != theirs => {
                clashes.push(SchemaClash::VertexSerialiser);
            }
            (None, Some(theirs)) => self.vertex_serialiser = Some(theirs.clone()),
            _ => {}
        }
        match (&self.visibility_property, &other.visibility_property) {
            (Some(mine), Some(theirs)) if mine != theirs => {
                clashes.push(SchemaClash::VisibilityProperty);
            }
            (None, Some(theirs)) => self.visibility_property = Some(theirs.clone()),
            _ => {}
        }

        clashes
    }
}

/// Something two schemas define differently
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum SchemaClash {
    Group(ElementGroupKind, String),
    Type(String),
    VertexSerialiser,
    VisibilityProperty,
}

impl std::fmt::Display for SchemaClash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaClash::Group(kind, name) => {
                write!(f, "{kind} group {name} is defined differently in schema parts")
            }
            SchemaClash::Type(name) => write!(f, "Type {name} is defined differently in schema parts"),
            SchemaClash::VertexSerialiser => write!(f, "Vertex serialisers do not match"),
            SchemaClash::VisibilityProperty => write!(f, "Visibility properties do not match"),
        }
    }
}
