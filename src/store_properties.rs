// Copyright 2025 Cowboy AI, LLC.

//! Key/value configuration for a single backend graph

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Property naming the backend engine that hosts a graph
pub const STORE_CLASS_KEY: &str = "store.class";

/// Backend engine type and its connection parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct StoreProperties {
    properties: BTreeMap<String, String>,
}

impl StoreProperties {
    /// Properties for the given store class
    pub fn new(store_class: impl Into<String>) -> Self {
        Self::default().with(STORE_CLASS_KEY, store_class)
    }

    /// Set a property, returning the properties
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a property
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Look up a property
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Whether the key is set
    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Name of the backend engine, if configured
    pub fn store_class(&self) -> Option<&str> {
        self.get(STORE_CLASS_KEY)
    }

    /// These properties laid over `parent`. The parent is left untouched.
    pub fn overlaid_on(&self, parent: &StoreProperties) -> StoreProperties {
        let mut merged = parent.clone();
        merged.properties.extend(
            self.properties
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        merged
    }

    /// Iterate over every property
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// True when no property is set
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for StoreProperties
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            properties: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_keeps_parent_intact() {
        let parent = StoreProperties::new("InMemoryStore").with("memory.traits", "ORDERED");
        let child = StoreProperties::default().with("unusual.key", "value");

        let merged = child.overlaid_on(&parent);
        assert_eq!(merged.store_class(), Some("InMemoryStore"));
        assert_eq!(merged.get("unusual.key"), Some("value"));
        assert!(!parent.contains_key("unusual.key"));
    }

    #[test]
    fn test_overlay_replaces_parent_values() {
        let parent = StoreProperties::new("InMemoryStore");
        let child = StoreProperties::new("OtherStore");
        assert_eq!(child.overlaid_on(&parent).store_class(), Some("OtherStore"));
    }

    #[test]
    fn test_serialises_as_flat_map() {
        let props = StoreProperties::new("InMemoryStore");
        let json = serde_json::to_string(&props).unwrap();
        assert_eq!(json, r#"{"store.class":"InMemoryStore"}"#);
        let back: StoreProperties = serde_json::from_str(&json).unwrap();
        assert_eq!(back, props);
    }
}
