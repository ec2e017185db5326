// Copyright 2025 Cowboy AI, LLC.

//! Federated store configuration

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::dispatch::DispatchConfig;
use crate::errors::{FederationError, FederationResult};
use crate::store_traits::{parse_traits, StoreTrait};

/// Cache service class name
pub const KEY_CACHE_SERVICE_CLASS: &str = "federatedstore.cache.service.class";
/// Cache namespace holding graph entries
pub const KEY_CACHE_NAMESPACE: &str = "federatedstore.cache.namespace";
/// Op auth that sees every graph
pub const KEY_ADMIN_AUTH: &str = "federatedstore.admin.auth";
/// Upper bound on graphs executing at once
pub const KEY_MAX_CONCURRENT_GRAPHS: &str = "federatedstore.dispatch.maxConcurrentGraphs";
/// Per-graph execution timeout in milliseconds
pub const KEY_GRAPH_TIMEOUT_MILLIS: &str = "federatedstore.dispatch.graphTimeoutMillis";
/// Skip graphs an operation's view is invalid for instead of failing
pub const KEY_SKIP_INVALID_GRAPHS: &str = "federatedstore.dispatch.skipInvalidGraphs";
/// Comma separated traits treated as present on every graph
pub const KEY_ALWAYS_ON_TRAITS: &str = "federatedstore.traits.alwaysOn";

/// Default cache namespace
pub const DEFAULT_CACHE_NAMESPACE: &str = "federatedStoreGraphs";

/// Properties of a federated store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederatedStoreProperties {
    cache_service_class: Option<String>,
    cache_namespace: String,
    admin_auth: Option<String>,
    dispatch: DispatchConfig,
    always_on_traits: BTreeSet<StoreTrait>,
    extra: BTreeMap<String, String>,
}

impl Default for FederatedStoreProperties {
    fn default() -> Self {
        Self {
            cache_service_class: None,
            cache_namespace: DEFAULT_CACHE_NAMESPACE.to_string(),
            admin_auth: None,
            dispatch: DispatchConfig::default(),
            always_on_traits: BTreeSet::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl FederatedStoreProperties {
    /// Parse the flat key/value form. Unknown keys are kept in [`extra`](Self::extra).
    pub fn from_properties<I, K, V>(properties: I) -> FederationResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut parsed = Self::default();
        for (key, value) in properties {
            let (key, value) = (key.into(), value.into());
            match key.as_str() {
                KEY_CACHE_SERVICE_CLASS => {
                    parsed.cache_service_class = non_empty(value);
                }
                KEY_CACHE_NAMESPACE => {
                    if let Some(namespace) = non_empty(value) {
                        parsed.cache_namespace = namespace;
                    }
                }
                KEY_ADMIN_AUTH => parsed.admin_auth = non_empty(value),
                KEY_MAX_CONCURRENT_GRAPHS => {
                    let max: usize = parse_number(&key, &value)?;
                    parsed.dispatch.max_concurrent_graphs = max.max(1);
                }
                KEY_GRAPH_TIMEOUT_MILLIS => {
                    let millis: u64 = parse_number(&key, &value)?;
                    parsed.dispatch.graph_timeout = Duration::from_millis(millis);
                }
                KEY_SKIP_INVALID_GRAPHS => {
                    parsed.dispatch.skip_invalid_graphs = value.trim().parse().map_err(|_| {
                        FederationError::Configuration(format!(
                            "{key} must be true or false, got {value}"
                        ))
                    })?;
                }
                KEY_ALWAYS_ON_TRAITS => parsed.always_on_traits = parse_traits(&value)?,
                _ => {
                    parsed.extra.insert(key, value);
                }
            }
        }
        Ok(parsed)
    }

    /// Set the cache service class
    pub fn with_cache_service_class(mut self, class: impl Into<String>) -> Self {
        self.cache_service_class = Some(class.into());
        self
    }

    /// Set the cache namespace
    pub fn with_cache_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.cache_namespace = namespace.into();
        self
    }

    /// Set the admin auth
    pub fn with_admin_auth(mut self, auth: impl Into<String>) -> Self {
        self.admin_auth = Some(auth.into());
        self
    }

    /// Set the dispatch settings
    pub fn with_dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Set the always-on traits
    pub fn with_always_on_traits(mut self, traits: BTreeSet<StoreTrait>) -> Self {
        self.always_on_traits = traits;
        self
    }

    /// Add a pass-through property
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Cache service class, `None` for an in-memory only registry
    pub fn cache_service_class(&self) -> Option<&str> {
        self.cache_service_class.as_deref()
    }

    /// Cache namespace holding graph entries
    pub fn cache_namespace(&self) -> &str {
        &self.cache_namespace
    }

    /// Op auth that sees every graph
    pub fn admin_auth(&self) -> Option<&str> {
        self.admin_auth.as_deref()
    }

    /// Dispatch settings
    pub fn dispatch(&self) -> &DispatchConfig {
        &self.dispatch
    }

    /// Traits treated as present on every graph
    pub fn always_on_traits(&self) -> &BTreeSet<StoreTrait> {
        &self.always_on_traits
    }

    /// Properties not consumed by the store itself
    pub fn extra(&self) -> &BTreeMap<String, String> {
        &self.extra
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> FederationResult<T> {
    value.trim().parse().map_err(|_| {
        FederationError::Configuration(format!("{key} must be a non-negative integer, got {value}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::nats_kv::NATS_URL_KEY;

    #[test]
    fn test_defaults() {
        let props = FederatedStoreProperties::default();
        assert_eq!(props.cache_service_class(), None);
        assert_eq!(props.cache_namespace(), "federatedStoreGraphs");
        assert_eq!(props.dispatch().max_concurrent_graphs, 8);
        assert_eq!(props.dispatch().graph_timeout, Duration::from_secs(30));
        assert!(!props.dispatch().skip_invalid_graphs);
    }

    #[test]
    fn test_from_flat_properties() {
        let props = FederatedStoreProperties::from_properties([
            (KEY_CACHE_SERVICE_CLASS, "HashMapCacheService"),
            (KEY_CACHE_NAMESPACE, "teamGraphs"),
            (KEY_ADMIN_AUTH, "admin"),
            (KEY_MAX_CONCURRENT_GRAPHS, "0"),
            (KEY_GRAPH_TIMEOUT_MILLIS, "250"),
            (KEY_SKIP_INVALID_GRAPHS, "true"),
            (KEY_ALWAYS_ON_TRAITS, "ORDERED"),
            (NATS_URL_KEY, "nats://cache:4222"),
        ])
        .unwrap();

        assert_eq!(props.cache_service_class(), Some("HashMapCacheService"));
        assert_eq!(props.cache_namespace(), "teamGraphs");
        assert_eq!(props.admin_auth(), Some("admin"));
        assert_eq!(props.dispatch().max_concurrent_graphs, 1);
        assert_eq!(props.dispatch().graph_timeout, Duration::from_millis(250));
        assert!(props.dispatch().skip_invalid_graphs);
        assert!(props.always_on_traits().contains(&StoreTrait::Ordered));
        assert_eq!(props.extra().get(NATS_URL_KEY).map(String::as_str), Some("nats://cache:4222"));
    }

    #[test]
    fn test_invalid_values_are_configuration_errors() {
        let err = FederatedStoreProperties::from_properties([(KEY_GRAPH_TIMEOUT_MILLIS, "soon")])
            .unwrap_err();
        assert!(matches!(err, FederationError::Configuration(_)));

        let err = FederatedStoreProperties::from_properties([(KEY_ALWAYS_ON_TRAITS, "WARP")])
            .unwrap_err();
        assert!(matches!(err, FederationError::Configuration(_)));
    }

    #[test]
    fn test_blank_cache_class_means_no_cache() {
        let props =
            FederatedStoreProperties::from_properties([(KEY_CACHE_SERVICE_CLASS, "  ")]).unwrap();
        assert_eq!(props.cache_service_class(), None);
    }
}
