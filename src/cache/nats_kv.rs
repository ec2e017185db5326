// Copyright 2025 Cowboy AI, LLC.

//! Cache service backed by NATS JetStream key/value buckets
//!
//! Each cache namespace maps to one bucket named `{bucket_prefix}{namespace}`.

use async_nats::jetstream::{self, kv, Context as JetStreamContext};
use async_nats::ConnectOptions;
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{CacheError, CacheService};

/// Class name of [`NatsKvCacheService`]
pub const NATS_KV_CACHE_SERVICE_CLASS: &str = "NatsKvCacheService";

/// Store property holding the NATS server URL
pub const NATS_URL_KEY: &str = "federatedstore.cache.nats.url";
/// Store property holding the NATS user
pub const NATS_USER_KEY: &str = "federatedstore.cache.nats.user";
/// Store property holding the NATS password
pub const NATS_PASSWORD_KEY: &str = "federatedstore.cache.nats.password";
/// Store property requiring TLS when `true`
pub const NATS_TLS_KEY: &str = "federatedstore.cache.nats.tls";
/// Store property holding the bucket name prefix
pub const NATS_BUCKET_PREFIX_KEY: &str = "federatedstore.cache.nats.bucketPrefix";

/// Connection settings for the NATS cache service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL (e.g., "nats://localhost:4222")
    pub url: String,

    /// Optional username for authentication
    pub user: Option<String>,

    /// Optional password for authentication
    pub password: Option<String>,

    /// Whether TLS is required
    pub tls_required: bool,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Prepended to every bucket name
    pub bucket_prefix: String,

    /// Revisions kept per key
    pub history: i64,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            user: None,
            password: None,
            tls_required: false,
            connection_timeout_secs: 10,
            bucket_prefix: "federated-".to_string(),
            history: 1,
        }
    }
}

impl NatsConfig {
    /// Read settings from the store's pass-through properties
    pub fn from_extra(extra: &BTreeMap<String, String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = extra.get(NATS_URL_KEY) {
            config.url = url.clone();
        }
        config.user = extra.get(NATS_USER_KEY).cloned();
        config.password = extra.get(NATS_PASSWORD_KEY).cloned();
        config.tls_required = extra
            .get(NATS_TLS_KEY)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        if let Some(prefix) = extra.get(NATS_BUCKET_PREFIX_KEY) {
            config.bucket_prefix = prefix.clone();
        }
        config
    }

    /// Bucket holding a namespace. Characters a bucket name cannot carry
    /// become `_`.
    pub fn bucket_for(&self, namespace: &str) -> String {
        format!("{}{}", self.bucket_prefix, namespace)
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect()
    }
}

/// Cache service storing each namespace in a JetStream KV bucket
#[derive(Debug)]
pub struct NatsKvCacheService {
    jetstream: JetStreamContext,
    config: NatsConfig,
    buckets: Mutex<HashMap<String, kv::Store>>,
}

impl NatsKvCacheService {
    /// Connect to NATS with the provided configuration
    pub async fn connect(config: NatsConfig) -> Result<Self, CacheError> {
        let mut options = ConnectOptions::new()
            .connection_timeout(Duration::from_secs(config.connection_timeout_secs));

        if let (Some(user), Some(password)) = (&config.user, &config.password) {
            options = options.user_and_password(user.clone(), password.clone());
        }

        if config.tls_required {
            options = options.require_tls(true);
        }

        let client = options.connect(&config.url).await.map_err(|e| {
            CacheError::Backend(format!("Failed to connect to {}: {}", config.url, e))
        })?;
        info!(url = %config.url, "connected NATS cache service");

        Ok(Self::with_jetstream(jetstream::new(client), config))
    }

    /// Use an existing JetStream context
    pub fn with_jetstream(jetstream: JetStreamContext, config: NatsConfig) -> Self {
        Self {
            jetstream,
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Connection settings
    pub fn config(&self) -> &NatsConfig {
        &self.config
    }

    async fn bucket(&self, namespace: &str) -> Result<kv::Store, CacheError> {
        let mut buckets = self.buckets.lock().await;
        if let Some(store) = buckets.get(namespace) {
            return Ok(store.clone());
        }

        let name = self.config.bucket_for(namespace);
        let store = match self.jetstream.get_key_value(&name).await {
            Ok(store) => store,
            Err(_) => {
                debug!(bucket = %name, "creating cache bucket");
                self.jetstream
                    .create_key_value(kv::Config {
                        bucket: name.clone(),
                        history: self.config.history,
                        storage: jetstream::stream::StorageType::File,
                        ..Default::default()
                    })
                    .await
                    .map_err(|e| {
                        CacheError::Backend(format!("Failed to create KV bucket {name}: {e}"))
                    })?
            }
        };
        buckets.insert(namespace.to_string(), store.clone());
        Ok(store)
    }
}

/// Key as stored in a bucket. Bytes outside `[A-Za-z0-9_-]` become `=XX`
/// so any graph id is a legal KV key.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("={byte:02X}"));
        }
    }
    encoded
}

fn decode_key(encoded: &str) -> Result<String, CacheError> {
    let invalid = || CacheError::Backend(format!("Invalid key in bucket: {encoded}"));
    let raw = encoded.as_bytes();
    let mut bytes = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'=' {
            let hex = encoded.get(i + 1..i + 3).ok_or_else(invalid)?;
            bytes.push(u8::from_str_radix(hex, 16).map_err(|_| invalid())?);
            i += 3;
        } else {
            bytes.push(raw[i]);
            i += 1;
        }
    }
    String::from_utf8(bytes).map_err(|_| invalid())
}

#[async_trait]
impl CacheService for NatsKvCacheService {
    async fn put(&self, namespace: &str, key: &str, value: Bytes) -> Result<(), CacheError> {
        self.bucket(namespace)
            .await?
            .put(encode_key(key), value)
            .await
            .map(|_| ())
            .map_err(|e| CacheError::Backend(format!("Failed to put {key}: {e}")))
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Bytes>, CacheError> {
        self.bucket(namespace)
            .await?
            .get(encode_key(key))
            .await
            .map_err(|e| CacheError::Backend(format!("Failed to get {key}: {e}")))
    }

    async fn get_all_keys(&self, namespace: &str) -> Result<BTreeSet<String>, CacheError> {
        let keys = self
            .bucket(namespace)
            .await?
            .keys()
            .await
            .map_err(|e| CacheError::Backend(format!("Failed to list keys: {e}")))?;
        let encoded = keys
            .try_collect::<Vec<String>>()
            .await
            .map_err(|e| CacheError::Backend(format!("Failed to list keys: {e}")))?;
        encoded.iter().map(|key| decode_key(key)).collect()
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<(), CacheError> {
        self.bucket(namespace)
            .await?
            .delete(encode_key(key))
            .await
            .map_err(|e| CacheError::Backend(format!("Failed to delete {key}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_default_config() {
        let config = NatsConfig::default();
        assert_eq!(config.url, "nats://localhost:4222");
        assert_eq!(config.connection_timeout_secs, 10);
        assert!(!config.tls_required);
    }

    #[test]
    fn test_config_from_extra_properties() {
        let extra = BTreeMap::from([
            (NATS_URL_KEY.to_string(), "nats://cache:4222".to_string()),
            (NATS_USER_KEY.to_string(), "testuser".to_string()),
            (NATS_PASSWORD_KEY.to_string(), "testpass".to_string()),
            (NATS_TLS_KEY.to_string(), "TRUE".to_string()),
        ]);
        let config = NatsConfig::from_extra(&extra);
        assert_eq!(config.url, "nats://cache:4222");
        assert_eq!(config.user.as_deref(), Some("testuser"));
        assert_eq!(config.password.as_deref(), Some("testpass"));
        assert!(config.tls_required);
    }

    #[test_case("acc1", "acc1" ; "plain id")]
    #[test_case("my graph", "my=20graph" ; "space")]
    #[test_case(".g/1=", "=2Eg=2F1=3D" ; "reserved characters")]
    #[test_case("grafo-ñ", "grafo-=C3=B1" ; "multi byte")]
    fn test_graph_ids_become_legal_keys(graph_id: &str, key: &str) {
        assert_eq!(encode_key(graph_id), key);
        assert_eq!(decode_key(key).unwrap(), graph_id);
    }

    #[test]
    fn test_malformed_keys_are_rejected() {
        assert!(decode_key("bad=4").is_err());
        assert!(decode_key("bad=ZZ").is_err());
        assert!(decode_key("=FF").is_err());
    }

    #[test]
    fn test_bucket_names_are_sanitised() {
        let config = NatsConfig::default();
        assert_eq!(config.bucket_for("federatedStoreGraphs"), "federated-federatedStoreGraphs");
        assert_eq!(config.bucket_for("team.graphs/v1"), "federated-team_graphs_v1");
    }
}
