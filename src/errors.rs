// Copyright 2025 Cowboy AI, LLC.

//! Error types for federated store operations

use thiserror::Error;

use crate::operation::KEY_OPERATION_OPTIONS_GRAPH_IDS;

/// Errors that can occur while federating graphs
#[derive(Debug, Clone, Error)]
pub enum FederationError {
    /// Store configuration is unusable (fatal at initialise)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A graph id is already registered with a different definition
    #[error("User is attempting to overwrite a graph within FederatedStore. GraphId: {graph_id}{reason}")]
    Conflict {
        /// Id of the graph being overwritten
        graph_id: String,
        /// Extra detail, already prefixed with its separator
        reason: String,
    },

    /// A schema or store properties id is unknown to the graph library
    #[error("{0}")]
    NotFound(String),

    /// A graph definition is missing a schema or store properties
    #[error("GraphId {graph_id} cannot be created without defined/known {component}")]
    MissingGraphComponent {
        /// Id of the graph being added
        graph_id: String,
        /// Missing component name, `Schema` or `StoreProperties`
        component: String,
    },

    /// Schemas of the selected graphs cannot be combined
    #[error(
        "Unable to merge the schemas for all of your federated graphs: [{}]. You can limit which graphs to query for using the operation option: {}",
        .graph_ids.join(", "),
        KEY_OPERATION_OPTIONS_GRAPH_IDS
    )]
    SchemaMerge {
        /// Every implicated graph id, in selection order
        graph_ids: Vec<String>,
    },

    /// A graph's own schema is incomplete or inconsistent
    #[error("Schema for graph {graph_id} is not valid: {}", .errors.join(", "))]
    InvalidSchema {
        /// Id of the graph whose schema failed validation
        graph_id: String,
        /// Individual validation failures
        errors: Vec<String>,
    },

    /// Operation is not valid for one or more selected graphs
    #[error("{0}")]
    Validation(String),

    /// Operation kind has no federated handling route
    #[error("Operation class {kind} is not supported by the FederatedStore.")]
    UnsupportedOperation {
        /// Concrete kind of the rejected operation
        kind: String,
    },

    /// A cache-backed call was made after the cache service went away
    #[error("No cache has been set, please initialise the FederatedStore with a cache service")]
    CacheUnavailable,

    /// Cache service failure
    #[error("Cache error: {0}")]
    Cache(String),

    /// Graph library failure, message passed through unchanged
    #[error("{0}")]
    Library(String),

    /// Failure raised by a single backend graph
    #[error("Graph {graph_id} failed: {message}")]
    Graph {
        /// Id of the failing graph
        graph_id: String,
        /// Failure reported by the backend
        message: String,
    },

    /// Adding a graph to storage failed
    #[error("Error adding graph {graph_id} to storage due to: {message}")]
    AddGraph {
        /// Id of the graph being added
        graph_id: String,
        /// Underlying cause
        message: String,
    },

    /// Caller may not see or manage the graph
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for federated store operations
pub type FederationResult<T> = Result<T, FederationError>;

impl From<serde_json::Error> for FederationError {
    fn from(err: serde_json::Error) -> Self {
        FederationError::Serialization(err.to_string())
    }
}

impl FederationError {
    /// Build a conflict error with no extra detail
    pub fn conflict(graph_id: impl Into<String>) -> Self {
        FederationError::Conflict {
            graph_id: graph_id.into(),
            reason: String::new(),
        }
    }

    /// Check if this is an id collision
    pub fn is_conflict(&self) -> bool {
        matches!(self, FederationError::Conflict { .. })
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, FederationError::NotFound(_))
    }

    /// Check if this is a validation error
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            FederationError::Validation(_)
                | FederationError::InvalidSchema { .. }
                | FederationError::MissingGraphComponent { .. }
        )
    }

    /// Whether the caller can fix the request and retry
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            FederationError::Configuration(_)
                | FederationError::UnsupportedOperation { .. }
                | FederationError::CacheUnavailable
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_merge_message_names_all_graphs() {
        let err = FederationError::SchemaMerge {
            graph_ids: vec!["g1".to_string(), "g2".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Unable to merge the schemas for all of your federated graphs: [g1, g2]. \
             You can limit which graphs to query for using the operation option: \
             federatedstore.operation.graphIds"
        );
    }

    #[test]
    fn test_error_display_messages() {
        let err = FederationError::conflict("accGraph");
        assert_eq!(
            err.to_string(),
            "User is attempting to overwrite a graph within FederatedStore. GraphId: accGraph"
        );

        let err = FederationError::MissingGraphComponent {
            graph_id: "accGraph".to_string(),
            component: "StoreProperties".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "GraphId accGraph cannot be created without defined/known StoreProperties"
        );

        let err = FederationError::UnsupportedOperation {
            kind: "Custom".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Operation class Custom is not supported by the FederatedStore."
        );

        assert!(FederationError::CacheUnavailable
            .to_string()
            .contains("No cache has been set"));
    }

    #[test]
    fn test_classification_helpers() {
        assert!(FederationError::conflict("g").is_conflict());
        assert!(FederationError::NotFound("x".to_string()).is_not_found());
        assert!(FederationError::Validation("bad view".to_string()).is_validation_error());
        assert!(!FederationError::Validation("bad view".to_string()).is_not_found());

        assert!(FederationError::conflict("g").is_recoverable());
        assert!(!FederationError::Configuration("x".to_string()).is_recoverable());
        assert!(!FederationError::UnsupportedOperation {
            kind: "Custom".to_string()
        }
        .is_recoverable());
    }

    #[test]
    fn test_serde_json_conversion() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{ invalid json }").unwrap_err();
        let err: FederationError = serde_err.into();
        assert!(matches!(err, FederationError::Serialization(msg) if !msg.is_empty()));
    }
}
