// Copyright 2025 Cowboy AI, LLC.

//! Which graphs a user may see and use

use std::sync::Arc;

use crate::graph::{FederatedGraph, GraphAccess};
use crate::user::{User, UNKNOWN_USER_ID};

/// Decides graph visibility for a user.
///
/// A graph is visible when it is public, declares no auths, shares an auth
/// with the user's op auths, is owned by the user, or the user holds the
/// admin auth. Graphs added by the unknown user have no owner. Invisible
/// graphs are dropped without error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityFilter {
    admin_auth: Option<String>,
}

impl VisibilityFilter {
    /// Filter with an optional admin auth
    pub fn new(admin_auth: Option<String>) -> Self {
        Self { admin_auth }
    }

    /// Whether `user` may see a graph with these access rules
    pub fn is_visible(&self, user: &User, access: &GraphAccess) -> bool {
        access.is_public
            || access.graph_auths.is_empty()
            || access
                .graph_auths
                .iter()
                .any(|auth| user.op_auths().contains(auth))
            || (access.owner_user_id != UNKNOWN_USER_ID
                && access.owner_user_id == user.user_id())
            || self
                .admin_auth
                .as_ref()
                .is_some_and(|admin| user.op_auths().contains(admin))
    }

    /// Keep the graphs `user` may see, preserving order
    pub fn filter(&self, user: &User, graphs: Vec<Arc<FederatedGraph>>) -> Vec<Arc<FederatedGraph>> {
        graphs
            .into_iter()
            .filter(|graph| self.is_visible(user, graph.access()))
            .collect()
    }
}
