// Copyright 2025 Cowboy AI, LLC.

//! Request context threaded through an operation's execution

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::user::User;

/// A user plus a unique request id
#[derive(Debug, Clone)]
pub struct Context {
    user: User,
    request_id: Uuid,
    started_at: DateTime<Utc>,
}

impl Context {
    /// Create a context for a new request
    pub fn new(user: impl Into<User>) -> Self {
        Self {
            user: user.into(),
            request_id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }

    /// The calling user
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Unique id of this request
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// When the request entered the store
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(User::unknown())
    }
}
