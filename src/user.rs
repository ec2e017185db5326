// Copyright 2025 Cowboy AI, LLC.

//! Users and their authorisations
//!
//! A user starts life as a [`MutableUser`] and is frozen into a [`User`] by
//! [`MutableUser::lock`]. A locked `User` exposes no mutators, so writing to
//! it is rejected at compile time rather than at runtime.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Identity used when no user id is supplied
pub const UNKNOWN_USER_ID: &str = "UNKNOWN";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct UserDetails {
    user_id: String,
    data_auths: BTreeSet<String>,
    op_auths: BTreeSet<String>,
}

impl Default for UserDetails {
    fn default() -> Self {
        Self {
            user_id: UNKNOWN_USER_ID.to_string(),
            data_auths: BTreeSet::new(),
            op_auths: BTreeSet::new(),
        }
    }
}

/// A user whose fields can still be changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutableUser {
    details: UserDetails,
}

impl MutableUser {
    /// Create a user with the given id
    pub fn new(user_id: impl Into<String>) -> Self {
        let mut user = Self::default();
        user.set_user_id(Some(user_id.into()));
        user
    }

    /// Set the user id, falling back to [`UNKNOWN_USER_ID`] when unset
    pub fn set_user_id(&mut self, user_id: Option<String>) -> &mut Self {
        self.details.user_id = user_id.unwrap_or_else(|| UNKNOWN_USER_ID.to_string());
        self
    }

    /// Add an element-level visibility auth
    pub fn add_data_auth(&mut self, auth: impl Into<String>) -> &mut Self {
        self.details.data_auths.insert(auth.into());
        self
    }

    /// Replace all data auths
    pub fn set_data_auths<I, S>(&mut self, auths: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.details.data_auths = auths.into_iter().map(Into::into).collect();
        self
    }

    /// Add an operation auth
    pub fn add_op_auth(&mut self, auth: impl Into<String>) -> &mut Self {
        self.details.op_auths.insert(auth.into());
        self
    }

    /// Replace all operation auths
    pub fn set_op_auths<I, S>(&mut self, auths: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.details.op_auths = auths.into_iter().map(Into::into).collect();
        self
    }

    /// Freeze the user. There is no way back to a mutable value.
    pub fn lock(self) -> User {
        User {
            details: Arc::new(self.details),
        }
    }
}

/// A locked, immutable user
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct User {
    details: Arc<UserDetails>,
}

impl User {
    /// Locked user with the given id and op auths
    pub fn with_op_auths<I, S>(user_id: impl Into<String>, op_auths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut user = MutableUser::new(user_id);
        user.set_op_auths(op_auths);
        user.lock()
    }

    /// Locked user with no id and no auths
    pub fn unknown() -> Self {
        MutableUser::default().lock()
    }

    /// User id
    pub fn user_id(&self) -> &str {
        &self.details.user_id
    }

    /// Element-level visibility auths, enforced by backends
    pub fn data_auths(&self) -> &BTreeSet<String> {
        &self.details.data_auths
    }

    /// Auths governing which graphs and operations the user may use
    pub fn op_auths(&self) -> &BTreeSet<String> {
        &self.details.op_auths
    }

    /// Always true, kept for callers that inspect lock state
    pub fn is_locked(&self) -> bool {
        true
    }
}

impl Default for User {
    fn default() -> Self {
        Self::unknown()
    }
}

impl From<MutableUser> for User {
    fn from(user: MutableUser) -> Self {
        user.lock()
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("user_id", &self.details.user_id)
            .field("data_auths", &self.details.data_auths)
            .finish()
    }
}
