// Copyright 2025 Cowboy AI, LLC.

//! Store capabilities and their aggregation across member graphs

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::errors::{FederationError, FederationResult};

/// A named capability a backend advertises
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoreTrait {
    /// Aggregates elements at query time
    QueryAggregation,
    /// Aggregates elements on ingest
    StoreAggregation,
    /// Filters before aggregation
    PreAggregationFiltering,
    /// Filters after aggregation
    PostAggregationFiltering,
    /// Filters after transformation
    PostTransformationFiltering,
    /// Applies transform functions
    Transformation,
    /// Validates elements when they are stored
    StoreValidation,
    /// Returns elements in a stable order
    Ordered,
    /// Enforces element level visibility
    Visibility,
    /// Reports which seed matched an element
    MatchedVertex,
}

impl StoreTrait {
    /// Every known trait
    pub const ALL: [StoreTrait; 10] = [
        StoreTrait::QueryAggregation,
        StoreTrait::StoreAggregation,
        StoreTrait::PreAggregationFiltering,
        StoreTrait::PostAggregationFiltering,
        StoreTrait::PostTransformationFiltering,
        StoreTrait::Transformation,
        StoreTrait::StoreValidation,
        StoreTrait::Ordered,
        StoreTrait::Visibility,
        StoreTrait::MatchedVertex,
    ];

    /// Canonical name, e.g. `QUERY_AGGREGATION`
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreTrait::QueryAggregation => "QUERY_AGGREGATION",
            StoreTrait::StoreAggregation => "STORE_AGGREGATION",
            StoreTrait::PreAggregationFiltering => "PRE_AGGREGATION_FILTERING",
            StoreTrait::PostAggregationFiltering => "POST_AGGREGATION_FILTERING",
            StoreTrait::PostTransformationFiltering => "POST_TRANSFORMATION_FILTERING",
            StoreTrait::Transformation => "TRANSFORMATION",
            StoreTrait::StoreValidation => "STORE_VALIDATION",
            StoreTrait::Ordered => "ORDERED",
            StoreTrait::Visibility => "VISIBILITY",
            StoreTrait::MatchedVertex => "MATCHED_VERTEX",
        }
    }

    /// Every known trait as a set
    pub fn all() -> BTreeSet<StoreTrait> {
        Self::ALL.into_iter().collect()
    }
}

impl fmt::Display for StoreTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreTrait {
    type Err = FederationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        StoreTrait::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| FederationError::Configuration(format!("Unknown store trait: {s}")))
    }
}

/// Parse a comma separated list of trait names, ignoring empty tokens
pub fn parse_traits(csv: &str) -> FederationResult<BTreeSet<StoreTrait>> {
    csv.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(StoreTrait::from_str)
        .collect()
}

/// Combines the trait sets of selected graphs
///
/// Traits listed as always on are added to every member's set before
/// combining, so a member that omits one does not remove it from the
/// federated result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraitAggregator {
    always_on: BTreeSet<StoreTrait>,
}

impl TraitAggregator {
    /// Create an aggregator with the given always-on traits
    pub fn new(always_on: BTreeSet<StoreTrait>) -> Self {
        Self { always_on }
    }

    /// Traits treated as present on every member
    pub fn always_on(&self) -> &BTreeSet<StoreTrait> {
        &self.always_on
    }

    /// Traits every selected graph supports. Empty when nothing is selected.
    pub fn intersection<I>(&self, member_traits: I) -> BTreeSet<StoreTrait>
    where
        I: IntoIterator<Item = BTreeSet<StoreTrait>>,
    {
        let mut members = member_traits.into_iter().map(|set| self.with_always_on(set));
        let Some(first) = members.next() else {
            return BTreeSet::new();
        };
        members.fold(first, |acc, next| acc.intersection(&next).copied().collect())
    }

    /// Traits at least one selected graph supports
    pub fn union<I>(&self, member_traits: I) -> BTreeSet<StoreTrait>
    where
        I: IntoIterator<Item = BTreeSet<StoreTrait>>,
    {
        let mut members = member_traits.into_iter().peekable();
        if members.peek().is_none() {
            return BTreeSet::new();
        }
        members
            .flat_map(|set| self.with_always_on(set))
            .collect()
    }

    fn with_always_on(&self, mut set: BTreeSet<StoreTrait>) -> BTreeSet<StoreTrait> {
        set.extend(self.always_on.iter().copied());
        set
    }
}
