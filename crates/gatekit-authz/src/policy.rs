//! Policy documents, validated policies, and the keyed index.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use gatekit_core::Action;

use crate::schema::Condition;

// =============================================================================
// Policy Document
// =============================================================================

/// Declarative policy document as supplied by callers.
///
/// The `conditions` tree arrives as raw JSON and is projected into a typed
/// [`Condition`] by the schema validator at registration time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PolicyDocument {
    /// Action this policy can grant.
    pub action: Action,

    /// Resource type this policy applies to; must be in the universe.
    pub resource: String,

    /// Optional condition tree; absent means unconditional grant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Value>,
}

impl PolicyDocument {
    /// A policy that grants the action on the type unconditionally.
    #[must_use]
    pub fn unconditional(action: Action, resource: impl Into<String>) -> Self {
        Self {
            action,
            resource: resource.into(),
            conditions: None,
        }
    }

    /// A policy guarded by a raw condition tree.
    #[must_use]
    pub fn with_conditions(
        action: Action,
        resource: impl Into<String>,
        conditions: Value,
    ) -> Self {
        Self {
            action,
            resource: resource.into(),
            conditions: Some(conditions),
        }
    }
}

// =============================================================================
// Policy
// =============================================================================

/// A policy that has passed schema validation.
///
/// Policies are immutable once registered; the index hands out shared
/// references only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Action this policy can grant.
    pub action: Action,

    /// Resource type this policy applies to.
    pub resource: String,

    /// Validated condition tree; `None` grants unconditionally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Condition>,
}

impl Policy {
    /// The index key this policy is stored under.
    #[must_use]
    pub fn key(&self) -> PolicyKey {
        PolicyKey::new(&self.resource, self.action)
    }
}

// =============================================================================
// Policy Key
// =============================================================================

/// Index key derived from a policy: `"<type>:<action>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PolicyKey(String);

impl PolicyKey {
    /// Build the key for a `(resource type, action)` pair.
    #[must_use]
    pub fn new(resource_type: &str, action: Action) -> Self {
        Self(format!("{resource_type}:{action}"))
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PolicyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Policy Index
// =============================================================================

/// Append-only map from policy key to the policies registered under it.
///
/// Within a key, policies keep their registration order; the evaluator
/// visits them in that order. Whole-index iteration is deterministic.
#[derive(Debug, Clone, Default)]
pub struct PolicyIndex {
    entries: IndexMap<PolicyKey, Vec<Policy>>,
}

impl PolicyIndex {
    /// Append a validated policy under its derived key.
    pub(crate) fn insert(&mut self, policy: Policy) {
        self.entries.entry(policy.key()).or_default().push(policy);
    }

    /// Policies registered for a `(resource type, action)` pair, in
    /// registration order. Unknown pairs yield an empty slice.
    #[must_use]
    pub fn get(&self, resource_type: &str, action: Action) -> &[Policy] {
        self.entries
            .get(&PolicyKey::new(resource_type, action))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Iterate over `(key, policies)` entries in first-registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&PolicyKey, &[Policy])> {
        self.entries
            .iter()
            .map(|(key, policies)| (key, policies.as_slice()))
    }

    /// Total number of registered policies across all keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Returns `true` if no policy has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
