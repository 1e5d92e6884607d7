//! Policy registration and the universe-scoped validators.
//!
//! The manager owns the mutable side of the system: it validates declarative
//! documents and appends the survivors to the keyed index. Mutation takes
//! `&mut self` and is expected to finish before the index is handed to any
//! engine; reads after that point are freely shared.

use serde_json::Value;

use gatekit_core::{Resource, ResourceDocument};

use crate::error::SchemaError;
use crate::policy::{PolicyDocument, PolicyIndex};
use crate::schema::{ResourceTypeUniverse, SchemaValidator};

/// Validates and stores policies under their `(type, action)` key; mints
/// validated resources against the same universe.
///
/// # Example
///
/// ```
/// use gatekit_authz::{PolicyManager, PolicyDocument};
/// use gatekit_core::Action;
///
/// let mut manager = PolicyManager::new(["user", "file"])?;
/// manager.add_policy(PolicyDocument::unconditional(Action::Read, "file"))?;
///
/// assert_eq!(manager.policies().get("file", Action::Read).len(), 1);
/// # Ok::<(), gatekit_authz::SchemaError>(())
/// ```
#[derive(Debug, Clone)]
pub struct PolicyManager {
    validator: SchemaValidator,
    index: PolicyIndex,
}

impl PolicyManager {
    /// Create a manager over a universe of resource type names.
    ///
    /// # Errors
    ///
    /// Fails when the universe is empty or contains duplicate or empty
    /// names.
    pub fn new<I, S>(universe: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let universe = ResourceTypeUniverse::new(universe)?;
        Ok(Self {
            validator: SchemaValidator::new(universe),
            index: PolicyIndex::default(),
        })
    }

    /// The universe this manager admits.
    #[must_use]
    pub fn universe(&self) -> &ResourceTypeUniverse {
        self.validator.universe()
    }

    /// Validate a policy document and append it to the index.
    ///
    /// # Errors
    ///
    /// Returns a path-carrying [`SchemaError`]; the index is unchanged on
    /// failure.
    pub fn add_policy(&mut self, document: PolicyDocument) -> Result<(), SchemaError> {
        let policy = self.validator.validate_policy(&document).map_err(|e| {
            tracing::debug!(path = %e.path, reason = %e.reason, "rejected policy document");
            e
        })?;

        let key = policy.key();
        self.index.insert(policy);
        tracing::debug!(policy = %key, total = self.index.len(), "registered policy");
        Ok(())
    }

    /// Validate and append a raw JSON policy document.
    ///
    /// # Errors
    ///
    /// Envelope errors (wrong fields, bad action name) surface as a
    /// [`SchemaError`] at the document root.
    pub fn add_policy_value(&mut self, document: Value) -> Result<(), SchemaError> {
        let document: PolicyDocument = serde_json::from_value(document)
            .map_err(|e| SchemaError::new("", e.to_string()))?;
        self.add_policy(document)
    }

    /// Register a batch of policy documents sequentially.
    ///
    /// # Errors
    ///
    /// Stops at the first invalid document; that document is not inserted
    /// but earlier ones remain registered. Callers needing all-or-nothing
    /// must validate up front or rebuild the manager.
    pub fn add_policies<I>(&mut self, documents: I) -> Result<(), SchemaError>
    where
        I: IntoIterator<Item = PolicyDocument>,
    {
        for document in documents {
            self.add_policy(document)?;
        }
        Ok(())
    }

    /// Immutable view of the policy index.
    #[must_use]
    pub fn policies(&self) -> &PolicyIndex {
        &self.index
    }

    /// Validate a resource document into a typed [`Resource`].
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] when the type is outside the universe or an
    /// attribute value has no permitted shape; no resource is produced.
    pub fn create_resource(&self, document: ResourceDocument) -> Result<Resource, SchemaError> {
        self.validator.validate_resource(&document)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gatekit_core::Action;
    use serde_json::json;

    // -------------------------------------------------------------------------
    // Test Helpers
    // -------------------------------------------------------------------------

    fn create_test_manager() -> PolicyManager {
        PolicyManager::new(["user", "todo", "file"]).unwrap()
    }

    // -------------------------------------------------------------------------
    // Construction Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_new_rejects_empty_universe() {
        assert!(PolicyManager::new(Vec::<String>::new()).is_err());
    }

    #[test]
    fn test_new_rejects_duplicate_types() {
        assert!(PolicyManager::new(["user", "user"]).is_err());
    }

    // -------------------------------------------------------------------------
    // Registration Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_add_policy_indexes_under_key() {
        let mut manager = create_test_manager();
        manager
            .add_policy(PolicyDocument::unconditional(Action::Read, "file"))
            .unwrap();
        manager
            .add_policy(PolicyDocument::unconditional(Action::Read, "file"))
            .unwrap();

        assert_eq!(manager.policies().get("file", Action::Read).len(), 2);
        assert!(manager.policies().get("file", Action::Delete).is_empty());
    }

    #[test]
    fn test_add_policy_failure_leaves_index_unchanged() {
        let mut manager = create_test_manager();
        let result = manager.add_policy(PolicyDocument::with_conditions(
            Action::Read,
            "file",
            json!({"op": "and", "conditions": []}),
        ));

        assert!(result.is_err());
        assert!(manager.policies().is_empty());
    }

    #[test]
    fn test_add_policies_keeps_earlier_registrations() {
        let mut manager = create_test_manager();
        let result = manager.add_policies([
            PolicyDocument::unconditional(Action::Read, "file"),
            PolicyDocument::unconditional(Action::Read, "project"), // outside universe
            PolicyDocument::unconditional(Action::Read, "todo"),
        ]);

        assert!(result.is_err());
        assert_eq!(manager.policies().get("file", Action::Read).len(), 1);
        assert!(manager.policies().get("todo", Action::Read).is_empty());
    }

    #[test]
    fn test_add_policy_value_parses_envelope() {
        let mut manager = create_test_manager();
        manager
            .add_policy_value(json!({
                "action": "update",
                "resource": "todo",
                "conditions": {"op": "eq", "subjectKey": "$id", "resourceKey": "$ownerId"}
            }))
            .unwrap();

        assert_eq!(manager.policies().get("todo", Action::Update).len(), 1);
    }

    #[test]
    fn test_add_policy_value_rejects_bad_envelope() {
        let mut manager = create_test_manager();
        let result = manager.add_policy_value(json!({
            "action": "annex",
            "resource": "todo"
        }));

        assert!(result.is_err());
        assert!(manager.policies().is_empty());
    }

    // -------------------------------------------------------------------------
    // Resource Minting Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_create_resource_validates_type() {
        let manager = create_test_manager();
        let result = manager.create_resource(ResourceDocument::new("p1", "project"));
        assert!(result.is_err());
    }

    #[test]
    fn test_create_resource_converts_attributes() {
        let manager = create_test_manager();
        let resource = manager
            .create_resource(
                ResourceDocument::new("u1", "user")
                    .with_attribute("role", json!("admin"))
                    .with_attribute("projects", json!(["p1", "p2"])),
            )
            .unwrap();

        assert_eq!(resource.resource_type, "user");
        assert_eq!(resource.attributes.len(), 2);
    }
}
