//! Resources: the entities on both sides of an authorization query.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attribute::{AttributeValue, Attributes};

// =============================================================================
// Resource
// =============================================================================

/// An identified entity with typed attributes.
///
/// The subject of an authorization query is itself a resource; its type
/// typically names a user-kind (`"user"`, `"service-account"`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Unique identifier.
    pub id: String,

    /// Resource type; drawn from the manager's universe for minted resources.
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Attribute map consulted during evaluation.
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl Resource {
    /// Create a resource directly, bypassing universe validation.
    ///
    /// Prefer `PolicyManager::create_resource` for caller-supplied input;
    /// this constructor exists for code that already holds typed values.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        resource_type: impl Into<String>,
        attributes: Attributes,
    ) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            attributes,
        }
    }

    /// Look up an attribute by resolved name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}

// =============================================================================
// Resource Document
// =============================================================================

/// Raw input shape for minting a resource through the policy manager.
///
/// Attribute values arrive as arbitrary JSON and are converted (and rejected)
/// during validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResourceDocument {
    /// Unique identifier.
    pub id: String,

    /// Requested resource type; must be in the manager's universe.
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Raw attribute values.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, Value>,
}

impl ResourceDocument {
    /// Create a document with no attributes.
    #[must_use]
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
        }
    }

    /// Builder-style attribute insertion.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }
}

// =============================================================================
// Tests
// =============================================================================
