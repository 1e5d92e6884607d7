//! # gatekit-authz
//!
//! Attribute-based access control for GateKit: declare policies over a fixed
//! universe of resource types, then ask whether a subject may perform an
//! action on a resource.
//!
//! This crate provides:
//! - A declarative policy document format with strict schema validation
//! - The recursive condition algebra (logical connectives, attribute
//!   comparisons, cross-entity key comparisons, collection membership)
//! - The `(resource_type, action)`-keyed policy store
//! - A pure, synchronous decision engine with precise type-error semantics
//! - An injectable trace hook for debugging decisions
//!
//! ## Modules
//!
//! - [`schema`] - operators, dynamic keys, the condition sum type, validators
//! - [`policy`] - policy documents, validated policies, and the keyed index
//! - [`manager`] - policy registration and resource minting
//! - [`engine`] - the decision engine
//! - [`trace`] - the injectable debug sink
//! - [`error`] - schema and evaluation error types
//!
//! ## Overview
//!
//! ```
//! use gatekit_authz::{AuthEngine, PolicyManager, PolicyDocument};
//! use gatekit_core::{Action, ResourceDocument};
//! use serde_json::json;
//!
//! let mut manager = PolicyManager::new(["user", "todo"])?;
//! manager.add_policy(PolicyDocument::with_conditions(
//!     Action::Update,
//!     "todo",
//!     json!({"op": "eq", "subjectKey": "$id", "resourceKey": "$ownerId"}),
//! ))?;
//!
//! let subject = manager.create_resource(
//!     ResourceDocument::new("u1", "user").with_attribute("id", json!("u1")),
//! )?;
//! let todo = manager.create_resource(
//!     ResourceDocument::new("t1", "todo").with_attribute("ownerId", json!("u1")),
//! )?;
//!
//! let engine = AuthEngine::new(manager.policies());
//! assert!(engine.is_authorized(&subject, &todo, Action::Update)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod engine;
pub mod error;
pub mod manager;
pub mod policy;
pub mod schema;
pub mod trace;

pub use engine::AuthEngine;
pub use error::{InvalidOperandError, SchemaError};
pub use manager::PolicyManager;
pub use policy::{Policy, PolicyDocument, PolicyIndex, PolicyKey};
pub use schema::{
    AttributeCondition, CollectionSource, CompareSource, ComparisonOp, Condition, DynamicKey,
    DynamicKeyError, EntityKeyCondition, ReferenceValue, ResourceTypeUniverse, ScalarValue,
    SchemaValidator,
};
pub use trace::{CollectingTraceSink, NoopTraceSink, TraceRecord, TraceSink, TraceStage};

/// Prelude module for convenient imports.
///
/// ```
/// use gatekit_authz::prelude::*;
/// ```
pub mod prelude {
    pub use crate::engine::AuthEngine;
    pub use crate::error::{InvalidOperandError, SchemaError};
    pub use crate::manager::PolicyManager;
    pub use crate::policy::{Policy, PolicyDocument, PolicyIndex, PolicyKey};
    pub use crate::trace::{CollectingTraceSink, TraceSink};
    pub use gatekit_core::{Action, AttributeValue, Attributes, Resource, ResourceDocument};
}
