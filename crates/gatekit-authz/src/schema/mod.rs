//! The shared schema layer: operators, dynamic keys, the condition sum type,
//! and the validators both the policy manager and resource minting call.

pub mod condition;
pub mod key;
pub mod validate;

pub use condition::{
    AttributeCondition, CollectionSource, CompareSource, ComparisonOp, Condition,
    EntityKeyCondition, ReferenceValue, ScalarValue,
};
pub use key::{DynamicKey, DynamicKeyError};
pub use validate::{ResourceTypeUniverse, SchemaValidator};
