//! The condition algebra: operators, reference values, and the predicate tree.
//!
//! A [`Condition`] is a recursively composed boolean expression mixing
//! logical connectives, attribute-against-reference comparisons, and
//! cross-entity key comparisons. Conditions are produced exclusively by the
//! schema validator; the evaluator consumes them with exhaustive matching.

use std::fmt;

use serde::{Deserialize, Serialize};

use gatekit_core::ValueType;

use crate::schema::key::DynamicKey;

// =============================================================================
// Operators
// =============================================================================

/// Comparison operator of an attribute or entity-key condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
}

impl ComparisonOp {
    /// The lowercase wire name of the operator.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
            Self::Nin => "nin",
        }
    }

    /// Parse a wire name.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "in" => Some(Self::In),
            "nin" => Some(Self::Nin),
            _ => None,
        }
    }

    /// `eq` or `ne`.
    #[must_use]
    pub fn is_equality(self) -> bool {
        matches!(self, Self::Eq | Self::Ne)
    }

    /// `gt`, `gte`, `lt`, or `lte`.
    #[must_use]
    pub fn is_ordering(self) -> bool {
        matches!(self, Self::Gt | Self::Gte | Self::Lt | Self::Lte)
    }

    /// `in` or `nin`.
    #[must_use]
    pub fn is_membership(self) -> bool {
        matches!(self, Self::In | Self::Nin)
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sources
// =============================================================================

/// Entity supplying the attribute value of an attribute condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareSource {
    Subject,
    Resource,
}

impl CompareSource {
    /// Parse a wire name.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "subject" => Some(Self::Subject),
            "resource" => Some(Self::Resource),
            _ => None,
        }
    }
}

/// Entity holding the collection in a membership entity-key condition;
/// the other entity supplies the probed target value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionSource {
    Subject,
    Resource,
}

impl CollectionSource {
    /// Parse a wire name.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "subject" => Some(Self::Subject),
            "resource" => Some(Self::Resource),
            _ => None,
        }
    }
}

// =============================================================================
// Reference Values
// =============================================================================

/// A primitive element of a reference list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Num(f64),
    Str(String),
}

impl ScalarValue {
    /// The shape of this scalar.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Str(_) => ValueType::String,
            Self::Num(_) => ValueType::Number,
            Self::Bool(_) => ValueType::Bool,
        }
    }
}

/// The inline comparison value of an attribute condition.
///
/// Equality operators carry a scalar, ordering operators a number, and
/// membership operators a list. List elements are individually strings or
/// numbers; element-type uniformity is checked at evaluation, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReferenceValue {
    Bool(bool),
    Num(f64),
    Str(String),
    List(Vec<ScalarValue>),
}

// =============================================================================
// Condition Tree
// =============================================================================

/// A node in the policy predicate tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    /// Conjunction over one or more children, left-to-right short-circuit.
    And(Vec<Condition>),

    /// Disjunction over one or more children, left-to-right short-circuit.
    Or(Vec<Condition>),

    /// Negation of a single child.
    Not(Box<Condition>),

    /// Attribute-against-reference comparison.
    Attribute(AttributeCondition),

    /// Subject-attribute-against-resource-attribute comparison.
    EntityKey(EntityKeyCondition),
}

/// Compares one entity attribute against an inline reference value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeCondition {
    /// Comparison operator.
    pub op: ComparisonOp,

    /// Attribute to resolve on the selected entity (or on both).
    pub attribute_key: DynamicKey,

    /// Inline value to compare against.
    pub reference_value: ReferenceValue,

    /// Which entity supplies the value; absent means both sides must match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compare_source: Option<CompareSource>,
}

/// Compares an attribute of the subject with an attribute of the resource.
///
/// The operator determines the form: membership operators inhabit
/// [`EntityKeyCondition::Collection`], every other operator
/// [`EntityKeyCondition::Primitive`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKeyCondition {
    /// `eq|ne|gt|gte|lt|lte` over one primitive from each entity.
    Primitive {
        op: ComparisonOp,
        subject_key: DynamicKey,
        resource_key: DynamicKey,
    },

    /// `in|nin` membership of one entity's primitive in the other's array.
    Collection {
        op: ComparisonOp,
        target_key: DynamicKey,
        collection_key: DynamicKey,
        collection_source: CollectionSource,
    },
}

// =============================================================================
// Tests
// =============================================================================
