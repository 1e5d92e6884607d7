//! Authorization error types.
//!
//! Two failure families exist and their distinction is load-bearing:
//! [`SchemaError`] rejects a document at registration time (nothing is
//! inserted or produced), while [`InvalidOperandError`] surfaces a runtime
//! shape mismatch of a *present* attribute during evaluation. A missing
//! attribute is never an error; it is data that evaluates to `false`.

use gatekit_core::ValueType;
use thiserror::Error;

use crate::schema::ComparisonOp;

// =============================================================================
// Schema Error
// =============================================================================

/// Rejection of a policy or resource document during validation.
///
/// `path` addresses the offending node in the document
/// (e.g. `conditions.conditions[1].attributeKey`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema violation at `{path}`: {reason}")]
pub struct SchemaError {
    /// Dotted path of the offending node.
    pub path: String,

    /// Human-readable description of the violation.
    pub reason: String,
}

impl SchemaError {
    /// Create a schema error for a document node.
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Invalid Operand Error
// =============================================================================

/// A present attribute whose shape is incompatible with the operator.
///
/// Raised only for policies actually reached during a decision; type errors
/// hiding in unreached policies stay silent.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct InvalidOperandError {
    /// Shape of the offending value.
    pub observed_type: ValueType,

    /// Operator that could not accept it.
    pub operator: ComparisonOp,

    /// Human-readable description.
    pub message: String,
}

impl InvalidOperandError {
    /// Create an invalid-operand error.
    pub fn new(
        observed_type: ValueType,
        operator: ComparisonOp,
        message: impl Into<String>,
    ) -> Self {
        Self {
            observed_type,
            operator,
            message: message.into(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
