use thiserror::Error;

/// Core error types for GateKit value handling
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("Unsupported attribute value: {0}")]
    UnsupportedValue(String),

    #[error("Boolean arrays are not a permitted attribute value")]
    BooleanArray,

    #[error("Array elements must all be strings or all be numbers")]
    MixedArray,

    #[error("Attribute numbers must be finite, got {0}")]
    NonFiniteNumber(f64),

    #[error("Attribute names must be non-empty")]
    EmptyAttributeName,

    #[error("Unknown action: {0} (expected read, create, update, or delete)")]
    UnknownAction(String),
}

impl CoreError {
    /// Create a new UnsupportedValue error
    pub fn unsupported_value(message: impl Into<String>) -> Self {
        Self::UnsupportedValue(message.into())
    }

    /// Create a new UnknownAction error
    pub fn unknown_action(action: impl Into<String>) -> Self {
        Self::UnknownAction(action.into())
    }
}
