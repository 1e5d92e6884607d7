//! Attribute values and the per-entity attribute container.
//!
//! Attributes are the raw material of every authorization decision: policies
//! reference them through dynamic keys, and the evaluator compares them with
//! reference values or with each other. The value space is deliberately
//! small: three primitives and two homogeneous array shapes. Boolean arrays
//! are not representable.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

// =============================================================================
// Value Type
// =============================================================================

/// The shape of an attribute value.
///
/// Used in type checks and error reporting; the lowercase names appear in
/// `InvalidOperandError` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    String,
    Number,
    Bool,
    StringArray,
    NumberArray,
}

impl ValueType {
    /// Returns `true` for the two array shapes.
    #[must_use]
    pub fn is_array(self) -> bool {
        matches!(self, Self::StringArray | Self::NumberArray)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::StringArray => "string array",
            Self::NumberArray => "number array",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Attribute Value
// =============================================================================

/// A single attribute value.
///
/// Numbers use one finite `f64` carrier; JSON integers and floats collapse
/// into it. Arrays are homogeneous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Num(f64),
    Str(String),
    StrArray(Vec<String>),
    NumArray(Vec<f64>),
}

impl AttributeValue {
    /// The shape of this value.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Str(_) => ValueType::String,
            Self::Num(_) => ValueType::Number,
            Self::Bool(_) => ValueType::Bool,
            Self::StrArray(_) => ValueType::StringArray,
            Self::NumArray(_) => ValueType::NumberArray,
        }
    }

    /// Returns `true` if this value is one of the array shapes.
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.value_type().is_array()
    }

    /// Convert a raw JSON value into an attribute value.
    ///
    /// # Errors
    ///
    /// Returns an error for nulls, objects, non-finite numbers, boolean
    /// arrays, mixed-type arrays, and arrays nested inside arrays.
    pub fn from_json(value: &Value) -> Result<Self, CoreError> {
        match value {
            Value::String(s) => Ok(Self::Str(s.clone())),
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Number(n) => {
                let n = n
                    .as_f64()
                    .ok_or_else(|| CoreError::unsupported_value("number is out of range"))?;
                if !n.is_finite() {
                    return Err(CoreError::NonFiniteNumber(n));
                }
                Ok(Self::Num(n))
            }
            Value::Array(items) => Self::array_from_json(items),
            Value::Null => Err(CoreError::unsupported_value("null is not a value")),
            Value::Object(_) => Err(CoreError::unsupported_value("objects are not values")),
        }
    }

    fn array_from_json(items: &[Value]) -> Result<Self, CoreError> {
        let mut strings = Vec::new();
        let mut numbers = Vec::new();

        for item in items {
            match item {
                Value::String(s) => strings.push(s.clone()),
                Value::Number(n) => {
                    let n = n
                        .as_f64()
                        .ok_or_else(|| CoreError::unsupported_value("number is out of range"))?;
                    if !n.is_finite() {
                        return Err(CoreError::NonFiniteNumber(n));
                    }
                    numbers.push(n);
                }
                Value::Bool(_) => return Err(CoreError::BooleanArray),
                _ => {
                    return Err(CoreError::unsupported_value(
                        "array elements must be strings or numbers",
                    ));
                }
            }
        }

        match (strings.is_empty(), numbers.is_empty()) {
            (false, false) => Err(CoreError::MixedArray),
            (true, false) => Ok(Self::NumArray(numbers)),
            // All-string, or empty: an empty array is an empty string array.
            _ => Ok(Self::StrArray(strings)),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Num(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Num(value as f64)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(value: Vec<String>) -> Self {
        Self::StrArray(value)
    }
}

impl From<Vec<&str>> for AttributeValue {
    fn from(value: Vec<&str>) -> Self {
        Self::StrArray(value.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(value: Vec<f64>) -> Self {
        Self::NumArray(value)
    }
}

impl From<Vec<i64>> for AttributeValue {
    fn from(value: Vec<i64>) -> Self {
        Self::NumArray(value.into_iter().map(|n| n as f64).collect())
    }
}

// =============================================================================
// Attributes
// =============================================================================

/// The attribute container of an entity.
///
/// Keys are unique attribute names; insertion order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(HashMap<String, AttributeValue>);

impl Attributes {
    /// Create an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an attribute, replacing any existing value under the name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Builder-style insert for literals and tests.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Look up an attribute by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0.get(name)
    }

    /// Returns `true` if an attribute with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the container holds no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(name, value)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.0.iter()
    }
}

impl FromIterator<(String, AttributeValue)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, AttributeValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -------------------------------------------------------------------------
    // JSON Conversion Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_from_json_primitives() {
        assert_eq!(
            AttributeValue::from_json(&json!("eng")).unwrap(),
            AttributeValue::Str("eng".to_string())
        );
        assert_eq!(
            AttributeValue::from_json(&json!(7)).unwrap(),
            AttributeValue::Num(7.0)
        );
        assert_eq!(
            AttributeValue::from_json(&json!(true)).unwrap(),
            AttributeValue::Bool(true)
        );
    }

    #[test]
    fn test_from_json_arrays() {
        assert_eq!(
            AttributeValue::from_json(&json!(["p1", "p2"])).unwrap(),
            AttributeValue::StrArray(vec!["p1".to_string(), "p2".to_string()])
        );
        assert_eq!(
            AttributeValue::from_json(&json!([1, 2.5])).unwrap(),
            AttributeValue::NumArray(vec![1.0, 2.5])
        );
    }

    #[test]
    fn test_from_json_empty_array_is_string_array() {
        assert_eq!(
            AttributeValue::from_json(&json!([])).unwrap(),
            AttributeValue::StrArray(vec![])
        );
    }

    #[test]
    fn test_from_json_rejects_boolean_array() {
        let result = AttributeValue::from_json(&json!([true, false]));
        assert_eq!(result, Err(CoreError::BooleanArray));
    }

    #[test]
    fn test_from_json_rejects_mixed_array() {
        let result = AttributeValue::from_json(&json!(["a", 1]));
        assert_eq!(result, Err(CoreError::MixedArray));
    }

    #[test]
    fn test_from_json_rejects_null_and_object() {
        assert!(AttributeValue::from_json(&json!(null)).is_err());
        assert!(AttributeValue::from_json(&json!({"nested": 1})).is_err());
        assert!(AttributeValue::from_json(&json!([["nested"]])).is_err());
    }

    // -------------------------------------------------------------------------
    // Shape Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_value_type() {
        assert_eq!(AttributeValue::from("x").value_type(), ValueType::String);
        assert_eq!(AttributeValue::from(1.5).value_type(), ValueType::Number);
        assert_eq!(AttributeValue::from(false).value_type(), ValueType::Bool);
        assert_eq!(
            AttributeValue::from(vec!["a"]).value_type(),
            ValueType::StringArray
        );
        assert_eq!(
            AttributeValue::from(vec![1i64, 2]).value_type(),
            ValueType::NumberArray
        );
    }

    #[test]
    fn test_is_array() {
        assert!(AttributeValue::from(vec![1.0]).is_array());
        assert!(!AttributeValue::from(1.0).is_array());
    }

    #[test]
    fn test_value_type_display() {
        assert_eq!(ValueType::StringArray.to_string(), "string array");
        assert_eq!(ValueType::Bool.to_string(), "bool");
    }

    // -------------------------------------------------------------------------
    // Serde Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_untagged_serialization() {
        assert_eq!(
            serde_json::to_value(AttributeValue::from("eng")).unwrap(),
            json!("eng")
        );
        assert_eq!(
            serde_json::to_value(AttributeValue::from(vec![1i64, 2])).unwrap(),
            json!([1.0, 2.0])
        );
    }

    #[test]
    fn test_untagged_deserialization() {
        let value: AttributeValue = serde_json::from_value(json!(["a", "b"])).unwrap();
        assert_eq!(value, AttributeValue::from(vec!["a", "b"]));

        // Boolean arrays have no representation.
        let result: Result<AttributeValue, _> = serde_json::from_value(json!([true]));
        assert!(result.is_err());
    }

    // -------------------------------------------------------------------------
    // Attributes Container Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_attributes_insert_and_get() {
        let mut attributes = Attributes::new();
        attributes.insert("role", "admin");
        attributes.insert("level", 3i64);

        assert_eq!(attributes.len(), 2);
        assert_eq!(
            attributes.get("role"),
            Some(&AttributeValue::Str("admin".to_string()))
        );
        assert!(attributes.get("missing").is_none());
    }

    #[test]
    fn test_attributes_builder_chaining() {
        let attributes = Attributes::new()
            .with("ownerId", "u1")
            .with("tags", vec!["a", "b"]);

        assert!(attributes.contains("ownerId"));
        assert!(attributes.contains("tags"));
    }

    #[test]
    fn test_attributes_replace_on_duplicate_name() {
        let attributes = Attributes::new().with("role", "user").with("role", "admin");

        assert_eq!(attributes.len(), 1);
        assert_eq!(
            attributes.get("role"),
            Some(&AttributeValue::Str("admin".to_string()))
        );
    }
}
