//! Schema validation for policy and resource documents.
//!
//! Validation is a fold over the raw JSON condition tree: it either produces
//! a strongly typed [`Condition`] or a [`SchemaError`] addressing the
//! offending node by path. Objects are checked strictly: a field outside
//! the variant's grammar rejects the whole document.

use serde_json::{Map, Value};

use gatekit_core::{AttributeValue, Attributes, Resource, ResourceDocument};

use crate::error::SchemaError;
use crate::policy::{Policy, PolicyDocument};
use crate::schema::condition::{
    AttributeCondition, CollectionSource, CompareSource, ComparisonOp, Condition,
    EntityKeyCondition, ReferenceValue, ScalarValue,
};
use crate::schema::key::DynamicKey;

// =============================================================================
// Resource Type Universe
// =============================================================================

/// The fixed, ordered set of resource type names a manager admits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTypeUniverse {
    members: Vec<String>,
}

impl ResourceTypeUniverse {
    /// Build a universe from an ordered list of type names.
    ///
    /// # Errors
    ///
    /// Rejects an empty list, duplicate members, and empty-string members.
    pub fn new<I, S>(members: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let members: Vec<String> = members.into_iter().map(Into::into).collect();

        if members.is_empty() {
            return Err(SchemaError::new(
                "universe",
                "at least one resource type is required",
            ));
        }
        for (i, member) in members.iter().enumerate() {
            if member.is_empty() {
                return Err(SchemaError::new(
                    format!("universe[{i}]"),
                    "resource type names must be non-empty",
                ));
            }
            if members[..i].contains(member) {
                return Err(SchemaError::new(
                    format!("universe[{i}]"),
                    format!("duplicate resource type `{member}`"),
                ));
            }
        }

        Ok(Self { members })
    }

    /// Returns `true` if the type name is a member.
    #[must_use]
    pub fn contains(&self, resource_type: &str) -> bool {
        self.members.iter().any(|m| m == resource_type)
    }

    /// The member names, in declaration order.
    #[must_use]
    pub fn members(&self) -> &[String] {
        &self.members
    }
}

// =============================================================================
// Schema Validator
// =============================================================================

/// Validates declarative documents against the condition grammar and the
/// universe. Shared by policy registration and resource minting.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    universe: ResourceTypeUniverse,
}

impl SchemaValidator {
    /// Create a validator scoped to a universe.
    #[must_use]
    pub fn new(universe: ResourceTypeUniverse) -> Self {
        Self { universe }
    }

    /// The universe this validator admits.
    #[must_use]
    pub fn universe(&self) -> &ResourceTypeUniverse {
        &self.universe
    }

    /// Validate a policy document into an immutable [`Policy`].
    ///
    /// # Errors
    ///
    /// Returns a path-carrying [`SchemaError`]; nothing is produced on
    /// failure.
    pub fn validate_policy(&self, document: &PolicyDocument) -> Result<Policy, SchemaError> {
        if !self.universe.contains(&document.resource) {
            return Err(SchemaError::new(
                "resource",
                format!(
                    "`{}` is not a registered resource type",
                    document.resource
                ),
            ));
        }

        let conditions = document
            .conditions
            .as_ref()
            .map(|value| self.validate_condition(value, "conditions"))
            .transpose()?;

        Ok(Policy {
            action: document.action,
            resource: document.resource.clone(),
            conditions,
        })
    }

    /// Validate a resource document into a typed [`Resource`].
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] when the type is outside the universe or an
    /// attribute value has no permitted shape.
    pub fn validate_resource(&self, document: &ResourceDocument) -> Result<Resource, SchemaError> {
        if !self.universe.contains(&document.resource_type) {
            return Err(SchemaError::new(
                "type",
                format!(
                    "`{}` is not a registered resource type",
                    document.resource_type
                ),
            ));
        }

        let mut attributes = Attributes::new();
        for (name, value) in &document.attributes {
            if name.is_empty() {
                return Err(SchemaError::new(
                    "attributes",
                    "attribute names must be non-empty",
                ));
            }
            let value = AttributeValue::from_json(value)
                .map_err(|e| SchemaError::new(join("attributes", name), e.to_string()))?;
            attributes.insert(name.clone(), value);
        }

        Ok(Resource::new(
            document.id.clone(),
            document.resource_type.clone(),
            attributes,
        ))
    }

    /// Validate one node of a raw condition tree.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] addressing the first offending node.
    pub fn validate_condition(&self, value: &Value, path: &str) -> Result<Condition, SchemaError> {
        let object = as_object(value, path)?;
        let op_raw = required_str(object, "op", path)?;

        match op_raw {
            "and" | "or" => self.validate_variadic(object, op_raw, path),
            "not" => self.validate_not(object, path),
            _ => {
                let Some(op) = ComparisonOp::parse(op_raw) else {
                    return Err(SchemaError::new(
                        join(path, "op"),
                        format!("unknown operator `{op_raw}`"),
                    ));
                };
                if object.contains_key("attributeKey") {
                    self.validate_attribute_condition(object, op, path)
                } else if op.is_membership() {
                    self.validate_collection_condition(object, op, path)
                } else {
                    self.validate_primitive_condition(object, op, path)
                }
            }
        }
    }

    fn validate_variadic(
        &self,
        object: &Map<String, Value>,
        op_raw: &str,
        path: &str,
    ) -> Result<Condition, SchemaError> {
        reject_unknown_fields(object, &["op", "conditions"], path)?;

        let children_path = join(path, "conditions");
        let Value::Array(children) = required(object, "conditions", path)? else {
            return Err(SchemaError::new(
                children_path,
                "expected an array of conditions",
            ));
        };
        if children.is_empty() {
            return Err(SchemaError::new(
                children_path,
                format!("`{op_raw}` requires at least one condition"),
            ));
        }

        let children = children
            .iter()
            .enumerate()
            .map(|(i, child)| self.validate_condition(child, &format!("{children_path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(match op_raw {
            "and" => Condition::And(children),
            _ => Condition::Or(children),
        })
    }

    fn validate_not(
        &self,
        object: &Map<String, Value>,
        path: &str,
    ) -> Result<Condition, SchemaError> {
        reject_unknown_fields(object, &["op", "conditions"], path)?;

        let child_path = join(path, "conditions");
        let child = required(object, "conditions", path)?;
        if child.is_array() {
            return Err(SchemaError::new(
                child_path,
                "`not` takes a single condition, not an array",
            ));
        }

        let child = self.validate_condition(child, &child_path)?;
        Ok(Condition::Not(Box::new(child)))
    }

    fn validate_attribute_condition(
        &self,
        object: &Map<String, Value>,
        op: ComparisonOp,
        path: &str,
    ) -> Result<Condition, SchemaError> {
        reject_unknown_fields(
            object,
            &["op", "attributeKey", "referenceValue", "compareSource"],
            path,
        )?;

        let attribute_key = self.validate_dynamic_key(object, "attributeKey", path)?;
        let reference_value = self.validate_reference_value(object, op, path)?;

        let compare_source = match object.get("compareSource") {
            None => None,
            Some(value) => {
                let source_path = join(path, "compareSource");
                let raw = as_str(value, &source_path)?;
                Some(CompareSource::parse(raw).ok_or_else(|| {
                    SchemaError::new(
                        source_path,
                        format!("expected `subject` or `resource`, got `{raw}`"),
                    )
                })?)
            }
        };

        Ok(Condition::Attribute(AttributeCondition {
            op,
            attribute_key,
            reference_value,
            compare_source,
        }))
    }

    fn validate_primitive_condition(
        &self,
        object: &Map<String, Value>,
        op: ComparisonOp,
        path: &str,
    ) -> Result<Condition, SchemaError> {
        reject_unknown_fields(object, &["op", "subjectKey", "resourceKey"], path)?;

        let subject_key = self.validate_dynamic_key(object, "subjectKey", path)?;
        let resource_key = self.validate_dynamic_key(object, "resourceKey", path)?;

        Ok(Condition::EntityKey(EntityKeyCondition::Primitive {
            op,
            subject_key,
            resource_key,
        }))
    }

    fn validate_collection_condition(
        &self,
        object: &Map<String, Value>,
        op: ComparisonOp,
        path: &str,
    ) -> Result<Condition, SchemaError> {
        reject_unknown_fields(
            object,
            &["op", "targetKey", "collectionKey", "collectionSource"],
            path,
        )?;

        let target_key = self.validate_dynamic_key(object, "targetKey", path)?;
        let collection_key = self.validate_dynamic_key(object, "collectionKey", path)?;

        let source_path = join(path, "collectionSource");
        let raw = required_str(object, "collectionSource", path)?;
        let collection_source = CollectionSource::parse(raw).ok_or_else(|| {
            SchemaError::new(
                source_path,
                format!("expected `subject` or `resource`, got `{raw}`"),
            )
        })?;

        Ok(Condition::EntityKey(EntityKeyCondition::Collection {
            op,
            target_key,
            collection_key,
            collection_source,
        }))
    }

    fn validate_dynamic_key(
        &self,
        object: &Map<String, Value>,
        field: &str,
        path: &str,
    ) -> Result<DynamicKey, SchemaError> {
        let raw = required_str(object, field, path)?;
        DynamicKey::parse(raw).map_err(|e| SchemaError::new(join(path, field), e.to_string()))
    }

    fn validate_reference_value(
        &self,
        object: &Map<String, Value>,
        op: ComparisonOp,
        path: &str,
    ) -> Result<ReferenceValue, SchemaError> {
        let value = required(object, "referenceValue", path)?;
        let field_path = join(path, "referenceValue");

        if op.is_ordering() {
            let Value::Number(n) = value else {
                return Err(SchemaError::new(
                    field_path,
                    format!("`{op}` requires a numeric referenceValue"),
                ));
            };
            let n = n.as_f64().ok_or_else(|| {
                SchemaError::new(field_path.clone(), "number is out of range")
            })?;
            return Ok(ReferenceValue::Num(n));
        }

        if op.is_membership() {
            let Value::Array(items) = value else {
                return Err(SchemaError::new(
                    field_path,
                    format!("`{op}` requires an array referenceValue"),
                ));
            };
            let items = items
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::String(s) => Ok(ScalarValue::Str(s.clone())),
                    Value::Number(n) => n
                        .as_f64()
                        .map(ScalarValue::Num)
                        .ok_or_else(|| {
                            SchemaError::new(
                                format!("{field_path}[{i}]"),
                                "number is out of range",
                            )
                        }),
                    _ => Err(SchemaError::new(
                        format!("{field_path}[{i}]"),
                        "list elements must be strings or numbers",
                    )),
                })
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(ReferenceValue::List(items));
        }

        // Equality: any single primitive.
        match value {
            Value::String(s) => Ok(ReferenceValue::Str(s.clone())),
            Value::Bool(b) => Ok(ReferenceValue::Bool(*b)),
            Value::Number(n) => n.as_f64().map(ReferenceValue::Num).ok_or_else(|| {
                SchemaError::new(field_path.clone(), "number is out of range")
            }),
            _ => Err(SchemaError::new(
                field_path,
                format!("`{op}` requires a string, number, or boolean referenceValue"),
            )),
        }
    }
}

// =============================================================================
// Document Helpers
// =============================================================================

fn join(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{path}.{field}")
    }
}

fn as_object<'v>(value: &'v Value, path: &str) -> Result<&'v Map<String, Value>, SchemaError> {
    value
        .as_object()
        .ok_or_else(|| SchemaError::new(path, "expected an object"))
}

fn as_str<'v>(value: &'v Value, path: &str) -> Result<&'v str, SchemaError> {
    value
        .as_str()
        .ok_or_else(|| SchemaError::new(path, "expected a string"))
}

fn required<'v>(
    object: &'v Map<String, Value>,
    field: &str,
    path: &str,
) -> Result<&'v Value, SchemaError> {
    object
        .get(field)
        .ok_or_else(|| SchemaError::new(join(path, field), "missing required field"))
}

fn required_str<'v>(
    object: &'v Map<String, Value>,
    field: &str,
    path: &str,
) -> Result<&'v str, SchemaError> {
    as_str(required(object, field, path)?, &join(path, field))
}

fn reject_unknown_fields(
    object: &Map<String, Value>,
    allowed: &[&str],
    path: &str,
) -> Result<(), SchemaError> {
    for field in object.keys() {
        if !allowed.contains(&field.as_str()) {
            return Err(SchemaError::new(join(path, field), "unknown field"));
        }
    }
    Ok(())
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

    fn create_test_validator() -> SchemaValidator {
        SchemaValidator::new(ResourceTypeUniverse::new(["user", "todo", "file"]).unwrap())
    }

    fn validate(condition: Value) -> Result<Condition, SchemaError> {
        create_test_validator().validate_condition(&condition, "conditions")
    }

    // -------------------------------------------------------------------------
    // Universe Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_universe_rejects_empty() {
        let result = ResourceTypeUniverse::new(Vec::<String>::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_universe_rejects_duplicates() {
        let error = ResourceTypeUniverse::new(["user", "todo", "user"]).unwrap_err();
        assert_eq!(error.path, "universe[2]");
    }

    #[test]
    fn test_universe_rejects_empty_member() {
        assert!(ResourceTypeUniverse::new(["user", ""]).is_err());
    }

    #[test]
    fn test_universe_membership() {
        let universe = ResourceTypeUniverse::new(["user", "todo"]).unwrap();
        assert!(universe.contains("todo"));
        assert!(!universe.contains("file"));
        assert_eq!(universe.members(), &["user", "todo"]);
    }

    // -------------------------------------------------------------------------
    // Policy Document Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_policy_outside_universe_rejected() {
        let validator = create_test_validator();
        let document = PolicyDocument::unconditional(Action::Read, "project");

        let error = validator.validate_policy(&document).unwrap_err();
        assert_eq!(error.path, "resource");
    }

    #[test]
    fn test_unconditional_policy_accepted() {
        let validator = create_test_validator();
        let document = PolicyDocument::unconditional(Action::Read, "file");

        let policy = validator.validate_policy(&document).unwrap();
        assert!(policy.conditions.is_none());
        assert_eq!(policy.key().as_str(), "file:read");
    }

    #[test]
    fn test_validation_is_idempotent() {
        let validator = create_test_validator();
        let document = PolicyDocument::with_conditions(
            Action::Update,
            "todo",
            json!({"op": "badop", "subjectKey": "$id", "resourceKey": "$ownerId"}),
        );

        let first = validator.validate_policy(&document).unwrap_err();
        let second = validator.validate_policy(&document).unwrap_err();
        assert_eq!(first, second);
    }

    // -------------------------------------------------------------------------
    // Logical Condition Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_and_requires_children() {
        let error = validate(json!({"op": "and", "conditions": []})).unwrap_err();
        assert_eq!(error.path, "conditions.conditions");
    }

    #[test]
    fn test_and_with_children_accepted() {
        let condition = validate(json!({
            "op": "and",
            "conditions": [
                {"op": "eq", "attributeKey": "$role", "referenceValue": "admin", "compareSource": "subject"}
            ]
        }))
        .unwrap();

        assert!(matches!(condition, Condition::And(children) if children.len() == 1));
    }

    #[test]
    fn test_not_rejects_array_child() {
        let error = validate(json!({
            "op": "not",
            "conditions": [{"op": "eq", "subjectKey": "$id", "resourceKey": "$ownerId"}]
        }))
        .unwrap_err();

        assert_eq!(error.path, "conditions.conditions");
    }

    #[test]
    fn test_not_takes_single_child() {
        let condition = validate(json!({
            "op": "not",
            "conditions": {"op": "eq", "subjectKey": "$id", "resourceKey": "$ownerId"}
        }))
        .unwrap();

        assert!(matches!(condition, Condition::Not(_)));
    }

    #[test]
    fn test_nested_error_path() {
        let error = validate(json!({
            "op": "or",
            "conditions": [
                {"op": "eq", "subjectKey": "$id", "resourceKey": "$ownerId"},
                {"op": "eq", "attributeKey": "role", "referenceValue": "admin"}
            ]
        }))
        .unwrap_err();

        assert_eq!(error.path, "conditions.conditions[1].attributeKey");
    }

    // -------------------------------------------------------------------------
    // Attribute Condition Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_unknown_operator_rejected() {
        let error = validate(json!({
            "op": "between",
            "attributeKey": "$level",
            "referenceValue": 5
        }))
        .unwrap_err();

        assert_eq!(error.path, "conditions.op");
        assert!(error.reason.contains("between"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let error = validate(json!({
            "op": "eq",
            "attributeKey": "$role",
            "referenceValue": "admin",
            "negate": true
        }))
        .unwrap_err();

        assert_eq!(error.path, "conditions.negate");
        assert_eq!(error.reason, "unknown field");
    }

    #[test]
    fn test_attribute_key_requires_sigil() {
        let error = validate(json!({
            "op": "eq",
            "attributeKey": "role",
            "referenceValue": "admin"
        }))
        .unwrap_err();

        assert_eq!(error.path, "conditions.attributeKey");
    }

    #[test]
    fn test_ordering_requires_numeric_reference() {
        let error = validate(json!({
            "op": "gt",
            "attributeKey": "$level",
            "referenceValue": "seven"
        }))
        .unwrap_err();

        assert_eq!(error.path, "conditions.referenceValue");
    }

    #[test]
    fn test_membership_requires_array_reference() {
        let error = validate(json!({
            "op": "in",
            "attributeKey": "$role",
            "referenceValue": "admin"
        }))
        .unwrap_err();

        assert_eq!(error.path, "conditions.referenceValue");
    }

    #[test]
    fn test_membership_list_elements_checked() {
        let error = validate(json!({
            "op": "nin",
            "attributeKey": "$role",
            "referenceValue": ["admin", true]
        }))
        .unwrap_err();

        assert_eq!(error.path, "conditions.referenceValue[1]");
    }

    #[test]
    fn test_membership_list_may_mix_strings_and_numbers() {
        // Uniformity is an evaluation-time concern.
        let condition = validate(json!({
            "op": "in",
            "attributeKey": "$role",
            "referenceValue": ["admin", 3]
        }))
        .unwrap();

        assert!(matches!(condition, Condition::Attribute(_)));
    }

    #[test]
    fn test_equality_rejects_array_reference() {
        let error = validate(json!({
            "op": "eq",
            "attributeKey": "$role",
            "referenceValue": ["admin"]
        }))
        .unwrap_err();

        assert_eq!(error.path, "conditions.referenceValue");
    }

    #[test]
    fn test_invalid_compare_source_rejected() {
        let error = validate(json!({
            "op": "eq",
            "attributeKey": "$role",
            "referenceValue": "admin",
            "compareSource": "owner"
        }))
        .unwrap_err();

        assert_eq!(error.path, "conditions.compareSource");
    }

    // -------------------------------------------------------------------------
    // Entity-Key Condition Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_primitive_form_accepted() {
        let condition = validate(json!({
            "op": "eq",
            "subjectKey": "$id",
            "resourceKey": "$ownerId"
        }))
        .unwrap();

        assert!(matches!(
            condition,
            Condition::EntityKey(EntityKeyCondition::Primitive { .. })
        ));
    }

    #[test]
    fn test_primitive_form_missing_key_rejected() {
        let error = validate(json!({"op": "eq", "subjectKey": "$id"})).unwrap_err();
        assert_eq!(error.path, "conditions.resourceKey");
        assert_eq!(error.reason, "missing required field");
    }

    #[test]
    fn test_membership_operator_selects_collection_form() {
        let condition = validate(json!({
            "op": "in",
            "targetKey": "$projects",
            "collectionKey": "$projectId",
            "collectionSource": "subject"
        }))
        .unwrap();

        assert!(matches!(
            condition,
            Condition::EntityKey(EntityKeyCondition::Collection {
                collection_source: CollectionSource::Subject,
                ..
            })
        ));
    }

    #[test]
    fn test_collection_form_requires_source() {
        let error = validate(json!({
            "op": "in",
            "targetKey": "$projects",
            "collectionKey": "$projectId"
        }))
        .unwrap_err();

        assert_eq!(error.path, "conditions.collectionSource");
    }

    #[test]
    fn test_mixed_variant_fields_rejected() {
        // attributeKey wins the discrimination, so subjectKey is foreign.
        let error = validate(json!({
            "op": "eq",
            "attributeKey": "$role",
            "referenceValue": "admin",
            "subjectKey": "$id"
        }))
        .unwrap_err();

        assert_eq!(error.path, "conditions.subjectKey");
        assert_eq!(error.reason, "unknown field");
    }

    #[test]
    fn test_condition_must_be_object() {
        let error = validate(json!("eq")).unwrap_err();
        assert_eq!(error.path, "conditions");
    }

    // -------------------------------------------------------------------------
    // Resource Document Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_resource_outside_universe_rejected() {
        let validator = create_test_validator();
        let document = ResourceDocument::new("p1", "project");

        let error = validator.validate_resource(&document).unwrap_err();
        assert_eq!(error.path, "type");
    }

    #[test]
    fn test_resource_attribute_value_path() {
        let validator = create_test_validator();
        let document =
            ResourceDocument::new("t1", "todo").with_attribute("flags", json!([true]));

        let error = validator.validate_resource(&document).unwrap_err();
        assert_eq!(error.path, "attributes.flags");
    }

    #[test]
    fn test_resource_minted_with_typed_attributes() {
        let validator = create_test_validator();
        let document = ResourceDocument::new("t1", "todo")
            .with_attribute("ownerId", json!("u1"))
            .with_attribute("tags", json!(["home", "urgent"]));

        let resource = validator.validate_resource(&document).unwrap();
        assert_eq!(resource.id, "t1");
        assert_eq!(resource.attributes.len(), 2);
        assert_eq!(
            resource.attribute("ownerId"),
            Some(&AttributeValue::Str("u1".to_string()))
        );
    }
}
