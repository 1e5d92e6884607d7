//! The authorization decision engine.
//!
//! [`AuthEngine`] answers one question: does any registered policy grant this
//! `(subject, resource, action)` request? It borrows the index built by the
//! policy manager and holds no other state; every decision is independent and
//! safe to run concurrently once registration has finished.
//!
//! Two outcomes short of a decision exist and must not be confused: a
//! *missing* attribute makes the enclosing comparison `false`, while a
//! *present* attribute of the wrong shape aborts the whole call with
//! [`InvalidOperandError`].

use std::sync::Arc;

use serde_json::json;

use gatekit_core::{Action, AttributeValue, Resource, ValueType};

use crate::error::InvalidOperandError;
use crate::policy::PolicyIndex;
use crate::schema::{
    AttributeCondition, CollectionSource, CompareSource, ComparisonOp, Condition,
    EntityKeyCondition, ReferenceValue, ScalarValue,
};
use crate::trace::{NoopTraceSink, TraceRecord, TraceSink, TraceStage};

// =============================================================================
// Auth Engine
// =============================================================================

/// Decision engine over an immutable policy index.
///
/// # Example
///
/// ```
/// use gatekit_authz::{AuthEngine, PolicyDocument, PolicyManager};
/// use gatekit_core::{Action, Attributes, Resource};
///
/// let mut manager = PolicyManager::new(["user", "file"])?;
/// manager.add_policy(PolicyDocument::unconditional(Action::Read, "file"))?;
///
/// let engine = AuthEngine::new(manager.policies());
/// let subject = Resource::new("u1", "user", Attributes::new());
/// let file = Resource::new("f1", "file", Attributes::new());
///
/// assert!(engine.is_authorized(&subject, &file, Action::Read)?);
/// assert!(!engine.is_authorized(&subject, &file, Action::Delete)?);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct AuthEngine<'idx> {
    index: &'idx PolicyIndex,
    sink: Arc<dyn TraceSink>,
}

/// Per-call evaluation context.
struct EvalContext<'a> {
    subject: &'a Resource,
    resource: &'a Resource,
    debug: bool,
}

impl<'idx> AuthEngine<'idx> {
    /// Create an engine over a finished index, with the no-op trace sink.
    #[must_use]
    pub fn new(index: &'idx PolicyIndex) -> Self {
        Self {
            index,
            sink: Arc::new(NoopTraceSink),
        }
    }

    /// Replace the trace sink used by debug decisions.
    #[must_use]
    pub fn with_trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Decide whether any policy grants `action` on `resource` to `subject`.
    ///
    /// Returns `true` iff a policy under `"<type>:<action>"` has no
    /// conditions or its conditions evaluate to `true`. The first granting
    /// policy wins; later policies are not evaluated.
    ///
    /// # Errors
    ///
    /// Propagates [`InvalidOperandError`] from the first reached comparison
    /// whose present operand has an incompatible shape. Type errors in
    /// policies after a grant stay silent.
    pub fn is_authorized(
        &self,
        subject: &Resource,
        resource: &Resource,
        action: Action,
    ) -> Result<bool, InvalidOperandError> {
        self.decide(subject, resource, action, false)
    }

    /// Same decision as [`is_authorized`](Self::is_authorized), additionally
    /// emitting a structured record to the trace sink for each policy
    /// considered, each condition node entered, each resolved value, and the
    /// final outcome.
    ///
    /// # Errors
    ///
    /// See [`is_authorized`](Self::is_authorized).
    pub fn is_authorized_debug(
        &self,
        subject: &Resource,
        resource: &Resource,
        action: Action,
    ) -> Result<bool, InvalidOperandError> {
        self.decide(subject, resource, action, true)
    }

    fn decide(
        &self,
        subject: &Resource,
        resource: &Resource,
        action: Action,
        debug: bool,
    ) -> Result<bool, InvalidOperandError> {
        let ctx = EvalContext {
            subject,
            resource,
            debug,
        };
        let policies = self.index.get(&resource.resource_type, action);

        for (position, policy) in policies.iter().enumerate() {
            self.trace(
                debug,
                TraceStage::PolicyConsidered,
                json!({
                    "policy": policy.key().as_str(),
                    "position": position,
                    "unconditional": policy.conditions.is_none(),
                }),
            );

            let granted = match &policy.conditions {
                None => true,
                Some(condition) => self.evaluate(&ctx, condition)?,
            };

            if granted {
                tracing::debug!(policy = %policy.key(), "policy granted access");
                self.trace(
                    debug,
                    TraceStage::Outcome,
                    json!({"granted": true, "policy": policy.key().as_str()}),
                );
                return Ok(true);
            }
        }

        tracing::debug!(
            resource_type = %resource.resource_type,
            action = %action,
            considered = policies.len(),
            "no policy granted access"
        );
        self.trace(debug, TraceStage::Outcome, json!({"granted": false}));
        Ok(false)
    }

    // -------------------------------------------------------------------------
    // Condition evaluation
    // -------------------------------------------------------------------------

    fn evaluate(
        &self,
        ctx: &EvalContext<'_>,
        condition: &Condition,
    ) -> Result<bool, InvalidOperandError> {
        match condition {
            Condition::And(children) => {
                self.trace(
                    ctx.debug,
                    TraceStage::ConditionEntered,
                    json!({"node": "and", "children": children.len()}),
                );
                for child in children {
                    if !self.evaluate(ctx, child)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Or(children) => {
                self.trace(
                    ctx.debug,
                    TraceStage::ConditionEntered,
                    json!({"node": "or", "children": children.len()}),
                );
                for child in children {
                    if self.evaluate(ctx, child)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::Not(child) => {
                self.trace(
                    ctx.debug,
                    TraceStage::ConditionEntered,
                    json!({"node": "not"}),
                );
                Ok(!self.evaluate(ctx, child)?)
            }
            Condition::Attribute(condition) => self.evaluate_attribute(ctx, condition),
            Condition::EntityKey(condition) => self.evaluate_entity_key(ctx, condition),
        }
    }

    fn evaluate_attribute(
        &self,
        ctx: &EvalContext<'_>,
        condition: &AttributeCondition,
    ) -> Result<bool, InvalidOperandError> {
        let name = condition.attribute_key.name();
        self.trace(
            ctx.debug,
            TraceStage::ConditionEntered,
            json!({
                "node": "attribute",
                "op": condition.op.as_str(),
                "attributeKey": condition.attribute_key.as_str(),
                "compareSource": condition.compare_source,
            }),
        );

        match condition.compare_source {
            Some(CompareSource::Subject) => {
                match self.resolve(ctx, "subject", ctx.subject, name) {
                    None => Ok(false),
                    Some(value) => {
                        apply_reference(condition.op, name, value, &condition.reference_value)
                    }
                }
            }
            Some(CompareSource::Resource) => {
                match self.resolve(ctx, "resource", ctx.resource, name) {
                    None => Ok(false),
                    Some(value) => {
                        apply_reference(condition.op, name, value, &condition.reference_value)
                    }
                }
            }
            None => {
                let sv = self.resolve(ctx, "subject", ctx.subject, name);
                let rv = self.resolve(ctx, "resource", ctx.resource, name);
                let (Some(sv), Some(rv)) = (sv, rv) else {
                    return Ok(false);
                };
                // Shape check runs on both sides before either comparison: an
                // array on one side errors even when the other side fails the
                // comparison.
                require_primitive(condition.op, name, sv)?;
                require_primitive(condition.op, name, rv)?;
                Ok(apply_reference(condition.op, name, sv, &condition.reference_value)?
                    && apply_reference(condition.op, name, rv, &condition.reference_value)?)
            }
        }
    }

    fn evaluate_entity_key(
        &self,
        ctx: &EvalContext<'_>,
        condition: &EntityKeyCondition,
    ) -> Result<bool, InvalidOperandError> {
        match condition {
            EntityKeyCondition::Primitive {
                op,
                subject_key,
                resource_key,
            } => {
                self.trace(
                    ctx.debug,
                    TraceStage::ConditionEntered,
                    json!({
                        "node": "entityKey",
                        "form": "primitive",
                        "op": op.as_str(),
                        "subjectKey": subject_key.as_str(),
                        "resourceKey": resource_key.as_str(),
                    }),
                );

                let sv = self.resolve(ctx, "subject", ctx.subject, subject_key.name());
                let rv = self.resolve(ctx, "resource", ctx.resource, resource_key.name());
                let (Some(sv), Some(rv)) = (sv, rv) else {
                    return Ok(false);
                };
                compare_entity_values(*op, subject_key.name(), resource_key.name(), sv, rv)
            }
            EntityKeyCondition::Collection {
                op,
                target_key,
                collection_key,
                collection_source,
            } => {
                self.trace(
                    ctx.debug,
                    TraceStage::ConditionEntered,
                    json!({
                        "node": "entityKey",
                        "form": "collection",
                        "op": op.as_str(),
                        "targetKey": target_key.as_str(),
                        "collectionKey": collection_key.as_str(),
                        "collectionSource": collection_source,
                    }),
                );

                // The source names which entity holds the collection. The key
                // used on each side is fixed: the collection is read through
                // `targetKey` on the subject but through `collectionKey` on
                // the resource, and the target through the other key.
                let (collection, target, collection_name, target_name) = match collection_source {
                    CollectionSource::Subject => (
                        self.resolve(ctx, "subject", ctx.subject, target_key.name()),
                        self.resolve(ctx, "resource", ctx.resource, collection_key.name()),
                        target_key.name(),
                        collection_key.name(),
                    ),
                    CollectionSource::Resource => (
                        self.resolve(ctx, "resource", ctx.resource, collection_key.name()),
                        self.resolve(ctx, "subject", ctx.subject, target_key.name()),
                        collection_key.name(),
                        target_key.name(),
                    ),
                };
                let (Some(collection), Some(target)) = (collection, target) else {
                    return Ok(false);
                };
                evaluate_collection_membership(*op, collection_name, target_name, collection, target)
            }
        }
    }

    /// Look up an attribute, recording the resolution when debugging.
    fn resolve<'r>(
        &self,
        ctx: &EvalContext<'_>,
        entity: &str,
        source: &'r Resource,
        name: &str,
    ) -> Option<&'r AttributeValue> {
        let value = source.attribute(name);
        self.trace(
            ctx.debug,
            TraceStage::ValueResolved,
            json!({"entity": entity, "attribute": name, "value": value}),
        );
        value
    }

    fn trace(&self, enabled: bool, stage: TraceStage, payload: serde_json::Value) {
        if enabled {
            self.sink.record(TraceRecord { stage, payload });
        }
    }
}

// =============================================================================
// Comparison Semantics
// =============================================================================

/// Apply `op` between a resolved attribute and the inline reference value.
fn apply_reference(
    op: ComparisonOp,
    name: &str,
    value: &AttributeValue,
    reference: &ReferenceValue,
) -> Result<bool, InvalidOperandError> {
    require_primitive(op, name, value)?;

    match op {
        ComparisonOp::Eq | ComparisonOp::Ne => {
            let eq = match (value, reference) {
                (AttributeValue::Str(a), ReferenceValue::Str(b)) => a == b,
                (AttributeValue::Num(a), ReferenceValue::Num(b)) => a == b,
                (AttributeValue::Bool(a), ReferenceValue::Bool(b)) => a == b,
                (_, ReferenceValue::List(_)) => {
                    unreachable!("equality against a list reference is rejected at schema time")
                }
                _ => {
                    return Err(InvalidOperandError::new(
                        value.value_type(),
                        op,
                        format!(
                            "cannot compare {} attribute `{name}` with {} reference",
                            value.value_type(),
                            reference_scalar_type(reference),
                        ),
                    ));
                }
            };
            Ok(if op == ComparisonOp::Ne { !eq } else { eq })
        }

        ComparisonOp::Gt | ComparisonOp::Gte | ComparisonOp::Lt | ComparisonOp::Lte => {
            let AttributeValue::Num(left) = value else {
                return Err(InvalidOperandError::new(
                    value.value_type(),
                    op,
                    format!(
                        "`{op}` requires numeric operands, attribute `{name}` is a {}",
                        value.value_type()
                    ),
                ));
            };
            let ReferenceValue::Num(right) = reference else {
                unreachable!("ordering against a non-numeric reference is rejected at schema time")
            };
            Ok(compare_numbers(op, *left, *right))
        }

        ComparisonOp::In | ComparisonOp::Nin => {
            let ReferenceValue::List(items) = reference else {
                unreachable!("membership against a scalar reference is rejected at schema time")
            };
            if matches!(value, AttributeValue::Bool(_)) {
                return Err(InvalidOperandError::new(
                    ValueType::Bool,
                    op,
                    format!("booleans cannot be probed with `{op}` (attribute `{name}`)"),
                ));
            }
            let probe_type = value.value_type();
            if !items.iter().any(|item| item.value_type() == probe_type) {
                return Err(InvalidOperandError::new(
                    probe_type,
                    op,
                    format!(
                        "no element of the reference array matches the {probe_type} probe of attribute `{name}`"
                    ),
                ));
            }

            let contains = items.iter().any(|item| scalar_eq(value, item));
            Ok(if op == ComparisonOp::In {
                contains
            } else {
                !contains
            })
        }
    }
}

/// Compare one primitive from each entity under `op`.
fn compare_entity_values(
    op: ComparisonOp,
    subject_name: &str,
    resource_name: &str,
    sv: &AttributeValue,
    rv: &AttributeValue,
) -> Result<bool, InvalidOperandError> {
    if sv.is_array() {
        return Err(InvalidOperandError::new(
            sv.value_type(),
            op,
            format!(
                "subject attribute `{subject_name}` is a {} where a primitive is required",
                sv.value_type()
            ),
        ));
    }
    if rv.is_array() {
        return Err(InvalidOperandError::new(
            rv.value_type(),
            op,
            format!(
                "resource attribute `{resource_name}` is a {} where a primitive is required",
                rv.value_type()
            ),
        ));
    }
    if sv.value_type() != rv.value_type() {
        return Err(InvalidOperandError::new(
            sv.value_type(),
            op,
            format!(
                "cannot compare {} subject attribute `{subject_name}` with {} resource attribute `{resource_name}`",
                sv.value_type(),
                rv.value_type(),
            ),
        ));
    }

    match op {
        ComparisonOp::Eq | ComparisonOp::Ne => {
            let eq = match (sv, rv) {
                (AttributeValue::Str(a), AttributeValue::Str(b)) => a == b,
                (AttributeValue::Num(a), AttributeValue::Num(b)) => a == b,
                (AttributeValue::Bool(a), AttributeValue::Bool(b)) => a == b,
                _ => unreachable!("operands share a primitive type"),
            };
            Ok(if op == ComparisonOp::Ne { !eq } else { eq })
        }
        ComparisonOp::Gt | ComparisonOp::Gte | ComparisonOp::Lt | ComparisonOp::Lte => {
            let (AttributeValue::Num(a), AttributeValue::Num(b)) = (sv, rv) else {
                return Err(InvalidOperandError::new(
                    sv.value_type(),
                    op,
                    format!(
                        "`{op}` requires numeric operands, attributes `{subject_name}` and `{resource_name}` are {}s",
                        sv.value_type()
                    ),
                ));
            };
            Ok(compare_numbers(op, *a, *b))
        }
        ComparisonOp::In | ComparisonOp::Nin => {
            unreachable!("membership operators inhabit the collection form")
        }
    }
}

/// Strict-equality membership of a primitive target in an attribute array.
fn evaluate_collection_membership(
    op: ComparisonOp,
    collection_name: &str,
    target_name: &str,
    collection: &AttributeValue,
    target: &AttributeValue,
) -> Result<bool, InvalidOperandError> {
    if target.is_array() {
        return Err(InvalidOperandError::new(
            target.value_type(),
            op,
            format!(
                "target attribute `{target_name}` is a {} where a primitive is required",
                target.value_type()
            ),
        ));
    }

    let contains = match (target, collection) {
        (AttributeValue::Str(t), AttributeValue::StrArray(items)) => {
            items.iter().any(|item| item == t)
        }
        (AttributeValue::Num(t), AttributeValue::NumArray(items)) => items.contains(t),
        // A primitive can only equal elements of its own type; a
        // type-disjoint collection simply does not contain the target.
        (_, AttributeValue::StrArray(_) | AttributeValue::NumArray(_)) => false,
        _ => {
            return Err(InvalidOperandError::new(
                collection.value_type(),
                op,
                format!(
                    "collection attribute `{collection_name}` is a {} where an array is required",
                    collection.value_type()
                ),
            ));
        }
    };

    match op {
        ComparisonOp::In => Ok(contains),
        ComparisonOp::Nin => Ok(!contains),
        _ => unreachable!("collection form carries a membership operator"),
    }
}

fn compare_numbers(op: ComparisonOp, left: f64, right: f64) -> bool {
    match op {
        ComparisonOp::Gt => left > right,
        ComparisonOp::Gte => left >= right,
        ComparisonOp::Lt => left < right,
        ComparisonOp::Lte => left <= right,
        _ => unreachable!("not an ordering operator"),
    }
}

fn require_primitive(
    op: ComparisonOp,
    name: &str,
    value: &AttributeValue,
) -> Result<(), InvalidOperandError> {
    if value.is_array() {
        return Err(InvalidOperandError::new(
            value.value_type(),
            op,
            format!(
                "attribute `{name}` is a {} where a primitive is required",
                value.value_type()
            ),
        ));
    }
    Ok(())
}

fn scalar_eq(value: &AttributeValue, item: &ScalarValue) -> bool {
    match (value, item) {
        (AttributeValue::Str(a), ScalarValue::Str(b)) => a == b,
        (AttributeValue::Num(a), ScalarValue::Num(b)) => a == b,
        (AttributeValue::Bool(a), ScalarValue::Bool(b)) => a == b,
        _ => false,
    }
}

fn reference_scalar_type(reference: &ReferenceValue) -> ValueType {
    match reference {
        ReferenceValue::Str(_) => ValueType::String,
        ReferenceValue::Num(_) => ValueType::Number,
        ReferenceValue::Bool(_) => ValueType::Bool,
        ReferenceValue::List(_) => unreachable!("list references have no scalar type"),
    }
}

// =============================================================================
// Tests
// =============================================================================
