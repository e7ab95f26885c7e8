//! Filter DSL evaluation
//!
//! Interprets `{prop, op, value}` predicates against an [`EvalContext`].
//! Evaluation is pure and total: missing properties, type mismatches and
//! malformed paths produce `false` (or the documented vacuous value for the
//! negated operators), never an error.

use serde_json::Value;

use crate::context::EvalContext;
use crate::policy::{Filter, FilterOperator};

/// Interprets filter predicates against an evaluation context.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterEngine;

impl FilterEngine {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a single filter condition.
    pub fn evaluate(&self, filter: &Filter, ctx: &EvalContext) -> bool {
        let left = self.resolve_property(&filter.prop, ctx);
        let right = self.resolve_value(&filter.value, ctx);
        apply_operator(left.as_ref(), filter.op, right.as_ref())
    }

    /// Evaluate a list of filters with AND semantics.
    ///
    /// An empty list places no restriction and returns true.
    pub fn evaluate_all(&self, filters: &[Filter], ctx: &EvalContext) -> bool {
        filters.iter().all(|filter| self.evaluate(filter, ctx))
    }

    /// Walk a dot-separated property path through the context.
    ///
    /// Returns `None` when any segment is missing, a non-mapping value is
    /// traversed, the path is empty, or the resolved value is JSON null.
    pub fn resolve_property(&self, path: &str, ctx: &EvalContext) -> Option<Value> {
        let mut segments = path.split('.');
        let first = segments.next().filter(|segment| !segment.is_empty())?;

        let mut current = ctx.vars().get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }

        if current.is_null() {
            None
        } else {
            Some(current.clone())
        }
    }

    /// Resolve a filter value, which may be a property reference.
    ///
    /// A string containing `.` whose first dot-separated segment names a
    /// top-level context key is dereferenced through the context; any other
    /// value is returned literally. The set of recognized keys depends on
    /// which optional entities the caller supplied, so this check happens
    /// at operator time, never at policy load time.
    pub fn resolve_value(&self, value: &Value, ctx: &EvalContext) -> Option<Value> {
        if let Value::String(s) = value {
            if let Some((head, _)) = s.split_once('.') {
                if ctx.contains_key(head) {
                    return self.resolve_property(s, ctx);
                }
            }
        }

        if value.is_null() {
            None
        } else {
            Some(value.clone())
        }
    }
}

fn apply_operator(left: Option<&Value>, op: FilterOperator, right: Option<&Value>) -> bool {
    // `<>` asks whether the property resolved at all, so it must run
    // before the null short-circuit every other operator shares.
    if op == FilterOperator::NotNull {
        return left.is_some();
    }

    let Some(left) = left else {
        return false;
    };
    let null = Value::Null;
    let right = right.unwrap_or(&null);

    match op {
        FilterOperator::NotNull => unreachable!("handled above"),
        FilterOperator::Eq => json_eq(left, right),
        FilterOperator::Ne => !json_eq(left, right),
        FilterOperator::Gt => compare(left, right).is_some_and(|ord| ord.is_gt()),
        FilterOperator::Gte => compare(left, right).is_some_and(|ord| ord.is_ge()),
        FilterOperator::Lt => compare(left, right).is_some_and(|ord| ord.is_lt()),
        FilterOperator::Lte => compare(left, right).is_some_and(|ord| ord.is_le()),
        FilterOperator::In => right
            .as_array()
            .is_some_and(|items| items.iter().any(|item| json_eq(left, item))),
        FilterOperator::NotIn => right
            .as_array()
            .map_or(true, |items| !items.iter().any(|item| json_eq(left, item))),
        FilterOperator::Has => match left {
            Value::String(l) => right.as_str().is_some_and(|r| l.contains(r)),
            Value::Array(items) => items.iter().any(|item| json_eq(item, right)),
            _ => false,
        },
        FilterOperator::HasNot => match left {
            Value::String(l) => right.as_str().map_or(true, |r| !l.contains(r)),
            Value::Array(items) => !items.iter().any(|item| json_eq(item, right)),
            _ => true,
        },
    }
}

/// Value equality with numbers compared across representations, so that
/// an integer filter literal matches a float context attribute.
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Natural ordering: numbers numerically, strings lexicographically.
/// Everything else is not order-comparable.
fn compare(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> EvalContext {
        let vars = json!({
            "user": {"id": "user1", "email": "user1@example.com", "score": 42},
            "document": {
                "id": "doc1",
                "creatorId": "user1",
                "projectId": "proj1",
                "deletedAt": null,
                "publicLinkEnabled": true,
                "tags": ["alpha", "beta"],
            },
            "teamMembership": {"userId": "user1", "teamId": "team1", "role": "admin"},
        });
        match vars {
            Value::Object(map) => EvalContext::from_map(map),
            _ => unreachable!(),
        }
    }

    fn check(prop: &str, op: FilterOperator, value: Value) -> bool {
        FilterEngine::new().evaluate(&Filter::new(prop, op, value), &context())
    }

    #[test]
    fn test_eq_and_ne() {
        assert!(check("user.id", FilterOperator::Eq, json!("user1")));
        assert!(!check("user.id", FilterOperator::Eq, json!("user2")));
        assert!(check("user.id", FilterOperator::Ne, json!("user2")));
        assert!(!check("user.id", FilterOperator::Ne, json!("user1")));
    }

    #[test]
    fn test_numeric_ordering() {
        assert!(check("user.score", FilterOperator::Gt, json!(40)));
        assert!(!check("user.score", FilterOperator::Gt, json!(42)));
        assert!(check("user.score", FilterOperator::Gte, json!(42)));
        assert!(check("user.score", FilterOperator::Lt, json!(50)));
        assert!(check("user.score", FilterOperator::Lte, json!(42.0)));
        assert!(!check("user.score", FilterOperator::Lt, json!(42)));
    }

    #[test]
    fn test_numeric_eq_across_representations() {
        assert!(check("user.score", FilterOperator::Eq, json!(42.0)));
    }

    #[test]
    fn test_string_ordering_is_lexicographic() {
        assert!(check("user.id", FilterOperator::Gt, json!("user0")));
        assert!(!check("user.id", FilterOperator::Gt, json!("user2")));
    }

    #[test]
    fn test_ordering_type_mismatch_is_false() {
        assert!(!check("user.score", FilterOperator::Gt, json!("40")));
        assert!(!check("user.id", FilterOperator::Lt, json!(100)));
        assert!(!check("document.publicLinkEnabled", FilterOperator::Gt, json!(false)));
    }

    #[test]
    fn test_not_null_operator() {
        assert!(check("user.id", FilterOperator::NotNull, json!(null)));
        // Explicit null attribute and missing attribute both count as null.
        assert!(!check("document.deletedAt", FilterOperator::NotNull, json!(null)));
        assert!(!check("document.missing", FilterOperator::NotNull, json!(null)));
        assert!(!check("project.id", FilterOperator::NotNull, json!(null)));
    }

    #[test]
    fn test_null_left_short_circuits() {
        assert!(!check("document.deletedAt", FilterOperator::Eq, json!(null)));
        assert!(!check("document.missing", FilterOperator::Ne, json!("x")));
        assert!(!check("document.missing", FilterOperator::NotIn, json!(["x"])));
        assert!(!check("document.missing", FilterOperator::HasNot, json!("x")));
    }

    #[test]
    fn test_in_and_not_in() {
        assert!(check("user.id", FilterOperator::In, json!(["user1", "user2"])));
        assert!(!check("user.id", FilterOperator::In, json!(["user2", "user3"])));
        assert!(!check("user.id", FilterOperator::In, json!("user1")));

        assert!(check("user.id", FilterOperator::NotIn, json!(["user2", "user3"])));
        assert!(!check("user.id", FilterOperator::NotIn, json!(["user1"])));
        // Vacuously true when the right side is not a sequence.
        assert!(check("user.id", FilterOperator::NotIn, json!("user1")));
    }

    #[test]
    fn test_has_on_strings_and_sequences() {
        assert!(check("user.email", FilterOperator::Has, json!("@example.com")));
        assert!(!check("user.email", FilterOperator::Has, json!("@other.com")));
        assert!(check("document.tags", FilterOperator::Has, json!("alpha")));
        assert!(!check("document.tags", FilterOperator::Has, json!("gamma")));
        // Neither string-on-string nor sequence membership applies.
        assert!(!check("user.score", FilterOperator::Has, json!("4")));
        assert!(!check("user.email", FilterOperator::Has, json!(42)));
    }

    #[test]
    fn test_has_not_on_strings_and_sequences() {
        assert!(!check("user.email", FilterOperator::HasNot, json!("@example.com")));
        assert!(check("user.email", FilterOperator::HasNot, json!("@other.com")));
        assert!(check("document.tags", FilterOperator::HasNot, json!("gamma")));
        assert!(!check("document.tags", FilterOperator::HasNot, json!("beta")));
        // Vacuously true when neither check applies.
        assert!(check("user.score", FilterOperator::HasNot, json!("4")));
    }

    #[test]
    fn test_boolean_equality_is_exact() {
        assert!(check("document.publicLinkEnabled", FilterOperator::Eq, json!(true)));
        assert!(!check("document.publicLinkEnabled", FilterOperator::Eq, json!("true")));
        assert!(!check("document.publicLinkEnabled", FilterOperator::Eq, json!(1)));
    }

    #[test]
    fn test_resolve_property_paths() {
        let engine = FilterEngine::new();
        let ctx = context();

        assert_eq!(engine.resolve_property("user.id", &ctx), Some(json!("user1")));
        assert_eq!(
            engine.resolve_property("user", &ctx).map(|v| v["id"].clone()),
            Some(json!("user1"))
        );
        assert_eq!(engine.resolve_property("", &ctx), None);
        assert_eq!(engine.resolve_property("user.id.extra", &ctx), None);
        assert_eq!(engine.resolve_property("missing.id", &ctx), None);
        assert_eq!(engine.resolve_property("document.deletedAt", &ctx), None);
    }

    #[test]
    fn test_resolve_value_duality() {
        let engine = FilterEngine::new();
        let ctx = context();

        // Property reference: first segment is a context key.
        assert_eq!(
            engine.resolve_value(&json!("user.id"), &ctx),
            Some(json!("user1"))
        );
        // Dotted string whose head is not a context key stays literal.
        assert_eq!(
            engine.resolve_value(&json!("admin.root"), &ctx),
            Some(json!("admin.root"))
        );
        // Plain literals pass through untouched.
        assert_eq!(engine.resolve_value(&json!("admin"), &ctx), Some(json!("admin")));
        assert_eq!(engine.resolve_value(&json!(7), &ctx), Some(json!(7)));
        assert_eq!(engine.resolve_value(&json!(null), &ctx), None);
        // Reference to a missing attribute resolves to null.
        assert_eq!(engine.resolve_value(&json!("user.missing"), &ctx), None);
    }

    #[test]
    fn test_property_reference_comparison() {
        assert!(check("document.creatorId", FilterOperator::Eq, json!("user.id")));
        assert!(!check("document.projectId", FilterOperator::Eq, json!("user.id")));
    }

    #[test]
    fn test_evaluate_all_and_semantics() {
        let engine = FilterEngine::new();
        let ctx = context();

        let pass = Filter::new("user.id", FilterOperator::Eq, "user1");
        let fail = Filter::new("user.id", FilterOperator::Eq, "user2");

        assert!(engine.evaluate_all(&[], &ctx));
        assert!(engine.evaluate_all(&[pass.clone()], &ctx));
        assert!(engine.evaluate_all(&[pass.clone(), pass.clone()], &ctx));
        assert!(!engine.evaluate_all(&[pass, fail], &ctx));
    }
}
