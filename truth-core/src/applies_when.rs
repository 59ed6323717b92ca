// truth-core/src/applies_when.rs
// ============================================================================
// Module: Applies-When DSL
// Description: JSON expression language describing when a Rule applies (§4.9).
// Purpose: Parse/validate the DSL into a ret-logic requirement tree and
//          evaluate it tri-state against a named-field context.
// Dependencies: ret-logic, serde_json, thiserror
// ============================================================================

//! ## Overview
//! `{and, or, not, eq, neq, gt, gte, lt, lte, in, between, true, false}` over
//! named fields. Each JSON object carries exactly one `op` key, plus the
//! operator's arguments; the operator set maps directly onto
//! [`ret_logic::Requirement`]'s universal Boolean algebra, with comparators as
//! the domain-specific [`Predicate`] leaf.
//!
//! Fields absent from the evaluation context evaluate to
//! [`ret_logic::TriState::Unknown`] rather than erroring — the same
//! fail-closed-on-missing-evidence posture the gate evaluator uses elsewhere
//! in this corpus. Composition uses [`ret_logic::KleeneLogic`] (the
//! corpus default), so an `Unknown` leaf propagates rather than being
//! silently treated as satisfied.
//!
//! A Rule's `appliesWhen` is validated at Compose time (§4.6 step 4);
//! [`parse_or_trivial_accept`] is the entry point the Composer uses — invalid
//! expressions are replaced with the trivial-accept predicate rather than
//! rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::collections::BTreeMap;

use ret_logic::KleeneLogic;
use ret_logic::Requirement;
use ret_logic::TriState;
use ret_logic::TriStatePredicateEval;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum recursion depth for an Applies-When expression tree (§4.9d).
pub const MAX_EXPRESSION_DEPTH: usize = 16;

// ============================================================================
// SECTION: Validation Errors
// ============================================================================

/// Structural error surfaced while parsing an Applies-When expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppliesWhenError {
    /// A node in the expression tree was not a JSON object.
    #[error("expression node must be a JSON object")]
    NotAnObject,
    /// A node's `op` field was missing or not a string.
    #[error("expression node is missing a string `op` field")]
    MissingOp,
    /// The `op` value is not one of the supported operators.
    #[error("unknown operator `{0}`")]
    UnknownOp(String),
    /// The operator's argument shape did not match its arity.
    #[error("operator `{op}` expects {expected}")]
    WrongArity {
        /// Operator name.
        op: String,
        /// Human-readable description of the expected shape.
        expected: &'static str,
    },
    /// A `field` argument was present but not a JSON string.
    #[error("operator `{op}` requires `field` to be a string")]
    FieldNotString {
        /// Operator name.
        op: String,
    },
    /// The expression nests deeper than [`MAX_EXPRESSION_DEPTH`].
    #[error("expression nests deeper than the maximum depth of {max_depth}")]
    TooDeep {
        /// Maximum allowed depth.
        max_depth: usize,
    },
}

// ============================================================================
// SECTION: Predicate Leaf
// ============================================================================

/// Domain-specific comparator leaf for the Applies-When requirement tree.
///
/// # Invariants
/// - `field` is always a non-empty string naming a context key; field
///   existence and type compatibility are resolved at evaluation time, not
///   at parse time (§1: the field vocabulary is not enumerated here).
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `{op:"eq", field, value}`
    Eq {
        /// Context key to read.
        field: String,
        /// Value the field must equal.
        value: Value,
    },
    /// `{op:"neq", field, value}`
    Neq {
        /// Context key to read.
        field: String,
        /// Value the field must not equal.
        value: Value,
    },
    /// `{op:"gt", field, value}`
    Gt {
        /// Context key to read.
        field: String,
        /// Value the field must exceed.
        value: Value,
    },
    /// `{op:"gte", field, value}`
    Gte {
        /// Context key to read.
        field: String,
        /// Value the field must meet or exceed.
        value: Value,
    },
    /// `{op:"lt", field, value}`
    Lt {
        /// Context key to read.
        field: String,
        /// Value the field must be below.
        value: Value,
    },
    /// `{op:"lte", field, value}`
    Lte {
        /// Context key to read.
        field: String,
        /// Value the field must be at or below.
        value: Value,
    },
    /// `{op:"in", field, values}`
    In {
        /// Context key to read.
        field: String,
        /// Candidate values; satisfied if the field matches any of them.
        values: Vec<Value>,
    },
    /// `{op:"between", field, low, high}` (inclusive on both ends)
    Between {
        /// Context key to read.
        field: String,
        /// Inclusive lower bound.
        low: Value,
        /// Inclusive upper bound.
        high: Value,
    },
    /// `{op:"true"}` — the trivial-accept fallback (§4.6, §4.9).
    AlwaysTrue,
    /// `{op:"false"}` — the trivial-reject counterpart.
    AlwaysFalse,
}

/// Named-field context an Applies-When expression evaluates against.
///
/// # Invariants
/// - A field absent from the map is treated as unknown, not false.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalContext {
    /// Named field values available for comparison.
    fields: BTreeMap<String, Value>,
}

impl EvalContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field value, returning the context for chaining.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>, value: Value) -> Self {
        self.fields.insert(field.into(), value);
        self
    }

    /// Returns the value bound to `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

impl FromIterator<(String, Value)> for EvalContext {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl TriStatePredicateEval for Predicate {
    type Reader<'a> = EvalContext;

    fn eval_row_tristate(&self, reader: &Self::Reader<'_>, _row: ret_logic::Row) -> TriState {
        match self {
            Self::AlwaysTrue => TriState::True,
            Self::AlwaysFalse => TriState::False,
            Self::Eq { field, value } => match reader.get(field) {
                Some(actual) => TriState::from(actual == value),
                None => TriState::Unknown,
            },
            Self::Neq { field, value } => match reader.get(field) {
                Some(actual) => TriState::from(actual != value),
                None => TriState::Unknown,
            },
            Self::Gt { field, value } => compare(reader, field, value, |o| o == Ordering::Greater),
            Self::Gte { field, value } => {
                compare(reader, field, value, |o| o != Ordering::Less)
            }
            Self::Lt { field, value } => compare(reader, field, value, |o| o == Ordering::Less),
            Self::Lte { field, value } => {
                compare(reader, field, value, |o| o != Ordering::Greater)
            }
            Self::In { field, values } => match reader.get(field) {
                Some(actual) => TriState::from(values.iter().any(|v| v == actual)),
                None => TriState::Unknown,
            },
            Self::Between { field, low, high } => match reader.get(field) {
                Some(actual) => match (numeric_cmp(actual, low), numeric_cmp(actual, high)) {
                    (Some(lo), Some(hi)) => {
                        TriState::from(lo != Ordering::Less && hi != Ordering::Greater)
                    }
                    _ => TriState::Unknown,
                },
                None => TriState::Unknown,
            },
        }
    }
}

/// Evaluates an ordering comparator, returning `Unknown` on a missing field
/// or a type pairing that does not support ordering (e.g. object vs number).
fn compare(
    reader: &EvalContext,
    field: &str,
    value: &Value,
    accept: impl Fn(Ordering) -> bool,
) -> TriState {
    match reader.get(field) {
        Some(actual) => match numeric_cmp(actual, value) {
            Some(ordering) => TriState::from(accept(ordering)),
            None => TriState::Unknown,
        },
        None => TriState::Unknown,
    }
}

/// Orders two JSON scalars: numbers compare numerically, strings
/// lexicographically; any other pairing is incomparable.
fn numeric_cmp(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses a JSON Applies-When expression into a validated requirement tree.
///
/// # Errors
/// Returns [`AppliesWhenError`] when the expression violates the operator
/// shape, arity, field-type, or recursion-depth rules (§4.9).
pub fn parse_applies_when(value: &Value) -> Result<Requirement<Predicate>, AppliesWhenError> {
    parse_node(value, 0)
}

/// Parses a single expression node, tracking recursion depth.
fn parse_node(value: &Value, depth: usize) -> Result<Requirement<Predicate>, AppliesWhenError> {
    if depth > MAX_EXPRESSION_DEPTH {
        return Err(AppliesWhenError::TooDeep {
            max_depth: MAX_EXPRESSION_DEPTH,
        });
    }

    let object = value.as_object().ok_or(AppliesWhenError::NotAnObject)?;
    let op = object.get("op").and_then(Value::as_str).ok_or(AppliesWhenError::MissingOp)?;

    match op {
        "true" => Ok(Requirement::predicate(Predicate::AlwaysTrue)),
        "false" => Ok(Requirement::predicate(Predicate::AlwaysFalse)),
        "not" => {
            let arg = object.get("arg").ok_or_else(|| AppliesWhenError::WrongArity {
                op: op.to_string(),
                expected: "an `arg` object",
            })?;
            Ok(Requirement::negate(parse_node(arg, depth + 1)?))
        }
        "and" | "or" => {
            let args = object
                .get("args")
                .and_then(Value::as_array)
                .ok_or_else(|| AppliesWhenError::WrongArity {
                    op: op.to_string(),
                    expected: "an `args` array",
                })?;
            let parsed = args
                .iter()
                .map(|arg| parse_node(arg, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(if op == "and" { Requirement::and(parsed) } else { Requirement::or(parsed) })
        }
        "eq" | "neq" | "gt" | "gte" | "lt" | "lte" => {
            let field = field_name(object, op)?;
            let value = object.get("value").cloned().ok_or_else(|| AppliesWhenError::WrongArity {
                op: op.to_string(),
                expected: "a `value` field",
            })?;
            let predicate = match op {
                "eq" => Predicate::Eq { field, value },
                "neq" => Predicate::Neq { field, value },
                "gt" => Predicate::Gt { field, value },
                "gte" => Predicate::Gte { field, value },
                "lt" => Predicate::Lt { field, value },
                _ => Predicate::Lte { field, value },
            };
            Ok(Requirement::predicate(predicate))
        }
        "in" => {
            let field = field_name(object, op)?;
            let values = object
                .get("values")
                .and_then(Value::as_array)
                .ok_or_else(|| AppliesWhenError::WrongArity {
                    op: op.to_string(),
                    expected: "a `values` array",
                })?
                .clone();
            Ok(Requirement::predicate(Predicate::In { field, values }))
        }
        "between" => {
            let field = field_name(object, op)?;
            let low = object.get("low").cloned().ok_or_else(|| AppliesWhenError::WrongArity {
                op: op.to_string(),
                expected: "`low` and `high` fields",
            })?;
            let high = object.get("high").cloned().ok_or_else(|| AppliesWhenError::WrongArity {
                op: op.to_string(),
                expected: "`low` and `high` fields",
            })?;
            Ok(Requirement::predicate(Predicate::Between { field, low, high }))
        }
        other => Err(AppliesWhenError::UnknownOp(other.to_string())),
    }
}

/// Extracts and validates the comparator `field` argument.
fn field_name(
    object: &serde_json::Map<String, Value>,
    op: &str,
) -> Result<String, AppliesWhenError> {
    match object.get("field") {
        Some(Value::String(field)) => Ok(field.clone()),
        Some(_) => Err(AppliesWhenError::FieldNotString { op: op.to_string() }),
        None => Err(AppliesWhenError::WrongArity {
            op: op.to_string(),
            expected: "a string `field`",
        }),
    }
}

/// Returns the trivial-accept expression `{op:"true"}` (§4.6, §4.9).
#[must_use]
pub fn trivial_accept() -> Requirement<Predicate> {
    Requirement::predicate(Predicate::AlwaysTrue)
}

/// Parses an Applies-When expression, falling back to [`trivial_accept`] on
/// any validation failure instead of rejecting the draft Rule (§4.6 step 4).
///
/// Returns the parsed requirement plus `true` when a fallback was applied, so
/// callers can append a `composer_notes` auto-fix entry.
#[must_use]
pub fn parse_or_trivial_accept(value: &Value) -> (Requirement<Predicate>, bool) {
    match parse_applies_when(value) {
        Ok(requirement) => (requirement, false),
        Err(_) => (trivial_accept(), true),
    }
}

/// Evaluates a parsed Applies-When requirement against a context, using the
/// corpus-default [`KleeneLogic`] tri-state logic table.
#[must_use]
pub fn evaluate(requirement: &Requirement<Predicate>, context: &EvalContext) -> TriState {
    requirement.eval_tristate(context, 0, &KleeneLogic)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ctx() -> EvalContext {
        EvalContext::new()
            .with_field("buyer_type", json!("consumer"))
            .with_field("amount", json!(150))
            .with_field("jurisdiction", json!("HR"))
    }

    #[test]
    fn trivial_true_always_accepts() {
        let req = parse_applies_when(&json!({"op": "true"})).unwrap();
        assert_eq!(evaluate(&req, &EvalContext::new()), TriState::True);
    }

    #[test]
    fn eq_matches_field_value() {
        let req = parse_applies_when(&json!({
            "op": "eq", "field": "buyer_type", "value": "consumer"
        }))
        .unwrap();
        assert_eq!(evaluate(&req, &ctx()), TriState::True);
    }

    #[test]
    fn missing_field_is_unknown() {
        let req = parse_applies_when(&json!({
            "op": "eq", "field": "not_present", "value": "x"
        }))
        .unwrap();
        assert_eq!(evaluate(&req, &ctx()), TriState::Unknown);
    }

    #[test]
    fn and_of_true_unknown_is_unknown_under_kleene() {
        let req = parse_applies_when(&json!({
            "op": "and",
            "args": [
                {"op": "true"},
                {"op": "eq", "field": "absent", "value": "x"}
            ]
        }))
        .unwrap();
        assert_eq!(evaluate(&req, &ctx()), TriState::Unknown);
    }

    #[test]
    fn between_is_inclusive() {
        let req = parse_applies_when(&json!({
            "op": "between", "field": "amount", "low": 100, "high": 150
        }))
        .unwrap();
        assert_eq!(evaluate(&req, &ctx()), TriState::True);
    }

    #[test]
    fn gt_rejects_when_not_greater() {
        let req = parse_applies_when(&json!({
            "op": "gt", "field": "amount", "value": 150
        }))
        .unwrap();
        assert_eq!(evaluate(&req, &ctx()), TriState::False);
    }

    #[test]
    fn in_matches_one_of_values() {
        let req = parse_applies_when(&json!({
            "op": "in", "field": "jurisdiction", "values": ["HR", "SI"]
        }))
        .unwrap();
        assert_eq!(evaluate(&req, &ctx()), TriState::True);
    }

    #[test]
    fn not_negates_inner_result() {
        let req = parse_applies_when(&json!({
            "op": "not",
            "arg": {"op": "eq", "field": "buyer_type", "value": "business"}
        }))
        .unwrap();
        assert_eq!(evaluate(&req, &ctx()), TriState::True);
    }

    #[test]
    fn missing_op_is_rejected() {
        let err = parse_applies_when(&json!({"field": "x"})).unwrap_err();
        assert_eq!(err, AppliesWhenError::MissingOp);
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let err = parse_applies_when(&json!({"op": "xor", "args": []})).unwrap_err();
        assert_eq!(err, AppliesWhenError::UnknownOp("xor".to_string()));
    }

    #[test]
    fn non_string_field_is_rejected() {
        let err =
            parse_applies_when(&json!({"op": "eq", "field": 5, "value": 1})).unwrap_err();
        assert_eq!(err, AppliesWhenError::FieldNotString { op: "eq".to_string() });
    }

    #[test]
    fn depth_beyond_limit_is_rejected() {
        let mut expr = json!({"op": "true"});
        for _ in 0 ..= MAX_EXPRESSION_DEPTH {
            expr = json!({"op": "not", "arg": expr});
        }
        let err = parse_applies_when(&expr).unwrap_err();
        assert_eq!(err, AppliesWhenError::TooDeep { max_depth: MAX_EXPRESSION_DEPTH });
    }

    #[test]
    fn invalid_expression_falls_back_to_trivial_accept() {
        let (req, fell_back) = parse_or_trivial_accept(&json!({"op": "nonsense"}));
        assert!(fell_back);
        assert_eq!(evaluate(&req, &EvalContext::new()), TriState::True);
    }

    #[test]
    fn valid_expression_does_not_fall_back() {
        let (_req, fell_back) = parse_or_trivial_accept(&json!({"op": "true"}));
        assert!(!fell_back);
    }
}
