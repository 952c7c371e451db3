//! Structural similarity scoring.
//!
//! The scorer measures how close two JSON values are on a `[0, 1]` scale.
//! The differencer uses it to align array elements across the two sides of
//! a comparison, so a re-sorted list or a record with one edited field does
//! not explode into a flood of remove/add pairs.

use std::collections::HashSet;

use serde_json::Value;

use crate::config::MAX_STRUCTURE_DEPTH;

/// Coarse JSON type, standing in for the dynamic `typeof` the scoring rules
/// are defined over. Arrays and objects are distinct kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        }
    }
}

pub(crate) fn value_kind(value: &Value) -> ValueKind {
    match value {
        Value::Null => ValueKind::Null,
        Value::Bool(_) => ValueKind::Bool,
        Value::Number(_) => ValueKind::Number,
        Value::String(_) => ValueKind::String,
        Value::Array(_) => ValueKind::Array,
        Value::Object(_) => ValueKind::Object,
    }
}

/// Scores the structural closeness of two values in `[0, 1]`.
///
/// Rules, in order:
/// - equal values score 1.0;
/// - a null on either side (but not both) scores 0.0;
/// - differing kinds score 0.0;
/// - unequal primitives of the same kind score 0.0;
/// - arrays score the Jaccard index of their serialized elements, an
///   order-insensitive content overlap (empty vs non-empty is 0.0);
/// - objects score the sum of per-key scores over shared keys, divided by
///   the size of the key union; keys on one side only contribute 0.
///
/// Pure function, no side effects. Recursion is bounded at
/// [`MAX_STRUCTURE_DEPTH`]; past the bound the scorer fails closed to 0.0.
pub fn score(a: &Value, b: &Value) -> f64 {
    score_at_depth(a, b, 0)
}

pub(crate) fn score_at_depth(a: &Value, b: &Value, depth: usize) -> f64 {
    if depth > MAX_STRUCTURE_DEPTH {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if a.is_null() || b.is_null() {
        return 0.0;
    }
    if value_kind(a) != value_kind(b) {
        return 0.0;
    }
    match (a, b) {
        (Value::Array(xs), Value::Array(ys)) => {
            // Equal empties were handled by the equality check above.
            if xs.is_empty() || ys.is_empty() {
                return 0.0;
            }
            let xs: HashSet<String> = xs.iter().map(canonical_string).collect();
            let ys: HashSet<String> = ys.iter().map(canonical_string).collect();
            let intersection = xs.intersection(&ys).count();
            let union = xs.union(&ys).count();
            intersection as f64 / union as f64
        }
        (Value::Object(xm), Value::Object(ym)) => {
            let union: HashSet<&String> = xm.keys().chain(ym.keys()).collect();
            if union.is_empty() {
                return 1.0;
            }
            let mut accumulator = 0.0;
            for key in &union {
                if let (Some(x), Some(y)) = (xm.get(*key), ym.get(*key)) {
                    accumulator += score_at_depth(x, y, depth + 1);
                }
            }
            accumulator / union.len() as f64
        }
        // Unequal primitives of the same kind.
        _ => 0.0,
    }
}

/// Serializes a value for set-based array comparison.
///
/// serde_json's default `Map` is BTreeMap-backed, so object keys serialize
/// in sorted order and the output is stable across key insertion order.
pub(crate) fn canonical_string(value: &Value) -> String {
    value.to_string()
}
