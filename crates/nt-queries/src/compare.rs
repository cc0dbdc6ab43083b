//! Value comparison
//!
//! Query-string values arrive as strings; they are cast to the JSON type of
//! the stored field before comparing, the way a schema-driven store casts
//! query values. Sorting uses a total order across JSON types.

use serde_json::Value;
use std::cmp::Ordering;

/// Cast `value` to the JSON type of `target` where a lossless reading exists
pub fn coerce_to(value: &Value, target: &Value) -> Value {
    match (value, target) {
        (Value::String(s), Value::Number(_)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        (Value::String(s), Value::Bool(_)) => match s.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => value.clone(),
        },
        (Value::Number(n), Value::String(_)) => Value::String(n.to_string()),
        (Value::Bool(b), Value::String(_)) => Value::String(b.to_string()),
        _ => value.clone(),
    }
}

/// Equality after casting; numbers compare numerically
pub fn values_equal(filter_value: &Value, stored: &Value) -> bool {
    let coerced = coerce_to(filter_value, stored);
    match (&coerced, stored) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => coerced == *stored,
    }
}

/// Ordering between a filter value and a stored value of the same type.
/// `None` when the types differ after casting.
pub fn compare_same_type(filter_value: &Value, stored: &Value) -> Option<Ordering> {
    let coerced = coerce_to(filter_value, stored);
    match (stored, &coerced) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Total order used for sorting; missing values sort first
pub fn sort_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => {
            for (left, right) in x.iter().zip(y.iter()) {
                let ord = sort_cmp(Some(left), Some(right));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => Ordering::Equal,
    }
}
