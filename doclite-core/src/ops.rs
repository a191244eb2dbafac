//! Builders for common field predicates and updaters.
//!
//! Every function here is stateless: it returns a [`FieldPredicate`] or
//! [`FieldUpdater`] closed over its arguments, ready to be placed in a query
//! or update tree. Numeric operators use ordinary f64 ordering and fail (or
//! leave the field unchanged, for updaters) when the field is not numeric.

use regex::Regex;

use crate::query::FieldPredicate;
use crate::update::FieldUpdater;
use crate::value::{Value, ValueSet};

/// Matches numbers within `[min, max]` (inclusive) or `(min, max)`.
pub fn between(min: f64, max: f64, inclusive: bool) -> FieldPredicate {
    FieldPredicate::new(move |value| match value.as_number() {
        Some(n) if inclusive => min <= n && n <= max,
        Some(n) => min < n && n < max,
        None => false,
    })
}

/// Strictly greater than.
pub fn gt(bound: f64) -> FieldPredicate {
    FieldPredicate::new(move |value| value.as_number().is_some_and(|n| n > bound))
}

/// Greater than or equal to.
pub fn gte(bound: f64) -> FieldPredicate {
    FieldPredicate::new(move |value| value.as_number().is_some_and(|n| n >= bound))
}

/// Strictly less than.
pub fn lt(bound: f64) -> FieldPredicate {
    FieldPredicate::new(move |value| value.as_number().is_some_and(|n| n < bound))
}

/// Less than or equal to.
pub fn lte(bound: f64) -> FieldPredicate {
    FieldPredicate::new(move |value| value.as_number().is_some_and(|n| n <= bound))
}

/// Deep equality.
pub fn eq(expected: impl Into<Value>) -> FieldPredicate {
    let expected = expected.into();
    FieldPredicate::new(move |value| *value == expected)
}

/// Deep inequality.
pub fn neq(expected: impl Into<Value>) -> FieldPredicate {
    let expected = expected.into();
    FieldPredicate::new(move |value| *value != expected)
}

/// Matches when the field value is a member of `collection`.
///
/// An array collection tests membership by deep equality; a string
/// collection tests substring containment of a string field.
pub fn is_in(collection: impl Into<Value>) -> FieldPredicate {
    let collection = collection.into();
    FieldPredicate::new(move |value| value_in(&collection, value))
}

/// Negation of [`is_in`].
pub fn not_in(collection: impl Into<Value>) -> FieldPredicate {
    let collection = collection.into();
    FieldPredicate::new(move |value| !value_in(&collection, value))
}

/// Matches when the field's own array, set, or string value contains `needle`.
pub fn contains(needle: impl Into<Value>) -> FieldPredicate {
    let needle = needle.into();
    FieldPredicate::new(move |value| value_in(value, &needle))
}

/// Matches when the field contains every one of `needles`.
pub fn all<I>(needles: I) -> FieldPredicate
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    let needles: Vec<Value> = needles.into_iter().map(Into::into).collect();
    FieldPredicate::new(move |value| needles.iter().all(|needle| value_in(value, needle)))
}

/// Matches a string field against a compiled regular expression.
pub fn regex(pattern: Regex) -> FieldPredicate {
    FieldPredicate::new(move |value| value.as_str().is_some_and(|s| pattern.is_match(s)))
}

/// Both predicates hold.
pub fn and(a: FieldPredicate, b: FieldPredicate) -> FieldPredicate {
    FieldPredicate::new(move |value| a.test(value) && b.test(value))
}

/// At least one predicate holds.
pub fn or(a: FieldPredicate, b: FieldPredicate) -> FieldPredicate {
    FieldPredicate::new(move |value| a.test(value) || b.test(value))
}

/// The predicate does not hold.
pub fn not(predicate: FieldPredicate) -> FieldPredicate {
    FieldPredicate::new(move |value| !predicate.test(value))
}

/// Neither predicate holds.
pub fn nor(a: FieldPredicate, b: FieldPredicate) -> FieldPredicate {
    FieldPredicate::new(move |value| !a.test(value) && !b.test(value))
}

/// Membership of `needle` within `haystack` (array, set, or string).
fn value_in(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Array(items) => items.contains(needle),
        Value::String(s) => needle.as_str().is_some_and(|sub| s.contains(sub)),
        Value::Opaque(_) => haystack
            .as_opaque::<ValueSet>()
            .is_some_and(|set| set.contains(needle)),
        _ => false,
    }
}

/// Appends values to the end of an array field.
pub fn push<I>(items: I) -> FieldUpdater
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    let items: Vec<Value> = items.into_iter().map(Into::into).collect();
    FieldUpdater::new(move |old| match old {
        Value::Array(mut array) => {
            array.extend(items.iter().cloned());
            Value::Array(array)
        }
        other => other,
    })
}

/// Removes the last element of an array field.
pub fn pop() -> FieldUpdater {
    FieldUpdater::new(|old| match old {
        Value::Array(mut array) => {
            array.pop();
            Value::Array(array)
        }
        other => other,
    })
}

/// Removes the first element of an array field.
pub fn shift() -> FieldUpdater {
    FieldUpdater::new(|old| match old {
        Value::Array(mut array) => {
            if !array.is_empty() {
                array.remove(0);
            }
            Value::Array(array)
        }
        other => other,
    })
}

/// Inserts a value at the front of an array field.
pub fn unshift(item: impl Into<Value>) -> FieldUpdater {
    let item = item.into();
    FieldUpdater::new(move |old| match old {
        Value::Array(mut array) => {
            array.insert(0, item.clone());
            Value::Array(array)
        }
        other => other,
    })
}

/// Increments a numeric field.
pub fn inc(by: f64) -> FieldUpdater {
    arithmetic(move |n| n + by)
}

/// Decrements a numeric field.
pub fn dec(by: f64) -> FieldUpdater {
    arithmetic(move |n| n - by)
}

/// Multiplies a numeric field.
pub fn mul(by: f64) -> FieldUpdater {
    arithmetic(move |n| n * by)
}

/// Divides a numeric field.
///
/// Division by zero follows IEEE-754: the field becomes infinite (or NaN
/// for `0 / 0`). Non-finite numbers persist as JSON `null`.
pub fn div(by: f64) -> FieldUpdater {
    arithmetic(move |n| n / by)
}

/// Reduces a numeric field modulo `by`.
///
/// Modulo zero follows IEEE-754 and yields NaN; see [`div`].
pub fn modulo(by: f64) -> FieldUpdater {
    arithmetic(move |n| n % by)
}

fn arithmetic(op: impl Fn(f64) -> f64 + Send + Sync + 'static) -> FieldUpdater {
    FieldUpdater::new(move |old| match old {
        Value::Number(n) => Value::Number(op(n)),
        other => other,
    })
}

/// Replaces the first match of `pattern` in a string field.
pub fn replace(pattern: Regex, replacement: impl Into<String>) -> FieldUpdater {
    let replacement = replacement.into();
    FieldUpdater::new(move |old| match old {
        Value::String(s) => Value::String(pattern.replace(&s, replacement.as_str()).into_owned()),
        other => other,
    })
}
