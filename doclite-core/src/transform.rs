//! Bidirectional transformers between opaque values and JSON surrogates.
//!
//! A [`Transformer`] pairs a type tag with an encode/decode function pair:
//! encode produces a JSON-representable surrogate [`Value`], decode reverses
//! it. The [`TransformerRegistry`] is an ordered list searched by tag (on
//! read) or by runtime type (on write); it is built once and immutable
//! afterwards — persistence implementations receive it as an explicit value,
//! never through ambient shared state.
//!
//! A surrogate may itself contain further opaque values (a set of datetimes,
//! say); the serialization codec re-walks surrogates, so transformers only
//! ever deal with their own layer.

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};

use crate::error::{StoreError, StoreResult};
use crate::value::{Blob, Opaque, OpaqueValue, Value, ValueMap, ValueSet};

/// A bidirectional codec between one opaque type and a JSON-safe surrogate.
pub trait Transformer: Send + Sync {
    /// The type tag stored alongside the surrogate.
    fn tag(&self) -> &str;

    /// Whether this transformer handles the given value's runtime type.
    fn claims(&self, value: &dyn OpaqueValue) -> bool;

    /// Encodes a claimed value into its surrogate.
    fn encode(&self, value: &dyn OpaqueValue) -> StoreResult<Value>;

    /// Decodes a surrogate back into the opaque value.
    fn decode(&self, surrogate: &Value) -> StoreResult<Box<dyn OpaqueValue>>;
}

/// A [`Transformer`] built from a pair of closures over a concrete type.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq)]
/// struct Celsius(f64);
/// impl Opaque for Celsius {}
///
/// let transformer = FnTransformer::new(
///     "Celsius",
///     |c: &Celsius| Value::Number(c.0),
///     |surrogate| surrogate.as_number().map(Celsius),
/// );
/// ```
pub struct FnTransformer<T: Opaque> {
    tag: String,
    encode: Box<dyn Fn(&T) -> Value + Send + Sync>,
    decode: Box<dyn Fn(&Value) -> Option<T> + Send + Sync>,
}

impl<T: Opaque> FnTransformer<T> {
    /// Creates a transformer from an encode and a decode function. The
    /// decode function returns `None` for malformed surrogates.
    pub fn new<E, D>(tag: impl Into<String>, encode: E, decode: D) -> Self
    where
        E: Fn(&T) -> Value + Send + Sync + 'static,
        D: Fn(&Value) -> Option<T> + Send + Sync + 'static,
    {
        Self {
            tag: tag.into(),
            encode: Box::new(encode),
            decode: Box::new(decode),
        }
    }
}

impl<T: Opaque> Transformer for FnTransformer<T> {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn claims(&self, value: &dyn OpaqueValue) -> bool {
        value.as_any().is::<T>()
    }

    fn encode(&self, value: &dyn OpaqueValue) -> StoreResult<Value> {
        let concrete = value.as_any().downcast_ref::<T>().ok_or_else(|| {
            StoreError::Serialization(format!("value not claimed by transformer {}", self.tag))
        })?;
        Ok((self.encode)(concrete))
    }

    fn decode(&self, surrogate: &Value) -> StoreResult<Box<dyn OpaqueValue>> {
        (self.decode)(surrogate)
            .map(|value| Box::new(value) as Box<dyn OpaqueValue>)
            .ok_or_else(|| {
                StoreError::Serialization(format!("malformed surrogate for tag {}", self.tag))
            })
    }
}

/// UTC datetimes, encoded as integer epoch milliseconds.
pub fn datetime() -> FnTransformer<DateTime<Utc>> {
    FnTransformer::new(
        "DateTime",
        |value: &DateTime<Utc>| Value::Number(value.timestamp_millis() as f64),
        |surrogate| {
            surrogate
                .as_number()
                .and_then(|ms| DateTime::from_timestamp_millis(ms as i64))
        },
    )
}

/// Sets, encoded as the ordered sequence of their members.
pub fn set() -> FnTransformer<ValueSet> {
    FnTransformer::new(
        "Set",
        |value: &ValueSet| Value::Array(value.members().to_vec()),
        |surrogate| {
            surrogate
                .as_array()
                .map(|members| members.iter().cloned().collect())
        },
    )
}

/// Maps, encoded as an ordered sequence of `[key, value]` pairs.
pub fn map() -> FnTransformer<ValueMap> {
    FnTransformer::new(
        "Map",
        |value: &ValueMap| {
            Value::Array(
                value
                    .entries()
                    .iter()
                    .map(|(key, value)| {
                        Value::Array(vec![Value::String(key.clone()), value.clone()])
                    })
                    .collect(),
            )
        },
        |surrogate| {
            let mut entries = ValueMap::new();
            for pair in surrogate.as_array()? {
                match pair.as_array()? {
                    [Value::String(key), value] => entries.insert(key.clone(), value.clone()),
                    _ => return None,
                }
            }
            Some(entries)
        },
    )
}

/// Binary blobs, encoded as base64 text.
pub fn blob() -> FnTransformer<Blob> {
    FnTransformer::new(
        "Blob",
        |value: &Blob| Value::String(BASE64.encode(value.bytes())),
        |surrogate| {
            surrogate
                .as_str()
                .and_then(|text| BASE64.decode(text).ok())
                .map(Blob::new)
        },
    )
}

/// An ordered, immutable-after-construction list of transformers.
#[derive(Clone)]
pub struct TransformerRegistry {
    transformers: Vec<Arc<dyn Transformer>>,
}

impl TransformerRegistry {
    /// A registry with no transformers at all.
    pub fn empty() -> Self {
        Self { transformers: Vec::new() }
    }

    /// The default registry: datetimes, sets, maps, and blobs.
    pub fn defaults() -> Self {
        Self::empty()
            .with(datetime())
            .with(set())
            .with(map())
            .with(blob())
    }

    /// Appends a transformer, consuming and returning the registry. Earlier
    /// transformers win when several claim the same tag or type.
    pub fn with(mut self, transformer: impl Transformer + 'static) -> Self {
        self.transformers.push(Arc::new(transformer));
        self
    }

    /// Finds a transformer by its type tag.
    pub fn by_tag(&self, tag: &str) -> Option<&dyn Transformer> {
        self.transformers
            .iter()
            .find(|t| t.tag() == tag)
            .map(Arc::as_ref)
    }

    /// Finds the transformer claiming a value's runtime type.
    pub fn claiming(&self, value: &dyn OpaqueValue) -> Option<&dyn Transformer> {
        self.transformers
            .iter()
            .find(|t| t.claims(value))
            .map(Arc::as_ref)
    }
}

impl Default for TransformerRegistry {
    fn default() -> Self {
        Self::defaults()
    }
}

impl fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.transformers.iter().map(|t| t.tag()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn round_trip(transformer: &dyn Transformer, value: &dyn OpaqueValue) -> Box<dyn OpaqueValue> {
        let surrogate = transformer.encode(value).unwrap();
        transformer.decode(&surrogate).unwrap()
    }

    #[test]
    fn datetime_round_trips_as_epoch_millis() {
        let transformer = datetime();
        let when = Utc.with_ymd_and_hms(2023, 9, 10, 8, 30, 0).unwrap();

        let surrogate = transformer.encode(&when).unwrap();
        assert_eq!(surrogate, Value::Number(when.timestamp_millis() as f64));

        let decoded = round_trip(&transformer, &when);
        assert!(decoded.eq_box(&when));
    }

    #[test]
    fn set_round_trips_members_in_order() {
        let transformer = set();
        let original: ValueSet = ["b", "a", "c"].into_iter().collect();
        let decoded = round_trip(&transformer, &original);
        assert!(decoded.eq_box(&original));
    }

    #[test]
    fn map_round_trips_entries_in_order() {
        let transformer = map();
        let original: ValueMap = [("one", 1), ("two", 2)].into_iter().collect();
        let decoded = round_trip(&transformer, &original);
        assert!(decoded.eq_box(&original));
    }

    #[test]
    fn blob_round_trips_through_base64() {
        let transformer = blob();
        let original = Blob::new(vec![0u8, 159, 146, 150]);

        let surrogate = transformer.encode(&original).unwrap();
        assert!(surrogate.as_str().is_some());

        let decoded = round_trip(&transformer, &original);
        assert!(decoded.eq_box(&original));
    }

    #[test]
    fn malformed_surrogates_are_rejected() {
        let err = datetime().decode(&Value::from("yesterday")).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn registry_lookup_by_tag_and_type() {
        let registry = TransformerRegistry::defaults();
        assert!(registry.by_tag("Set").is_some());
        assert!(registry.by_tag("Unknown").is_none());

        let set_value: ValueSet = [1, 2].into_iter().collect();
        let found = registry.claiming(&set_value).unwrap();
        assert_eq!(found.tag(), "Set");
    }
}
