//! JSON encoding and decoding of stores, documents, and values.
//!
//! The codec walks a value tree and converts it to (or from) a
//! `serde_json::Value`, running every opaque value through the transformer
//! registry. Encoded opaque values appear as an envelope object carrying the
//! type tag and the surrogate:
//!
//! ```json
//! { "$oid": "DateTime", "$ov": 1694334600000 }
//! ```
//!
//! Two special cases, applied at every nesting depth:
//!
//! - Document identifiers (`Value::Id`) are enveloped under the reserved
//!   `ObjectId` tag — except for fields named `_id`, which are written as
//!   their plain string form and re-parsed to identifiers on read.
//! - Numbers are canonicalized: an integral f64 in the safe integer range
//!   serializes as a JSON integer; non-finite numbers (the result of
//!   division by zero) serialize as `null`, which JSON cannot represent
//!   otherwise.
//!
//! Envelope objects whose tag has no registered transformer pass through
//! unchanged as plain objects.

use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::{StoreError, StoreResult};
use crate::id::DocumentId;
use crate::transform::TransformerRegistry;
use crate::value::{CollectionData, Document, StoreData, Value};

/// Envelope key carrying the transformer tag.
pub const TAG_KEY: &str = "$oid";
/// Envelope key carrying the encoded surrogate.
pub const SURROGATE_KEY: &str = "$ov";
/// Reserved tag for document identifiers.
pub const ID_TAG: &str = "ObjectId";
/// The synthesized identifier field of returned documents.
pub const ID_FIELD: &str = "_id";

/// A value codec bound to a transformer registry.
#[derive(Debug, Clone)]
pub struct ValueCodec {
    registry: TransformerRegistry,
}

impl ValueCodec {
    pub fn new(registry: TransformerRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TransformerRegistry {
        &self.registry
    }

    /// Encodes a whole store: model name → identifier → document.
    pub fn encode_store(&self, store: &StoreData) -> StoreResult<JsonValue> {
        let mut models = JsonMap::new();
        for (model, collection) in store {
            let mut documents = JsonMap::new();
            for (id, document) in collection {
                documents.insert(id.clone(), self.encode_document(document)?);
            }
            models.insert(model.clone(), JsonValue::Object(documents));
        }
        Ok(JsonValue::Object(models))
    }

    /// Decodes a whole store.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::Serialization`] when the top-level shape is
    /// not an object of objects of documents.
    pub fn decode_store(&self, json: &JsonValue) -> StoreResult<StoreData> {
        let models = expect_object(json, "store root")?;
        let mut store = StoreData::new();
        for (model, documents) in models {
            let documents = expect_object(documents, "collection")?;
            let mut collection = CollectionData::new();
            for (id, document) in documents {
                collection.insert(id.clone(), self.decode_document(document)?);
            }
            store.insert(model.clone(), collection);
        }
        Ok(store)
    }

    /// Encodes one document, applying the `_id` special case.
    pub fn encode_document(&self, document: &Document) -> StoreResult<JsonValue> {
        let mut fields = JsonMap::new();
        for (field, value) in document {
            let encoded = match value {
                Value::Id(id) if field == ID_FIELD => JsonValue::String(id.to_string()),
                other => self.encode_value(other)?,
            };
            fields.insert(field.clone(), encoded);
        }
        Ok(JsonValue::Object(fields))
    }

    /// Decodes one document, reconstructing `_id` fields as identifiers.
    pub fn decode_document(&self, json: &JsonValue) -> StoreResult<Document> {
        let fields = expect_object(json, "document")?;
        let mut document = Document::new();
        for (field, value) in fields {
            let decoded = match value {
                JsonValue::String(raw) if field == ID_FIELD => DocumentId::parse(raw)
                    .map(Value::Id)
                    .unwrap_or_else(|_| Value::String(raw.clone())),
                other => self.decode_value(other)?,
            };
            document.insert(field.clone(), decoded);
        }
        Ok(document)
    }

    /// Encodes a single value.
    pub fn encode_value(&self, value: &Value) -> StoreResult<JsonValue> {
        Ok(match value {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => canonical_number(*n),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Array(items) => JsonValue::Array(
                items
                    .iter()
                    .map(|item| self.encode_value(item))
                    .collect::<StoreResult<_>>()?,
            ),
            Value::Object(document) => self.encode_document(document)?,
            Value::Id(id) => envelope(ID_TAG, JsonValue::String(id.to_string())),
            Value::Opaque(inner) => {
                let transformer = self.registry.claiming(inner.as_ref()).ok_or_else(|| {
                    StoreError::Serialization(format!(
                        "no transformer registered for opaque value {inner:?}"
                    ))
                })?;
                let surrogate = transformer.encode(inner.as_ref())?;
                envelope(transformer.tag(), self.encode_value(&surrogate)?)
            }
        })
    }

    /// Decodes a single value, resolving any transformer envelopes.
    pub fn decode_value(&self, json: &JsonValue) -> StoreResult<Value> {
        Ok(match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => Value::Number(n.as_f64().ok_or_else(|| {
                StoreError::Serialization(format!("unrepresentable number {n}"))
            })?),
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.decode_value(item))
                    .collect::<StoreResult<_>>()?,
            ),
            JsonValue::Object(fields) => match unwrap_envelope(fields) {
                Some((tag, surrogate)) if tag == ID_TAG => {
                    let raw = surrogate.as_str().ok_or_else(|| {
                        StoreError::Serialization("identifier surrogate is not a string".into())
                    })?;
                    Value::Id(DocumentId::parse(raw)?)
                }
                Some((tag, surrogate)) => match self.registry.by_tag(tag) {
                    Some(transformer) => {
                        let surrogate = self.decode_value(surrogate)?;
                        Value::Opaque(transformer.decode(&surrogate)?)
                    }
                    // Unknown tag: leave the envelope as a plain object.
                    None => Value::Object(self.decode_document(json)?),
                },
                None => Value::Object(self.decode_document(json)?),
            },
        })
    }
}

fn envelope(tag: &str, surrogate: JsonValue) -> JsonValue {
    let mut fields = JsonMap::new();
    fields.insert(TAG_KEY.to_string(), JsonValue::String(tag.to_string()));
    fields.insert(SURROGATE_KEY.to_string(), surrogate);
    JsonValue::Object(fields)
}

fn unwrap_envelope(fields: &JsonMap<String, JsonValue>) -> Option<(&str, &JsonValue)> {
    if fields.len() != 2 {
        return None;
    }
    let tag = fields.get(TAG_KEY)?.as_str()?;
    let surrogate = fields.get(SURROGATE_KEY)?;
    Some((tag, surrogate))
}

/// The largest integer exactly representable as an f64.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn canonical_number(n: f64) -> JsonValue {
    if !n.is_finite() {
        return JsonValue::Null;
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return JsonValue::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

fn expect_object<'a>(
    json: &'a JsonValue,
    context: &str,
) -> StoreResult<&'a JsonMap<String, JsonValue>> {
    json.as_object()
        .ok_or_else(|| StoreError::Serialization(format!("{context} is not a JSON object")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::value::{Blob, ValueSet};
    use chrono::{TimeZone, Utc};

    fn codec() -> ValueCodec {
        ValueCodec::new(TransformerRegistry::defaults())
    }

    #[test]
    fn scalars_round_trip() {
        let codec = codec();
        for value in [
            Value::Null,
            Value::Bool(true),
            Value::Number(2.5),
            Value::from("text"),
        ] {
            let encoded = codec.encode_value(&value).unwrap();
            assert_eq!(codec.decode_value(&encoded).unwrap(), value);
        }
    }

    #[test]
    fn integral_numbers_encode_as_json_integers() {
        let encoded = codec().encode_value(&Value::Number(42.0)).unwrap();
        assert_eq!(encoded.to_string(), "42");

        let encoded = codec().encode_value(&Value::Number(2.5)).unwrap();
        assert_eq!(encoded.to_string(), "2.5");
    }

    #[test]
    fn non_finite_numbers_encode_as_null() {
        let encoded = codec().encode_value(&Value::Number(f64::INFINITY)).unwrap();
        assert_eq!(encoded, JsonValue::Null);
    }

    #[test]
    fn opaque_values_encode_as_envelopes() {
        let codec = codec();
        let when = Utc.with_ymd_and_hms(2023, 9, 10, 8, 30, 0).unwrap();
        let encoded = codec.encode_value(&Value::from(when)).unwrap();

        assert_eq!(encoded[TAG_KEY], "DateTime");
        assert_eq!(encoded[SURROGATE_KEY], JsonValue::from(when.timestamp_millis()));
        assert_eq!(codec.decode_value(&encoded).unwrap(), Value::from(when));
    }

    #[test]
    fn nested_opaque_surrogates_round_trip() {
        let codec = codec();
        let when = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let set: ValueSet = [Value::from(when), Value::from("plain")].into_iter().collect();
        let value = Value::from(set);

        let encoded = codec.encode_value(&value).unwrap();
        assert_eq!(codec.decode_value(&encoded).unwrap(), value);
    }

    #[test]
    fn unknown_envelope_tags_pass_through() {
        let codec = codec();
        let json: JsonValue = serde_json::json!({ "$oid": "Custom", "$ov": 1 });
        let decoded = codec.decode_value(&json).unwrap();

        let object = decoded.as_object().unwrap();
        assert_eq!(object.get(TAG_KEY), Some(&Value::from("Custom")));
    }

    #[test]
    fn id_fields_encode_as_plain_strings() {
        let codec = codec();
        let id = DocumentId::new();
        let document = doc! { "_id" => id.clone(), "ref" => id.clone() };

        let encoded = codec.encode_document(&document).unwrap();
        assert_eq!(encoded["_id"], JsonValue::String(id.to_string()));
        assert_eq!(encoded["ref"][TAG_KEY], ID_TAG);

        let decoded = codec.decode_document(&encoded).unwrap();
        assert_eq!(decoded.get("_id"), Some(&Value::Id(id.clone())));
        assert_eq!(decoded.get("ref"), Some(&Value::Id(id)));
    }

    #[test]
    fn blob_fields_round_trip_through_store_encoding() {
        let codec = codec();
        let mut store = StoreData::new();
        let mut collection = CollectionData::new();
        collection.insert(
            DocumentId::new().to_string(),
            doc! { "payload" => Blob::new(vec![1u8, 2, 3]) },
        );
        store.insert("files".to_string(), collection);

        let encoded = codec.encode_store(&store).unwrap();
        let decoded = codec.decode_store(&encoded).unwrap();
        assert_eq!(decoded, store);
    }

    #[test]
    fn malformed_store_shape_is_a_serialization_error() {
        let err = codec().decode_store(&JsonValue::Bool(true)).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
