//! JSON-file persistence.
//!
//! [`JsonFile`] encodes the whole store as a single JSON text through the
//! transformer registry and hands the text to a [`SaveLocation`]. The
//! on-disk shape is a top-level object keyed by model name, each value an
//! object keyed by document identifier; non-native values appear as
//! `{"$oid": <tag>, "$ov": <surrogate>}` envelopes, and identifiers are
//! collection keys rather than document fields.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use doclite_core::codec::ValueCodec;
use doclite_core::error::{StoreError, StoreResult};
use doclite_core::persist::Persistence;
use doclite_core::transform::TransformerRegistry;
use doclite_core::value::StoreData;

use crate::location::{FileLocation, SaveLocation};

/// Persistence over a JSON text file (or any other [`SaveLocation`]).
pub struct JsonFile {
    location: Box<dyn SaveLocation>,
    codec: ValueCodec,
}

impl JsonFile {
    /// A JSON file at `path` with the default transformer registry. The
    /// file is created on first load when absent.
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self::with_location(FileLocation::new(path), TransformerRegistry::defaults())
    }

    /// A JSON store over an arbitrary save location and registry. Use this
    /// to add custom transformers or swap the storage boundary.
    pub fn with_location(
        location: impl SaveLocation + 'static,
        registry: TransformerRegistry,
    ) -> Self {
        Self {
            location: Box::new(location),
            codec: ValueCodec::new(registry),
        }
    }
}

#[async_trait]
impl Persistence for JsonFile {
    /// Reads and decodes the whole store.
    ///
    /// An empty or all-whitespace payload is a fresh store. Anything that
    /// fails to parse or decode is a [`StoreError::ReadFailure`]; the
    /// database layer recovers by falling back to an empty store and
    /// overwriting.
    async fn read(&self) -> StoreResult<StoreData> {
        let text = self.location.load().await?;
        if text.trim().is_empty() {
            return Ok(StoreData::new());
        }

        let json: JsonValue = serde_json::from_str(&text)
            .map_err(|err| StoreError::ReadFailure(format!("invalid JSON: {err}")))?;
        self.codec
            .decode_store(&json)
            .map_err(|err| StoreError::ReadFailure(err.to_string()))
    }

    async fn write(&self, data: &StoreData) -> StoreResult<()> {
        let json = self.codec.encode_store(data)?;
        let text = serde_json::to_string(&json)?;
        self.location.save(&text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::StringLocation;
    use chrono::{TimeZone, Utc};
    use doclite_core::doc;
    use doclite_core::id::DocumentId;
    use doclite_core::value::{CollectionData, Value};

    fn sample_store() -> StoreData {
        let mut users = CollectionData::new();
        users.insert(
            DocumentId::new().to_string(),
            doc! {
                "name" => "John",
                "joined" => Utc.with_ymd_and_hms(2023, 2, 1, 9, 0, 0).unwrap(),
                "tags" => vec!["alpha", "beta"],
            },
        );
        let mut store = StoreData::new();
        store.insert("user".to_string(), users);
        store
    }

    #[tokio::test]
    async fn store_round_trips_through_json_text() {
        let location = StringLocation::new();
        let persistence =
            JsonFile::with_location(location.clone(), TransformerRegistry::defaults());

        let store = sample_store();
        persistence.write(&store).await.unwrap();
        assert_eq!(persistence.read().await.unwrap(), store);

        let text = location.contents().await;
        assert!(text.contains("\"$oid\":\"DateTime\""));
    }

    #[tokio::test]
    async fn empty_payload_reads_as_a_fresh_store() {
        let persistence = JsonFile::with_location(
            StringLocation::new(),
            TransformerRegistry::defaults(),
        );
        assert_eq!(persistence.read().await.unwrap(), StoreData::new());
    }

    #[tokio::test]
    async fn garbage_payload_is_a_read_failure() {
        let persistence = JsonFile::with_location(
            StringLocation::with_content("{not json"),
            TransformerRegistry::defaults(),
        );
        let err = persistence.read().await.unwrap_err();
        assert!(matches!(err, StoreError::ReadFailure(_)));
    }

    #[tokio::test]
    async fn writes_are_deterministic() {
        let location = StringLocation::new();
        let persistence =
            JsonFile::with_location(location.clone(), TransformerRegistry::defaults());

        let store = sample_store();
        persistence.write(&store).await.unwrap();
        let first = location.contents().await;
        persistence.write(&store).await.unwrap();
        assert_eq!(location.contents().await, first);
    }

    #[tokio::test]
    async fn identifiers_are_keys_not_fields() {
        let location = StringLocation::new();
        let persistence =
            JsonFile::with_location(location.clone(), TransformerRegistry::defaults());

        let id = DocumentId::new();
        let mut users = CollectionData::new();
        users.insert(id.to_string(), doc! { "name" => "solo" });
        let mut store = StoreData::new();
        store.insert("user".to_string(), users);

        persistence.write(&store).await.unwrap();
        let text = location.contents().await;
        assert!(text.contains(&format!("\"{id}\":{{")));
        assert!(!text.contains("_id"));

        let read_back = persistence.read().await.unwrap();
        assert!(read_back["user"].contains_key(&id.to_string()));
        assert_eq!(read_back["user"][&id.to_string()].get("name"), Some(&Value::from("solo")));
    }
}
