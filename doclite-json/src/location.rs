//! Raw-text save locations.
//!
//! A [`SaveLocation`] is the byte-level boundary beneath [`JsonFile`]: it
//! stores and returns opaque text without knowing anything about stores or
//! documents. The file implementation creates its target on first load when
//! configured to; the in-memory implementation backs tests and custom
//! wiring.
//!
//! [`JsonFile`]: crate::store::JsonFile

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use mea::mutex::Mutex;

use doclite_core::error::{StoreError, StoreResult};

/// A place to save and load a text payload.
#[async_trait]
pub trait SaveLocation: Send + Sync {
    /// Overwrites the stored text.
    async fn save(&self, text: &str) -> StoreResult<()>;

    /// Loads the stored text.
    async fn load(&self) -> StoreResult<String>;
}

/// A save location backed by a single file on disk.
#[derive(Debug, Clone)]
pub struct FileLocation {
    path: PathBuf,
    create_if_missing: bool,
}

impl FileLocation {
    /// A file location that creates an empty target file on first load if
    /// it does not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), create_if_missing: true }
    }

    /// A file location that fails to load when the target is absent.
    pub fn require_existing(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), create_if_missing: false }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl SaveLocation for FileLocation {
    async fn save(&self, text: &str) -> StoreResult<()> {
        tokio::fs::write(&self.path, text).await.map_err(|err| {
            StoreError::WriteFailure(format!("{}: {err}", self.path.display()))
        })
    }

    async fn load(&self) -> StoreResult<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(text),
            Err(err) if err.kind() == ErrorKind::NotFound && self.create_if_missing => {
                tokio::fs::write(&self.path, "").await.map_err(|err| {
                    StoreError::ReadFailure(format!(
                        "could not create {}: {err}",
                        self.path.display()
                    ))
                })?;
                Ok(String::new())
            }
            Err(err) => Err(StoreError::ReadFailure(format!(
                "{}: {err}",
                self.path.display()
            ))),
        }
    }
}

/// An in-memory save location.
///
/// Clones share the same buffer, so a test can hold one clone and inspect
/// what the store wrote through the other.
#[derive(Debug, Clone)]
pub struct StringLocation {
    text: Arc<Mutex<String>>,
}

impl StringLocation {
    pub fn new() -> Self {
        Self::with_content(String::new())
    }

    /// Pre-seeds the location with existing content.
    pub fn with_content(text: impl Into<String>) -> Self {
        Self { text: Arc::new(Mutex::new(text.into())) }
    }

    /// Returns a copy of the current content.
    pub async fn contents(&self) -> String {
        self.text.lock().await.clone()
    }
}

#[async_trait]
impl SaveLocation for StringLocation {
    async fn save(&self, text: &str) -> StoreResult<()> {
        *self.text.lock().await = text.to_string();
        Ok(())
    }

    async fn load(&self) -> StoreResult<String> {
        Ok(self.text.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_location_creates_missing_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let location = FileLocation::new(&path);
        assert_eq!(location.load().await.unwrap(), "");
        assert!(path.exists());
    }

    #[tokio::test]
    async fn file_location_can_require_an_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let location = FileLocation::require_existing(dir.path().join("absent.json"));

        let err = location.load().await.unwrap_err();
        assert!(matches!(err, StoreError::ReadFailure(_)));
    }

    #[tokio::test]
    async fn file_location_round_trips_text() {
        let dir = tempfile::tempdir().unwrap();
        let location = FileLocation::new(dir.path().join("store.json"));

        location.save("{\"a\":1}").await.unwrap();
        assert_eq!(location.load().await.unwrap(), "{\"a\":1}");
    }

    #[tokio::test]
    async fn string_location_shares_its_buffer_across_clones() {
        let location = StringLocation::new();
        let observer = location.clone();

        location.save("payload").await.unwrap();
        assert_eq!(observer.contents().await, "payload");
    }
}
