//! An embedded, schema-validated JSON document store.
//!
//! doclite keeps a collection of JSON-like documents per model entirely in
//! process, validates every insert through a pluggable schema, and writes
//! the store back to a pluggable persistence medium with debounced,
//! coalesced flushes. It is the primary entry point for users of the
//! doclite workspace and re-exports the core types along with the JSON file
//! backend.
//!
//! # Quick Start
//!
//! ```ignore
//! use doclite::prelude::*;
//! use doclite::json::JsonFile;
//!
//! #[tokio::main]
//! async fn main() -> StoreResult<()> {
//!     let db = Database::builder()
//!         .model("user", Unchecked)
//!         .persistence(JsonFile::new("store.json"))
//!         .build();
//!
//!     let users = db.collection("user")?;
//!     let john = users.create(doc! { "name" => "John", "age" => 20 }).await?;
//!
//!     // Field literals, predicates, and nested queries compose freely.
//!     let grown_up = users
//!         .find(&QueryDoc::new().filter("age", ops::between(18.0, 21.0, true)).into())
//!         .await?;
//!     assert!(grown_up.is_some());
//!
//!     users
//!         .update_by_id(
//!             john["_id"].as_id().unwrap(),
//!             &UpdateDoc::new().set("age", 21).into(),
//!         )
//!         .await?;
//!
//!     db.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Persistence
//!
//! - In-memory (the default): the store lives for the process lifetime.
//! - [`json::JsonFile`]: a single JSON text file; non-JSON values (dates,
//!   sets, maps, blobs, custom types) round-trip through registered
//!   transformers.
//! - Anything implementing [`persist::Persistence`]: wrap encryption, a
//!   network store, or any medium that can hand back a whole store.
//!
//! # Consistency model
//!
//! Operations are serialized per store by the cooperative async model;
//! every mutation runs synchronously between awaits, and only the resulting
//! flush is coalesced. There is no cross-process coordination on a shared
//! backing file.

pub use doclite_core::{codec, error, id, ops, persist, query, schema, scheduler, store, transform, update, value};

pub use doclite_core::doc;

pub mod prelude;

/// JSON file persistence and the raw-text save locations beneath it.
pub mod json {
    pub use doclite_json::{FileLocation, JsonFile, SaveLocation, StringLocation};
}
