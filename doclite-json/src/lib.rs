//! File-backed JSON persistence for doclite.
//!
//! This crate provides the [`JsonFile`] persistence implementation: the
//! whole store serialized as one JSON text, with every non-native value run
//! through the transformer registry, plus the [`SaveLocation`] raw-text
//! boundary it writes through.
//!
//! # Example
//!
//! ```ignore
//! use doclite_core::{store::Database, schema::Unchecked};
//! use doclite_json::JsonFile;
//!
//! let db = Database::builder()
//!     .model("user", Unchecked)
//!     .persistence(JsonFile::new("data/store.json"))
//!     .build();
//! ```

#[allow(unused_extern_crates)]
extern crate self as doclite_json;

pub mod location;
pub mod store;

pub use location::{FileLocation, SaveLocation, StringLocation};
pub use store::JsonFile;
