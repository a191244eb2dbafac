//! An embedded, schema-validated JSON document store.
//!
//! This crate is the core of the doclite project and provides:
//!
//! - **Value model** ([`value`]) - The dynamic value tree documents are made
//!   of, including opaque transformer-backed values
//! - **Identifiers** ([`id`]) - Opaque, collision-resistant document ids
//! - **Schema contract** ([`schema`]) - The validation capability the store
//!   calls but never implements
//! - **Query engine** ([`query`]) - Tagged query trees and recursive matching
//! - **Update engine** ([`update`]) - Tagged update trees and in-place
//!   deep partial merges
//! - **Operator library** ([`ops`]) - Stateless predicate/updater builders
//! - **Transformers** ([`transform`]) - Codecs that let non-JSON values
//!   round-trip through JSON persistence
//! - **Serialization** ([`codec`]) - The store/document/value JSON codec
//! - **Persistence** ([`persist`]) - The read/write-whole-store abstraction
//! - **Scheduling** ([`scheduler`]) - The timer capability behind debounced
//!   write-backs
//! - **The database** ([`store`]) - Readiness lifecycle, collection handles,
//!   and the debounced save loop
//!
//! # Example
//!
//! ```ignore
//! use doclite_core::{doc, ops, store::Database, schema::Unchecked};
//! use doclite_core::query::QueryDoc;
//!
//! #[tokio::main]
//! async fn main() -> doclite_core::error::StoreResult<()> {
//!     let db = Database::builder().model("user", Unchecked).build();
//!     let users = db.collection("user")?;
//!
//!     users.create(doc! { "name" => "John", "age" => 20 }).await?;
//!     let adults = users
//!         .find_many(&QueryDoc::new().filter("age", ops::gt(18.0)).into())
//!         .await?;
//!     assert_eq!(adults.len(), 1);
//!
//!     db.disconnect().await?;
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as doclite_core;

pub mod codec;
pub mod error;
pub mod id;
pub mod ops;
pub mod persist;
pub mod query;
pub mod schema;
pub mod scheduler;
pub mod store;
pub mod transform;
pub mod update;
pub mod value;
