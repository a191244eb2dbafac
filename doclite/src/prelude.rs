//! Convenient glob import for the common doclite surface.
//!
//! ```ignore
//! use doclite::prelude::*;
//! ```

pub use doclite_core::doc;
pub use doclite_core::error::{StoreError, StoreResult};
pub use doclite_core::id::DocumentId;
pub use doclite_core::ops;
pub use doclite_core::persist::{MemoryPersistence, Persistence};
pub use doclite_core::query::{FieldPredicate, Query, QueryDoc};
pub use doclite_core::schema::{Schema, Unchecked, ValidationFailure, ValidationIssue};
pub use doclite_core::store::{Collection, Database, DatabaseBuilder};
pub use doclite_core::transform::{FnTransformer, TransformerRegistry};
pub use doclite_core::update::{FieldUpdater, Update, UpdateDoc};
pub use doclite_core::value::{Blob, Document, Opaque, Value, ValueMap, ValueSet};
