//! Error and result types for store operations.
//!
//! All fallibility in the crate is concentrated at the create/flush/load
//! boundaries; the recursive query and update engines never fail. Use
//! [`StoreResult<T>`] as the return type for fallible operations.

use thiserror::Error;

use crate::schema::ValidationFailure;

/// Represents all possible errors that can occur when interacting with the store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The input document was rejected by the model's schema. Nothing was
    /// persisted and the in-memory store is unchanged.
    #[error("validation failed: {0}")]
    Validation(ValidationFailure),
    /// A malformed identifier was supplied to a lookup. Surfaced as an error,
    /// never silently treated as not-found.
    #[error("invalid document identifier: {0}")]
    InvalidId(String),
    /// The requested model name was not configured on the database.
    #[error("unknown model: {0}")]
    UnknownModel(String),
    /// The persistence medium was unreachable or its contents could not be
    /// decoded at load time.
    #[error("failed to read backing store: {0}")]
    ReadFailure(String),
    /// The persistence medium rejected a write. No retry is built in; the
    /// caller of the triggering flush owns the retry policy.
    #[error("failed to write backing store: {0}")]
    WriteFailure(String),
    /// Serialization/deserialization error when converting between the value
    /// tree and its JSON representation.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// The database has been disconnected; no further operations are valid.
    #[error("store is disconnected")]
    Disconnected,
}

/// A specialized `Result` type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<ValidationFailure> for StoreError {
    fn from(err: ValidationFailure) -> Self {
        StoreError::Validation(err)
    }
}
