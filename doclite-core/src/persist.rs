//! The persistence abstraction.
//!
//! A [`Persistence`] implementation reads and writes the whole store. The
//! database reads exactly once at startup and writes on every (debounced)
//! flush; no retry policy is built in. Custom implementations can wrap
//! encryption, a network store, or anything else that can return a full
//! store on read and accept one on write.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::value::StoreData;

/// Abstract interface over "read whole store" / "write whole store".
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Reads the full store from the medium.
    ///
    /// # Errors
    ///
    /// Fails with a read error when the medium is unreachable or corrupt.
    /// The database recovers from this by falling back to an empty store
    /// and scheduling an overwrite.
    async fn read(&self) -> StoreResult<StoreData>;

    /// Writes the full store to the medium.
    ///
    /// # Errors
    ///
    /// Fails with a write error when the medium rejects the write; the
    /// caller of the triggering flush owns any retry policy.
    async fn write(&self, data: &StoreData) -> StoreResult<()>;
}

/// Ephemeral persistence: reads yield an empty store, writes are dropped.
///
/// The default when no persistence is configured; the store then lives
/// purely in memory for the lifetime of the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryPersistence;

#[async_trait]
impl Persistence for MemoryPersistence {
    async fn read(&self) -> StoreResult<StoreData> {
        Ok(StoreData::new())
    }

    async fn write(&self, _data: &StoreData) -> StoreResult<()> {
        Ok(())
    }
}
