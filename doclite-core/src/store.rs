//! The database: model registry, readiness lifecycle, debounced flushing,
//! and per-model collection handles.
//!
//! A [`Database`] owns the in-memory store, the persistence layer, and the
//! save scheduler. It is constructed through [`DatabaseBuilder`]; the
//! initial load runs as an async task kicked off at construction, and every
//! per-model operation waits on the readiness signal before touching the
//! store, so no write can race (and be lost to) the initial load.
//!
//! Mutating operations run against the in-memory store and then request a
//! debounced write-back: re-requesting within the debounce window cancels
//! the previous timer, so a burst of mutations produces exactly one flush.
//!
//! # Example
//!
//! ```ignore
//! use doclite_core::{doc, ops, store::Database, schema::Unchecked};
//! use doclite_core::query::{Query, QueryDoc};
//!
//! let db = Database::builder().model("user", Unchecked).build();
//! let users = db.collection("user")?;
//!
//! let john = users.create(doc! { "name" => "John", "age" => 20 }).await?;
//! let adults = users
//!     .find_many(&QueryDoc::new().filter("age", ops::gt(18.0)).into())
//!     .await?;
//! db.disconnect().await?;
//! ```
//!
//! Concurrent external writers on the same backing medium are not
//! coordinated; sharing one backing file between processes can lose data.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use mea::latch::Latch;
use mea::mutex::Mutex;
use mea::rwlock::RwLock;

use crate::codec::ID_FIELD;
use crate::error::{StoreError, StoreResult};
use crate::id::DocumentId;
use crate::persist::{MemoryPersistence, Persistence};
use crate::query::{Query, matches};
use crate::schema::Schema;
use crate::scheduler::{Scheduler, TimerHandle, TokioScheduler};
use crate::update::{Update, apply};
use crate::value::{CollectionData, Document, StoreData, Value};

/// Default debounce window between a mutation and its write-back.
pub const DEFAULT_SAVE_INTERVAL: Duration = Duration::from_secs(60);

/// Builder for [`Database`] instances.
pub struct DatabaseBuilder {
    models: BTreeMap<String, Arc<dyn Schema>>,
    persistence: Box<dyn Persistence>,
    scheduler: Box<dyn Scheduler>,
    save_interval: Duration,
}

impl DatabaseBuilder {
    fn new() -> Self {
        Self {
            models: BTreeMap::new(),
            persistence: Box::new(MemoryPersistence),
            scheduler: Box::new(TokioScheduler),
            save_interval: DEFAULT_SAVE_INTERVAL,
        }
    }

    /// Registers a model under `name` with its schema.
    pub fn model(mut self, name: impl Into<String>, schema: impl Schema + 'static) -> Self {
        self.models.insert(name.into(), Arc::new(schema));
        self
    }

    /// Sets the persistence layer. Defaults to [`MemoryPersistence`].
    pub fn persistence(mut self, persistence: impl Persistence + 'static) -> Self {
        self.persistence = Box::new(persistence);
        self
    }

    /// Sets the scheduler. Defaults to [`TokioScheduler`].
    pub fn scheduler(mut self, scheduler: impl Scheduler + 'static) -> Self {
        self.scheduler = Box::new(scheduler);
        self
    }

    /// Sets the debounce window for write-backs.
    pub fn save_interval(mut self, interval: Duration) -> Self {
        self.save_interval = interval;
        self
    }

    /// Builds the database and kicks off the initial load.
    ///
    /// With the default scheduler this must be called from within a tokio
    /// runtime, since the load runs as a spawned task.
    pub fn build(self) -> Database {
        let inner = Arc::new(DatabaseInner {
            models: self.models,
            data: RwLock::new(StoreData::new()),
            persistence: self.persistence,
            scheduler: self.scheduler,
            save_interval: self.save_interval,
            pending_flush: Mutex::new(None),
            ready: Latch::new(1),
            closed: AtomicBool::new(false),
        });

        let handles = inner
            .models
            .keys()
            .map(|name| {
                let collection = Collection {
                    name: name.clone(),
                    schema: Arc::clone(&inner.models[name]),
                    inner: Arc::clone(&inner),
                };
                (name.clone(), collection)
            })
            .collect();

        let init = Arc::clone(&inner);
        inner.scheduler.spawn(Box::pin(async move { init.init().await }));

        Database { inner, handles: Arc::new(handles) }
    }
}

/// An embedded document database.
///
/// Cheap to clone; clones share the same underlying store.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    handles: Arc<BTreeMap<String, Collection>>,
}

impl Database {
    /// Creates a builder with an empty model set, in-memory persistence,
    /// and the default scheduler.
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// Resolves once the initial load (or initialization of an empty store)
    /// has completed. Operations await this internally; calling it directly
    /// is only needed to sequence application startup.
    pub async fn ready(&self) {
        self.inner.ready.wait().await;
    }

    /// Returns the handle for a model's collection.
    ///
    /// Handles come from a lookup table built at construction, so repeated
    /// access returns the same handle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownModel`] for names that were not
    /// registered on the builder.
    pub fn collection(&self, name: &str) -> StoreResult<Collection> {
        self.handles
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownModel(name.to_string()))
    }

    /// Schedules a debounced write-back of the current store.
    ///
    /// Mutating operations call this automatically; it is public for
    /// callers that mutate documents through their own means. Requesting
    /// again within the debounce window restarts the timer, so only the
    /// most recent request's deadline matters.
    pub async fn request_flush(&self) -> StoreResult<()> {
        self.inner.ensure_open()?;
        self.inner.ready.wait().await;
        Arc::clone(&self.inner).request_flush().await;
        Ok(())
    }

    /// Persists the current in-memory store right now, cancelling any
    /// pending debounced flush.
    ///
    /// # Errors
    ///
    /// Surfaces the persistence layer's write error, if any.
    pub async fn flush_now(&self) -> StoreResult<()> {
        self.inner.ensure_open()?;
        self.inner.ready.wait().await;
        self.inner.flush().await
    }

    /// Cancels any pending flush, performs a final write-back, and marks
    /// the database closed. Further operations fail fast with
    /// [`StoreError::Disconnected`].
    pub async fn disconnect(&self) -> StoreResult<()> {
        self.inner.ensure_open()?;
        self.inner.ready.wait().await;
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.flush().await
    }
}

struct DatabaseInner {
    models: BTreeMap<String, Arc<dyn Schema>>,
    data: RwLock<StoreData>,
    persistence: Box<dyn Persistence>,
    scheduler: Box<dyn Scheduler>,
    save_interval: Duration,
    pending_flush: Mutex<Option<Box<dyn TimerHandle>>>,
    ready: Latch,
    closed: AtomicBool,
}

impl DatabaseInner {
    /// One-shot initial load. On a read failure the database stays usable:
    /// it falls back to an empty store and schedules an overwrite of the
    /// unreadable data.
    async fn init(self: Arc<Self>) {
        let mut needs_flush = false;

        let mut data = match self.persistence.read().await {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "backing store unreadable, falling back to an empty store"
                );
                needs_flush = true;
                StoreData::new()
            }
        };

        for model in self.models.keys() {
            if !data.contains_key(model) {
                data.insert(model.clone(), CollectionData::new());
                needs_flush = true;
            }
        }

        *self.data.write().await = data;
        if needs_flush {
            Arc::clone(&self).request_flush().await;
        }
        self.ready.count_down();
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Disconnected);
        }
        Ok(())
    }

    /// Schedules a debounced write-back. The pending-timer slot is the only
    /// shared resource needing cancellation discipline: the old timer is
    /// cancelled under the same lock that installs the new one.
    async fn request_flush(self: Arc<Self>) {
        let task_inner = Arc::clone(&self);
        let mut slot = self.pending_flush.lock().await;
        if let Some(previous) = slot.take() {
            previous.cancel();
        }
        *slot = Some(self.scheduler.after(
            self.save_interval,
            Box::pin(async move {
                if let Err(err) = task_inner.flush().await {
                    tracing::error!(error = %err, "debounced flush failed");
                }
            }),
        ));
    }

    async fn flush(&self) -> StoreResult<()> {
        if let Some(pending) = self.pending_flush.lock().await.take() {
            pending.cancel();
        }
        let data = self.data.read().await;
        self.persistence.write(&data).await?;
        tracing::debug!("store flushed");
        Ok(())
    }
}

/// Handle to one model's collection.
///
/// All operations are asynchronous, wait on the database's readiness
/// signal, and fail fast once the database has been disconnected.
#[derive(Clone)]
pub struct Collection {
    name: String,
    schema: Arc<dyn Schema>,
    inner: Arc<DatabaseInner>,
}

impl Collection {
    /// The model name this collection stores.
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn guard(&self) -> StoreResult<()> {
        self.inner.ensure_open()?;
        self.inner.ready.wait().await;
        Ok(())
    }

    /// Validates and inserts a new document, returning the stored document
    /// with its assigned identifier in the `_id` field.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when the schema rejects the
    /// input; nothing is stored in that case.
    pub async fn create(&self, input: Document) -> StoreResult<Document> {
        self.guard().await?;

        let normalized = self.schema.normalize(input)?;
        let id = DocumentId::new();

        {
            let mut data = self.inner.data.write().await;
            data.entry(self.name.clone())
                .or_default()
                .insert(id.to_string(), normalized.clone());
        }
        Arc::clone(&self.inner).request_flush().await;

        Ok(attach_id(normalized, &id.to_string()))
    }

    /// Finds a document by its identifier.
    pub async fn find_by_id(&self, id: &DocumentId) -> StoreResult<Option<Document>> {
        self.guard().await?;

        let key = id.to_string();
        let data = self.inner.data.read().await;
        Ok(data
            .get(&self.name)
            .and_then(|collection| collection.get(&key))
            .map(|document| attach_id(document.clone(), &key)))
    }

    /// Finds the first document matching a query.
    pub async fn find(&self, query: &Query) -> StoreResult<Option<Document>> {
        self.guard().await?;

        let data = self.inner.data.read().await;
        Ok(data.get(&self.name).and_then(|collection| {
            collection
                .iter()
                .find(|(_, document)| matches(document, query))
                .map(|(key, document)| attach_id(document.clone(), key))
        }))
    }

    /// Finds every document matching a query. The empty query returns the
    /// whole collection.
    pub async fn find_many(&self, query: &Query) -> StoreResult<Vec<Document>> {
        self.guard().await?;

        let data = self.inner.data.read().await;
        Ok(data
            .get(&self.name)
            .map(|collection| {
                collection
                    .iter()
                    .filter(|(_, document)| matches(document, query))
                    .map(|(key, document)| attach_id(document.clone(), key))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Applies an update to the document with the given identifier.
    ///
    /// Returns the post-mutation document, or `None` when the identifier
    /// matches nothing (in which case no flush is requested).
    pub async fn update_by_id(&self, id: &DocumentId, update: &Update) -> StoreResult<Option<Document>> {
        self.guard().await?;

        let key = id.to_string();
        let updated = {
            let mut data = self.inner.data.write().await;
            data.get_mut(&self.name)
                .and_then(|collection| collection.get_mut(&key))
                .map(|document| {
                    apply(document, update);
                    attach_id(document.clone(), &key)
                })
        };

        if updated.is_some() {
            Arc::clone(&self.inner).request_flush().await;
        }
        Ok(updated)
    }

    /// Applies an update to the first document matching a query.
    pub async fn update(&self, query: &Query, update: &Update) -> StoreResult<Option<Document>> {
        self.guard().await?;

        let updated = {
            let mut data = self.inner.data.write().await;
            data.get_mut(&self.name).and_then(|collection| {
                collection
                    .iter_mut()
                    .find(|(_, document)| matches(document, query))
                    .map(|(key, document)| {
                        apply(document, update);
                        attach_id(document.clone(), key)
                    })
            })
        };

        if updated.is_some() {
            Arc::clone(&self.inner).request_flush().await;
        }
        Ok(updated)
    }

    /// Applies an update to every document matching a query, returning the
    /// post-mutation documents.
    pub async fn update_many(&self, query: &Query, update: &Update) -> StoreResult<Vec<Document>> {
        self.guard().await?;

        let updated: Vec<Document> = {
            let mut data = self.inner.data.write().await;
            data.get_mut(&self.name)
                .map(|collection| {
                    collection
                        .iter_mut()
                        .filter(|(_, document)| matches(document, query))
                        .map(|(key, document)| {
                            apply(document, update);
                            attach_id(document.clone(), key)
                        })
                        .collect()
                })
                .unwrap_or_default()
        };

        if !updated.is_empty() {
            Arc::clone(&self.inner).request_flush().await;
        }
        Ok(updated)
    }

    /// Deletes the document with the given identifier.
    ///
    /// Returns true when a document was removed; a second call with the
    /// same identifier returns false.
    pub async fn delete_by_id(&self, id: &DocumentId) -> StoreResult<bool> {
        self.guard().await?;

        let key = id.to_string();
        let removed = {
            let mut data = self.inner.data.write().await;
            data.get_mut(&self.name)
                .is_some_and(|collection| collection.remove(&key).is_some())
        };

        if removed {
            Arc::clone(&self.inner).request_flush().await;
        }
        Ok(removed)
    }

    /// Deletes the first document matching a query.
    pub async fn delete(&self, query: &Query) -> StoreResult<bool> {
        self.guard().await?;

        let removed = {
            let mut data = self.inner.data.write().await;
            data.get_mut(&self.name).is_some_and(|collection| {
                let key = collection
                    .iter()
                    .find(|(_, document)| matches(document, query))
                    .map(|(key, _)| key.clone());
                match key {
                    Some(key) => collection.remove(&key).is_some(),
                    None => false,
                }
            })
        };

        if removed {
            Arc::clone(&self.inner).request_flush().await;
        }
        Ok(removed)
    }

    /// Deletes every document matching a query, returning how many were
    /// removed. The empty query clears the collection.
    pub async fn delete_many(&self, query: &Query) -> StoreResult<usize> {
        self.guard().await?;

        let removed = {
            let mut data = self.inner.data.write().await;
            data.get_mut(&self.name)
                .map(|collection| {
                    let keys: Vec<String> = collection
                        .iter()
                        .filter(|(_, document)| matches(document, query))
                        .map(|(key, _)| key.clone())
                        .collect();
                    for key in &keys {
                        collection.remove(key);
                    }
                    keys.len()
                })
                .unwrap_or(0)
        };

        if removed > 0 {
            Arc::clone(&self.inner).request_flush().await;
        }
        Ok(removed)
    }
}

/// Synthesizes the `_id` field onto a document leaving the stored copy
/// untouched. Keys that predate this store (hand-edited files) fall back to
/// plain strings rather than failing the read.
fn attach_id(mut document: Document, key: &str) -> Document {
    let id = DocumentId::parse(key)
        .map(Value::Id)
        .unwrap_or_else(|_| Value::String(key.to_string()));
    document.insert(ID_FIELD.to_string(), id);
    document
}
