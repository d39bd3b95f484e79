//! Storage abstraction for Doc Catalog.
//!
//! The [`DocumentRepository`] trait is the single owner of the canonical
//! document collection. Backends are pluggable and chosen once, when the
//! application is composed:
//!
//! | Backend | Persistence |
//! |---------|-------------|
//! | [`memory::InMemoryRepository`] | none, process lifetime only |
//! | [`slot::SlotRepository`] | one JSON slot in a [`KeyValueStore`] |
//!
//! Every backend replaces the whole collection on [`save`](DocumentRepository::save)
//! and then publishes the new collection to its subscribers. There is no
//! partial update or delete.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;
pub mod slot;

use anyhow::Result;
use async_trait::async_trait;

use crate::broadcast::Subscription;
use crate::models::Document;

pub use memory::InMemoryRepository;
pub use slot::{KeyValueStore, MemoryKeyValueStore, SlotRepository};

/// Listener invoked with a fresh copy of the collection after every save.
pub type DocumentsListener = Box<dyn Fn(Vec<Document>) -> Result<()> + Send + Sync>;

/// Turns the current collection into the next one. See
/// [`DocumentRepository::update`].
pub type DocumentsUpdate = Box<dyn FnOnce(Vec<Document>) -> Vec<Document> + Send>;

/// Abstract owner of the document collection.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get_all`](DocumentRepository::get_all) | Copy of the current collection |
/// | [`save`](DocumentRepository::save) | Replace the collection and notify subscribers |
/// | [`update`](DocumentRepository::update) | Read, modify, write and notify as one step |
/// | [`subscribe`](DocumentRepository::subscribe) | Observe every subsequent save |
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Return a copy of the current collection. Callers may mutate it freely.
    async fn get_all(&self) -> Result<Vec<Document>>;

    /// Replace the collection wholesale, then publish it to subscribers.
    ///
    /// Documents are stored as given; no validation happens here.
    async fn save(&self, documents: Vec<Document>) -> Result<()> {
        self.update(Box::new(move |_| documents)).await.map(|_| ())
    }

    /// Apply `update` to the current collection, store the result and
    /// publish it, all under the repository's write gate.
    ///
    /// Writes are serialized: concurrent callers never lose each other's
    /// changes, and subscribers see the collections in the order they were
    /// stored. Listeners must not write to the repository that notifies them.
    async fn update(&self, update: DocumentsUpdate) -> Result<Vec<Document>>;

    /// Register a listener for collection changes.
    fn subscribe(&self, listener: DocumentsListener) -> Subscription;
}
