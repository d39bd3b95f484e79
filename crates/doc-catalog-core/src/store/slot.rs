//! Key/value slot persistence.
//!
//! [`SlotRepository`] keeps the whole collection as one JSON string under a
//! single key of a [`KeyValueStore`]. Reads are forgiving: a missing slot,
//! a slot that no longer parses, or a store that fails to read all yield an
//! empty collection and a warning. Writes are not: a failed write is
//! returned to the caller and nothing is published.
//!
//! Writes are serialized by a gate held from the read of the slot through
//! the publish.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::broadcast::{Broadcaster, Subscription};
use crate::models::Document;

use super::{DocumentRepository, DocumentsListener, DocumentsUpdate};

/// String-keyed persistence provider.
///
/// Operations are synchronous; a write has completed when `set` returns.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local [`KeyValueStore`].
#[derive(Default)]
pub struct MemoryKeyValueStore {
    slots: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.remove(key);
        Ok(())
    }
}

/// Repository persisted as a single JSON slot.
pub struct SlotRepository<S> {
    store: S,
    key: String,
    writes: Mutex<()>,
    changes: Broadcaster<Document>,
}

impl<S: KeyValueStore> SlotRepository<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            writes: Mutex::new(()),
            changes: Broadcaster::new("repository.slot"),
        }
    }

    fn read_slot(&self) -> Vec<Document> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(key = %self.key, "failed to read document slot: {:#}", e);
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(documents) => documents,
            Err(e) => {
                tracing::warn!(key = %self.key, "ignoring corrupt document slot: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl<S: KeyValueStore> DocumentRepository for SlotRepository<S> {
    async fn get_all(&self) -> Result<Vec<Document>> {
        Ok(self.read_slot())
    }

    async fn update(&self, update: DocumentsUpdate) -> Result<Vec<Document>> {
        let _gate = self.writes.lock().unwrap_or_else(PoisonError::into_inner);
        let documents = update(self.read_slot());
        let json = serde_json::to_string(&documents).context("failed to save documents")?;
        self.store
            .set(&self.key, &json)
            .context("failed to save documents")?;
        tracing::debug!(key = %self.key, count = documents.len(), "saved documents to slot");
        self.changes.publish(&documents);
        Ok(documents)
    }

    fn subscribe(&self, listener: DocumentsListener) -> Subscription {
        self.changes.subscribe(listener)
    }
}
