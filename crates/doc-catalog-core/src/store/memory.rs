//! In-memory [`DocumentRepository`] implementation.
//!
//! Holds the collection in a `Vec` behind `std::sync::RwLock`. Used by tests
//! and by the `memory` storage backend.
//!
//! Writers additionally take `writes`, held across the store and the
//! publish, so readers (including listeners) are never blocked by delivery.

use std::sync::{Mutex, PoisonError, RwLock};

use anyhow::Result;
use async_trait::async_trait;

use crate::broadcast::{Broadcaster, Subscription};
use crate::models::Document;

use super::{DocumentRepository, DocumentsListener, DocumentsUpdate};

/// In-memory repository. Nothing survives the process.
pub struct InMemoryRepository {
    documents: RwLock<Vec<Document>>,
    writes: Mutex<()>,
    changes: Broadcaster<Document>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::with_documents(Vec::new())
    }

    /// Start with an initial collection. No subscriber is notified.
    pub fn with_documents(documents: Vec<Document>) -> Self {
        Self {
            documents: RwLock::new(documents),
            writes: Mutex::new(()),
            changes: Broadcaster::new("repository.memory"),
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentRepository for InMemoryRepository {
    async fn get_all(&self) -> Result<Vec<Document>> {
        Ok(self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn update(&self, update: DocumentsUpdate) -> Result<Vec<Document>> {
        let _gate = self.writes.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let next = update(current);
        *self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner) = next.clone();
        tracing::debug!(count = next.len(), "saved documents in memory");
        self.changes.publish(&next);
        Ok(next)
    }

    fn subscribe(&self, listener: DocumentsListener) -> Subscription {
        self.changes.subscribe(listener)
    }
}
