//! Composition root.
//!
//! Wires configuration into concrete components: the repository backend
//! picked by `[storage] backend`, the HTTP source, the stream client and the
//! toast notifier. Nothing else in the crate decides which implementation
//! backs a trait.

use std::sync::Arc;

use anyhow::Result;
use doc_catalog_core::service::DocumentService;
use doc_catalog_core::store::{DocumentRepository, InMemoryRepository, SlotRepository};
use doc_catalog_core::toast::{Notifier, ToastSink};

use crate::api::HttpDocumentSource;
use crate::config::{Config, StorageConfig};
use crate::controller::DocumentController;
use crate::file_store::FileKeyValueStore;
use crate::render::GridRenderer;
use crate::stream::NotificationStreamClient;

/// Build the repository backend named in `storage.backend`.
pub fn build_repository(storage: &StorageConfig) -> Result<Arc<dyn DocumentRepository>> {
    match storage.backend.as_str() {
        "memory" => {
            tracing::debug!("using in-memory repository");
            Ok(Arc::new(InMemoryRepository::new()))
        }
        "file" => {
            let store = FileKeyValueStore::open(&storage.dir)?;
            tracing::debug!(dir = %storage.dir.display(), key = %storage.key, "using file repository");
            Ok(Arc::new(SlotRepository::new(store, storage.key.clone())))
        }
        other => anyhow::bail!(
            "Unknown storage backend: '{}'. Must be file or memory.",
            other
        ),
    }
}

pub fn build_service(config: &Config) -> Result<DocumentService> {
    let repository = build_repository(&config.storage)?;
    let source = HttpDocumentSource::new(&config.api)?;
    Ok(DocumentService::new(repository, Arc::new(source)))
}

/// WebSocket stream client, or `None` when `[stream] enabled = false`.
pub fn build_stream(config: &Config) -> Option<Arc<NotificationStreamClient>> {
    config
        .stream
        .enabled
        .then(|| Arc::new(NotificationStreamClient::websocket(&config.stream)))
}

pub fn build_notifier(config: &Config, sink: Arc<dyn ToastSink>) -> Notifier {
    Notifier::new(sink).with_default_duration(config.toasts.default_duration())
}

pub fn build_controller(
    config: &Config,
    renderer: Arc<dyn GridRenderer>,
    sink: Arc<dyn ToastSink>,
) -> Result<DocumentController> {
    Ok(DocumentController::new(
        build_service(config)?,
        build_stream(config),
        renderer,
        build_notifier(config, sink),
    ))
}
