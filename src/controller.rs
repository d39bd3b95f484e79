//! Interactive catalog session.
//!
//! [`DocumentController`] ties the use cases to what the user sees: it loads
//! the collection, keeps the grid in sync with the repository, applies the
//! chosen sort, and turns live notifications into toasts.
//!
//! # Lifecycle
//!
//! ```text
//! initialize()
//!   ├─ load_all_documents ── err ─▶ "Failed to load documents" toast, return err
//!   ├─ "Loaded N documents" toast, render
//!   ├─ observe repository saves ─▶ re-render
//!   └─ connect stream ── err ─▶ "Real-time notifications unavailable" toast
//!        └─ ok ─▶ "Connected to real-time notifications" toast,
//!                 every notification ─▶ info toast
//! destroy()
//!   └─ release subscriptions, disconnect stream
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use doc_catalog_core::broadcast::Disposers;
use doc_catalog_core::grid::grid_rows;
use doc_catalog_core::models::Document;
use doc_catalog_core::service::{CreateDocumentInput, DocumentService, ValidationError};
use doc_catalog_core::sort::{SortBy, SortState};
use doc_catalog_core::toast::Notifier;

use crate::render::GridRenderer;
use crate::stream::NotificationStreamClient;

pub const LOAD_FAILED_TOAST: Duration = Duration::from_secs(10);
pub const STREAM_UNAVAILABLE_TOAST: Duration = Duration::from_secs(7);
pub const NOTIFICATION_TOAST: Duration = Duration::from_secs(6);

#[derive(Default)]
struct View {
    sort: SortState,
    documents: Vec<Document>,
}

impl View {
    fn render(&self, renderer: &dyn GridRenderer) {
        let sorted = self.sort.apply(&self.documents);
        renderer.render(&grid_rows(&sorted, Utc::now().timestamp_millis()), self.sort);
    }
}

pub struct DocumentController {
    service: DocumentService,
    stream: Option<Arc<NotificationStreamClient>>,
    renderer: Arc<dyn GridRenderer>,
    notifier: Notifier,
    view: Arc<Mutex<View>>,
    disposers: Disposers,
}

impl DocumentController {
    /// `stream` is `None` when live notifications are disabled.
    pub fn new(
        service: DocumentService,
        stream: Option<Arc<NotificationStreamClient>>,
        renderer: Arc<dyn GridRenderer>,
        notifier: Notifier,
    ) -> Self {
        Self {
            service,
            stream,
            renderer,
            notifier,
            view: Arc::new(Mutex::new(View::default())),
            disposers: Disposers::new(),
        }
    }

    pub fn with_sort(self, sort: SortState) -> Self {
        self.view().sort = sort;
        self
    }

    fn view(&self) -> MutexGuard<'_, View> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load, render, and start following changes.
    ///
    /// Only a failed load is an error. An unreachable notification stream
    /// degrades to a warning toast.
    pub async fn initialize(&mut self) -> Result<()> {
        let documents = match self.service.load_all_documents().await {
            Ok(documents) => documents,
            Err(e) => {
                self.notifier
                    .error("Failed to load documents", Some(LOAD_FAILED_TOAST));
                return Err(e);
            }
        };

        self.notifier
            .success(format!("Loaded {} documents", documents.len()), None);
        {
            let mut view = self.view();
            view.documents = documents;
            view.render(self.renderer.as_ref());
        }

        let view = self.view.clone();
        let renderer = self.renderer.clone();
        let subscription = self.service.observe_documents(Box::new(move |documents| {
            tracing::debug!(count = documents.len(), "documents changed, re-rendering");
            let mut view = view.lock().unwrap_or_else(PoisonError::into_inner);
            view.documents = documents;
            view.render(renderer.as_ref());
            Ok(())
        }));
        self.disposers.push(subscription);

        self.connect_stream().await;
        tracing::info!("controller initialized");
        Ok(())
    }

    async fn connect_stream(&mut self) {
        let Some(stream) = self.stream.clone() else {
            tracing::debug!("live notifications disabled");
            return;
        };

        // Subscribe first so nothing sent right after the handshake is lost.
        let notifier = self.notifier.clone();
        let subscription = stream.subscribe(move |record| {
            notifier.info(record.message(), Some(NOTIFICATION_TOAST));
            Ok(())
        });

        match stream.connect().await {
            Ok(()) => {
                self.notifier
                    .info("Connected to real-time notifications", None);
                let client = stream.clone();
                self.disposers.push_fn(move || client.disconnect());
                self.disposers.push(subscription);
            }
            Err(e) => {
                tracing::warn!("continuing without live notifications: {}", e);
                self.notifier.warning(
                    "Real-time notifications unavailable",
                    Some(STREAM_UNAVAILABLE_TOAST),
                );
            }
        }
    }

    /// Sort by `by`. Selecting the current key flips the direction.
    pub fn select_sort(&self, by: SortBy) {
        let mut view = self.view();
        view.sort.select(by);
        tracing::debug!(by = %view.sort.by, order = %view.sort.order, "sort changed");
        view.render(self.renderer.as_ref());
    }

    pub fn toggle_order(&self) {
        let mut view = self.view();
        view.sort.toggle_order();
        view.render(self.renderer.as_ref());
    }

    pub fn sort_state(&self) -> SortState {
        self.view().sort
    }

    /// The working set in display order.
    pub fn documents(&self) -> Vec<Document> {
        let view = self.view();
        view.sort.apply(&view.documents)
    }

    /// Create a document. The grid refreshes through the repository
    /// observer; the returned error (if any) has already been toasted.
    pub async fn create_document(&self, input: CreateDocumentInput) -> Result<Document> {
        match self.service.create_document(input).await {
            Ok(document) => {
                self.notifier
                    .success(format!("Document \"{}\" created", document.title), None);
                Ok(document)
            }
            Err(e) => {
                match e.downcast_ref::<ValidationError>() {
                    Some(invalid) => self.notifier.error(invalid.to_string(), None),
                    None => self.notifier.error("Failed to create document", None),
                }
                Err(e)
            }
        }
    }

    /// Release every subscription and close the stream. Safe to call twice.
    pub fn destroy(&mut self) {
        if !self.disposers.is_empty() {
            tracing::info!("tearing down controller");
        }
        self.disposers.dispose();
    }
}
