//! Application use cases.
//!
//! [`DocumentService`] coordinates a [`DocumentSource`] (where documents come
//! from) with a [`DocumentRepository`] (who owns them now). Callers never see
//! wire records or persistence details.
//!
//! # Use cases
//!
//! | Method | Flow |
//! |--------|------|
//! | [`load_all_documents`](DocumentService::load_all_documents) | fetch → map → drop invalid → save → return |
//! | [`create_document`](DocumentService::create_document) | validate input → build → append → save |
//! | [`get_all_documents`](DocumentService::get_all_documents) | read the repository |
//! | [`observe_documents`](DocumentService::observe_documents) | subscribe to saves |

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::broadcast::Subscription;
use crate::models::{self, validate_document, Attachment, Contributor, Document, DocumentRaw};
use crate::sort::{sort_documents, SortBy, SortOrder};
use crate::store::{DocumentRepository, DocumentsListener};

/// Remote origin of the document collection.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch_documents(&self) -> Result<Vec<DocumentRaw>>;
}

/// Input of the create-document use case, as typed by the user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateDocumentInput {
    pub title: String,
    pub version: String,
    #[serde(default)]
    pub contributors: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// Rejected create-document input. Reported to the user as is, never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Title is required")]
    TitleRequired,
    #[error("Version is required")]
    VersionRequired,
    #[error("At least one contributor is required")]
    ContributorRequired,
    #[error("Contributor names cannot be empty")]
    EmptyContributorName,
    #[error("Attachment names cannot be empty")]
    EmptyAttachmentName,
}

impl CreateDocumentInput {
    /// Check the input, reporting the first rule it breaks.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::TitleRequired);
        }
        if self.version.trim().is_empty() {
            return Err(ValidationError::VersionRequired);
        }
        if self.contributors.is_empty() {
            return Err(ValidationError::ContributorRequired);
        }
        if self.contributors.iter().any(|c| c.trim().is_empty()) {
            return Err(ValidationError::EmptyContributorName);
        }
        if self.attachments.iter().any(|a| a.trim().is_empty()) {
            return Err(ValidationError::EmptyAttachmentName);
        }
        Ok(())
    }

    /// Build the document: trimmed fields, fresh ids, current timestamp.
    fn into_document(self) -> Document {
        Document {
            id: generate_id(),
            title: self.title.trim().to_string(),
            version: self.version.trim().to_string(),
            contributors: self
                .contributors
                .iter()
                .map(|name| Contributor {
                    id: generate_id(),
                    name: name.trim().to_string(),
                })
                .collect(),
            attachments: self
                .attachments
                .iter()
                .map(|name| Attachment {
                    name: name.trim().to_string(),
                })
                .collect(),
            created_at: models::now_iso(),
        }
    }
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Application service over a repository and a remote source.
#[derive(Clone)]
pub struct DocumentService {
    repository: Arc<dyn DocumentRepository>,
    source: Arc<dyn DocumentSource>,
}

impl DocumentService {
    pub fn new(repository: Arc<dyn DocumentRepository>, source: Arc<dyn DocumentSource>) -> Self {
        Self { repository, source }
    }

    /// Fetch the full collection from the source and make it the working set.
    ///
    /// Records missing an id, title, or version are dropped with a warning.
    /// Any failure (network, decoding, persistence) is reported as
    /// `"Failed to load documents"` with the cause attached.
    pub async fn load_all_documents(&self) -> Result<Vec<Document>> {
        match self.fetch_and_store().await {
            Ok(documents) => {
                tracing::info!(count = documents.len(), "loaded documents");
                Ok(documents)
            }
            Err(e) => {
                tracing::error!("error loading documents: {:#}", e);
                Err(e.context("Failed to load documents"))
            }
        }
    }

    async fn fetch_and_store(&self) -> Result<Vec<Document>> {
        let raw = self.source.fetch_documents().await?;
        let documents: Vec<Document> = models::to_domain(raw)
            .into_iter()
            .filter(|doc| {
                let errors = validate_document(doc);
                if !errors.is_empty() {
                    tracing::warn!(id = %doc.id, "skipping invalid document: {}", errors.join(", "));
                }
                errors.is_empty()
            })
            .collect();
        self.repository.save(documents.clone()).await?;
        Ok(documents)
    }

    pub async fn get_all_documents(&self) -> Result<Vec<Document>> {
        self.repository.get_all().await
    }

    /// Validate `input`, build a new document, and append it to the
    /// collection. Saving notifies every repository observer.
    ///
    /// The append runs as one repository update, so creations racing each
    /// other all land.
    ///
    /// Validation failures are returned as a [`ValidationError`] inside the
    /// `anyhow::Error`; use `downcast_ref` to tell them apart from storage
    /// failures.
    pub async fn create_document(&self, input: CreateDocumentInput) -> Result<Document> {
        input.validate()?;
        let document = input.into_document();

        let created = document.clone();
        self.repository
            .update(Box::new(move |mut all: Vec<Document>| {
                all.push(created);
                all
            }))
            .await?;

        tracing::info!(id = %document.id, title = %document.title, "document created");
        Ok(document)
    }

    pub fn sort_documents(&self, documents: &[Document], by: SortBy, order: SortOrder) -> Vec<Document> {
        sort_documents(documents, by, order)
    }

    pub fn observe_documents(&self, listener: DocumentsListener) -> Subscription {
        self.repository.subscribe(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContributorRaw;
    use crate::store::InMemoryRepository;
    use chrono::DateTime;
    use std::sync::Mutex;

    struct FixedSource(Vec<DocumentRaw>);

    #[async_trait]
    impl DocumentSource for FixedSource {
        async fn fetch_documents(&self) -> Result<Vec<DocumentRaw>> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl DocumentSource for FailingSource {
        async fn fetch_documents(&self) -> Result<Vec<DocumentRaw>> {
            anyhow::bail!("connection refused")
        }
    }

    fn raw(id: &str, title: &str) -> DocumentRaw {
        DocumentRaw {
            id: id.to_string(),
            title: title.to_string(),
            version: "1.0".to_string(),
            contributors: vec![ContributorRaw {
                id: "c".to_string(),
                name: "Alice".to_string(),
            }],
            attachments: vec!["file.pdf".to_string()],
            created_at: "2023-01-01".to_string(),
            updated_at: "2023-01-02".to_string(),
        }
    }

    fn service_with(source: impl DocumentSource + 'static) -> (DocumentService, Arc<InMemoryRepository>) {
        let repo = Arc::new(InMemoryRepository::new());
        (DocumentService::new(repo.clone(), Arc::new(source)), repo)
    }

    fn input(title: &str, version: &str, contributors: &[&str]) -> CreateDocumentInput {
        CreateDocumentInput {
            title: title.to_string(),
            version: version.to_string(),
            contributors: contributors.iter().map(|s| s.to_string()).collect(),
            attachments: vec![],
        }
    }

    #[tokio::test]
    async fn test_load_drops_invalid_and_saves() {
        let (service, repo) = service_with(FixedSource(vec![raw("1", "Doc 1"), raw("2", "")]));

        let documents = service.load_all_documents().await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].title, "Doc 1");
        assert_eq!(repo.get_all().await.unwrap(), documents);
    }

    #[tokio::test]
    async fn test_load_failure_is_generic() {
        let (service, _repo) = service_with(FailingSource);
        let err = service.load_all_documents().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to load documents");
        assert!(format!("{:#}", err).contains("connection refused"));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_title() {
        let (service, repo) = service_with(FixedSource(vec![]));
        let err = service
            .create_document(input("", "1.0", &["A"]))
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::TitleRequired)
        );
        assert_eq!(err.to_string(), "Title is required");
        assert!(repo.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_accepts_minimal_input() {
        let (service, repo) = service_with(FixedSource(vec![]));
        let doc = service
            .create_document(input("T", "1.0", &["A"]))
            .await
            .unwrap();

        assert!(!doc.id.is_empty());
        assert!(DateTime::parse_from_rfc3339(&doc.created_at).is_ok());
        assert_eq!(doc.contributors[0].name, "A");
        assert!(!doc.contributors[0].id.is_empty());
        assert_eq!(repo.get_all().await.unwrap(), vec![doc]);
    }

    #[tokio::test]
    async fn test_create_appends_and_notifies() {
        let (service, _repo) = service_with(FixedSource(vec![raw("1", "Existing")]));
        service.load_all_documents().await.unwrap();

        let counts = Arc::new(Mutex::new(Vec::new()));
        let sink = counts.clone();
        let _sub = service.observe_documents(Box::new(move |docs| {
            sink.lock().unwrap().push(docs.len());
            Ok(())
        }));

        let doc = service
            .create_document(CreateDocumentInput {
                title: "  Spaced  ".into(),
                version: " 2.0 ".into(),
                contributors: vec![" Bob ".into()],
                attachments: vec![" notes.txt ".into()],
            })
            .await
            .unwrap();

        assert_eq!(doc.title, "Spaced");
        assert_eq!(doc.version, "2.0");
        assert_eq!(doc.contributors[0].name, "Bob");
        assert_eq!(doc.attachments[0].name, "notes.txt");
        assert_eq!(*counts.lock().unwrap(), vec![2]);
        assert_eq!(service.get_all_documents().await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_all_land() {
        let (service, repo) = service_with(FixedSource(vec![]));

        let tasks: Vec<_> = (0..10)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .create_document(input(&format!("Doc {}", i), "1.0", &["A"]))
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let mut titles: Vec<String> = repo
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.title)
            .collect();
        titles.sort();
        assert_eq!(titles.len(), 10);
        titles.dedup();
        assert_eq!(titles.len(), 10);
    }

    #[test]
    fn test_validation_rules() {
        assert_eq!(input("T", " ", &["A"]).validate(), Err(ValidationError::VersionRequired));
        assert_eq!(input("T", "1", &[]).validate(), Err(ValidationError::ContributorRequired));
        assert_eq!(
            input("T", "1", &["A", "  "]).validate(),
            Err(ValidationError::EmptyContributorName)
        );
        let mut with_blank_attachment = input("T", "1", &["A"]);
        with_blank_attachment.attachments = vec!["".into()];
        assert_eq!(
            with_blank_attachment.validate(),
            Err(ValidationError::EmptyAttachmentName)
        );
        assert_eq!(input("T", "1", &["A"]).validate(), Ok(()));
    }
}
