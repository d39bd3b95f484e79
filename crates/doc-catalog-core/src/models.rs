//! Core data models used throughout Doc Catalog.
//!
//! [`Document`] is the catalog entity held by the repository and handed to
//! views. [`DocumentRaw`] is the shape the HTTP API speaks; the mapper
//! functions convert between the two so that API changes stay contained here.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A catalog document.
///
/// Serialized with camelCase keys; this is the format of the local
/// persistence slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    /// Dot-separated numeric version, e.g. `"2.1.0"`.
    pub version: String,
    #[serde(default)]
    pub contributors: Vec<Contributor>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
}

/// Someone who contributed to a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub id: String,
    pub name: String,
}

/// A named attachment. Only the label is modeled, never the content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
}

/// Document record as returned by `GET /documents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRaw {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Version", default)]
    pub version: String,
    #[serde(rename = "Contributors", default)]
    pub contributors: Vec<ContributorRaw>,
    #[serde(rename = "Attachments", default)]
    pub attachments: Vec<String>,
    #[serde(rename = "CreatedAt", default)]
    pub created_at: String,
    #[serde(rename = "UpdatedAt", default)]
    pub updated_at: String,
}

/// Contributor record as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorRaw {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
}

impl From<DocumentRaw> for Document {
    fn from(raw: DocumentRaw) -> Self {
        Document {
            id: raw.id,
            title: raw.title,
            version: raw.version,
            contributors: raw
                .contributors
                .into_iter()
                .map(|c| Contributor {
                    id: c.id,
                    name: c.name,
                })
                .collect(),
            attachments: raw
                .attachments
                .into_iter()
                .map(|name| Attachment { name })
                .collect(),
            created_at: raw.created_at,
        }
    }
}

impl Document {
    /// Convert back to the API record, stamping `UpdatedAt` with the current time.
    pub fn to_raw(&self) -> DocumentRaw {
        DocumentRaw {
            id: self.id.clone(),
            title: self.title.clone(),
            version: self.version.clone(),
            contributors: self
                .contributors
                .iter()
                .map(|c| ContributorRaw {
                    id: c.id.clone(),
                    name: c.name.clone(),
                })
                .collect(),
            attachments: self.attachments.iter().map(|a| a.name.clone()).collect(),
            created_at: self.created_at.clone(),
            updated_at: now_iso(),
        }
    }

    /// Contributor display names joined with `", "`.
    pub fn contributor_names(&self) -> String {
        self.contributors
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Map a batch of API records into documents, preserving order.
pub fn to_domain(raw: Vec<DocumentRaw>) -> Vec<Document> {
    raw.into_iter().map(Document::from).collect()
}

/// Current UTC time in the same shape as JavaScript's `toISOString()`.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Check the invariants every stored document must satisfy.
///
/// Returns one message per violated rule; an empty vector means valid.
/// Contributors are deliberately not checked here: only newly created
/// documents must carry one.
pub fn validate_document(doc: &Document) -> Vec<String> {
    let mut errors = Vec::new();
    if doc.id.trim().is_empty() {
        errors.push("Document ID is required".to_string());
    }
    if doc.title.trim().is_empty() {
        errors.push("Document title is required".to_string());
    }
    if doc.version.trim().is_empty() {
        errors.push("Document version is required".to_string());
    }
    errors
}
