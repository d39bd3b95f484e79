//! HTTP bulk-load client.
//!
//! [`HttpDocumentSource`] implements [`DocumentSource`] over
//! `GET {api.base_url}/documents`, which returns a JSON array of
//! [`DocumentRaw`] records.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use doc_catalog_core::models::DocumentRaw;
use doc_catalog_core::service::DocumentSource;

use crate::config::ApiConfig;

/// Fetches the document collection from the catalog API.
pub struct HttpDocumentSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDocumentSource {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn documents_url(&self) -> String {
        format!("{}/documents", self.base_url)
    }
}

#[async_trait]
impl DocumentSource for HttpDocumentSource {
    async fn fetch_documents(&self) -> Result<Vec<DocumentRaw>> {
        let url = self.documents_url();
        tracing::debug!(%url, "fetching documents");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Network error while fetching {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Catalog API error {}: {}", status, body);
        }

        let documents: Vec<DocumentRaw> = response
            .json()
            .await
            .context("Invalid documents response")?;
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_url_trims_trailing_slash() {
        let source = HttpDocumentSource::new(&ApiConfig {
            base_url: "http://localhost:8080/".to_string(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(source.documents_url(), "http://localhost:8080/documents");
    }

    #[tokio::test]
    async fn test_unreachable_server_errors() {
        let source = HttpDocumentSource::new(&ApiConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 2,
        })
        .unwrap();
        let err = source.fetch_documents().await.unwrap_err();
        assert!(err.to_string().contains("Network error"));
    }
}
