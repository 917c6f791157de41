//! HTTP search index client
//!
//! Publishes pages to an OpenSearch/Elasticsearch compatible node with
//! `PUT {address}/{index}/_doc/{id}`.

use crate::config::IndexConfig;
use crate::output::traits::{IndexError, IndexResult, SearchIndex};
use crate::storage::Page;
use crate::url::IdentityHash;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Search index reached over HTTP
pub struct HttpSearchIndex {
    client: Client,
    base: Url,
    index_name: String,
    username: Option<String>,
    password: Option<String>,
}

impl HttpSearchIndex {
    /// Builds a client for the configured index
    ///
    /// # Returns
    ///
    /// * `Ok(HttpSearchIndex)` - Client ready to publish documents
    /// * `Err(IndexError)` - The address is not a valid base URL or the HTTP client failed to build
    pub fn new(config: &IndexConfig) -> IndexResult<Self> {
        let mut base = Url::parse(&config.address)
            .map_err(|e| IndexError::Address(format!("{}: {}", config.address, e)))?;
        if base.cannot_be_a_base() {
            return Err(IndexError::Address(config.address.clone()));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base,
            index_name: config.index_name.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn document_url(&self, document_id: &IdentityHash) -> IndexResult<Url> {
        self.base
            .join(&format!("{}/_doc/{}", self.index_name, document_id))
            .map_err(|e| IndexError::Address(e.to_string()))
    }
}

#[async_trait]
impl SearchIndex for HttpSearchIndex {
    async fn upsert(&self, document_id: &IdentityHash, page: &Page) -> IndexResult<()> {
        let mut request = self.client.put(self.document_url(document_id)?).json(page);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexError::Rejected {
                id: document_id.clone(),
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!("Indexed {} as {}", page.url, document_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::identity_hash;
    use chrono::Utc;
    use wiremock::matchers::{body_partial_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_page() -> Page {
        Page {
            identity: identity_hash("https://example.com/jobs"),
            url: "https://example.com/jobs".to_string(),
            title: Some("Jobs".to_string()),
            content: "backend intern".to_string(),
            index: 2,
            keywords_found: vec!["backend".to_string(), "intern".to_string()],
            updated_at: Utc::now(),
        }
    }

    fn create_config(address: String) -> IndexConfig {
        IndexConfig {
            address,
            index_name: "pages_index".to_string(),
            username: Some("admin".to_string()),
            password: Some("secret".to_string()),
        }
    }

    #[test]
    fn test_rejects_invalid_address() {
        let result = HttpSearchIndex::new(&create_config("not a url".to_string()));
        assert!(matches!(result, Err(IndexError::Address(_))));
    }

    #[tokio::test]
    async fn test_upsert_puts_document_by_identity() {
        let server = MockServer::start().await;
        let page = create_page();

        Mock::given(method("PUT"))
            .and(path(format!("/pages_index/_doc/{}", page.identity)))
            .and(header_exists("authorization"))
            .and(body_partial_json(serde_json::json!({
                "url": "https://example.com/jobs",
                "index": 2,
                "url_hash_id": page.identity.as_str(),
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let index = HttpSearchIndex::new(&create_config(server.uri())).unwrap();
        index.upsert(&page.identity, &page).await.unwrap();
    }

    #[tokio::test]
    async fn test_upsert_reports_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(400).set_body_string("mapper_parsing_exception"))
            .mount(&server)
            .await;

        let page = create_page();
        let index = HttpSearchIndex::new(&create_config(server.uri())).unwrap();
        let err = index.upsert(&page.identity, &page).await.unwrap_err();

        match err {
            IndexError::Rejected { status, body, .. } => {
                assert_eq!(status, 400);
                assert!(body.contains("mapper_parsing_exception"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
