
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{Collection, SearchHit, WikiApi, WikiDocument};
use crate::config::WikiConfig;
use crate::http;
use crate::{AskError, Result};

const USER_AGENT: &str = "outline-ask/0.1.0";

/// Client for the Outline RPC-style API (`POST /api/<resource>.<method>`)
#[derive(Debug, Clone)]
pub struct OutlineClient {
    api_url: Url,
    base_url: Url,
    api_key: String,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: Option<T>,
}

impl OutlineClient {
    #[inline]
    pub fn new(config: &WikiConfig, api_key: impl Into<String>) -> Result<Self> {
        config.validate()?;

        let api_url = config.api_url()?;
        // `<base>/api/` always has a parent, so this keeps any path prefix
        let base_url = api_url
            .join("../")
            .map_err(|e| AskError::Config(format!("Failed to derive Outline base URL: {}", e)))?;

        Ok(Self {
            api_url,
            base_url,
            api_key: api_key.into(),
            agent: http::build_agent(Duration::from_secs(config.timeout_seconds), USER_AGENT),
        })
    }

    /// POST `body` to `<api>/<method>` and unwrap the `data` field of the reply
    async fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> Result<Option<T>> {
        let url = self
            .api_url
            .join(method)
            .map_err(|e| AskError::Config(format!("Failed to build Outline URL: {}", e)))?;

        debug!("Calling Outline {}", method);
        let response = http::post_json(
            &self.agent,
            url,
            vec![("Authorization", format!("Bearer {}", self.api_key))],
            body.to_string(),
        )
        .await?;

        if !response.is_success() {
            return Err(AskError::WikiApi {
                status: response.status,
                body: response.body,
            });
        }

        let envelope: DataEnvelope<T> = serde_json::from_str(&response.body)?;
        Ok(envelope.data)
    }

    /// Outline reports document URLs as paths such as `/doc/title-abc123`;
    /// anchor them under the configured base URL, path prefix included.
    fn absolute_url(&self, url: &str) -> String {
        if url.is_empty() || Url::parse(url).is_ok() {
            return url.to_string();
        }
        self.base_url
            .join(url.trim_start_matches('/'))
            .map_or_else(|_| url.to_string(), |absolute| absolute.to_string())
    }

    fn resolve_document(&self, mut document: WikiDocument) -> WikiDocument {
        if let Some(url) = document.url.take() {
            document.url = Some(self.absolute_url(&url));
        }
        document
    }
}

#[async_trait]
impl WikiApi for OutlineClient {
    async fn list_documents(&self, limit: u32, offset: u32) -> Result<Vec<WikiDocument>> {
        let documents = self
            .call::<Vec<WikiDocument>>(
                "documents.list",
                json!({ "limit": limit, "offset": offset }),
            )
            .await?;

        let documents = documents.unwrap_or_default();
        debug!(
            "Listed {} documents (limit {}, offset {})",
            documents.len(),
            limit,
            offset
        );
        Ok(documents
            .into_iter()
            .map(|doc| self.resolve_document(doc))
            .collect())
    }

    async fn search_documents(&self, query: &str, limit: u32) -> Result<Vec<SearchHit>> {
        let hits = self
            .call::<Vec<SearchHit>>("documents.search", json!({ "query": query, "limit": limit }))
            .await?;

        let hits = hits.unwrap_or_default();
        debug!("Search for {:?} returned {} hits", query, hits.len());
        Ok(hits
            .into_iter()
            .map(|hit| SearchHit {
                ranking_score: hit.ranking_score,
                snippet: hit.snippet,
                document: self.resolve_document(hit.document),
            })
            .collect())
    }

    async fn get_document(&self, id: &str) -> Result<Option<WikiDocument>> {
        match self
            .call::<WikiDocument>("documents.info", json!({ "id": id }))
            .await
        {
            Ok(document) => Ok(document.map(|doc| self.resolve_document(doc))),
            Err(AskError::WikiApi { status: 404, .. }) => {
                debug!("Document {} not found", id);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn list_collections(&self, limit: u32, offset: u32) -> Result<Vec<Collection>> {
        let collections = self
            .call::<Vec<Collection>>(
                "collections.list",
                json!({
                    "limit": limit,
                    "offset": offset,
                    "sort": "updatedAt",
                    "direction": "DESC"
                }),
            )
            .await?;

        Ok(collections.unwrap_or_default())
    }
}
