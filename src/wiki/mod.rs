// Wiki module
// Read-only access to the document wiki that questions are answered from

pub mod outline;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

pub use outline::OutlineClient;

/// Document as returned by the wiki. Owned by the wiki; never written back.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WikiDocument {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl WikiDocument {
    /// Title, falling back to the name and then to "Untitled"
    #[inline]
    pub fn display_title(&self) -> &str {
        [self.title.as_deref(), self.name.as_deref()]
            .into_iter()
            .flatten()
            .find(|title| !title.trim().is_empty())
            .unwrap_or("Untitled")
    }

    #[inline]
    pub fn body(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

/// One ranked hit from the wiki's own search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    #[serde(rename = "ranking", default)]
    pub ranking_score: f32,
    #[serde(rename = "context", default)]
    pub snippet: String,
    pub document: WikiDocument,
}

/// A wiki collection (a top-level grouping of documents)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Operations this crate needs from the wiki
#[async_trait]
pub trait WikiApi: Send + Sync {
    /// One page of documents. Callers page by raising `offset` until a short page comes back.
    async fn list_documents(&self, limit: u32, offset: u32) -> Result<Vec<WikiDocument>>;

    /// Ranked full-text search; no matches is an empty list, not an error
    async fn search_documents(&self, query: &str, limit: u32) -> Result<Vec<SearchHit>>;

    /// Full content of one document, or `None` when it does not exist
    async fn get_document(&self, id: &str) -> Result<Option<WikiDocument>>;

    async fn list_collections(&self, limit: u32, offset: u32) -> Result<Vec<Collection>>;
}
