// In-process fakes for the wiki, embedding and language model seams

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::embeddings::EmbeddingProvider;
use crate::llm::{LanguageModel, OutputSchema};
use crate::wiki::{Collection, SearchHit, WikiApi, WikiDocument};
use crate::{AskError, Result};

pub(crate) fn wiki_document(id: &str, title: &str, text: &str) -> WikiDocument {
    WikiDocument {
        id: id.to_string(),
        title: Some(title.to_string()),
        text: Some(text.to_string()),
        url: Some(format!("https://wiki.example.com/doc/{}", id)),
        ..WikiDocument::default()
    }
}

/// Wiki backed by fixed documents and per-query search results
#[derive(Default)]
pub(crate) struct FakeWiki {
    pub documents: Vec<WikiDocument>,
    pub search_results: HashMap<String, Vec<SearchHit>>,
    pub list_calls: AtomicUsize,
    pub searched: Mutex<Vec<String>>,
    pub fetched: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
}

impl FakeWiki {
    pub(crate) fn with_documents(documents: Vec<WikiDocument>) -> Self {
        Self {
            documents,
            ..Self::default()
        }
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn searched_queries(&self) -> Vec<String> {
        self.searched.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl WikiApi for FakeWiki {
    async fn list_documents(&self, limit: u32, offset: u32) -> Result<Vec<WikiDocument>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .documents
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn search_documents(&self, query: &str, limit: u32) -> Result<Vec<SearchHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.searched
            .lock()
            .expect("lock poisoned")
            .push(query.to_string());
        Ok(self
            .search_results
            .get(query)
            .map(|hits| hits.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn get_document(&self, id: &str) -> Result<Option<WikiDocument>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.fetched
            .lock()
            .expect("lock poisoned")
            .push(id.to_string());
        Ok(self.documents.iter().find(|doc| doc.id == id).cloned())
    }

    async fn list_collections(&self, _limit: u32, _offset: u32) -> Result<Vec<Collection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![Collection {
            id: "col-1".to_string(),
            name: "General".to_string(),
            description: None,
            url: None,
            updated_at: None,
        }])
    }
}

/// Deterministic embedder: maps known texts to fixed vectors and hashes the rest.
/// Texts containing `fail_marker` fail to embed.
#[derive(Default)]
pub(crate) struct FakeEmbedder {
    pub vectors: HashMap<String, Vec<f32>>,
    pub fail_marker: Option<String>,
    pub unavailable: bool,
    pub embedded: Mutex<Vec<String>>,
}

impl FakeEmbedder {
    pub(crate) fn embedded_texts(&self) -> Vec<String> {
        self.embedded.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.unavailable {
            return Err(AskError::EmbeddingUnavailable("model not installed".to_string()));
        }
        if let Some(marker) = &self.fail_marker {
            if text.contains(marker.as_str()) {
                return Err(AskError::Embedding(format!("cannot embed {:?}", marker)));
            }
        }

        self.embedded
            .lock()
            .expect("lock poisoned")
            .push(text.to_string());

        if let Some(vector) = self.vectors.get(text) {
            return Ok(vector.clone());
        }

        let sum: u32 = text.bytes().map(u32::from).sum();
        Ok(vec![1.0, (sum % 7) as f32, (text.len() % 5) as f32])
    }

    fn model_name(&self) -> &str {
        "fake-embedder"
    }
}

/// Language model that replays scripted replies in order and records prompts
#[derive(Default)]
pub(crate) struct ScriptedModel {
    pub replies: Mutex<VecDeque<Value>>,
    pub prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedModel {
    pub(crate) fn new(replies: Vec<Value>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::default(),
        }
    }

    /// Recorded `(schema name, prompt)` pairs
    pub(crate) fn recorded(&self) -> Vec<(String, String)> {
        self.prompts.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str, schema: &OutputSchema) -> Result<Value> {
        self.prompts
            .lock()
            .expect("lock poisoned")
            .push((schema.name.to_string(), prompt.to_string()));
        self.replies
            .lock()
            .expect("lock poisoned")
            .pop_front()
            .ok_or_else(|| AskError::MalformedModelOutput("no scripted reply left".to_string()))
    }
}
