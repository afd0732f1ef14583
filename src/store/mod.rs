// Vector store module
// In-memory embeddings with linear-scan cosine search, persisted as one JSON array

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::{AskError, Result};

/// One indexed wiki document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorDocument {
    /// Identifier of the source wiki document
    pub id: String,
    /// Normalized embedding of the document's leading text
    pub embedding: Vec<f32>,
    pub metadata: DocumentMetadata,
}

/// Metadata kept next to the embedding.
///
/// `text` is the full document body, not the truncated text that was embedded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub title: String,
    pub text: String,
    pub url: String,
}

/// A stored document paired with its similarity to a query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchResult<'a> {
    pub document: &'a VectorDocument,
    pub score: f32,
}

/// Ordered collection of vector documents.
///
/// There is no internal locking: one writer at a time is a usage constraint
/// enforced by the callers that own the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorStore {
    documents: Vec<VectorDocument>,
}

impl VectorStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Embedding length shared by every stored document, if any are stored
    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.documents.first().map(|doc| doc.embedding.len())
    }

    #[inline]
    pub fn documents(&self) -> &[VectorDocument] {
        &self.documents
    }

    /// Append a document. Duplicate ids are allowed; a differing embedding length is not.
    #[inline]
    pub fn add(&mut self, document: VectorDocument) -> Result<()> {
        if let Some(expected) = self.dimension() {
            if document.embedding.len() != expected {
                return Err(AskError::DimensionMismatch {
                    expected,
                    actual: document.embedding.len(),
                });
            }
        }

        self.documents.push(document);
        Ok(())
    }

    /// Append several documents, stopping at the first one with a mismatched dimension
    #[inline]
    pub fn add_batch<I>(&mut self, documents: I) -> Result<()>
    where
        I: IntoIterator<Item = VectorDocument>,
    {
        for document in documents {
            self.add(document)?;
        }
        Ok(())
    }

    /// Rank every stored document against `query` and return the best `limit`.
    ///
    /// Ties keep insertion order.
    #[inline]
    pub fn search(&self, query: &[f32], limit: usize) -> Vec<SearchResult<'_>> {
        if self.documents.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut results: Vec<SearchResult<'_>> = self
            .documents
            .iter()
            .map(|document| SearchResult {
                document,
                score: cosine_similarity(query, &document.embedding),
            })
            .collect();

        // `sort_by` is stable, which keeps equal scores in insertion order
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(limit);

        debug!(
            "Vector search over {} documents returned {} results",
            self.documents.len(),
            results.len()
        );
        results
    }

    /// Drop every in-memory document. The file on disk is left alone.
    #[inline]
    pub fn clear(&mut self) {
        self.documents.clear();
    }

    /// Overwrite `path` with the whole store
    #[inline]
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string(&self.documents)?;
        tokio::fs::write(path, json).await?;

        info!(
            "Saved {} documents to vector store at {}",
            self.documents.len(),
            path.display()
        );
        Ok(())
    }

    /// Replace the in-memory contents with the file at `path`.
    ///
    /// Returns `false` and leaves the store untouched when the file is
    /// missing, unreadable, or not a valid store.
    #[inline]
    pub async fn load(&mut self, path: &Path) -> bool {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!("Vector store not loaded from {}: {}", path.display(), e);
                return false;
            }
        };

        let documents: Vec<VectorDocument> = match serde_json::from_str(&raw) {
            Ok(documents) => documents,
            Err(e) => {
                warn!("Ignoring malformed vector store {}: {}", path.display(), e);
                return false;
            }
        };

        if let Some(first) = documents.first() {
            let dimension = first.embedding.len();
            if documents.iter().any(|doc| doc.embedding.len() != dimension) {
                warn!(
                    "Ignoring vector store {}: embeddings have mixed dimensions",
                    path.display()
                );
                return false;
            }
        }

        info!(
            "Loaded {} documents from vector store at {}",
            documents.len(),
            path.display()
        );
        self.documents = documents;
        true
    }
}

/// Cosine similarity of two vectors, compared over their common prefix.
///
/// A zero-norm vector on either side yields exactly 0.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;

    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot = x.mul_add(y, dot);
        norm_a = x.mul_add(x, norm_a);
        norm_b = y.mul_add(y, norm_b);
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 {
        return 0.0;
    }

    (dot / denominator).clamp(-1.0, 1.0) as f32
}
