// Indexer module
// Pulls every wiki document, embeds it, and persists the vector store


use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::embeddings::EmbeddingProvider;
use crate::store::{DocumentMetadata, VectorDocument, VectorStore};
use crate::utilities::truncate_chars;
use crate::wiki::{WikiApi, WikiDocument};
use crate::{AskError, Result};

pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const DEFAULT_EMBED_CHARS: usize = 1000;

/// Statistics about one indexing run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexingStats {
    /// The store was already populated and `force` was not set, so nothing ran
    pub skipped: bool,
    pub collections: usize,
    pub documents_fetched: usize,
    pub documents_indexed: usize,
    pub embedding_failures: usize,
    /// Model the vectors were produced with; empty when the run was skipped
    pub embedding_model: String,
}

/// Builds the vector store from the wiki.
///
/// Borrows the store mutably for its whole life, which makes it the single
/// writer while indexing runs.
pub struct Indexer<'a> {
    wiki: &'a dyn WikiApi,
    embedder: &'a dyn EmbeddingProvider,
    store: &'a mut VectorStore,
    store_path: PathBuf,
    page_size: u32,
    embed_chars: usize,
}

impl<'a> Indexer<'a> {
    #[inline]
    pub fn new(
        wiki: &'a dyn WikiApi,
        embedder: &'a dyn EmbeddingProvider,
        store: &'a mut VectorStore,
        store_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            wiki,
            embedder,
            store,
            store_path: store_path.into(),
            page_size: DEFAULT_PAGE_SIZE,
            embed_chars: DEFAULT_EMBED_CHARS,
        }
    }

    #[inline]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[inline]
    pub fn with_embed_chars(mut self, embed_chars: usize) -> Self {
        self.embed_chars = embed_chars;
        self
    }

    /// Index every wiki document into the store and save it once.
    ///
    /// Without `force`, an already populated store (in memory or loadable
    /// from disk) is left as is and the wiki is not contacted. With `force`,
    /// existing contents are discarded first.
    #[inline]
    pub async fn index_all(&mut self, force: bool) -> Result<IndexingStats> {
        if force {
            if !self.store.is_empty() {
                info!(
                    "Discarding {} existing documents before reindexing",
                    self.store.len()
                );
            }
            self.store.clear();
        } else {
            // A populated store is never replaced by what is on disk
            if self.store.is_empty() {
                self.store.load(&self.store_path).await;
            }
            if !self.store.is_empty() {
                info!(
                    "Vector store already holds {} documents; use --force to reindex",
                    self.store.len()
                );
                return Ok(IndexingStats {
                    skipped: true,
                    ..IndexingStats::default()
                });
            }
        }

        let collections = self.wiki.list_collections(100, 0).await?;
        let documents = self.fetch_all_documents().await?;
        info!(
            "Fetched {} documents from {} collections",
            documents.len(),
            collections.len()
        );

        let mut stats = IndexingStats {
            collections: collections.len(),
            documents_fetched: documents.len(),
            embedding_model: self.embedder.model_name().to_string(),
            ..IndexingStats::default()
        };

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(documents.len() as u64).with_style(
                ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            )
        } else {
            ProgressBar::hidden()
        };

        for document in documents {
            let title = document.display_title().to_string();
            bar.set_message(title.clone());

            match self.index_document(document).await {
                Ok(()) => stats.documents_indexed += 1,
                Err(e @ AskError::EmbeddingUnavailable(_)) => {
                    bar.abandon();
                    return Err(e);
                }
                Err(e) => {
                    warn!("Error embedding {}: {}", title, e);
                    stats.embedding_failures += 1;
                }
            }
            bar.inc(1);
        }
        bar.finish_and_clear();

        self.store.save(&self.store_path).await?;

        info!(
            "Indexed {} of {} documents with {} ({} failures)",
            stats.documents_indexed,
            stats.documents_fetched,
            stats.embedding_model,
            stats.embedding_failures
        );
        Ok(stats)
    }

    /// Page through the wiki until a short page comes back
    async fn fetch_all_documents(&self) -> Result<Vec<WikiDocument>> {
        let mut documents = Vec::new();
        let mut offset = 0;

        loop {
            let batch = self.wiki.list_documents(self.page_size, offset).await?;
            let batch_len = batch.len();
            debug!("Fetched page at offset {} with {} documents", offset, batch_len);
            documents.extend(batch);

            if batch_len < self.page_size as usize {
                break;
            }
            offset += self.page_size;
        }

        Ok(documents)
    }

    async fn index_document(&mut self, document: WikiDocument) -> Result<()> {
        let title = document.display_title().to_string();
        let full_text = format!("{}\n\n{}", title, document.body());
        let to_embed = truncate_chars(&full_text, self.embed_chars);

        let embedding = self.embedder.embed(to_embed).await?;

        self.store.add(VectorDocument {
            id: document.id,
            embedding,
            metadata: DocumentMetadata {
                title,
                text: document.text.unwrap_or_default(),
                url: document.url.unwrap_or_default(),
            },
        })
    }
}
