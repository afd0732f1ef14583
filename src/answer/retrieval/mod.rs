// Retrieval strategies
// Given a question, produce ranked candidate documents for synthesis


use async_trait::async_trait;
use futures::future::try_join_all;
use serde::Deserialize;
use serde_json::json;
use std::fmt::Write as _;
use tracing::{debug, info};

use crate::embeddings::EmbeddingProvider;
use crate::llm::{LanguageModel, OutputSchema, generate_structured};
use crate::store::VectorStore;
use crate::wiki::{SearchHit, WikiApi};
use crate::{AskError, Result};

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_MAX_KEYWORD_ROUNDS: u32 = 5;
pub const DEFAULT_KEYWORD_SEARCH_LIMIT: u32 = 5;
pub const DEFAULT_MAX_FETCHED_DOCUMENTS: usize = 5;

/// A candidate document handed to answer synthesis
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedDocument {
    pub id: String,
    pub title: String,
    /// Full text; synthesis slices it
    pub text: String,
    pub url: Option<String>,
    pub score: f32,
}

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Ranked candidates for `question`, best first. Empty when nothing matched.
    async fn retrieve(&self, question: &str) -> Result<Vec<RetrievedDocument>>;
}

fn non_empty(url: &str) -> Option<String> {
    let url = url.trim();
    (!url.is_empty()).then(|| url.to_string())
}

/// Cosine similarity over a pre-built vector store
pub struct SimilarityRetriever<'a> {
    store: &'a VectorStore,
    embedder: &'a dyn EmbeddingProvider,
    top_k: usize,
}

impl<'a> SimilarityRetriever<'a> {
    #[inline]
    pub fn new(store: &'a VectorStore, embedder: &'a dyn EmbeddingProvider) -> Self {
        Self {
            store,
            embedder,
            top_k: DEFAULT_TOP_K,
        }
    }

    #[inline]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

#[async_trait]
impl Retriever for SimilarityRetriever<'_> {
    async fn retrieve(&self, question: &str) -> Result<Vec<RetrievedDocument>> {
        let Some(dimension) = self.store.dimension() else {
            debug!("Vector store is empty, nothing to search");
            return Ok(Vec::new());
        };

        let query = self.embedder.embed(question).await?;
        if query.len() != dimension {
            return Err(AskError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }

        let results = self.store.search(&query, self.top_k);
        debug!("Similarity search returned {} documents", results.len());

        Ok(results
            .into_iter()
            .map(|result| RetrievedDocument {
                id: result.document.id.clone(),
                title: result.document.metadata.title.clone(),
                text: result.document.metadata.text.clone(),
                url: non_empty(&result.document.metadata.url),
                score: result.score,
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct KeywordProposal {
    keywords: Vec<String>,
}

fn keyword_schema() -> OutputSchema {
    OutputSchema {
        name: "search_keywords",
        description: "Short search keywords for finding documents in the wiki",
        schema: json!({
            "type": "object",
            "properties": {
                "keywords": {
                    "type": "array",
                    "items": { "type": "string" },
                    "minItems": 1,
                    "maxItems": 6
                }
            },
            "required": ["keywords"]
        }),
    }
}

fn keyword_prompt(question: &str, tried: &[String]) -> String {
    let mut prompt = format!(
        "Generate between 1 and 6 short search keywords or phrases that would find documents \
         in my Outline wiki answering this question.\n\nQUESTION: {}\n",
        question
    );
    if !tried.is_empty() {
        let _ = writeln!(
            prompt,
            "\nThese keywords were already tried and found nothing, do not repeat them: {}",
            tried.join(", ")
        );
    }
    prompt.push_str("\nPrefer single words or two-word phrases likely to appear in a title.");
    prompt
}

/// Live wiki search driven by model-proposed keywords.
///
/// Each round asks the model for a fresh batch and tries its keywords in
/// order until one has hits. Tried keywords are never proposed again, and
/// the number of rounds is bounded.
pub struct KeywordRetriever<'a> {
    wiki: &'a dyn WikiApi,
    llm: &'a dyn LanguageModel,
    max_rounds: u32,
    search_limit: u32,
    max_documents: usize,
}

impl<'a> KeywordRetriever<'a> {
    #[inline]
    pub fn new(wiki: &'a dyn WikiApi, llm: &'a dyn LanguageModel) -> Self {
        Self {
            wiki,
            llm,
            max_rounds: DEFAULT_MAX_KEYWORD_ROUNDS,
            search_limit: DEFAULT_KEYWORD_SEARCH_LIMIT,
            max_documents: DEFAULT_MAX_FETCHED_DOCUMENTS,
        }
    }

    #[inline]
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    #[inline]
    pub fn with_search_limit(mut self, search_limit: u32) -> Self {
        self.search_limit = search_limit.max(1);
        self
    }

    async fn propose_keywords(&self, question: &str, tried: &[String]) -> Result<Vec<String>> {
        let proposal: KeywordProposal = generate_structured(
            self.llm,
            &keyword_prompt(question, tried),
            &keyword_schema(),
        )
        .await?;

        let mut fresh: Vec<String> = Vec::new();
        for keyword in proposal.keywords {
            let keyword = keyword.trim();
            let seen = tried
                .iter()
                .chain(fresh.iter())
                .any(|previous| previous.eq_ignore_ascii_case(keyword));
            if !keyword.is_empty() && !seen {
                fresh.push(keyword.to_string());
            }
        }
        Ok(fresh)
    }

    /// Fetch full text for the leading hits, keeping the hit's own text when
    /// a document has gone missing
    async fn resolve_hits(&self, hits: Vec<SearchHit>) -> Result<Vec<RetrievedDocument>> {
        let hits: Vec<SearchHit> = hits.into_iter().take(self.max_documents).collect();
        let fetched = try_join_all(
            hits.iter()
                .map(|hit| self.wiki.get_document(&hit.document.id)),
        )
        .await?;

        Ok(hits
            .into_iter()
            .zip(fetched)
            .map(|(hit, full)| {
                let document = full.unwrap_or(hit.document);
                let title = document.display_title().to_string();
                let text = document.body().to_string();
                let url = document.url.as_deref().and_then(non_empty);
                RetrievedDocument {
                    id: document.id,
                    title,
                    text,
                    url,
                    score: hit.ranking_score,
                }
            })
            .collect())
    }
}

#[async_trait]
impl Retriever for KeywordRetriever<'_> {
    async fn retrieve(&self, question: &str) -> Result<Vec<RetrievedDocument>> {
        let mut tried: Vec<String> = Vec::new();

        for round in 1..=self.max_rounds {
            let keywords = self.propose_keywords(question, &tried).await?;
            debug!("Round {}: trying keywords {:?}", round, keywords);

            for keyword in keywords {
                let hits = self.wiki.search_documents(&keyword, self.search_limit).await?;
                if !hits.is_empty() {
                    info!(
                        "Keyword {:?} matched {} documents in round {}",
                        keyword,
                        hits.len(),
                        round
                    );
                    return self.resolve_hits(hits).await;
                }
                tried.push(keyword);
            }
        }

        info!(
            "No documents found after {} rounds ({} keywords tried)",
            self.max_rounds,
            tried.len()
        );
        Ok(Vec::new())
    }
}
