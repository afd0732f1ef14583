use console::style;
use std::fmt::Write as _;
use tracing::info;

use crate::answer::{Answer, Answerer, KeywordRetriever, Retriever, SimilarityRetriever};
use crate::config::{Config, RetrievalStrategy};
use crate::embeddings::OllamaClient;
use crate::indexer::{Indexer, IndexingStats};
use crate::llm::AnthropicClient;
use crate::store::VectorStore;
use crate::wiki::OutlineClient;
use crate::{AskError, Result};

/// Build or rebuild the vector store from the wiki
#[inline]
pub async fn index_docs(config: &Config, force: bool) -> Result<IndexingStats> {
    let wiki = OutlineClient::new(&config.wiki, config.wiki_api_key()?)?;
    let embedder = OllamaClient::new(&config.ollama)?;
    let mut store = VectorStore::new();

    info!(
        "Indexing {} into {}",
        config.wiki.base_url,
        config.store_path.display()
    );

    let stats = Indexer::new(&wiki, &embedder, &mut store, &config.store_path)
        .with_page_size(config.wiki.page_size)
        .with_embed_chars(config.retrieval.embed_chars)
        .index_all(force)
        .await?;

    if stats.skipped {
        println!(
            "Vector store at {} already holds {} documents. Use --force to reindex.",
            config.store_path.display(),
            store.len()
        );
    } else {
        println!(
            "Indexed {} of {} documents into {} with {}",
            stats.documents_indexed,
            stats.documents_fetched,
            config.store_path.display(),
            stats.embedding_model
        );
        if stats.embedding_failures > 0 {
            println!(
                "{} documents could not be embedded and were skipped",
                stats.embedding_failures
            );
        }
    }

    Ok(stats)
}

/// Answer `question` with the configured strategy, or `strategy` when given
#[inline]
pub async fn ask_question(
    config: &Config,
    question: &str,
    strategy: Option<RetrievalStrategy>,
) -> Result<Answer> {
    let strategy = strategy.unwrap_or(config.retrieval.strategy);
    info!("Answering with {:?} retrieval", strategy);

    match strategy {
        RetrievalStrategy::Embedding => {
            let mut store = VectorStore::new();
            if !store.load(&config.store_path).await {
                return Err(AskError::StoreNotFound {
                    path: config.store_path.display().to_string(),
                });
            }

            let llm = AnthropicClient::new(&config.anthropic, config.anthropic_api_key()?)?;
            let embedder = OllamaClient::new(&config.ollama)?;
            let retriever =
                SimilarityRetriever::new(&store, &embedder).with_top_k(config.retrieval.top_k);

            answer_with(config, Box::new(retriever), &llm, question).await
        }
        RetrievalStrategy::Keyword => {
            let wiki = OutlineClient::new(&config.wiki, config.wiki_api_key()?)?;
            let llm = AnthropicClient::new(&config.anthropic, config.anthropic_api_key()?)?;
            let retriever = KeywordRetriever::new(&wiki, &llm)
                .with_max_rounds(config.retrieval.max_keyword_rounds)
                .with_search_limit(config.retrieval.keyword_search_limit);

            answer_with(config, Box::new(retriever), &llm, question).await
        }
    }
}

async fn answer_with(
    config: &Config,
    retriever: Box<dyn Retriever + '_>,
    llm: &AnthropicClient,
    question: &str,
) -> Result<Answer> {
    Answerer::new(retriever, llm)
        .with_context_chars(config.retrieval.context_chars)
        .ask(question)
        .await
}

/// Render the answer followed by its numbered sources
#[inline]
pub fn format_answer(answer: &Answer) -> String {
    let mut output = format!("{}\n{}\n", style("Answer:").bold(), answer.answer);

    if !answer.sources.is_empty() {
        output.push('\n');
        let _ = writeln!(output, "{}", style("Sources:").bold());
        for (i, source) in answer.sources.iter().enumerate() {
            let _ = writeln!(output, "{}. {}", i + 1, source.title);
            if let Some(url) = &source.url {
                let _ = writeln!(output, "   {}", style(url).dim());
            }
        }
    }

    output
}

#[inline]
pub fn print_answer(answer: &Answer) {
    print!("{}", format_answer(answer));
}
