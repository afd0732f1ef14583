use thiserror::Error;

pub type Result<T> = std::result::Result<T, AskError>;

#[derive(Error, Debug)]
pub enum AskError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Vector store not found at {path}. Run indexing first (e.g. outline-ask index-docs).")]
    StoreNotFound { path: String },

    #[error("Outline API failed: {status} - {body}")]
    WikiApi { status: u16, body: String },

    #[error("Embedding model unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Language model request failed: {status} - {body}")]
    LanguageModel { status: u16, body: String },

    #[error("Malformed model output: {0}")]
    MalformedModelOutput(String),

    #[error(
        "Embedding dimension mismatch: store holds {expected}-dimensional vectors but got {actual}. Re-run `index-docs --force` after changing embedding models."
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod answer;
pub mod commands;
pub mod config;
pub mod embeddings;
mod http;
pub mod indexer;
pub mod llm;
pub mod store;
pub mod utilities;
pub mod wiki;

#[cfg(test)]
pub(crate) mod test_support;
