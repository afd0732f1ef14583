
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;

use super::{EmbeddingProvider, l2_normalize};
use crate::config::OllamaConfig;
use crate::http::{self, HttpResponse};
use crate::{AskError, Result};

const USER_AGENT: &str = "outline-ask/0.1.0";

/// Embedding provider backed by a local Ollama server.
///
/// The first embedding request warms the client up by checking that the
/// server answers and the model is installed. That outcome is remembered, so
/// once warm-up fails every later call fails immediately with
/// [`AskError::EmbeddingUnavailable`].
#[derive(Debug)]
pub struct OllamaClient {
    base_url: Url,
    model: String,
    agent: ureq::Agent,
    warm_up: OnceCell<std::result::Result<(), String>>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
    truncate: bool,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        config.validate()?;
        let base_url = config.ollama_url()?;

        Ok(Self {
            base_url,
            model: config.model.clone(),
            agent: http::build_agent(Duration::from_secs(config.timeout_seconds), USER_AGENT),
            warm_up: OnceCell::new(),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = http::build_agent(timeout, USER_AGENT);
        self
    }

    /// Verify the server is reachable and the configured model is installed
    #[inline]
    pub async fn health_check(&self) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        let models = self.list_models().await?;
        let tagged = format!("{}:latest", self.model);

        if models
            .iter()
            .any(|m| m.name == self.model || m.name == tagged)
        {
            info!(
                "Embedding model {} is available at {}",
                self.model, self.base_url
            );
            Ok(())
        } else {
            let available_models: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
            warn!(
                "Model {} not found. Available models: {:?}",
                self.model, available_models
            );
            Err(AskError::EmbeddingUnavailable(format!(
                "Model '{}' is not available. Available models: {:?}",
                self.model, available_models
            )))
        }
    }

    /// List the models installed on the server
    #[inline]
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self.endpoint("/api/tags")?;
        debug!("Fetching available models from {}", url);

        let response = http::get(&self.agent, url, Vec::new()).await?;
        let response = Self::ensure_success(response)?;

        let models_response: ModelsResponse = serde_json::from_str(&response.body)
            .map_err(|e| AskError::Embedding(format!("Failed to parse models response: {}", e)))?;

        debug!("Found {} models", models_response.models.len());
        Ok(models_response.models)
    }

    async fn ensure_warm(&self) -> Result<()> {
        let outcome = self
            .warm_up
            .get_or_init(|| async {
                info!("Loading embedding model {} (first use only)", self.model);
                self.health_check().await.map_err(|e| e.to_string())
            })
            .await;

        outcome
            .clone()
            .map_err(AskError::EmbeddingUnavailable)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| AskError::Config(format!("Failed to build Ollama URL: {}", e)))
    }

    fn ensure_success(response: HttpResponse) -> Result<HttpResponse> {
        if response.is_success() {
            Ok(response)
        } else {
            Err(AskError::Embedding(format!(
                "Ollama returned HTTP {}: {}",
                response.status, response.body
            )))
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.ensure_warm().await?;

        debug!("Generating embedding for text (length: {})", text.len());

        let request = EmbedRequest {
            model: &self.model,
            input: text,
            truncate: true,
        };
        let body = serde_json::to_string(&request)?;
        let url = self.endpoint("/api/embed")?;

        let response = http::post_json(&self.agent, url, Vec::new(), body).await?;
        let response = Self::ensure_success(response)?;

        let embed_response: EmbedResponse = serde_json::from_str(&response.body).map_err(|e| {
            AskError::Embedding(format!("Failed to parse embedding response: {}", e))
        })?;

        let mut embedding = embed_response
            .embeddings
            .into_iter()
            .next()
            .filter(|embedding| !embedding.is_empty())
            .ok_or_else(|| AskError::Embedding("Ollama returned no embedding".to_string()))?;

        l2_normalize(&mut embedding);

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
