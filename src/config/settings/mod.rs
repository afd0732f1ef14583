
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::AskError;

pub const DEFAULT_WIKI_BASE_URL: &str = "https://example.outline.com";
pub const DEFAULT_STORE_PATH: &str = "./vector-store.json";

pub const ENV_WIKI_BASE_URL: &str = "OUTLINE_BASE_URL";
pub const ENV_WIKI_API_KEY: &str = "OUTLINE_API_KEY";
pub const ENV_ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ENV_STORE_PATH: &str = "OUTLINE_ASK_STORE";
pub const ENV_STRATEGY: &str = "OUTLINE_ASK_STRATEGY";
pub const ENV_OLLAMA_MODEL: &str = "OLLAMA_MODEL";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub wiki: WikiConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub anthropic: AnthropicConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WikiConfig {
    pub base_url: String,
    pub page_size: u32,
    pub timeout_seconds: u64,
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnthropicConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    #[serde(skip)]
    pub api_key: Option<String>,
}

/// Which retrieval strategy answers a question
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalStrategy {
    /// Cosine similarity against the pre-built vector store
    #[default]
    Embedding,
    /// Live wiki search driven by model-proposed keywords
    Keyword,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub strategy: RetrievalStrategy,
    pub top_k: usize,
    pub max_keyword_rounds: u32,
    pub keyword_search_limit: u32,
    pub context_chars: usize,
    pub embed_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wiki: WikiConfig::default(),
            ollama: OllamaConfig::default(),
            anthropic: AnthropicConfig::default(),
            retrieval: RetrievalConfig::default(),
            store_path: default_store_path(),
            base_dir: PathBuf::new(),
        }
    }
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WIKI_BASE_URL.to_string(),
            page_size: 25,
            timeout_seconds: 30,
            api_key: None,
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "all-minilm".to_string(),
            timeout_seconds: 60,
        }
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-sonnet-4-5-20250929".to_string(),
            max_tokens: 2048,
            timeout_seconds: 120,
            api_key: None,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            strategy: RetrievalStrategy::Embedding,
            top_k: 5,
            max_keyword_rounds: 5,
            keyword_search_limit: 5,
            context_chars: 2000,
            embed_chars: 1000,
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid page size: {0} (must be between 1 and 100)")]
    InvalidPageSize(u32),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid max tokens: {0} (must be between 256 and 64000)")]
    InvalidMaxTokens(u32),
    #[error("Invalid top k: {0} (must be between 1 and 50)")]
    InvalidTopK(usize),
    #[error("Invalid keyword rounds: {0} (must be between 1 and 20)")]
    InvalidKeywordRounds(u32),
    #[error("Invalid keyword search limit: {0} (must be between 1 and 100)")]
    InvalidSearchLimit(u32),
    #[error("Invalid {0} character limit: {1} (must be between 100 and 100000)")]
    InvalidCharLimit(&'static str, usize),
    #[error("Invalid retrieval strategy: {0} (must be 'embedding' or 'keyword')")]
    InvalidStrategy(String),
    #[error("{0} is not set")]
    MissingCredential(&'static str),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl From<ConfigError> for AskError {
    #[inline]
    fn from(error: ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}

impl Config {
    /// Default configuration directory, e.g. `~/.config/outline-ask`
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("outline-ask"))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load `config.toml` from the default directory and apply environment overrides
    #[inline]
    pub fn from_env() -> Result<Self> {
        let config_dir = Self::config_dir()?;
        let mut config = Self::load(config_dir)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    /// Overlay environment variables on top of the file configuration.
    ///
    /// Takes a lookup function so callers can supply something other than the
    /// process environment.
    #[inline]
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(base_url) = non_empty(ENV_WIKI_BASE_URL) {
            self.wiki.base_url = base_url;
        }
        if let Some(api_key) = non_empty(ENV_WIKI_API_KEY) {
            self.wiki.api_key = Some(api_key);
        }
        if let Some(api_key) = non_empty(ENV_ANTHROPIC_API_KEY) {
            self.anthropic.api_key = Some(api_key);
        }
        if let Some(store_path) = non_empty(ENV_STORE_PATH) {
            self.store_path = PathBuf::from(store_path);
        }
        if let Some(strategy) = non_empty(ENV_STRATEGY) {
            self.retrieval.strategy = RetrievalStrategy::from_str(strategy.trim(), true)
                .map_err(|_| ConfigError::InvalidStrategy(strategy))?;
        }
        if let Some(model) = non_empty(ENV_OLLAMA_MODEL) {
            self.ollama.model = model;
        }

        self.validate()
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.wiki.validate()?;
        self.ollama.validate()?;
        self.anthropic.validate()?;
        self.retrieval.validate()?;
        Ok(())
    }

    /// Outline API credential, required for indexing and keyword retrieval
    #[inline]
    pub fn wiki_api_key(&self) -> Result<&str, ConfigError> {
        self.wiki
            .api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential(ENV_WIKI_API_KEY))
    }

    /// Anthropic credential, required for asking questions
    #[inline]
    pub fn anthropic_api_key(&self) -> Result<&str, ConfigError> {
        self.anthropic
            .api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential(ENV_ANTHROPIC_API_KEY))
    }
}

fn validate_timeout(timeout_seconds: u64) -> Result<(), ConfigError> {
    if !(1..=600).contains(&timeout_seconds) {
        return Err(ConfigError::InvalidTimeout(timeout_seconds));
    }
    Ok(())
}

fn validate_http_url(url_str: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(url_str).map_err(|_| ConfigError::InvalidUrl(url_str.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidProtocol(url.scheme().to_string()));
    }
    Ok(url)
}

impl WikiConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_url()?;

        if self.page_size == 0 || self.page_size > 100 {
            return Err(ConfigError::InvalidPageSize(self.page_size));
        }

        validate_timeout(self.timeout_seconds)
    }

    /// Root of the Outline RPC endpoints: the base URL without trailing slashes, plus `/api/`
    #[inline]
    pub fn api_url(&self) -> Result<Url, ConfigError> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        validate_http_url(&format!("{}/api/", trimmed))
    }
}

impl OllamaConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        self.ollama_url()?;

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        validate_timeout(self.timeout_seconds)
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}

impl AnthropicConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.messages_url()?;

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if !(256..=64000).contains(&self.max_tokens) {
            return Err(ConfigError::InvalidMaxTokens(self.max_tokens));
        }

        validate_timeout(self.timeout_seconds)
    }

    #[inline]
    pub fn messages_url(&self) -> Result<Url, ConfigError> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        validate_http_url(&format!("{}/v1/messages", trimmed))
    }
}

impl RetrievalConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=50).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }

        if !(1..=20).contains(&self.max_keyword_rounds) {
            return Err(ConfigError::InvalidKeywordRounds(self.max_keyword_rounds));
        }

        if !(1..=100).contains(&self.keyword_search_limit) {
            return Err(ConfigError::InvalidSearchLimit(self.keyword_search_limit));
        }

        if !(100..=100_000).contains(&self.context_chars) {
            return Err(ConfigError::InvalidCharLimit("context", self.context_chars));
        }

        if !(100..=100_000).contains(&self.embed_chars) {
            return Err(ConfigError::InvalidCharLimit("embedding", self.embed_chars));
        }

        Ok(())
    }
}
