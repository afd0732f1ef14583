// Configuration management module
// TOML settings file plus environment overrides for credentials

pub mod settings;

pub use settings::{
    AnthropicConfig, Config, ConfigError, OllamaConfig, RetrievalConfig, RetrievalStrategy,
    WikiConfig,
};

