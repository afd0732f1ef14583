// Language model module
// Schema-constrained generation: model output is validated before it is trusted

pub mod anthropic;


use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{AskError, Result};

pub use anthropic::AnthropicClient;

/// JSON schema the model's reply must satisfy
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    /// Short identifier, also used as the tool name for providers that need one
    pub name: &'static str,
    pub description: &'static str,
    pub schema: Value,
}

impl OutputSchema {
    /// Check `value` against the schema, collecting every violation
    #[inline]
    pub fn validate(&self, value: &Value) -> Result<()> {
        let compiled = JSONSchema::compile(&self.schema).map_err(|e| {
            AskError::MalformedModelOutput(format!("invalid schema {}: {}", self.name, e))
        })?;

        if let Err(errors) = compiled.validate(value) {
            let violations: Vec<String> = errors
                .map(|e| format!("{} at '{}'", e, e.instance_path))
                .collect();
            warn!(
                "Model output failed {} schema: {}",
                self.name,
                violations.join("; ")
            );
            return Err(AskError::MalformedModelOutput(format!(
                "{} does not match schema: {}",
                self.name,
                violations.join("; ")
            )));
        }

        Ok(())
    }

    /// Validate `value` and deserialize it into `T`
    #[inline]
    pub fn parse<T: DeserializeOwned>(&self, value: Value) -> Result<T> {
        self.validate(&value)?;
        serde_json::from_value(value).map_err(|e| {
            AskError::MalformedModelOutput(format!("{} could not be decoded: {}", self.name, e))
        })
    }
}

/// A chat model that can be asked for output matching a schema
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send `prompt` and return the model's raw structured reply
    async fn generate(&self, prompt: &str, schema: &OutputSchema) -> Result<Value>;
}

/// Generate, validate against `schema`, and decode into `T`
#[inline]
pub async fn generate_structured<T: DeserializeOwned>(
    model: &dyn LanguageModel,
    prompt: &str,
    schema: &OutputSchema,
) -> Result<T> {
    debug!("Requesting {} from language model", schema.name);
    let raw = model.generate(prompt, schema).await?;
    schema.parse(raw)
}
