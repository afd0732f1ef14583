
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{LanguageModel, OutputSchema};
use crate::config::AnthropicConfig;
use crate::http;
use crate::{AskError, Result};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const USER_AGENT: &str = "outline-ask/0.1.0";

/// Anthropic Messages API client.
///
/// Structured output is obtained by offering exactly one tool whose input
/// schema is the requested output schema and forcing the model to call it.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    messages_url: Url,
    api_key: String,
    model: String,
    max_tokens: u32,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
    tools: Vec<Tool<'a>>,
    tool_choice: ToolChoice<'a>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct Tool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Debug, Serialize)]
struct ToolChoice<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    ToolUse { name: String, input: Value },
    #[serde(other)]
    Other,
}

impl AnthropicClient {
    #[inline]
    pub fn new(config: &AnthropicConfig, api_key: impl Into<String>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            messages_url: config.messages_url()?,
            api_key: api_key.into(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            agent: http::build_agent(Duration::from_secs(config.timeout_seconds), USER_AGENT),
        })
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn extract_output(response: MessagesResponse, schema: &OutputSchema) -> Result<Value> {
        let mut text_reply = None;

        for block in response.content {
            match block {
                ContentBlock::ToolUse { name, input } if name == schema.name => return Ok(input),
                ContentBlock::ToolUse { name, .. } => {
                    warn!("Ignoring call to unexpected tool {}", name);
                }
                ContentBlock::Text { text } => text_reply = Some(text),
                ContentBlock::Other => {}
            }
        }

        // Tool use was forced, but accept a bare JSON reply if that is what came back
        let text = text_reply.ok_or_else(|| {
            AskError::MalformedModelOutput(format!(
                "Empty response from model (stop reason: {})",
                response.stop_reason.as_deref().unwrap_or("unknown")
            ))
        })?;

        serde_json::from_str(strip_code_fence(&text)).map_err(|e| {
            AskError::MalformedModelOutput(format!("reply for {} is not JSON: {}", schema.name, e))
        })
    }
}

/// Remove a surrounding Markdown code fence (```json ... ```), if any
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[async_trait]
impl LanguageModel for AnthropicClient {
    async fn generate(&self, prompt: &str, schema: &OutputSchema) -> Result<Value> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            tools: vec![Tool {
                name: schema.name,
                description: schema.description,
                input_schema: &schema.schema,
            }],
            tool_choice: ToolChoice {
                kind: "tool",
                name: schema.name,
            },
        };
        let body = serde_json::to_string(&request)?;

        debug!(
            "Sending {} request to {} ({} prompt chars)",
            schema.name,
            self.model,
            prompt.len()
        );

        let response = http::post_json(
            &self.agent,
            self.messages_url.clone(),
            vec![
                ("x-api-key", self.api_key.clone()),
                ("anthropic-version", ANTHROPIC_VERSION.to_string()),
            ],
            body,
        )
        .await?;

        if !response.is_success() {
            return Err(AskError::LanguageModel {
                status: response.status,
                body: response.body,
            });
        }

        let parsed: MessagesResponse = serde_json::from_str(&response.body).map_err(|e| {
            AskError::MalformedModelOutput(format!("unexpected response shape: {}", e))
        })?;

        Self::extract_output(parsed, schema)
    }
}
