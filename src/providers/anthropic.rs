//! Anthropic backend — messages API with a forced `tool_use` block.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::{ReadingProvider, TarotReading, parse_reading, tool_parameters, user_message};
use crate::error::ProviderError;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Fallback provider: Anthropic's messages API.
pub struct AnthropicProvider {
    api_key: SecretString,
    model: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ReadingProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "claude"
    }

    async fn draw(&self, question: &str) -> Result<TarotReading, ProviderError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": 1024,
            "system": super::SYSTEM_PROMPT,
            "messages": [
                { "role": "user", "content": user_message(question) },
            ],
            "tools": [{
                "name": super::TOOL_NAME,
                "description": super::TOOL_DESCRIPTION,
                "input_schema": tool_parameters(),
            }],
            "tool_choice": { "type": "tool", "name": super::TOOL_NAME },
        });

        let resp = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed {
                provider: self.name().to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(ProviderError::RequestFailed {
                provider: self.name().to_string(),
                reason: format!("{status}: {detail}"),
            });
        }

        let data: serde_json::Value =
            resp.json().await.map_err(|e| ProviderError::InvalidResponse {
                provider: self.name().to_string(),
                reason: format!("response body is not JSON: {e}"),
            })?;

        let block = data
            .pointer("/content/0")
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: self.name().to_string(),
                reason: "empty content in response".to_string(),
            })?;

        let is_tool_use = block.get("type").and_then(|t| t.as_str()) == Some("tool_use")
            && block.get("name").and_then(|n| n.as_str()) == Some(super::TOOL_NAME);
        if !is_tool_use {
            return Err(ProviderError::InvalidResponse {
                provider: self.name().to_string(),
                reason: "no tool_use block in response".to_string(),
            });
        }

        let payload = block
            .get("input")
            .cloned()
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: self.name().to_string(),
                reason: "tool_use block has no input".to_string(),
            })?;

        parse_reading(payload, self.name())
    }
}
