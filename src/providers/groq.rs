//! Groq backend — OpenAI-compatible chat completions with a forced tool call.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::{ReadingProvider, TarotReading, parse_reading, tool_parameters, user_message};
use crate::error::ProviderError;

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Primary provider: Groq's OpenAI-compatible chat completions API.
pub struct GroqProvider {
    api_key: SecretString,
    model: String,
    client: reqwest::Client,
}

impl GroqProvider {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ReadingProvider for GroqProvider {
    fn name(&self) -> &'static str {
        "groq"
    }

    async fn draw(&self, question: &str) -> Result<TarotReading, ProviderError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": super::SYSTEM_PROMPT },
                { "role": "user", "content": user_message(question) },
            ],
            "tools": [{
                "type": "function",
                "function": {
                    "name": super::TOOL_NAME,
                    "description": super::TOOL_DESCRIPTION,
                    "parameters": tool_parameters(),
                },
            }],
            "tool_choice": { "type": "function", "function": { "name": super::TOOL_NAME } },
        });

        let resp = self
            .client
            .post(GROQ_API_URL)
            .bearer_auth(self.api_key.expose_secret())
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

        // The tool call we forced; its absence is a retryable failure.
        let arguments = data
            .pointer("/choices/0/message/tool_calls/0/function/arguments")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: self.name().to_string(),
                reason: "no tool call in response".to_string(),
            })?;

        let payload: serde_json::Value =
            serde_json::from_str(arguments).map_err(|e| ProviderError::InvalidResponse {
                provider: self.name().to_string(),
                reason: format!("tool arguments are not JSON: {e}"),
            })?;

        parse_reading(payload, self.name())
    }
}
