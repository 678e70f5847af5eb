//! AI completion providers for tarot readings.
//!
//! Two interchangeable backends (Groq primary, Anthropic fallback), both
//! forced through a `tarot_reading` tool call so the model returns a
//! structured `{card, orientation, interpretation}` triple instead of
//! free-running prose. `FailoverReader` wraps them in the
//! retry-then-failover chain.

pub mod anthropic;
pub mod failover;
pub mod groq;

pub use anthropic::AnthropicProvider;
pub use failover::{DrawAccounting, FailoverReader};
pub use groq::GroqProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Card facing. Affects both the general meaning and the image variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Upright,
    Reversed,
}

impl Orientation {
    /// Lowercase form used in meaning keys and API payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Upright => "upright",
            Orientation::Reversed => "reversed",
        }
    }

    /// Capitalized form used in image file names.
    pub fn capitalized(self) -> &'static str {
        match self {
            Orientation::Upright => "Upright",
            Orientation::Reversed => "Reversed",
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tarot draw: card, facing, and the contextual interpretation.
#[derive(Debug, Clone, Deserialize)]
pub struct TarotReading {
    pub card: String,
    pub orientation: Orientation,
    pub interpretation: String,
}

/// Name of the forced tool call on both backends.
pub const TOOL_NAME: &str = "tarot_reading";

/// Description of the forced tool call.
pub const TOOL_DESCRIPTION: &str = "Generate a tarot card reading";

/// System instruction shared by both backends.
pub const SYSTEM_PROMPT: &str = "You are a skilled tarot reader using the Rider-Waite deck. \
Randomly select one card from the 78-card Rider-Waite tarot deck and determine if it's upright or reversed. \
Based on that card, provide a short interpretation in the context of the user's question. \
Your response should be a structured JSON object with the card name, orientation, and interpretation.";

/// JSON schema for the `tarot_reading` tool parameters.
pub fn tool_parameters() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "card": {
                "type": "string",
                "description": "The name of the tarot card",
            },
            "orientation": {
                "type": "string",
                "enum": ["upright", "reversed"],
                "description": "The orientation of the card",
            },
            "interpretation": {
                "type": "string",
                "description": "The interpretation of the card in the context of the question",
            },
        },
        "required": ["card", "orientation", "interpretation"],
    })
}

/// Wrap the user question the way both backends expect it.
pub(crate) fn user_message(question: &str) -> String {
    format!("Question for tarot reading: {question}")
}

/// Parse and validate a tool-call payload into a `TarotReading`.
///
/// A payload missing any of the three fields, carrying an unknown
/// orientation, or with a blank card/interpretation is a provider
/// failure — the caller retries rather than using a partial triple.
pub(crate) fn parse_reading(
    payload: serde_json::Value,
    provider: &str,
) -> Result<TarotReading, ProviderError> {
    let reading: TarotReading =
        serde_json::from_value(payload).map_err(|e| ProviderError::InvalidResponse {
            provider: provider.to_string(),
            reason: format!("malformed tarot_reading payload: {e}"),
        })?;

    if reading.card.trim().is_empty() || reading.interpretation.trim().is_empty() {
        return Err(ProviderError::InvalidResponse {
            provider: provider.to_string(),
            reason: "tarot_reading payload has empty card or interpretation".to_string(),
        });
    }

    Ok(reading)
}

/// One AI completion backend.
#[async_trait]
pub trait ReadingProvider: Send + Sync {
    /// Short provider name for logs and error context.
    fn name(&self) -> &'static str;

    /// Draw one card for the given question.
    async fn draw(&self, question: &str) -> Result<TarotReading, ProviderError>;
}
