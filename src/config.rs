//! Configuration — read once from the environment at startup.
//!
//! Handlers never touch `std::env`; they get an immutable `Config`
//! behind an `Arc` through the webhook state.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Process-wide bot configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot token.
    pub bot_token: SecretString,
    /// Expected value of the `X-Telegram-Bot-Api-Secret-Token` header.
    /// When unset, the header is not checked.
    pub webhook_secret: Option<String>,
    /// When set, updates from any other chat are silently acknowledged.
    pub designated_chat: Option<i64>,
    /// Groq API key (primary provider).
    pub groq_api_key: SecretString,
    /// Groq model name.
    pub groq_model: String,
    /// Anthropic API key (fallback provider).
    pub anthropic_api_key: SecretString,
    /// Anthropic model name.
    pub anthropic_model: String,
    /// Base URL under which the card images are hosted.
    pub image_base_url: String,
    /// Chat used as the upload target by the provisioning tool.
    pub admin_chat: Option<i64>,
    /// Path to the local store database.
    pub db_path: String,
    /// Webhook bind address.
    pub bind_addr: String,
    /// Daily reading limit for non-admin users.
    pub daily_limit: u32,
}

impl Config {
    /// Build the configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bot_token: SecretString::from(required("TELEGRAM_BOT_TOKEN")?),
            webhook_secret: optional("TELEGRAM_SECRET_TOKEN"),
            designated_chat: optional_i64("DESIGNATED_CHAT_ID")?,
            groq_api_key: SecretString::from(required("GROQ_API_KEY")?),
            groq_model: optional("GROQ_MODEL").unwrap_or_else(|| "llama3-8b-8192".to_string()),
            anthropic_api_key: SecretString::from(required("ANTHROPIC_API_KEY")?),
            anthropic_model: optional("ANTHROPIC_MODEL")
                .unwrap_or_else(|| "claude-3-sonnet-20240229".to_string()),
            image_base_url: required("IMAGE_BASE_URL")?,
            admin_chat: optional_i64("ADMIN_CHAT_ID")?,
            db_path: optional("ARCANA_DB_PATH").unwrap_or_else(|| "./data/arcana.db".to_string()),
            bind_addr: optional("ARCANA_BIND").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            daily_limit: optional_u32("ARCANA_DAILY_LIMIT")?.unwrap_or(3),
        })
    }
}

fn required(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn optional_i64(key: &str) -> Result<Option<i64>, ConfigError> {
    optional(key)
        .map(|v| {
            v.parse::<i64>().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
}

fn optional_u32(key: &str) -> Result<Option<u32>, ConfigError> {
    optional(key)
        .map(|v| {
            v.parse::<u32>().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
}
