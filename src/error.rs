//! Error types for arcana.
//!
//! One enum per subsystem; handlers degrade store and provider failures
//! into user-visible messages, so only gateway errors propagate.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Persistence-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open store: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Telegram gateway errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP request to Telegram failed: {0}")]
    Http(String),

    #[error("Telegram API call {method} failed: {detail}")]
    Api { method: String, detail: String },

    #[error("Unexpected response from {method}: {detail}")]
    InvalidResponse { method: String, detail: String },
}

/// AI completion provider errors.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("All providers failed: {summary}")]
    AllProvidersFailed { summary: String },
}
