use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use arcana::config::Config;
use arcana::gateway::{Gateway, TelegramGateway};
use arcana::providers::{AnthropicProvider, FailoverReader, GroqProvider, ReadingProvider};
use arcana::store::{LibSqlStore, ReadingStore};
use arcana::webhook::{AppState, webhook_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Arc::new(Config::from_env().context("failed to load configuration")?);

    let store: Arc<dyn ReadingStore> = Arc::new(
        LibSqlStore::new_local(Path::new(&config.db_path))
            .await
            .with_context(|| format!("failed to open store at {}", config.db_path))?,
    );

    let gateway: Arc<dyn Gateway> = Arc::new(TelegramGateway::new(config.bot_token.clone()));

    // Groq first, Anthropic as the fallback.
    let providers: Vec<Arc<dyn ReadingProvider>> = vec![
        Arc::new(GroqProvider::new(
            config.groq_api_key.clone(),
            config.groq_model.clone(),
        )),
        Arc::new(AnthropicProvider::new(
            config.anthropic_api_key.clone(),
            config.anthropic_model.clone(),
        )),
    ];
    let reader = Arc::new(FailoverReader::new(providers));

    let state = AppState {
        config: Arc::clone(&config),
        gateway,
        store,
        reader,
    };

    let app = webhook_routes(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "webhook listening");
    axum::serve(listener, app).await?;

    Ok(())
}
