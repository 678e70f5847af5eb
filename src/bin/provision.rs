//! Offline provisioning tool.
//!
//! Uploads both orientation images for every deck card to Telegram (via
//! the admin chat) and records the returned file_ids in the store, so
//! the reading handler can send cached photos instead of re-fetching
//! from the image host.
//!
//! Usage: `provision [base_url]` — defaults to `IMAGE_BASE_URL`.
//! Image naming convention: `<Card_Name>_<Orientation>.jpg`.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info};

use arcana::config::Config;
use arcana::gateway::{Gateway, TelegramGateway};
use arcana::meanings::{DECK, image_file_name};
use arcana::providers::Orientation;
use arcana::store::{LibSqlStore, ReadingStore};

/// Pause between cards to stay under Telegram's upload rate limits.
const UPLOAD_DELAY: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    let admin_chat = config
        .admin_chat
        .context("ADMIN_CHAT_ID must be set for provisioning")?;

    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.image_base_url.clone());
    let base_url = base_url.trim_end_matches('/').to_string();

    let gateway = TelegramGateway::new(config.bot_token.clone());
    let store = LibSqlStore::new_local(Path::new(&config.db_path))
        .await
        .with_context(|| format!("failed to open store at {}", config.db_path))?;

    info!(base_url, cards = DECK.len(), "starting image upload");

    let mut uploaded = 0u32;
    let mut failed = 0u32;

    for card in DECK {
        for orientation in [Orientation::Upright, Orientation::Reversed] {
            let image_name = image_file_name(card, orientation);
            let url = format!("{base_url}/{image_name}");

            match provision_one(&gateway, &store, admin_chat, card, orientation, &url).await {
                Ok(file_id) => {
                    info!(card, orientation = %orientation, file_id = %file_id, "stored image reference");
                    uploaded += 1;
                }
                Err(e) => {
                    error!(card, orientation = %orientation, error = %e, "upload failed");
                    failed += 1;
                }
            }
        }
        tokio::time::sleep(UPLOAD_DELAY).await;
    }

    info!(uploaded, failed, "image upload complete");
    Ok(())
}

async fn provision_one(
    gateway: &TelegramGateway,
    store: &LibSqlStore,
    admin_chat: i64,
    card: &str,
    orientation: Orientation,
    url: &str,
) -> anyhow::Result<String> {
    let file_id = gateway.upload_photo(admin_chat, url).await?;
    store.set_image_ref(card, orientation, &file_id).await?;
    Ok(file_id)
}
