//! Webhook surface — receives Telegram updates and dispatches commands.
//!
//! The transport contract: 405 for non-POST (axum method routing), 401
//! for a bad secret header, and 200 "OK" for everything else — including
//! filtered-out chats and handler failures. Telegram re-delivers updates
//! on non-2xx responses, so internal failures are logged, never surfaced.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::commands::{self, Command};
use crate::config::Config;
use crate::gateway::Gateway;
use crate::providers::FailoverReader;
use crate::store::ReadingStore;

/// Header Telegram echoes back when a webhook secret is configured.
pub const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: Arc<dyn Gateway>,
    pub store: Arc<dyn ReadingStore>,
    pub reader: Arc<FailoverReader>,
}

/// Inbound update, with every field tolerated as absent.
#[derive(Debug, Default, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub chat: Option<Chat>,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct User {
    pub id: i64,
}

/// Build the webhook router.
pub fn webhook_routes(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(handle_update))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "arcana",
    }))
}

async fn handle_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    // Authenticate before looking at the body at all.
    if let Some(expected) = &state.config.webhook_secret {
        let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            warn!("webhook call with missing or invalid secret token");
            return (StatusCode::UNAUTHORIZED, "Unauthorized");
        }
    }

    let update: Update = match serde_json::from_str(&body) {
        Ok(update) => update,
        Err(e) => {
            // Acknowledge anyway; a non-2xx would make Telegram
            // re-deliver the same unparseable payload forever.
            warn!(error = %e, "unparseable update body; ignoring");
            return (StatusCode::OK, "OK");
        }
    };

    let Some(message) = update.message else {
        // Not a message update; nothing for us to do.
        return (StatusCode::OK, "OK");
    };

    let Some(chat_id) = message.chat.map(|c| c.id) else {
        warn!("message update without a chat; ignoring");
        return (StatusCode::OK, "OK");
    };

    if let Some(designated) = state.config.designated_chat
        && chat_id != designated
    {
        info!(chat_id, "ignoring message from non-designated chat");
        return (StatusCode::OK, "OK");
    }

    let user_id = message.from.map(|u| u.id).unwrap_or_default();
    let text = message.text.unwrap_or_default();

    match Command::parse(&text) {
        Command::Help => {
            if let Err(e) = commands::help::handle(&state, chat_id).await {
                error!(chat_id, error = %e, "help command failed");
            }
        }
        Command::ToggleBot => {
            if let Err(e) = commands::togglebot::handle(&state, chat_id, user_id).await {
                error!(chat_id, error = %e, "togglebot command failed");
            }
        }
        Command::Reading => {
            // The reading handler converts its own failures into a
            // user-visible apology; nothing propagates here.
            commands::reading::handle(&state, chat_id, user_id, &text).await;
        }
    }

    (StatusCode::OK, "OK")
}
