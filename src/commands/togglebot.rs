//! `/togglebot` — admins flip the bot-enabled flag.

use tracing::{error, info, warn};

use crate::error::GatewayError;
use crate::webhook::AppState;

pub const MSG_ADMINS_ONLY: &str = "Only admins can use this command.";
pub const MSG_NOW_ENABLED: &str = "Bot is now enabled.";
pub const MSG_NOW_DISABLED: &str = "Bot is now disabled.";
pub const MSG_TOGGLE_FAILED: &str =
    "An error occurred while toggling the bot state. Please try again later.";

pub async fn handle(state: &AppState, chat_id: i64, user_id: i64) -> Result<(), GatewayError> {
    let is_admin = match state.gateway.member_role(chat_id, user_id).await {
        Ok(role) => role.is_admin(),
        Err(e) => {
            warn!(chat_id, user_id, error = %e, "admin check failed; treating as non-admin");
            false
        }
    };

    if !is_admin {
        return state.gateway.send_message(chat_id, MSG_ADMINS_ONLY).await;
    }

    match state.store.toggle_bot().await {
        Ok(new_state) => {
            info!(enabled = new_state.enabled, "bot state toggled by admin");
            let reply = if new_state.enabled {
                MSG_NOW_ENABLED
            } else {
                MSG_NOW_DISABLED
            };
            state.gateway.send_message(chat_id, reply).await
        }
        Err(e) => {
            error!(error = %e, "failed to toggle bot state");
            state.gateway.send_message(chat_id, MSG_TOGGLE_FAILED).await
        }
    }
}
