//! `/help` (and `/start`, and everything unrecognized).

use crate::error::GatewayError;
use crate::webhook::AppState;

pub const HELP_TEXT: &str = "The following commands are available:

/start - Start the bot

/help - Get help from the bot

/reading <question> - Get a tarot card reading for your question

/togglebot - Enable or disable the bot (admin only)
";

/// Send the fixed command reference.
pub async fn handle(state: &AppState, chat_id: i64) -> Result<(), GatewayError> {
    state.gateway.send_message(chat_id, HELP_TEXT).await
}
