//! `/reading <question>` — the main command.
//!
//! Precondition order matters and each check short-circuits with its
//! own message and no side effects: question present, bot enabled,
//! admin status, rate limit. A failed draw or a missing meaning does
//! not consume a rate-limit slot; the usage counter moves only after
//! the reading was actually delivered.

use chrono::Utc;
use tracing::{debug, error, warn};

use crate::error::GatewayError;
use crate::meanings;
use crate::providers::{Orientation, TarotReading};
use crate::webhook::AppState;

pub const MSG_USAGE: &str =
    "Please provide a question for your reading. Example: /reading Will I succeed?";
pub const MSG_DISABLED: &str = "The bot is currently disabled by an admin.";
pub const MSG_RATE_LIMITED: &str =
    "You have reached your daily limit of 3 readings. Please try again tomorrow.";
pub const MSG_SHUFFLING: &str = "Shuffling the deck and drawing a card for you...";
pub const MSG_GENERATION_FAILED: &str =
    "An error occurred while generating your reading. Please try again.";
pub const MSG_SERVICE_UNAVAILABLE: &str =
    "The service is unavailable at the moment. Please try again later.";

pub async fn handle(state: &AppState, chat_id: i64, user_id: i64, text: &str) {
    if let Err(e) = run(state, chat_id, user_id, text).await {
        error!(chat_id, user_id, error = %e, "reading command failed");
        if let Err(send_err) = state
            .gateway
            .send_message(chat_id, MSG_SERVICE_UNAVAILABLE)
            .await
        {
            error!(chat_id, error = %send_err, "failed to deliver apology message");
        }
    }
}

async fn run(state: &AppState, chat_id: i64, user_id: i64, text: &str) -> Result<(), GatewayError> {
    let question = extract_question(text);
    if question.is_empty() {
        state.gateway.send_message(chat_id, MSG_USAGE).await?;
        return Ok(());
    }

    // Store failure degrades to the default (enabled) rather than
    // blocking every reading on a flaky store.
    let bot_state = match state.store.bot_state().await {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "failed to read bot state; assuming enabled");
            Default::default()
        }
    };
    if !bot_state.enabled {
        state.gateway.send_message(chat_id, MSG_DISABLED).await?;
        return Ok(());
    }

    // Role-query failure counts as non-admin.
    let is_admin = match state.gateway.member_role(chat_id, user_id).await {
        Ok(role) => role.is_admin(),
        Err(e) => {
            warn!(chat_id, user_id, error = %e, "admin check failed; treating as non-admin");
            false
        }
    };

    let today = Utc::now().format("%Y-%m-%d").to_string();
    let user_key = user_id.to_string();

    if !is_admin {
        let count = match state.store.usage(&user_key, &today).await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "failed to read usage; assuming 0");
                0
            }
        };
        if count >= state.config.daily_limit {
            state.gateway.send_message(chat_id, MSG_RATE_LIMITED).await?;
            return Ok(());
        }
    }

    // Best-effort acknowledgment while the draw is in flight.
    if let Err(e) = state.gateway.send_message(chat_id, MSG_SHUFFLING).await {
        warn!(chat_id, error = %e, "failed to send shuffling message");
    }

    let (reading, accounting) = match state.reader.draw(question).await {
        Ok(drawn) => drawn,
        Err(e) => {
            error!(error = %e, "reading generation failed");
            state
                .gateway
                .send_message(chat_id, MSG_GENERATION_FAILED)
                .await?;
            return Ok(());
        }
    };
    debug!(?accounting, card = %reading.card, orientation = %reading.orientation, "card drawn");

    let Some(meaning) = meanings::general_meaning(&reading.card, reading.orientation) else {
        error!(
            card = %reading.card,
            orientation = %reading.orientation,
            "no general meaning found"
        );
        let not_found = format!(
            "I drew {} ({}) but could not find its general meaning. Please try again.",
            reading.card, reading.orientation
        );
        state.gateway.send_message(chat_id, &not_found).await?;
        return Ok(());
    };

    let caption = format_caption(&reading, meaning);
    let photo = photo_reference(state, &reading.card, reading.orientation).await;

    if let Err(e) = state.gateway.send_photo(chat_id, &photo, &caption).await {
        // Never drop a generated reading over a photo problem.
        warn!(chat_id, error = %e, "photo delivery failed; falling back to text");
        state.gateway.send_message(chat_id, &caption).await?;
    }

    if !is_admin {
        match state.store.increment_usage(&user_key, &today).await {
            Ok(count) => debug!(user_id, count, "usage incremented"),
            Err(e) => error!(user_id, error = %e, "failed to increment usage"),
        }
    }

    Ok(())
}

/// Strip the command prefix; whatever remains is the question.
fn extract_question(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix("/reading").unwrap_or(text).trim()
}

fn format_caption(reading: &TarotReading, meaning: &str) -> String {
    format!(
        "**{} ({})**\n*General Meaning: {}*\n*Interpretation: {}*",
        reading.card, reading.orientation, meaning, reading.interpretation
    )
}

/// Prefer the provisioned Telegram file_id; fall back to the
/// deterministic image URL under the configured base.
async fn photo_reference(state: &AppState, card: &str, orientation: Orientation) -> String {
    match state.store.image_ref(card, orientation).await {
        Ok(Some(file_id)) => file_id,
        Ok(None) => derived_image_url(&state.config.image_base_url, card, orientation),
        Err(e) => {
            warn!(card, error = %e, "image mapping lookup failed; using derived URL");
            derived_image_url(&state.config.image_base_url, card, orientation)
        }
    }
}

fn derived_image_url(base_url: &str, card: &str, orientation: Orientation) -> String {
    format!(
        "{}/tarot-images/{}",
        base_url.trim_end_matches('/'),
        meanings::image_file_name(card, orientation)
    )
}
