//! Arcana — Telegram tarot-reading bot.
//!
//! A webhook receives Telegram updates, routes them to one of three
//! command handlers, and replies through the Bot API. Readings come
//! from an AI provider chain (Groq, then Anthropic) forced into a
//! structured card/orientation/interpretation triple; state (enabled
//! flag, daily usage counters, image mappings) lives in a libSQL store.

pub mod commands;
pub mod config;
pub mod error;
pub mod gateway;
pub mod meanings;
pub mod providers;
pub mod store;
pub mod webhook;
