//! Command handlers and the prefix router.

pub mod help;
pub mod reading;
pub mod togglebot;

/// The three user-facing commands. Anything unrecognized (including an
/// empty message) falls back to help.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    ToggleBot,
    Reading,
}

impl Command {
    /// Route a message by prefix, checked in order.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.starts_with("/start") || text.starts_with("/help") {
            Command::Help
        } else if text.starts_with("/togglebot") {
            Command::ToggleBot
        } else if text.starts_with("/reading") {
            Command::Reading
        } else {
            Command::Help
        }
    }
}
