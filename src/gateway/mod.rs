//! Messaging gateway abstraction.
//!
//! Command handlers talk to a `Gateway` trait object so tests can swap
//! in a recording stub; `TelegramGateway` is the real Bot API client.

pub mod telegram;

pub use telegram::TelegramGateway;

use async_trait::async_trait;

use crate::error::GatewayError;

/// A participant's role in a chat, as reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRole {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
    Unknown,
}

impl MemberRole {
    /// Creator and administrator count as admin; everything else does not.
    pub fn is_admin(self) -> bool {
        matches!(self, MemberRole::Creator | MemberRole::Administrator)
    }

    pub fn from_status(status: &str) -> Self {
        match status {
            "creator" => MemberRole::Creator,
            "administrator" => MemberRole::Administrator,
            "member" => MemberRole::Member,
            "restricted" => MemberRole::Restricted,
            "left" => MemberRole::Left,
            "kicked" => MemberRole::Kicked,
            _ => MemberRole::Unknown,
        }
    }
}

/// Outbound messaging operations the handlers depend on.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Send a text message to a chat.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), GatewayError>;

    /// Send a photo (Telegram file_id or URL) with a caption.
    async fn send_photo(&self, chat_id: i64, photo: &str, caption: &str)
    -> Result<(), GatewayError>;

    /// Query a user's role in a chat.
    async fn member_role(&self, chat_id: i64, user_id: i64) -> Result<MemberRole, GatewayError>;

    /// Upload a photo by URL into a chat and return the provider-assigned
    /// file_id of the stored photo.
    async fn upload_photo(&self, chat_id: i64, url: &str) -> Result<String, GatewayError>;
}
