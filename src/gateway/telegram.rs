//! Telegram Bot API client.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use super::{Gateway, MemberRole};
use crate::error::GatewayError;

/// Real gateway speaking to `api.telegram.org`.
pub struct TelegramGateway {
    bot_token: SecretString,
    client: reqwest::Client,
}

impl TelegramGateway {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{method}",
            self.bot_token.expose_secret()
        )
    }

    /// POST a JSON body to a Bot API method and return the parsed response.
    async fn call(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                method: method.to_string(),
                detail: format!("{status}: {detail}"),
            });
        }

        let data: serde_json::Value =
            resp.json().await.map_err(|e| GatewayError::InvalidResponse {
                method: method.to_string(),
                detail: format!("body is not JSON: {e}"),
            })?;

        if data.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            return Err(GatewayError::Api {
                method: method.to_string(),
                detail: data.to_string(),
            });
        }

        Ok(data)
    }
}

#[async_trait]
impl Gateway for TelegramGateway {
    /// Send a text message, Markdown first with a plain-text retry.
    ///
    /// Telegram rejects the whole message when Markdown entities do not
    /// parse, so a formatting error must not swallow the reply.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), GatewayError> {
        let markdown = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });
        if self.call("sendMessage", markdown).await.is_ok() {
            return Ok(());
        }

        warn!(chat_id, "sendMessage with Markdown failed; retrying without parse_mode");
        let plain = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        self.call("sendMessage", plain).await.map(|_| ())
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo: &str,
        caption: &str,
    ) -> Result<(), GatewayError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "photo": photo,
            "caption": caption,
            "parse_mode": "Markdown",
        });
        self.call("sendPhoto", body).await.map(|_| ())
    }

    async fn member_role(&self, chat_id: i64, user_id: i64) -> Result<MemberRole, GatewayError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "user_id": user_id,
        });
        let data = self.call("getChatMember", body).await?;

        let status = data
            .pointer("/result/status")
            .and_then(|v| v.as_str())
            .ok_or_else(|| GatewayError::InvalidResponse {
                method: "getChatMember".to_string(),
                detail: "missing result.status".to_string(),
            })?;

        Ok(MemberRole::from_status(status))
    }

    /// Upload a photo by sending it to a chat; Telegram stores it and
    /// hands back a reusable file_id (first photo size is enough).
    async fn upload_photo(&self, chat_id: i64, url: &str) -> Result<String, GatewayError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "photo": url,
        });
        let data = self.call("sendPhoto", body).await?;

        data.pointer("/result/photo/0/file_id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| GatewayError::InvalidResponse {
                method: "sendPhoto".to_string(),
                detail: "missing result.photo[0].file_id".to_string(),
            })
    }
}
