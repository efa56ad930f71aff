//! Telegram channel — relays memo notifications through the Bot API.
//!
//! Sends one `sendMessage` call per chat id, concurrently, using the
//! HTML rendering from the formatter plus an optional "Detail" link.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use secrecy::{ExposeSecret, SecretString};

use crate::channels::{DeliveryResult, NotifyChannel, check_response};
use crate::config::TelegramConfig;
use crate::error::ChannelError;
use crate::format::{FormattedMessage, escape_html};

const CHANNEL_NAME: &str = "telegram";

/// Telegram Bot API channel.
pub struct TelegramChannel {
    config: Arc<TelegramConfig>,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(config: Arc<TelegramConfig>, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Configured bot token, if present and non-empty.
    fn bot_token(&self) -> Option<&SecretString> {
        self.config
            .bot_token
            .as_ref()
            .filter(|t| !t.expose_secret().is_empty())
    }

    fn api_url(&self, token: &SecretString, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.config.api_base.trim_end_matches('/'),
            token.expose_secret()
        )
    }

    /// `sendMessage` body for one chat.
    fn message_body(&self, chat_id: &str, text: &str) -> serde_json::Value {
        serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": self.config.parse_mode,
            "disable_web_page_preview": true
        })
    }

    async fn send_to_chat(
        &self,
        token: &SecretString,
        chat_id: &str,
        text: &str,
    ) -> Result<(), ChannelError> {
        let response = self
            .client
            .post(self.api_url(token, "sendMessage"))
            .json(&self.message_body(chat_id, text))
            .send()
            .await
            // the request URL carries the bot token; keep it out of logs
            .map_err(|e| ChannelError::Http(e.without_url().to_string()))?;

        check_response(CHANNEL_NAME, response).await
    }
}

/// Append a link to the memo when a URL is available.
pub fn with_detail_link(text: &str, url: Option<&str>) -> String {
    match url.filter(|u| !u.is_empty()) {
        Some(u) => format!("{text}\n\n<a href=\"{}\">Detail</a>", escape_html(u)),
        None => text.to_string(),
    }
}

#[async_trait]
impl NotifyChannel for TelegramChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn send(
        &self,
        message: &FormattedMessage,
        creator: &str,
        url: Option<&str>,
    ) -> DeliveryResult {
        if !self.config.enabled {
            tracing::debug!("Telegram notification is disabled");
            return DeliveryResult::default();
        }

        let Some(token) = self.bot_token() else {
            tracing::warn!("Telegram bot token is not configured");
            return DeliveryResult::default();
        };

        let chat_ids = self.config.chat_ids.resolve(creator);
        if chat_ids.is_empty() {
            tracing::debug!(creator = %creator, "No Telegram chats configured for notification");
            return DeliveryResult::default();
        }

        let text = with_detail_link(&message.html, url);

        let sends = chat_ids.iter().map(|chat_id| {
            let text = text.as_str();
            async move {
                match self.send_to_chat(token, chat_id, text).await {
                    Ok(()) => {
                        tracing::debug!(chat_id = %chat_id, "Telegram message sent");
                        true
                    }
                    Err(e @ ChannelError::SendFailed { .. }) => {
                        tracing::warn!(chat_id = %chat_id, error = %e, "Telegram message rejected");
                        false
                    }
                    Err(e) => {
                        tracing::error!(chat_id = %chat_id, error = %e, "Error sending Telegram message");
                        false
                    }
                }
            }
        });
        let outcomes = join_all(sends).await;

        let result = DeliveryResult::from_outcomes(&outcomes);
        tracing::info!(
            total = result.total,
            success = result.success,
            failed = result.failure,
            "Telegram message fan-out complete"
        );
        result
    }
}

// ── Tests ───────────────────────────────────────────────────────────
