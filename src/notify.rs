//! Best-effort delivery of analysis results to a chat channel

use crate::constants::{
    REQUEST_TIMEOUT_SECS, TELEGRAM_API_URL, TELEGRAM_BOT_TOKEN_ENV, TELEGRAM_CHAT_ID_ENV,
    USER_AGENT,
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Trait for notification sinks
///
/// Delivery is best-effort by contract: a failed or disabled notification
/// is logged and forgotten, and never affects what the tracker records.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one message
    async fn notify(&self, message: &str);
}

/// Telegram notification sink
///
/// Enabled only when both the bot token and the chat id are configured;
/// otherwise every `notify` is a silent no-op, so the tracker runs the
/// same with or without a channel wired up.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Option<Client>,
    token: Option<String>,
    chat_id: Option<String>,
}

impl TelegramNotifier {
    /// Creates a notifier with explicit credentials (or none)
    pub fn new(token: Option<String>, chat_id: Option<String>) -> Self {
        let client = if token.is_some() && chat_id.is_some() {
            match Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .user_agent(USER_AGENT)
                .build()
            {
                Ok(client) => Some(client),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Failed to build Telegram client, notifications disabled"
                    );
                    None
                }
            }
        } else {
            None
        };

        Self {
            client,
            token,
            chat_id,
        }
    }

    /// Creates a notifier from `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID`
    pub fn from_env() -> Self {
        Self::new(
            std::env::var(TELEGRAM_BOT_TOKEN_ENV).ok(),
            std::env::var(TELEGRAM_CHAT_ID_ENV).ok(),
        )
    }

    /// True when credentials and an HTTP client are in place
    pub fn is_enabled(&self) -> bool {
        self.client.is_some() && self.token.is_some() && self.chat_id.is_some()
    }
}

impl Default for TelegramNotifier {
    fn default() -> Self {
        Self::from_env()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, message: &str) {
        let (Some(client), Some(token), Some(chat_id)) = (&self.client, &self.token, &self.chat_id)
        else {
            tracing::debug!("Telegram notifications disabled, dropping message");
            return;
        };

        let url = format!("{}/bot{}/sendMessage", TELEGRAM_API_URL, token);

        let payload = serde_json::json!({
            "chat_id": chat_id,
            "text": message,
            "parse_mode": "HTML",
            "disable_web_page_preview": true
        });

        match client.post(&url).json(&payload).send().await {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    tracing::warn!(%status, "Telegram API error");
                    if let Ok(text) = response.text().await {
                        tracing::warn!("Telegram API response: {}", text);
                    }
                } else {
                    tracing::debug!("Telegram notification sent successfully");
                }
            }
            Err(e) => {
                tracing::warn!("Failed to send Telegram notification: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_notifier_drops_messages_silently() {
        let notifier = TelegramNotifier::new(None, None);
        assert!(!notifier.is_enabled());
        // Must complete without credentials and without a network call.
        notifier.notify("hello").await;
    }

    #[test]
    fn partial_credentials_leave_the_notifier_disabled() {
        let notifier = TelegramNotifier::new(Some("token".into()), None);
        assert!(!notifier.is_enabled());

        let notifier = TelegramNotifier::new(None, Some("chat".into()));
        assert!(!notifier.is_enabled());

        let notifier = TelegramNotifier::new(Some("token".into()), Some("chat".into()));
        assert!(notifier.is_enabled());
    }
}
