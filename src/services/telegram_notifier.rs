use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config::AppConfig;
use crate::services::notification_service::{Notification, Notifier, NotifyError};

/// Sends notifications through the Bot API `sendMessage` method.
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_url: String,
    bot_token: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(api_url: &str, bot_token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.telegram_api_url, &config.telegram_bot_token)
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.bot_token)
    }
}

/// The request URL carries the bot token, which must never reach the logs.
fn redact(error: reqwest::Error) -> NotifyError {
    NotifyError::Http(error.without_url())
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.bot_token.is_empty() {
            return Err(NotifyError::NotConfigured);
        }

        let response: ApiResponse = self
            .client
            .post(self.send_message_url())
            .json(&json!({
                "chat_id": notification.chat_id,
                "text": notification.text,
                "parse_mode": "HTML",
            }))
            .send()
            .await
            .map_err(redact)?
            .json()
            .await
            .map_err(redact)?;

        if !response.ok {
            return Err(NotifyError::Api(
                response.description.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_message_url() {
        let notifier = TelegramNotifier::new("https://api.telegram.org/", "123:ABC");
        assert_eq!(notifier.send_message_url(), "https://api.telegram.org/bot123:ABC/sendMessage");
    }

    #[tokio::test]
    async fn test_failed_delivery_does_not_expose_token() {
        // Nothing listens on the discard port, so the request fails to connect.
        let notifier = TelegramNotifier::new("http://127.0.0.1:9", "123456:SECRET-BOT-TOKEN");
        let notification = Notification {
            chat_id: 1,
            text: "hello".to_string(),
            kind: crate::services::notification_service::NotificationKind::Direct,
        };

        let err = notifier.send(&notification).await.unwrap_err();
        assert!(matches!(err, NotifyError::Http(_)));
        let message = err.to_string();
        assert!(!message.contains("SECRET-BOT-TOKEN"), "{}", message);
        assert!(!message.contains("/bot"), "{}", message);
    }
}
