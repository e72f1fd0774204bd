use std::future::Future;

use serde_json::json;
use tracing::{debug, warn};

use crate::config;
use crate::http::REQUEST_TIMEOUT;

/// Delivery of one HTML-formatted message. `false` means it was not delivered.
pub trait Notifier {
    fn send(&self, text: &str) -> impl Future<Output = bool>;
}

pub struct Telegram {
    client: reqwest::Client,
    settings: config::Telegram,
}

impl Telegram {
    pub fn new(client: reqwest::Client, settings: config::Telegram) -> Self {
        Self { client, settings }
    }

    fn endpoint(&self, token: &str) -> String {
        let base = self.settings.api_url.as_str().trim_end_matches('/');
        format!("{base}/bot{token}/sendMessage")
    }
}

impl Notifier for Telegram {
    async fn send(&self, text: &str) -> bool {
        let (Some(token), Some(chat_id)) = (&self.settings.token, &self.settings.chat_id) else {
            debug!("telegram token or chat id not configured, message dropped");
            return false;
        };

        let result = self
            .client
            .post(self.endpoint(token))
            .timeout(REQUEST_TIMEOUT)
            .json(&json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "HTML",
            }))
            .send()
            .await
            .and_then(|resp| resp.error_for_status());

        match result {
            Ok(_) => true,
            Err(e) => {
                // The error text embeds the URL, and with it the bot token.
                warn!(status = ?e.status(), "telegram sendMessage failed");
                false
            }
        }
    }
}
