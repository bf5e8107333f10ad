use serde_json::json;
use std::time::Duration;
use tracing::{error, warn};

use crate::config::{TelegramConfig, URL_TELEGRAM_API};

const PUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Telegram push sink. Fire-and-forget: a failed push is logged and the
/// cycle goes on.
pub struct Notifier {
    telegram: Option<TelegramConfig>,
}

impl Notifier {
    pub fn new(telegram: Option<TelegramConfig>) -> Notifier {
        Notifier { telegram }
    }

    pub async fn notify(&self, title: &str, body: &str) -> bool {
        let Some(telegram) = &self.telegram else {
            warn!("no notification service configured, dropping: [{title}]");
            return false;
        };

        let url = format!("{URL_TELEGRAM_API}/bot{}/sendMessage", telegram.bot_token);
        let payload = json!({
            "chat_id": telegram.chat_id,
            "text": format!("[{title}]\n{body}"),
        });

        match reqwest::Client::new()
            .post(&url)
            .timeout(PUSH_TIMEOUT)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                error!("telegram push refused: {}", response.status());
                false
            }
            Err(e) => {
                error!("telegram push failed: {e}");
                false
            }
        }
    }
}
