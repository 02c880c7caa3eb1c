use anyhow::{Result, bail};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Clone)]
struct TelegramTarget {
    bot_token: String,
    chat_id: String,
}

/// Fire-and-forget chat notifications. Disabled unless both the bot token and
/// chat id are configured.
#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    target: Option<TelegramTarget>,
}

impl Notifier {
    pub fn new(config: &Config) -> Self {
        let target = match (&config.telegram_bot_token, &config.telegram_chat_id) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramTarget {
                bot_token: bot_token.clone(),
                chat_id: chat_id.clone(),
            }),
            _ => None,
        };

        Self {
            client: reqwest::Client::new(),
            target,
        }
    }

    pub fn disabled() -> Self {
        Self {
            client: reqwest::Client::new(),
            target: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }

    /// Sends `message` in the background. Failures are logged and never reach
    /// the caller.
    pub fn dispatch(&self, message: String) {
        if !self.is_enabled() {
            debug!("Telegram not configured, skipping notification");
            return;
        }

        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send(&message).await {
                warn!("Failed to send Telegram notification: {:#}", e);
            }
        });
    }

    pub async fn send(&self, message: &str) -> Result<()> {
        let Some(target) = &self.target else {
            bail!("telegram configuration missing");
        };

        let body = TelegramMessage {
            chat_id: &target.chat_id,
            text: message,
            parse_mode: "HTML",
        };

        let response = self
            .client
            .post(format!(
                "{}/bot{}/sendMessage",
                TELEGRAM_API_BASE, target.bot_token
            ))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("failed to send telegram message: {}", response.status());
        }
        Ok(())
    }
}
