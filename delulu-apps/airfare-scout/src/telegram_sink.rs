//!  Delulu Airfare Scout
//!
//!  Copyright (C) 2026  Mamy Ratsimbazafy
//!
//!  This program is free software: you can redistribute it and/or modify
//!  it under the terms of the GNU Affero General Public License as published by
//!  the Free Software Foundation, either version 3 of the License, or
//!  (at your option) any later version.
//!
//!  This program is distributed in the hope that it will be useful,
//!  but WITHOUT ANY WARRANTY; without even the implied warranty of
//!  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//!  GNU Affero General Public License for more details.
//!
//!  You should have received a copy of the GNU Affero General Public License
//!  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Delivery of report messages to a Telegram chat through the Bot API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, ensure};
use serde::{Deserialize, Serialize};

use delulu_page_queues::PageQueue;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Bot API cap on a single message, counted in characters.
pub const MESSAGE_LIMIT: usize = 4096;

#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl TelegramConfig {
    /// `None` when either part is missing or blank.
    pub fn from_parts(bot_token: Option<String>, chat_id: Option<String>) -> Option<Self> {
        let bot_token = bot_token.filter(|t| !t.trim().is_empty())?;
        let chat_id = chat_id.filter(|c| !c.trim().is_empty())?;
        Some(Self {
            bot_token: bot_token.trim().to_string(),
            chat_id: chat_id.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Number of messages the text was sent as.
    Sent(usize),
    /// No bot token or chat id configured.
    Skipped,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Clone)]
pub struct TelegramSink {
    client: Arc<reqwest::Client>,
    config: Option<TelegramConfig>,
    api_base: String,
    queue: PageQueue,
}

impl TelegramSink {
    pub fn new(config: Option<TelegramConfig>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client: Arc::new(client),
            config,
            api_base: TELEGRAM_API_BASE.to_string(),
            queue: PageQueue::with_concurrency_limit(1)
                .max_retries(2)
                .settle_delay(Duration::from_millis(500)),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_queue(mut self, queue: PageQueue) -> Self {
        self.queue = queue;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    /// Sends `text` (legacy Markdown), split into several messages when it
    /// is over the Bot API limit.
    pub async fn send_text(&self, text: &str) -> Result<Delivery> {
        let Some(config) = &self.config else {
            tracing::warn!("Telegram bot token or chat id not set, skipping delivery");
            return Ok(Delivery::Skipped);
        };
        let url = format!("{}/bot{}/sendMessage", self.api_base, config.bot_token);

        let chunks = split_message(text, MESSAGE_LIMIT);
        for (i, chunk) in chunks.iter().enumerate() {
            self.queue
                .with_retry(|| {
                    let client = Arc::clone(&self.client);
                    let url = url.clone();
                    let chat_id = config.chat_id.clone();
                    let chunk = chunk.clone();
                    async move { post_message(&client, &url, &chat_id, &chunk).await }
                })
                .await
                .with_context(|| {
                    format!(
                        "Telegram delivery to chat {} failed (part {}/{})",
                        config.chat_id,
                        i + 1,
                        chunks.len()
                    )
                })?;
        }
        tracing::info!(
            "Sent {} Telegram message(s) to chat {}",
            chunks.len(),
            config.chat_id
        );
        Ok(Delivery::Sent(chunks.len()))
    }
}

async fn post_message(client: &reqwest::Client, url: &str, chat_id: &str, text: &str) -> Result<()> {
    // reqwest errors embed the URL, which carries the bot token.
    let response = client
        .post(url)
        .json(&SendMessage {
            chat_id,
            text,
            parse_mode: "Markdown",
        })
        .send()
        .await
        .map_err(|e| anyhow!(e.without_url()))?;

    let status = response.status();
    let body: Option<ApiResponse> = response.json().await.ok();
    let description = body
        .as_ref()
        .and_then(|b| b.description.clone())
        .unwrap_or_default();
    ensure!(
        status.is_success(),
        "Telegram API returned {}: {}",
        status,
        description
    );
    ensure!(
        body.is_some_and(|b| b.ok),
        "Telegram API rejected the message: {}",
        description
    );
    Ok(())
}

/// Splits `text` into parts of at most `limit` characters, on line breaks
/// where possible.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > limit && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > limit {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                parts.push(piece.iter().collect());
            }
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_requires_both_parts() {
        assert!(TelegramConfig::from_parts(Some("123:abc".into()), Some("42".into())).is_some());
        assert!(TelegramConfig::from_parts(Some("123:abc".into()), None).is_none());
        assert!(TelegramConfig::from_parts(Some("  ".into()), Some("42".into())).is_none());
    }

    #[test]
    fn test_config_debug_hides_token() {
        let config = TelegramConfig::from_parts(Some("123:secret".into()), Some("42".into())).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("42"));
    }

    #[tokio::test]
    async fn test_unconfigured_sink_skips() {
        let sink = TelegramSink::new(None, 5).unwrap();
        assert!(!sink.is_configured());
        assert_eq!(sink.send_text("hello").await.unwrap(), Delivery::Skipped);
    }

    #[test]
    fn test_split_message_keeps_short_text_whole() {
        assert_eq!(split_message("a\nb\n", 10), vec!["a\nb\n".to_string()]);
        assert!(split_message("", 10).is_empty());
    }

    #[test]
    fn test_split_message_breaks_on_lines() {
        let parts = split_message("aaaa\nbbbb\ncccc\n", 10);
        assert_eq!(parts, vec!["aaaa\nbbbb\n", "cccc\n"]);
    }

    #[test]
    fn test_split_message_counts_chars_not_bytes() {
        let text = "円".repeat(6);
        let parts = split_message(&text, 4);
        assert_eq!(parts, vec!["円円円円".to_string(), "円円".to_string()]);
    }
}
