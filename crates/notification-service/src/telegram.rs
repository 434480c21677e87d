use async_trait::async_trait;
use serde::Serialize;

use observatory_core::{EngineError, Notifier};

/// Telegram's hard message-length cap.
pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Bot credentials, loaded from `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID`.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

impl TelegramConfig {
    pub fn from_env() -> Self {
        Self {
            bot_token: std::env::var("TELEGRAM_BOT_TOKEN").ok().filter(|s| !s.is_empty()),
            chat_id: std::env::var("TELEGRAM_CHAT_ID").ok().filter(|s| !s.is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Split a message at the platform limit, preferring newline boundaries.
/// A single line longer than the limit is hard-split.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.split('\n') {
        let mut line = line;
        // Hard-split lines that alone exceed the limit.
        while line.len() > max_len {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let mut split_at = (0..=max_len)
                .rev()
                .find(|i| line.is_char_boundary(*i))
                .unwrap_or(0);
            if split_at == 0 {
                // A limit narrower than one character: emit the character
                // whole rather than looping forever.
                split_at = line.chars().next().map_or(line.len(), |c| c.len_utf8());
            }
            chunks.push(line[..split_at].to_string());
            line = &line[split_at..];
        }

        let needed = line.len() + if current.is_empty() { 0 } else { 1 };
        if current.len() + needed > max_len {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Telegram Bot HTTP notifier. Long messages are split at newline
/// boundaries; once one chunk fails, the rest are aborted so the receiver
/// never sees a gap-riddled tail.
pub struct TelegramNotifier {
    http: reqwest::Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    async fn send_chunk(&self, token: &str, chat_id: &str, text: &str) -> Result<(), EngineError> {
        let url = format!("{TELEGRAM_API_BASE}/bot{token}/sendMessage");
        let response = self
            .http
            .post(&url)
            .json(&SendMessageRequest { chat_id, text })
            .send()
            .await
            .map_err(|e| EngineError::Notification(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::Notification(format!(
                "telegram HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), EngineError> {
        let (Some(token), Some(chat_id)) = (&self.config.bot_token, &self.config.chat_id) else {
            tracing::debug!("telegram not configured, dropping notification");
            return Ok(());
        };

        for (i, chunk) in split_message(text, TELEGRAM_MAX_MESSAGE_LEN).iter().enumerate() {
            if let Err(e) = self.send_chunk(token, chat_id, chunk).await {
                tracing::warn!("telegram chunk {i} failed, aborting the rest: {e}");
                return Err(e);
            }
        }
        Ok(())
    }
}
