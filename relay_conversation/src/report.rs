//! Human-readable failure records sent to the log chat.

use chrono::{DateTime, Local};
use relay_core::Error;

use crate::InboundMessage;

/// Deep link to a message in a Telegram supergroup or channel.
#[must_use]
pub fn message_link(chat_id: i64, message_id: i32) -> String {
    let raw = chat_id.to_string();
    let internal = raw.strip_prefix("-100").unwrap_or(&raw);
    format!("https://t.me/c/{internal}/{message_id}")
}

#[derive(Debug, Clone)]
pub struct DiagnosticReport {
    pub at: DateTime<Local>,
    pub chat_id: i64,
    pub chat_title: Option<String>,
    pub message_id: i32,
    pub rate_limited: bool,
    pub description: String,
}

impl DiagnosticReport {
    #[must_use]
    pub fn new(message: &InboundMessage, error: &Error) -> Self {
        Self {
            at: Local::now(),
            chat_id: message.chat_id,
            chat_title: message.chat_title.clone(),
            message_id: message.message_id,
            rate_limited: matches!(error, Error::PoolExhausted { .. }),
            description: error.to_string(),
        }
    }

    #[must_use]
    pub fn render(&self) -> String {
        let headline = if self.rate_limited {
            "All API keys rate limited at"
        } else {
            "Error occurred at"
        };
        format!(
            "{headline} {}\nGroup Info: Chat ID: {}, Title: {}\nMessage Link: {}\nError: {}",
            self.at.format("%Y-%m-%d %H:%M:%S"),
            self.chat_id,
            self.chat_title.as_deref().unwrap_or("Private"),
            message_link(self.chat_id, self.message_id),
            self.description
        )
    }
}
