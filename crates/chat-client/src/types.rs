//! Chat gateway API types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw chat message as returned by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub login: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    pub text: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub badges: Vec<String>,
}

/// Outgoing message request.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    pub message: String,
}

/// Channel metadata.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ChannelInfo {
    #[serde(rename = "gameName", default)]
    pub game_name: String,
    #[serde(rename = "isLive", default)]
    pub is_live: bool,
}

/// User metadata returned by a user lookup.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ChatUser {
    pub id: String,
    pub login: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(rename = "isSubscriber", default)]
    pub is_subscriber: bool,
}

impl ChatUser {
    /// Name to show in chat, falling back to the login.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.login)
    }
}

/// Parsed message for bot processing.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// Platform user id of the sender.
    pub user_id: String,
    /// Lowercase login of the sender.
    pub login: String,
    /// Display name of the sender.
    pub display_name: String,
    /// The message text.
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Sender owns the channel.
    pub is_broadcaster: bool,
    pub is_subscriber: bool,
    /// Message was sent by the bot account itself.
    pub echo: bool,
}

impl ChatMessage {
    /// Extract a bot message from a gateway message.
    ///
    /// Returns `None` for messages without text.
    pub fn from_incoming(msg: &IncomingMessage, bot_login: &str) -> Option<Self> {
        let text = msg.text.clone()?;
        let login = msg.login.to_lowercase();
        let has_badge = |badge: &str| msg.badges.iter().any(|b| b.eq_ignore_ascii_case(badge));

        Some(Self {
            user_id: msg.user_id.clone(),
            display_name: msg.display_name.clone().unwrap_or_else(|| msg.login.clone()),
            echo: login.eq_ignore_ascii_case(bot_login),
            login,
            text,
            timestamp: msg.timestamp.unwrap_or_else(Utc::now),
            is_broadcaster: has_badge("broadcaster"),
            is_subscriber: has_badge("subscriber"),
        })
    }

    /// The leading command word without its prefix, lowercased.
    ///
    /// `"!Trivia load 3"` with prefix `"!"` gives `Some("trivia")`.
    pub fn command_word(&self, prefix: &str) -> Option<String> {
        let first = self.text.split_whitespace().next()?;
        let word = first.strip_prefix(prefix)?;
        if word.is_empty() {
            None
        } else {
            Some(word.to_lowercase())
        }
    }

    /// Everything after the leading command word, trimmed.
    pub fn arguments(&self) -> &str {
        let trimmed = self.text.trim_start();
        match trimmed.find(char::is_whitespace) {
            Some(pos) => trimmed[pos..].trim(),
            None => "",
        }
    }
}
