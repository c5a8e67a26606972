//! Transport abstraction used by the bot runtime.

use crate::error::ChatError;
use crate::types::{ChannelInfo, ChatUser};
use async_trait::async_trait;

/// Outbound side of a chat connection bound to a single channel.
///
/// Inbound messages arrive through [`crate::MessageReceiver`].
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Name of the connected channel.
    fn channel(&self) -> &str;

    /// Send a chat message to the channel.
    async fn send(&self, message: &str) -> Result<(), ChatError>;

    /// Current game and live status of the channel.
    async fn fetch_channel_info(&self) -> Result<ChannelInfo, ChatError>;

    /// Logins of everyone currently present in chat.
    async fn fetch_chatters(&self) -> Result<Vec<String>, ChatError>;

    /// Look up users by login.
    async fn fetch_users(&self, logins: &[String]) -> Result<Vec<ChatUser>, ChatError>;
}
