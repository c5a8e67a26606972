//! Chat gateway HTTP client.

use crate::error::ChatError;
use crate::transport::ChatTransport;
use crate::types::*;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use urlencoding::encode;

/// Chat gateway REST API client for one channel.
///
/// The access token is kept in a `SecretString` so it never shows up in
/// debug output or logs.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    channel: String,
    bot_login: String,
    token: Option<SecretString>,
}

impl ChatClient {
    /// Create a new chat client.
    pub fn new(
        base_url: impl Into<String>,
        channel: impl Into<String>,
        bot_login: impl Into<String>,
    ) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            channel: channel.into().to_lowercase(),
            bot_login: bot_login.into().to_lowercase(),
            token: None,
        })
    }

    /// Attach a bearer token to every request.
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    /// Login of the bot account, used to flag echoed messages.
    pub fn bot_login(&self) -> &str {
        &self.bot_login
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    fn channel_url(&self) -> String {
        format!("{}/v1/channels/{}", self.base_url, encode(&self.channel))
    }

    /// Check if the chat gateway is healthy.
    pub async fn health_check(&self) -> bool {
        self.authorize(self.client.get(format!("{}/v1/health", self.base_url)))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    /// Receive pending messages.
    #[instrument(skip(self))]
    pub async fn receive(&self) -> Result<Vec<IncomingMessage>, ChatError> {
        let response = self
            .authorize(self.client.get(format!("{}/messages", self.channel_url())))
            .send()
            .await?;

        if !response.status().is_success() {
            let msg = response.text().await.unwrap_or_default();
            return Err(ChatError::Api(msg));
        }

        let messages: Vec<IncomingMessage> = response.json().await?;
        debug!("Received {} messages", messages.len());
        Ok(messages)
    }
}

#[async_trait]
impl ChatTransport for ChatClient {
    fn channel(&self) -> &str {
        &self.channel
    }

    #[instrument(skip(self, message))]
    async fn send(&self, message: &str) -> Result<(), ChatError> {
        let request = SendMessageRequest {
            message: message.to_string(),
        };

        let response = self
            .authorize(self.client.post(format!("{}/messages", self.channel_url())))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let msg = response.text().await.unwrap_or_default();
            warn!("Send failed: {}", msg);
            return Err(ChatError::SendFailed(msg));
        }

        debug!("Sent message to #{}", self.channel);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_channel_info(&self) -> Result<ChannelInfo, ChatError> {
        let response = self.authorize(self.client.get(self.channel_url())).send().await?;

        if !response.status().is_success() {
            let msg = response.text().await.unwrap_or_default();
            return Err(ChatError::Api(msg));
        }

        Ok(response.json().await?)
    }

    #[instrument(skip(self))]
    async fn fetch_chatters(&self) -> Result<Vec<String>, ChatError> {
        let response = self
            .authorize(self.client.get(format!("{}/chatters", self.channel_url())))
            .send()
            .await?;

        if !response.status().is_success() {
            let msg = response.text().await.unwrap_or_default();
            return Err(ChatError::Api(msg));
        }

        Ok(response.json().await?)
    }

    #[instrument(skip(self, logins), fields(count = logins.len()))]
    async fn fetch_users(&self, logins: &[String]) -> Result<Vec<ChatUser>, ChatError> {
        if logins.is_empty() {
            return Ok(Vec::new());
        }

        let query: Vec<(&str, &str)> = logins.iter().map(|l| ("login", l.as_str())).collect();
        let response = self
            .authorize(self.client.get(format!("{}/v1/users", self.base_url)))
            .query(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            let msg = response.text().await.unwrap_or_default();
            return Err(ChatError::Api(msg));
        }

        Ok(response.json().await?)
    }
}
