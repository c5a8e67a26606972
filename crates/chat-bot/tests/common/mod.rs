//! Common test utilities for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chat_bot::config::CommandPermissions;
use chat_bot::{BotState, Settings};
use chat_client::{ChannelInfo, ChatClient, ChatError, ChatMessage, ChatTransport, ChatUser};
use mockall::mock;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use trivia::{Question, TriviaConfig, TriviaEngine};
use wiremock::MockServer;

mock! {
    pub Transport {}

    #[async_trait]
    impl ChatTransport for Transport {
        fn channel(&self) -> &str;
        async fn send(&self, message: &str) -> Result<(), ChatError>;
        async fn fetch_channel_info(&self) -> Result<ChannelInfo, ChatError>;
        async fn fetch_chatters(&self) -> Result<Vec<String>, ChatError>;
        async fn fetch_users(&self, logins: &[String]) -> Result<Vec<ChatUser>, ChatError>;
    }
}

/// Messages captured by a mock transport.
pub type Outbox = Arc<Mutex<Vec<String>>>;

/// Mock transport that records sends and reports an offline channel.
pub fn recording_transport() -> (MockTransport, Outbox) {
    let outbox: Outbox = Arc::new(Mutex::new(Vec::new()));
    let mut transport = MockTransport::new();

    let sent = outbox.clone();
    transport.expect_send().returning(move |message| {
        sent.lock().unwrap().push(message.to_string());
        Ok(())
    });
    transport
        .expect_fetch_channel_info()
        .returning(|| Ok(ChannelInfo::default()));

    (transport, outbox)
}

pub fn sent(outbox: &Outbox) -> Vec<String> {
    outbox.lock().unwrap().clone()
}

/// In-memory state with trivia running regardless of live status.
pub fn test_state(questions: Vec<Question>) -> BotState {
    let trivia = TriviaEngine::new(
        TriviaConfig {
            run_only_when_live: false,
            ..TriviaConfig::default()
        },
        questions,
        Instant::now(),
    );
    BotState::in_memory(Settings::default(), CommandPermissions::default(), trivia)
}

pub fn chat_message(login: &str, text: &str) -> ChatMessage {
    ChatMessage {
        user_id: format!("id-{}", login),
        login: login.to_string(),
        display_name: login.to_string(),
        text: text.to_string(),
        timestamp: chrono::Utc::now(),
        is_broadcaster: false,
        is_subscriber: false,
        echo: false,
    }
}

pub fn broadcaster_message(login: &str, text: &str) -> ChatMessage {
    ChatMessage {
        is_broadcaster: true,
        ..chat_message(login, text)
    }
}

pub fn chat_user(id: &str, login: &str, is_subscriber: bool) -> ChatUser {
    ChatUser {
        id: id.to_string(),
        login: login.to_string(),
        display_name: None,
        is_subscriber,
    }
}

/// Start a mock chat gateway.
pub async fn mock_gateway() -> MockServer {
    MockServer::start().await
}

/// Create a chat client configured for a mock gateway.
pub fn test_chat_client(mock_server: &MockServer) -> ChatClient {
    ChatClient::new(mock_server.uri(), "streamer", "triviabot").unwrap()
}
