//! Chat gateway client for a single live-stream channel.

mod client;
mod error;
mod receiver;
mod transport;
mod types;

pub use client::ChatClient;
pub use error::ChatError;
pub use receiver::MessageReceiver;
pub use transport::ChatTransport;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_test_client(mock_server: &MockServer) -> ChatClient {
        ChatClient::new(mock_server.uri(), "StreamerChan", "triviabot").unwrap()
    }

    fn incoming(login: &str, text: Option<&str>, badges: &[&str]) -> IncomingMessage {
        IncomingMessage {
            user_id: "1001".into(),
            login: login.into(),
            display_name: Some("Viewer One".into()),
            text: text.map(String::from),
            timestamp: None,
            badges: badges.iter().map(|b| b.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_health_check_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        assert!(client.health_check().await);
    }

    #[tokio::test]
    async fn test_health_check_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/health"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        assert!(!client.health_check().await);
    }

    #[tokio::test]
    async fn test_receive_messages() {
        let mock_server = MockServer::start().await;

        let messages = serde_json::json!([
            {
                "userId": "1001",
                "login": "viewer1",
                "displayName": "Viewer1",
                "text": "Hello bot!",
                "timestamp": "2024-01-01T00:00:00Z",
                "badges": ["subscriber"]
            }
        ]);

        Mock::given(method("GET"))
            .and(path("/v1/channels/streamerchan/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&messages))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        let msgs = client.receive().await.unwrap();

        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].login, "viewer1");
        assert_eq!(msgs[0].badges, vec!["subscriber".to_string()]);
    }

    #[tokio::test]
    async fn test_send_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/channels/streamerchan/messages"))
            .and(body_json(serde_json::json!({ "message": "Hello!" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        assert!(client.send("Hello!").await.is_ok());
    }

    #[tokio::test]
    async fn test_send_message_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/channels/streamerchan/messages"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Message rejected"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        let result = client.send("Hello!").await;

        assert!(matches!(result, Err(ChatError::SendFailed(_))));
    }

    #[tokio::test]
    async fn test_token_sent_as_bearer() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/health"))
            .and(header("authorization", "Bearer oauth-secret"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server)
            .await
            .with_token(SecretString::new("oauth-secret".into()));
        assert!(client.health_check().await);
    }

    #[tokio::test]
    async fn test_fetch_channel_info() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/channels/streamerchan"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "gameName": "Celeste",
                "isLive": true
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        let info = tokio_test::assert_ok!(client.fetch_channel_info().await);

        assert_eq!(info.game_name, "Celeste");
        assert!(info.is_live);
    }

    #[tokio::test]
    async fn test_fetch_chatters_and_users() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/channels/streamerchan/chatters"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!(["alice", "bob"])),
            )
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/users"))
            .and(query_param("login", "alice"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": "1", "login": "alice", "displayName": "Alice", "isSubscriber": true },
                { "id": "2", "login": "bob", "displayName": null, "isSubscriber": false }
            ])))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        let chatters = client.fetch_chatters().await.unwrap();
        assert_eq!(chatters, vec!["alice".to_string(), "bob".to_string()]);

        let users = client.fetch_users(&chatters).await.unwrap();
        assert_eq!(users.len(), 2);
        assert!(users[0].is_subscriber);
        assert_eq!(users[0].name(), "Alice");
        assert_eq!(users[1].name(), "bob");
    }

    #[tokio::test]
    async fn test_fetch_users_empty_skips_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/users"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server).await;
        assert!(client.fetch_users(&[]).await.unwrap().is_empty());
    }

    #[test]
    fn test_chat_message_from_incoming() {
        let msg = ChatMessage::from_incoming(
            &incoming("Viewer1", Some("!trivia load 3"), &["subscriber"]),
            "triviabot",
        )
        .unwrap();

        assert_eq!(msg.login, "viewer1");
        assert_eq!(msg.display_name, "Viewer One");
        assert!(msg.is_subscriber);
        assert!(!msg.is_broadcaster);
        assert!(!msg.echo);
        assert_eq!(msg.command_word("!"), Some("trivia".into()));
        assert_eq!(msg.arguments(), "load 3");
    }

    #[test]
    fn test_chat_message_echo_detection() {
        let msg =
            ChatMessage::from_incoming(&incoming("TriviaBot", Some("Question 1"), &[]), "triviabot")
                .unwrap();
        assert!(msg.echo);
    }

    #[test]
    fn test_chat_message_without_text() {
        assert!(ChatMessage::from_incoming(&incoming("viewer1", None, &[]), "triviabot").is_none());
    }

    #[test]
    fn test_command_word_requires_prefix() {
        let msg = ChatMessage::from_incoming(
            &incoming("streamer", Some("paris"), &["broadcaster"]),
            "triviabot",
        )
        .unwrap();

        assert!(msg.is_broadcaster);
        assert_eq!(msg.command_word("!"), None);
        assert_eq!(msg.arguments(), "");
    }
}
