//! Polling stream of inbound chat messages.

use crate::client::ChatClient;
use crate::transport::ChatTransport;
use crate::types::*;
use std::time::Duration;
use tokio::time::sleep;
use tokio_stream::Stream;
use tracing::{debug, warn};

const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Polls the gateway and yields parsed messages in arrival order.
///
/// A failed poll waits before retrying. The wait starts at the poll interval
/// and doubles on each consecutive failure, capped at 30 seconds.
pub struct MessageReceiver {
    client: ChatClient,
    poll_interval: Duration,
    max_backoff: Duration,
}

impl MessageReceiver {
    pub fn new(client: ChatClient, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
            max_backoff: DEFAULT_MAX_BACKOFF.max(poll_interval),
        }
    }

    /// Start polling. The stream never ends on its own.
    pub fn stream(self) -> impl Stream<Item = ChatMessage> {
        async_stream::stream! {
            let mut failures: u32 = 0;
            loop {
                let wait = match self.client.receive().await {
                    Ok(batch) => {
                        if failures > 0 {
                            debug!("Receive recovered after {} failures", failures);
                            failures = 0;
                        }
                        for incoming in batch {
                            if let Some(message) = ChatMessage::from_incoming(&incoming, self.client.bot_login()) {
                                debug!("#{} <{}> {}", self.client.channel(), message.login, message.text);
                                yield message;
                            }
                        }
                        self.poll_interval
                    }
                    Err(e) => {
                        failures = failures.saturating_add(1);
                        let wait = backoff(self.poll_interval, self.max_backoff, failures);
                        warn!("Receive failed ({} in a row), retrying in {:?}: {}", failures, wait, e);
                        wait
                    }
                };

                sleep(wait).await;
            }
        }
    }
}

/// Wait after the `failures`-th consecutive failed poll.
fn backoff(poll_interval: Duration, max_backoff: Duration, failures: u32) -> Duration {
    let factor = 1u32.checked_shl(failures.min(16)).unwrap_or(u32::MAX);
    poll_interval.saturating_mul(factor).min(max_backoff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let poll = Duration::from_millis(500);
        let cap = Duration::from_secs(3);

        assert_eq!(backoff(poll, cap, 1), Duration::from_secs(1));
        assert_eq!(backoff(poll, cap, 2), Duration::from_secs(2));
        assert_eq!(backoff(poll, cap, 3), cap);
        assert_eq!(backoff(poll, cap, u32::MAX), cap);
    }

    #[tokio::test]
    async fn test_stream_recovers_after_gateway_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/channels/streamerchan/messages"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/channels/streamerchan/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "userId": "7", "login": "TriviaBot", "text": "echo" },
                { "userId": "1", "login": "Viewer", "text": "hi" }
            ])))
            .mount(&mock_server)
            .await;

        let client = ChatClient::new(mock_server.uri(), "streamerchan", "triviabot").unwrap();
        let receiver = MessageReceiver::new(client, Duration::from_millis(10));
        let mut stream = Box::pin(receiver.stream());

        let first = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap()
            .unwrap();
        assert!(first.echo);

        let second = stream.next().await.unwrap();
        assert_eq!(second.login, "viewer");
        assert_eq!(second.text, "hi");
        assert!(!second.echo);
    }
}
