//! Chat bot - Main entry point.

use anyhow::Context;
use chat_bot::config::Config;
use chat_bot::{AppResult, BotState, Dispatcher};
use chat_client::{ChatClient, ChatTransport, MessageReceiver};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Seconds between ticks; timers and earn intervals count in ticks.
const TICK_PERIOD: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_logging(&config.log.level);

    info!("Starting chat bot for #{}...", config.twitch.channel);

    let mut client = ChatClient::new(
        &config.twitch.service_url,
        &config.twitch.channel,
        &config.twitch.bot_username,
    )
    .context("Failed to create chat client")?;
    if let Some(token) = config.twitch.token.clone() {
        client = client.with_token(token);
    }

    if !client.health_check().await {
        error!("Chat gateway not reachable at {}", config.twitch.service_url);
        return Err(anyhow::anyhow!("Chat gateway not reachable").into());
    }
    info!("Chat gateway healthy");

    let state = BotState::load(&config).await?;
    info!(
        "Registered {} built-in commands and {} custom definitions",
        state.registry.builtin_count(),
        state.registry.definitions().len()
    );

    let transport: Arc<dyn ChatTransport> = Arc::new(client.clone());
    match transport.fetch_channel_info().await {
        Ok(info) if info.is_live => info!("#{} is live playing {}", transport.channel(), info.game_name),
        Ok(_) => info!("#{} is offline", transport.channel()),
        Err(e) => warn!("Could not fetch channel info: {}", e),
    }

    let (dispatcher, handle) = Dispatcher::new(state, transport, TICK_PERIOD);

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            handle.stop().await;
        }
    });

    // Start message receiver
    let receiver = MessageReceiver::new(client, config.twitch.poll_interval);
    let stream = Box::pin(receiver.stream());

    info!("Listening for messages...");
    dispatcher.run(stream).await;

    info!("Shut down");
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
