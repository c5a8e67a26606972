//! Serial dispatch of chat messages, ticks and control requests.
//!
//! The dispatcher is the single owner of [`BotState`]. Every message and
//! every tick is one unit of work that runs to completion before the next
//! starts, so handlers never see partially applied changes.

use crate::commands::{Context, CustomCommands};
use crate::error::AppResult;
use crate::permissions::Caller;
use crate::registry::Resolved;
use crate::state::BotState;
use chat_client::{ChatMessage, ChatTransport};
use loyalty_ledger::ActiveMember;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

/// Requests accepted while the dispatcher is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    PauseTicks,
    ResumeTicks,
    Stop,
}

/// Cloneable handle for controlling a running dispatcher.
#[derive(Clone)]
pub struct DispatcherHandle {
    tx: mpsc::Sender<ControlMessage>,
}

impl DispatcherHandle {
    /// Returns false once the dispatcher has stopped.
    pub async fn pause_ticks(&self) -> bool {
        self.tx.send(ControlMessage::PauseTicks).await.is_ok()
    }

    pub async fn resume_ticks(&self) -> bool {
        self.tx.send(ControlMessage::ResumeTicks).await.is_ok()
    }

    pub async fn stop(&self) -> bool {
        self.tx.send(ControlMessage::Stop).await.is_ok()
    }
}

pub struct Dispatcher {
    state: BotState,
    transport: Arc<dyn ChatTransport>,
    timers: CustomCommands,
    tick_period: Duration,
    /// Seconds since start at the last tick that ran.
    tick: u64,
    control: mpsc::Receiver<ControlMessage>,
}

impl Dispatcher {
    pub fn new(
        state: BotState,
        transport: Arc<dyn ChatTransport>,
        tick_period: Duration,
    ) -> (Self, DispatcherHandle) {
        let (tx, control) = mpsc::channel(16);
        let dispatcher = Self {
            state,
            transport,
            timers: CustomCommands::new(),
            tick_period,
            tick: 0,
            control,
        };
        (dispatcher, DispatcherHandle { tx })
    }

    pub fn state(&self) -> &BotState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut BotState {
        &mut self.state
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Run until stopped, the message stream ends or a handler requests
    /// shutdown. Stores are flushed on exit.
    pub async fn run<S>(mut self, mut messages: S)
    where
        S: Stream<Item = ChatMessage> + Unpin,
    {
        let start = Instant::now();
        let mut interval = tokio::time::interval(self.tick_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Dispatcher running (tick period {:?})", self.tick_period);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let tick = start.elapsed().as_secs();
                    self.run_tick(tick).await;
                }
                message = messages.next() => match message {
                    Some(message) => self.handle_message(&message).await,
                    None => {
                        info!("Message stream ended");
                        break;
                    }
                },
                Some(control) = self.control.recv() => {
                    if !self.apply_control(control) {
                        break;
                    }
                }
            }

            if self.state.stop_requested {
                break;
            }
        }

        self.shutdown().await;
    }

    /// Returns false when the dispatcher should stop.
    fn apply_control(&mut self, control: ControlMessage) -> bool {
        debug!("Control message: {:?}", control);
        match control {
            ControlMessage::PauseTicks => self.state.ticks_paused = true,
            ControlMessage::ResumeTicks => self.state.ticks_paused = false,
            ControlMessage::Stop => {
                info!("Stop requested");
                return false;
            }
        }
        true
    }

    /// Process one chat message: listeners first, then the command word.
    pub async fn handle_message(&mut self, message: &ChatMessage) {
        if message.echo {
            return;
        }

        let caller = self.caller_for(message);
        let now = Instant::now().into_std();
        let mut ctx = Context::new(
            message,
            &caller,
            &mut self.state,
            self.transport.as_ref(),
            now,
        );

        for listener in ctx.state.registry.listeners() {
            if let Err(e) = listener.on_message(&mut ctx).await {
                ctx.report(e);
            }
        }

        if let Some(word) = message.command_word(&ctx.state.settings.prefix) {
            match ctx.state.registry.resolve_for_message(&word) {
                Some(Resolved::Custom(definition)) => {
                    match ctx.state.registry.authorize_definition(&definition, &caller) {
                        Ok(()) => ctx.reply(CustomCommands::respond(&definition, &caller)),
                        Err(e) => ctx.report(e),
                    }
                }
                Some(Resolved::Builtin(handler)) => {
                    debug!("{} invoked {}", caller.login, handler.name());
                    let result = match ctx.state.registry.authorize_builtin(handler.as_ref(), &caller)
                    {
                        Ok(()) => handler.execute(&mut ctx, message.arguments()).await,
                        Err(e) => Err(e),
                    };
                    if let Err(e) = result {
                        ctx.report(e);
                    }
                }
                None => {}
            }
        }

        let replies = ctx.into_replies();
        self.send_all(replies).await;
    }

    /// Run the periodic work for `tick` (seconds since start).
    ///
    /// Ticks that do not advance, or arrive while ticks are paused, are
    /// skipped.
    pub async fn run_tick(&mut self, tick: u64) {
        if tick <= self.tick {
            return;
        }
        let last = std::mem::replace(&mut self.tick, tick);
        if self.state.ticks_paused {
            debug!("Ticks paused, skipping tick {}", tick);
            return;
        }

        let refresh = self.state.settings.channel_refresh_secs.max(1);
        if last == 0 || tick / refresh > last / refresh {
            self.refresh_channel().await;
        }

        self.accrue_loyalty(tick).await;

        let now = Instant::now().into_std();
        let mut outbox = self.state.trivia.tick(now);
        outbox.extend(self.timers.due_timers(&self.state.registry, tick));

        self.send_all(outbox).await;
    }

    async fn refresh_channel(&mut self) {
        match self.transport.fetch_channel_info().await {
            Ok(info) => {
                self.state.trivia.set_channel_live(info.is_live);
                if self.state.trivia_config().enable_game_detection {
                    self.state.trivia.set_detected_game(&info.game_name);
                }
            }
            Err(e) => warn!("Failed to refresh channel info: {}", e),
        }
    }

    async fn accrue_loyalty(&mut self, tick: u64) {
        if !self.state.ledger.is_due(&self.state.settings.accrual, tick) {
            return;
        }

        let members = match self.active_members().await {
            Ok(members) => members,
            Err(e) => {
                warn!("Failed to fetch chatters, skipping distribution: {}", e);
                Vec::new()
            }
        };

        let policy = self.state.settings.accrual.clone();
        if let Some(summary) = self.state.ledger.accrue(&members, &policy, tick) {
            if summary.members > 0 {
                info!(
                    "Distributed {} points to {} members",
                    summary.points_awarded, summary.members
                );
                self.state.save_ledger().await;
            }
        }
    }

    async fn active_members(&self) -> AppResult<Vec<ActiveMember>> {
        let chatters = self.transport.fetch_chatters().await?;
        let users = self.transport.fetch_users(&chatters).await?;
        Ok(users
            .iter()
            .map(|user| ActiveMember {
                user_id: user.id.clone(),
                display_name: user.name().to_string(),
                is_subscriber: user.is_subscriber,
            })
            .collect())
    }

    fn caller_for(&self, message: &ChatMessage) -> Caller {
        Caller {
            user_id: message.user_id.clone(),
            login: message.login.clone(),
            display_name: message.display_name.clone(),
            levels: self.state.permissions.levels_of(&message.login),
            is_broadcaster: message.is_broadcaster,
        }
    }

    async fn send_all(&self, messages: Vec<String>) {
        for text in messages {
            if let Err(e) = self.transport.send(&text).await {
                error!("Failed to send message: {}", e);
            }
        }
    }

    async fn shutdown(&mut self) {
        info!("Saving state before shutdown");
        self.state.save_ledger().await;
        self.state.save_questions().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{message, test_state, FakeTransport};
    use chat_client::ChatUser;

    fn dispatcher(transport: Arc<FakeTransport>) -> Dispatcher {
        let mut state = test_state();
        state.settings.accrual.interval_ticks = 10;
        Dispatcher::new(state, transport, Duration::from_secs(1)).0
    }

    fn user(id: &str, login: &str, subscriber: bool) -> ChatUser {
        ChatUser {
            id: id.into(),
            login: login.into(),
            display_name: None,
            is_subscriber: subscriber,
        }
    }

    #[tokio::test]
    async fn test_accrual_on_boundary() {
        let transport = Arc::new(FakeTransport::default());
        transport.set_chatters(vec!["alice".into(), "bob".into()]);
        transport.set_users(vec![user("1", "alice", true), user("2", "bob", false)]);
        let mut dispatcher = dispatcher(transport.clone());

        dispatcher.run_tick(5).await;
        assert_eq!(dispatcher.state().ledger.balance_of("1"), 0);

        dispatcher.run_tick(10).await;
        assert_eq!(dispatcher.state().ledger.balance_of("1"), 20);
        assert_eq!(dispatcher.state().ledger.balance_of("2"), 10);

        // A stale tick does nothing
        dispatcher.run_tick(10).await;
        assert_eq!(dispatcher.state().ledger.balance_of("2"), 10);
    }

    #[tokio::test]
    async fn test_echo_ignored() {
        let transport = Arc::new(FakeTransport::default());
        let mut dispatcher = dispatcher(transport.clone());

        let mut msg = message("triviabot", "!loyalty", false);
        msg.echo = true;
        dispatcher.handle_message(&msg).await;
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_paused_ticks_skip_work() {
        let transport = Arc::new(FakeTransport::default());
        transport.set_chatters(vec!["alice".into()]);
        transport.set_users(vec![user("1", "alice", false)]);
        let mut dispatcher = dispatcher(transport.clone());

        assert!(dispatcher.apply_control(ControlMessage::PauseTicks));
        dispatcher.run_tick(10).await;
        assert_eq!(dispatcher.state().ledger.balance_of("1"), 0);
        assert_eq!(dispatcher.current_tick(), 10);

        assert!(dispatcher.apply_control(ControlMessage::ResumeTicks));
        dispatcher.run_tick(20).await;
        assert_eq!(dispatcher.state().ledger.balance_of("1"), 10);
        assert!(!dispatcher.apply_control(ControlMessage::Stop));
    }

    #[tokio::test]
    async fn test_reload_keeps_control_pause() {
        let transport = Arc::new(FakeTransport::default());
        let mut dispatcher = dispatcher(transport.clone());

        assert!(dispatcher.apply_control(ControlMessage::PauseTicks));
        dispatcher
            .handle_message(&message("owner", "!reload", true))
            .await;

        assert_eq!(
            transport.sent(),
            vec!["@owner: Reloaded 0 custom commands and timers.".to_string()]
        );
        assert!(dispatcher.state().ticks_paused);
    }
}
