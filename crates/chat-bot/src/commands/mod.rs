//! Bot command handlers.

mod control;
mod custom;
mod definitions;
mod loyalty;
mod perms;
mod trivia;

pub use control::{ReloadHandler, ShutdownHandler};
pub use custom::CustomCommands;
pub use definitions::{DefinitionAction, DefinitionHandler};
pub use loyalty::LoyaltyHandler;
pub use perms::PermissionHandler;
pub use self::trivia::TriviaHandler;

use crate::error::{AppError, AppResult};
use crate::permissions::Caller;
use crate::registry::HandlerRegistry;
use crate::state::BotState;
use async_trait::async_trait;
use chat_client::{ChatMessage, ChatTransport};
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

/// Handler for a prefixed command word.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Command name (e.g., "loyalty"), also the key for its required level.
    fn name(&self) -> &str;

    /// Words that invoke this handler, lowercased and without the prefix.
    fn triggers(&self) -> Vec<String> {
        vec![self.name().to_string()]
    }

    /// Execute the command with everything after the command word.
    async fn execute(&self, ctx: &mut Context<'_>, args: &str) -> AppResult<()>;
}

/// Handler that sees every message, ahead of command dispatch.
#[async_trait]
pub trait MessageListener: Send + Sync {
    fn name(&self) -> &str;

    async fn on_message(&self, ctx: &mut Context<'_>) -> AppResult<()>;
}

/// One unit of work: the message, its sender and the bot state.
///
/// Replies are collected and sent by the dispatcher once the unit is done.
pub struct Context<'a> {
    pub message: &'a ChatMessage,
    pub caller: &'a Caller,
    pub state: &'a mut BotState,
    pub transport: &'a dyn ChatTransport,
    /// Sampled once at the start of the unit.
    pub now: Instant,
    replies: Vec<String>,
}

impl<'a> Context<'a> {
    pub fn new(
        message: &'a ChatMessage,
        caller: &'a Caller,
        state: &'a mut BotState,
        transport: &'a dyn ChatTransport,
        now: Instant,
    ) -> Self {
        Self {
            message,
            caller,
            state,
            transport,
            now,
            replies: Vec::new(),
        }
    }

    pub fn reply(&mut self, text: impl Into<String>) {
        self.replies.push(text.into());
    }

    /// Reply addressed to the caller.
    pub fn mention(&mut self, text: impl AsRef<str>) {
        let text = format!("@{}: {}", self.caller.display_name, text.as_ref());
        self.replies.push(text);
    }

    /// Turn a handler error into a reply, logging internal failures.
    pub fn report(&mut self, err: AppError) {
        match err.user_message(&self.caller.display_name) {
            Some(text) => self.replies.push(text),
            None => {
                error!("Handler error: {}", err);
                self.replies.push("Sorry, something went wrong.".into());
            }
        }
    }

    pub fn into_replies(self) -> Vec<String> {
        self.replies
    }
}

/// Register every built-in handler.
pub fn register_builtins(registry: &mut HandlerRegistry, point_name: &str, trivia_prefix: &str) {
    registry.register_listener(Arc::new(TriviaHandler::new(trivia_prefix)));
    registry.register_builtin(Arc::new(LoyaltyHandler::new(point_name)));
    registry.register_builtin(Arc::new(ReloadHandler));
    registry.register_builtin(Arc::new(ShutdownHandler));
    registry.register_builtin(Arc::new(PermissionHandler::grant()));
    registry.register_builtin(Arc::new(PermissionHandler::revoke()));
    for action in DefinitionAction::ALL {
        registry.register_builtin(Arc::new(DefinitionHandler::new(action)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{caller, message, test_state, FakeTransport};

    #[test]
    fn test_context_collects_replies() {
        let mut state = test_state();
        let transport = FakeTransport::default();
        let msg = message("alice", "!hello", false);
        let who = caller("alice", &[], false);
        let mut ctx = Context::new(&msg, &who, &mut state, &transport, Instant::now());

        ctx.reply("one");
        ctx.mention("two");
        ctx.report(AppError::NotFound("No such command.".into()));

        assert_eq!(
            ctx.into_replies(),
            vec![
                "one".to_string(),
                "@alice: two".to_string(),
                "@alice: No such command.".to_string()
            ]
        );
    }

    #[test]
    fn test_report_internal_error() {
        let mut state = test_state();
        let transport = FakeTransport::default();
        let msg = message("alice", "!x", false);
        let who = caller("alice", &[], false);
        let mut ctx = Context::new(&msg, &who, &mut state, &transport, Instant::now());

        ctx.report(AppError::Storage(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk",
        )));
        assert_eq!(ctx.into_replies(), vec!["Sorry, something went wrong.".to_string()]);
    }
}
