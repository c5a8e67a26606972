//! Reload and shutdown commands.

use crate::commands::{CommandHandler, Context};
use crate::error::AppResult;
use async_trait::async_trait;
use tracing::info;

/// Re-read custom definitions from storage and swap them in.
pub struct ReloadHandler;

#[async_trait]
impl CommandHandler for ReloadHandler {
    fn name(&self) -> &str {
        "reload"
    }

    fn triggers(&self) -> Vec<String> {
        vec!["reload".into(), "recog".into()]
    }

    async fn execute(&self, ctx: &mut Context<'_>, _args: &str) -> AppResult<()> {
        let definitions = ctx.state.definition_store.load().await?;
        let count = ctx.state.registry.replace_definitions(definitions);
        info!("Reloaded {} custom definitions for {}", count, ctx.caller.login);
        ctx.mention(format!("Reloaded {} custom commands and timers.", count));
        Ok(())
    }
}

/// Stop the bot after the current unit of work.
pub struct ShutdownHandler;

#[async_trait]
impl CommandHandler for ShutdownHandler {
    fn name(&self) -> &str {
        "shutdown"
    }

    async fn execute(&self, ctx: &mut Context<'_>, _args: &str) -> AppResult<()> {
        info!("Shutdown requested by {}", ctx.caller.login);
        ctx.reply("Shutting down...");
        ctx.state.stop_requested = true;
        Ok(())
    }
}
