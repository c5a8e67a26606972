//! Commands that create, change and delete custom commands and timers.

use crate::commands::{CommandHandler, Context};
use crate::error::{AppError, AppResult};
use crate::registry::{CommandDefinition, TriggerKind};
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionAction {
    NewCommand,
    ModifyCommand,
    NewTimer,
    ModifyTimer,
    DelCommand,
    DelTimer,
}

impl DefinitionAction {
    pub const ALL: [DefinitionAction; 6] = [
        DefinitionAction::NewCommand,
        DefinitionAction::ModifyCommand,
        DefinitionAction::NewTimer,
        DefinitionAction::ModifyTimer,
        DefinitionAction::DelCommand,
        DefinitionAction::DelTimer,
    ];

    pub fn word(&self) -> &'static str {
        match self {
            DefinitionAction::NewCommand => "newcommand",
            DefinitionAction::ModifyCommand => "modifycommand",
            DefinitionAction::NewTimer => "newtimer",
            DefinitionAction::ModifyTimer => "modifytimer",
            DefinitionAction::DelCommand => "delcommand",
            DefinitionAction::DelTimer => "deltimer",
        }
    }

    fn kind(&self) -> TriggerKind {
        match self {
            DefinitionAction::NewCommand
            | DefinitionAction::ModifyCommand
            | DefinitionAction::DelCommand => TriggerKind::OnCommand,
            _ => TriggerKind::OnInterval {
                interval_seconds: 0,
            },
        }
    }

    fn parse(&self, args: &str) -> AppResult<CommandDefinition> {
        match self.kind() {
            TriggerKind::OnCommand => CommandDefinition::parse_command(args),
            TriggerKind::OnInterval { .. } => CommandDefinition::parse_timer(args),
        }
    }
}

pub struct DefinitionHandler {
    action: DefinitionAction,
}

impl DefinitionHandler {
    pub fn new(action: DefinitionAction) -> Self {
        Self { action }
    }

    fn not_found(&self, name: &str) -> AppError {
        AppError::NotFound(format!(
            "No {} exists with the name {}.",
            self.action.kind().label(),
            name
        ))
    }
}

#[async_trait]
impl CommandHandler for DefinitionHandler {
    fn name(&self) -> &str {
        self.action.word()
    }

    async fn execute(&self, ctx: &mut Context<'_>, args: &str) -> AppResult<()> {
        let kind = self.action.kind();
        let registry = &mut ctx.state.registry;

        let reply = match self.action {
            DefinitionAction::NewCommand | DefinitionAction::NewTimer => {
                let definition = self.action.parse(args)?;
                registry.register(definition, false)?;
                if kind == TriggerKind::OnCommand {
                    "Command created."
                } else {
                    "Timer created."
                }
            }
            DefinitionAction::ModifyCommand | DefinitionAction::ModifyTimer => {
                let definition = self.action.parse(args)?;
                let exists = registry
                    .definition(&definition.name)
                    .map(|existing| existing.trigger.same_kind(&kind))
                    .unwrap_or(false);
                if !exists {
                    return Err(self.not_found(&definition.name));
                }
                registry.register(definition, true)?;
                if kind == TriggerKind::OnCommand {
                    "Command modified."
                } else {
                    "Timer modified."
                }
            }
            DefinitionAction::DelCommand | DefinitionAction::DelTimer => {
                let name = args
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .find(|s| !s.is_empty())
                    .ok_or_else(|| {
                        AppError::UserInput(format!("Syntax: {} <name>", self.action.word()))
                    })?
                    .to_lowercase();
                if !registry.unregister_kind(&name, &kind) {
                    return Err(self.not_found(&name));
                }
                if kind == TriggerKind::OnCommand {
                    "Command deleted."
                } else {
                    "Timer deleted."
                }
            }
        };

        info!("{} by {}: {}", self.action.word(), ctx.caller.login, args.trim());
        ctx.state.save_definitions().await;
        ctx.mention(reply);
        Ok(())
    }
}
