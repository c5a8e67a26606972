//! Custom command and timer definitions.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// When a custom definition fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum TriggerKind {
    OnCommand,
    OnInterval { interval_seconds: u64 },
}

impl TriggerKind {
    pub fn label(&self) -> &'static str {
        match self {
            TriggerKind::OnCommand => "command",
            TriggerKind::OnInterval { .. } => "timer",
        }
    }

    pub fn same_kind(&self, other: &TriggerKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// A user-authored command or timer. Identity is the lowercased name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDefinition {
    pub name: String,
    #[serde(flatten)]
    pub trigger: TriggerKind,
    /// Any one of these levels is enough; empty means public.
    #[serde(default)]
    pub required_permissions: BTreeSet<String>,
    pub response: String,
}

impl CommandDefinition {
    pub fn command(name: &str, required_permissions: BTreeSet<String>, response: &str) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            trigger: TriggerKind::OnCommand,
            required_permissions,
            response: response.trim().to_string(),
        }
    }

    pub fn timer(name: &str, interval_seconds: u64, response: &str) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            trigger: TriggerKind::OnInterval { interval_seconds },
            required_permissions: BTreeSet::new(),
            response: response.trim().to_string(),
        }
    }

    /// Parse `name, [perm1|perm2,] response`.
    ///
    /// The middle part is read as permissions only when it is a list of
    /// single words, so a response may contain commas.
    pub fn parse_command(args: &str) -> AppResult<Self> {
        let syntax = || {
            AppError::UserInput(
                "Syntax: newcommand <name>, (<permission1>|<permission2>|...,) <response>".into(),
            )
        };

        let (name, rest) = args.split_once(',').ok_or_else(syntax)?;
        let name = parse_name(name).ok_or_else(syntax)?;

        let (permissions, response) = match rest.split_once(',') {
            Some((perms, response)) if is_permission_list(perms) => (
                perms
                    .split('|')
                    .map(|p| p.trim().to_lowercase())
                    .filter(|p| !p.is_empty())
                    .collect(),
                response,
            ),
            _ => (BTreeSet::new(), rest),
        };

        if response.trim().is_empty() {
            return Err(syntax());
        }
        Ok(Self::command(&name, permissions, response))
    }

    /// Parse `name, intervalSeconds, response`.
    pub fn parse_timer(args: &str) -> AppResult<Self> {
        let syntax = || {
            AppError::UserInput(
                "Syntax: newtimer <name>, <interval in seconds>, <response>".into(),
            )
        };

        let mut parts = args.splitn(3, ',');
        let name = parts.next().and_then(parse_name).ok_or_else(syntax)?;
        let interval = parts.next().ok_or_else(syntax)?.trim();
        let response = parts.next().ok_or_else(syntax)?;

        let interval_seconds: u64 = interval.parse().map_err(|_| {
            AppError::UserInput(format!(
                "The interval \"{}\" must be a positive number of seconds.",
                interval
            ))
        })?;
        if interval_seconds == 0 {
            return Err(AppError::UserInput(
                "The interval must be at least one second.".into(),
            ));
        }
        if response.trim().is_empty() {
            return Err(syntax());
        }

        Ok(Self::timer(&name, interval_seconds, response))
    }

    /// Check the invariants of a definition loaded from storage.
    pub fn validate(&self) -> AppResult<()> {
        if parse_name(&self.name).is_none() {
            return Err(AppError::UserInput(format!(
                "Invalid command name \"{}\"",
                self.name
            )));
        }
        if let TriggerKind::OnInterval { interval_seconds: 0 } = self.trigger {
            return Err(AppError::UserInput(format!(
                "Timer {} has a zero interval",
                self.name
            )));
        }
        Ok(())
    }

    /// Response text for `user`. Only commands substitute `{user}`.
    pub fn render(&self, user: &str) -> String {
        match self.trigger {
            TriggerKind::OnCommand => self.response.replace("{user}", user),
            TriggerKind::OnInterval { .. } => self.response.clone(),
        }
    }
}

/// A name is one word, without the command prefix.
fn parse_name(raw: &str) -> Option<String> {
    let name = raw.trim().to_lowercase();
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        None
    } else {
        Some(name)
    }
}

fn is_permission_list(part: &str) -> bool {
    let part = part.trim();
    !part.is_empty()
        && part
            .split('|')
            .all(|p| !p.trim().is_empty() && !p.trim().chars().any(char::is_whitespace))
}
