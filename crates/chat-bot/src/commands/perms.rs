//! Grant and revoke permission levels.

use crate::commands::{CommandHandler, Context};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use tracing::info;

pub struct PermissionHandler {
    grant: bool,
}

impl PermissionHandler {
    /// `addperms user,level[,level...]`
    pub fn grant() -> Self {
        Self { grant: true }
    }

    /// `delperms user,level[,level...]`
    pub fn revoke() -> Self {
        Self { grant: false }
    }
}

#[async_trait]
impl CommandHandler for PermissionHandler {
    fn name(&self) -> &str {
        if self.grant {
            "addperms"
        } else {
            "delperms"
        }
    }

    async fn execute(&self, ctx: &mut Context<'_>, args: &str) -> AppResult<()> {
        let mut parts = args
            .split(',')
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty());
        let user = parts.next();
        let levels: Vec<String> = parts.collect();

        let Some(user) = user.filter(|_| !levels.is_empty()) else {
            return Err(AppError::UserInput(format!(
                "Command syntax: {}{} <user>,<permission>",
                ctx.state.settings.prefix,
                self.name()
            )));
        };

        let permissions = &mut ctx.state.permissions;
        let changed = levels
            .iter()
            .filter(|level| {
                if self.grant {
                    permissions.grant(level, &user)
                } else {
                    permissions.revoke(level, &user)
                }
            })
            .count();

        info!(
            "{} {:?} for {} ({} changed)",
            self.name(),
            levels,
            user,
            changed
        );
        ctx.state.save_permissions().await;
        ctx.mention(if self.grant {
            "Permissions added."
        } else {
            "Permissions deleted."
        });
        Ok(())
    }
}
