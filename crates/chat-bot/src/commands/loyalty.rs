//! Loyalty command - shows the caller's point balance.

use crate::commands::{CommandHandler, Context};
use crate::error::AppResult;
use async_trait::async_trait;

pub struct LoyaltyHandler {
    point_name: String,
}

impl LoyaltyHandler {
    pub fn new(point_name: impl Into<String>) -> Self {
        Self {
            point_name: point_name.into(),
        }
    }
}

#[async_trait]
impl CommandHandler for LoyaltyHandler {
    fn name(&self) -> &str {
        "loyalty"
    }

    fn triggers(&self) -> Vec<String> {
        let alias = self.point_name.trim().to_lowercase();
        if alias.is_empty() || alias.contains(char::is_whitespace) || alias == "loyalty" {
            vec!["loyalty".into()]
        } else {
            vec!["loyalty".into(), alias]
        }
    }

    async fn execute(&self, ctx: &mut Context<'_>, _args: &str) -> AppResult<()> {
        let reply = match ctx.state.ledger.account(&ctx.caller.user_id) {
            Some(account) if account.balance > 0 => format!(
                "Your current amount of {} is {}.",
                self.point_name, account.balance
            ),
            _ => format!("You do not currently have any {}.", self.point_name),
        };
        ctx.mention(reply);
        Ok(())
    }
}
