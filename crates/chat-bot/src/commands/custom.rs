//! Responses for user-authored commands and timers.

use crate::permissions::Caller;
use crate::registry::{CommandDefinition, HandlerRegistry, TriggerKind};
use tracing::debug;

/// Tracks which timer boundaries have already fired.
#[derive(Debug, Default)]
pub struct CustomCommands {
    last_tick: u64,
}

impl CustomCommands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply for an invoked custom command.
    pub fn respond(definition: &CommandDefinition, caller: &Caller) -> String {
        definition.render(&caller.display_name)
    }

    /// Responses of every timer whose interval boundary was crossed since
    /// the last call. Skipped ticks still fire once.
    pub fn due_timers(&mut self, registry: &HandlerRegistry, tick: u64) -> Vec<String> {
        if tick <= self.last_tick {
            return Vec::new();
        }
        let last = std::mem::replace(&mut self.last_tick, tick);

        registry
            .all_interval_handlers()
            .into_iter()
            .filter(|definition| match definition.trigger {
                TriggerKind::OnInterval { interval_seconds } if interval_seconds > 0 => {
                    tick / interval_seconds > last / interval_seconds
                }
                _ => false,
            })
            .map(|definition| {
                debug!("Timer {} fired at tick {}", definition.name, tick);
                definition.response.clone()
            })
            .collect()
    }

    pub fn last_tick(&self) -> u64 {
        self.last_tick
    }
}
