//! Registry of built-in handlers and custom definitions.

mod definition;
mod store;

pub use definition::{CommandDefinition, TriggerKind};
pub use store::{CommandDefinitionStore, JsonDefinitionStore, MemoryDefinitionStore};

use crate::commands::{CommandHandler, MessageListener};
use crate::config::CommandPermissions;
use crate::error::{AppError, AppResult};
use crate::permissions::Caller;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// What a command word resolved to.
#[derive(Clone)]
pub enum Resolved {
    Builtin(Arc<dyn CommandHandler>),
    Custom(CommandDefinition),
}

/// Built-in handlers plus the custom command and timer definitions.
pub struct HandlerRegistry {
    builtins: HashMap<String, Arc<dyn CommandHandler>>,
    listeners: Vec<Arc<dyn MessageListener>>,
    /// Words custom definitions may not use.
    reserved: HashSet<String>,
    definitions: BTreeMap<String, CommandDefinition>,
    command_permissions: CommandPermissions,
}

impl HandlerRegistry {
    pub fn new(command_permissions: CommandPermissions) -> Self {
        Self {
            builtins: HashMap::new(),
            listeners: Vec::new(),
            reserved: HashSet::new(),
            definitions: BTreeMap::new(),
            command_permissions,
        }
    }

    /// Register a built-in under each of its trigger words.
    pub fn register_builtin(&mut self, handler: Arc<dyn CommandHandler>) {
        for trigger in handler.triggers() {
            let trigger = trigger.to_lowercase();
            self.reserved.insert(trigger.clone());
            self.builtins.insert(trigger, handler.clone());
        }
    }

    pub fn register_listener(&mut self, listener: Arc<dyn MessageListener>) {
        self.reserved.insert(listener.name().to_lowercase());
        self.listeners.push(listener);
    }

    pub fn listeners(&self) -> Vec<Arc<dyn MessageListener>> {
        self.listeners.clone()
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(&name.to_lowercase())
    }

    /// Add a custom definition, or overwrite one when `replace` is set.
    pub fn register(&mut self, definition: CommandDefinition, replace: bool) -> AppResult<()> {
        definition.validate()?;
        let name = definition.name.to_lowercase();

        if self.is_reserved(&name) {
            return Err(AppError::ReservedName(name));
        }
        if !replace && self.definitions.contains_key(&name) {
            return Err(AppError::DuplicateName(name));
        }

        debug!("Registered {} {}", definition.trigger.label(), name);
        self.definitions.insert(name, definition);
        Ok(())
    }

    /// Remove a custom definition of any kind.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.definitions.remove(&name.to_lowercase()).is_some()
    }

    /// Remove a custom definition only if it has the given trigger kind.
    pub fn unregister_kind(&mut self, name: &str, kind: &TriggerKind) -> bool {
        let name = name.to_lowercase();
        match self.definitions.get(&name) {
            Some(def) if def.trigger.same_kind(kind) => self.definitions.remove(&name).is_some(),
            _ => false,
        }
    }

    pub fn definition(&self, name: &str) -> Option<&CommandDefinition> {
        self.definitions.get(&name.to_lowercase())
    }

    /// All custom definitions, ordered by name.
    pub fn definitions(&self) -> Vec<CommandDefinition> {
        self.definitions.values().cloned().collect()
    }

    /// Swap the whole custom set. Invalid or reserved definitions are skipped.
    pub fn replace_definitions(&mut self, definitions: Vec<CommandDefinition>) -> usize {
        let previous = std::mem::take(&mut self.definitions);
        for definition in definitions {
            if let Err(e) = self.register(definition, true) {
                info!("Skipping definition: {}", e);
            }
        }
        info!(
            "Replaced {} custom definitions with {}",
            previous.len(),
            self.definitions.len()
        );
        self.definitions.len()
    }

    /// Exact, case-insensitive lookup of a command word.
    pub fn resolve_for_message(&self, word: &str) -> Option<Resolved> {
        let word = word.to_lowercase();
        if let Some(def) = self
            .definitions
            .get(&word)
            .filter(|d| d.trigger == TriggerKind::OnCommand)
        {
            return Some(Resolved::Custom(def.clone()));
        }
        self.builtins.get(&word).cloned().map(Resolved::Builtin)
    }

    pub fn all_interval_handlers(&self) -> Vec<&CommandDefinition> {
        self.definitions
            .values()
            .filter(|d| matches!(d.trigger, TriggerKind::OnInterval { .. }))
            .collect()
    }

    /// Check the caller against a built-in's configured level.
    pub fn authorize_builtin(&self, handler: &dyn CommandHandler, caller: &Caller) -> AppResult<()> {
        match self.command_permissions.required(handler.name()) {
            Some(level) if !caller.has(&level) => Err(AppError::PermissionDenied {
                required: vec![level],
            }),
            _ => Ok(()),
        }
    }

    /// Check the caller against a definition's required levels.
    pub fn authorize_definition(
        &self,
        definition: &CommandDefinition,
        caller: &Caller,
    ) -> AppResult<()> {
        if caller.has_any(&definition.required_permissions) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied {
                required: definition.required_permissions.iter().cloned().collect(),
            })
        }
    }

    pub fn builtin_count(&self) -> usize {
        self.builtins
            .values()
            .map(|h| h.name().to_string())
            .collect::<HashSet<_>>()
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Context;
    use crate::test_support::caller;
    use async_trait::async_trait;
    use std::collections::BTreeSet;

    struct EchoHandler;

    #[async_trait]
    impl CommandHandler for EchoHandler {
        fn name(&self) -> &str {
            "newcommand"
        }

        fn triggers(&self) -> Vec<String> {
            vec!["newcommand".into(), "addcom".into()]
        }

        async fn execute(&self, ctx: &mut Context<'_>, args: &str) -> AppResult<()> {
            ctx.reply(args);
            Ok(())
        }
    }

    fn registry() -> HandlerRegistry {
        let mut registry = HandlerRegistry::new(CommandPermissions::default());
        registry.register_builtin(Arc::new(EchoHandler));
        registry
    }

    fn perms(levels: &[&str]) -> BTreeSet<String> {
        levels.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_duplicate_name_rejected_unless_replace() {
        let mut registry = registry();
        let def = CommandDefinition::command("discord", BTreeSet::new(), "v1");
        registry.register(def.clone(), false).unwrap();

        assert!(matches!(
            registry.register(def, false),
            Err(AppError::DuplicateName(_))
        ));

        registry
            .register(CommandDefinition::command("DISCORD", BTreeSet::new(), "v2"), true)
            .unwrap();
        assert_eq!(registry.definition("discord").unwrap().response, "v2");
    }

    #[test]
    fn test_name_unique_across_kinds() {
        let mut registry = registry();
        registry
            .register(CommandDefinition::timer("follow", 60, "Follow!"), false)
            .unwrap();

        assert!(matches!(
            registry.register(CommandDefinition::command("follow", BTreeSet::new(), "x"), false),
            Err(AppError::DuplicateName(_))
        ));
    }

    #[test]
    fn test_builtin_names_reserved() {
        let mut registry = registry();
        assert!(matches!(
            registry.register(CommandDefinition::command("addcom", BTreeSet::new(), "x"), true),
            Err(AppError::ReservedName(_))
        ));
    }

    #[test]
    fn test_unregister() {
        let mut registry = registry();
        registry
            .register(CommandDefinition::timer("follow", 60, "Follow!"), false)
            .unwrap();

        assert!(!registry.unregister_kind("follow", &TriggerKind::OnCommand));
        assert!(registry.definition("follow").is_some());
        assert!(registry.unregister("FOLLOW"));
        assert!(!registry.unregister("follow"));
    }

    #[test]
    fn test_resolve_for_message() {
        let mut registry = registry();
        registry
            .register(CommandDefinition::command("discord", BTreeSet::new(), "Join"), false)
            .unwrap();
        registry
            .register(CommandDefinition::timer("follow", 60, "Follow!"), false)
            .unwrap();

        assert!(matches!(
            registry.resolve_for_message("Discord"),
            Some(Resolved::Custom(_))
        ));
        assert!(matches!(
            registry.resolve_for_message("ADDCOM"),
            Some(Resolved::Builtin(_))
        ));
        // Timers are not invocable by name
        assert!(registry.resolve_for_message("follow").is_none());
        assert!(registry.resolve_for_message("unknown").is_none());
        assert_eq!(registry.all_interval_handlers().len(), 1);
        assert_eq!(registry.builtin_count(), 1);
    }

    #[test]
    fn test_definition_permissions() {
        let registry = registry();
        let def = CommandDefinition::command("secret", perms(&["vip", "moderator"]), "shh");

        assert!(registry
            .authorize_definition(&def, &caller("a", &["vip"], false))
            .is_ok());
        assert!(registry
            .authorize_definition(&def, &caller("a", &[], true))
            .is_ok());
        assert!(matches!(
            registry.authorize_definition(&def, &caller("a", &["regular"], false)),
            Err(AppError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn test_builtin_permissions_from_config() {
        let registry = registry();
        let handler = EchoHandler;

        assert!(registry
            .authorize_builtin(&handler, &caller("a", &["moderator"], false))
            .is_ok());
        assert!(registry
            .authorize_builtin(&handler, &caller("a", &[], false))
            .is_err());
    }

    #[test]
    fn test_replace_definitions() {
        let mut registry = registry();
        registry
            .register(CommandDefinition::command("old", BTreeSet::new(), "x"), false)
            .unwrap();

        let count = registry.replace_definitions(vec![
            CommandDefinition::command("new", BTreeSet::new(), "y"),
            CommandDefinition::command("addcom", BTreeSet::new(), "reserved"),
        ]);

        assert_eq!(count, 1);
        assert!(registry.definition("old").is_none());
        assert!(registry.definition("new").is_some());
    }
}
