//! Runtime state owned by the dispatcher.

use crate::commands::register_builtins;
use crate::config::{CommandPermissions, Config};
use crate::error::AppResult;
use crate::permissions::{ConfigStore, JsonConfigStore, MemoryConfigStore, PermissionModel};
use crate::registry::{
    CommandDefinitionStore, HandlerRegistry, JsonDefinitionStore, MemoryDefinitionStore,
};
use loyalty_ledger::{AccrualPolicy, LoyaltyLedger};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use trivia::{QuestionStore, TriviaConfig, TriviaEngine};

/// Settings the handlers read.
#[derive(Debug, Clone)]
pub struct Settings {
    pub prefix: String,
    pub point_name: String,
    pub accrual: AccrualPolicy,
    /// Seconds between channel status refreshes.
    pub channel_refresh_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prefix: "!".into(),
            point_name: "Points".into(),
            accrual: AccrualPolicy::default(),
            channel_refresh_secs: 60,
        }
    }
}

/// Everything a unit of work may read or change.
pub struct BotState {
    pub settings: Settings,
    pub permissions: PermissionModel,
    pub config_store: Arc<dyn ConfigStore>,
    pub ledger: LoyaltyLedger,
    pub trivia: TriviaEngine,
    /// `None` keeps questions in memory only.
    pub question_store: Option<QuestionStore>,
    pub registry: HandlerRegistry,
    pub definition_store: Arc<dyn CommandDefinitionStore>,
    /// Tick work is skipped while set.
    pub ticks_paused: bool,
    pub stop_requested: bool,
}

impl BotState {
    /// State with in-memory stores.
    pub fn in_memory(
        settings: Settings,
        command_permissions: CommandPermissions,
        trivia: TriviaEngine,
    ) -> Self {
        let mut registry = HandlerRegistry::new(command_permissions);
        register_builtins(
            &mut registry,
            &settings.point_name,
            &trivia.config().command_prefix,
        );

        Self {
            settings,
            permissions: PermissionModel::new(),
            config_store: Arc::new(MemoryConfigStore::new()),
            ledger: LoyaltyLedger::in_memory(),
            trivia,
            question_store: None,
            registry,
            definition_store: Arc::new(MemoryDefinitionStore::default()),
            ticks_paused: false,
            stop_requested: false,
        }
    }

    /// Build the state from configuration, loading every persisted store.
    pub async fn load(config: &Config) -> AppResult<Self> {
        let settings = Settings {
            prefix: config.general.prefix.clone(),
            point_name: config.general.point_name.clone(),
            accrual: config.general.accrual_policy(),
            channel_refresh_secs: config.general.channel_refresh.as_secs(),
        };

        let question_store = QuestionStore::new(&config.storage.questions_dir);
        let questions = question_store.load().await?;
        let trivia = TriviaEngine::new(config.trivia.clone(), questions, Instant::now());

        let mut state = Self::in_memory(settings, config.command_permissions.clone(), trivia);
        state.question_store = Some(question_store);
        state.ledger = LoyaltyLedger::open(&config.storage.loyalty_path).await?;

        let config_store: Arc<dyn ConfigStore> =
            Arc::new(JsonConfigStore::new(&config.storage.permissions_path));
        state.permissions = match config_store.load_permissions().await {
            Ok(Some(sections)) => PermissionModel::from_sections(&sections),
            Ok(None) => PermissionModel::from_sections(&config.permissions),
            Err(e) => {
                error!("Failed to load permissions, using configured defaults: {}", e);
                PermissionModel::from_sections(&config.permissions)
            }
        };
        state.config_store = config_store;

        let definition_store: Arc<dyn CommandDefinitionStore> =
            Arc::new(JsonDefinitionStore::new(&config.storage.commands_path));
        state.definition_store = definition_store;
        match state.definition_store.load().await {
            Ok(definitions) => {
                state.registry.replace_definitions(definitions);
            }
            Err(e) => error!("Failed to load custom commands: {}", e),
        }

        info!(
            "Loaded state: {} loyalty accounts, {} questions, {} permission levels",
            state.ledger.len(),
            state.trivia.master_len(),
            state.permissions.level_count()
        );
        Ok(state)
    }

    pub fn trivia_config(&self) -> &TriviaConfig {
        self.trivia.config()
    }

    /// Persist permissions. Failures are logged and the change is kept.
    pub async fn save_permissions(&self) {
        if let Err(e) = self
            .config_store
            .save_permissions(&self.permissions.to_sections())
            .await
        {
            error!("Failed to save permissions: {}", e);
        }
    }

    /// Persist custom definitions. Failures are logged and the change is kept.
    pub async fn save_definitions(&self) {
        if let Err(e) = self
            .definition_store
            .save(&self.registry.definitions())
            .await
        {
            error!("Failed to save custom commands: {}", e);
        }
    }

    /// Persist the question pool. Failures are logged and the change is kept.
    pub async fn save_questions(&self) {
        if let Some(store) = &self.question_store {
            if let Err(e) = store.save(self.trivia.questions()).await {
                error!("Failed to save trivia questions: {}", e);
            }
        }
    }

    /// Persist the loyalty ledger. Failures are logged.
    pub async fn save_ledger(&self) {
        if let Err(e) = self.ledger.persist().await {
            error!("Failed to save loyalty ledger: {}", e);
        }
    }
}
