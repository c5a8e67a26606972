//! Storage for custom command definitions.

use super::definition::CommandDefinition;
use crate::error::AppResult;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::fs;
use tracing::{debug, info, warn};

/// Enumerable collection of custom definitions.
#[async_trait]
pub trait CommandDefinitionStore: Send + Sync {
    async fn load(&self) -> AppResult<Vec<CommandDefinition>>;

    async fn save(&self, definitions: &[CommandDefinition]) -> AppResult<()>;
}

/// All definitions in one JSON array file.
pub struct JsonDefinitionStore {
    path: PathBuf,
}

impl JsonDefinitionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CommandDefinitionStore for JsonDefinitionStore {
    async fn load(&self) -> AppResult<Vec<CommandDefinition>> {
        if !self.path.exists() {
            info!("No command definitions at {:?}", self.path);
            return Ok(Vec::new());
        }

        let raw = fs::read(&self.path).await?;
        let definitions: Vec<CommandDefinition> = serde_json::from_slice(&raw)?;

        let valid: Vec<CommandDefinition> = definitions
            .into_iter()
            .filter(|def| match def.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!("Skipping stored definition: {}", e);
                    false
                }
            })
            .collect();

        debug!("Loaded {} command definitions", valid.len());
        Ok(valid)
    }

    async fn save(&self, definitions: &[CommandDefinition]) -> AppResult<()> {
        let data = serde_json::to_vec_pretty(definitions)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        // Atomic write
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, &data).await?;
        fs::rename(&temp_path, &self.path).await?;

        debug!("Saved {} command definitions", definitions.len());
        Ok(())
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryDefinitionStore {
    definitions: Mutex<Vec<CommandDefinition>>,
}

impl MemoryDefinitionStore {
    pub fn new(definitions: Vec<CommandDefinition>) -> Self {
        Self {
            definitions: Mutex::new(definitions),
        }
    }

    pub fn snapshot(&self) -> Vec<CommandDefinition> {
        self.definitions
            .lock()
            .map(|defs| defs.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CommandDefinitionStore for MemoryDefinitionStore {
    async fn load(&self) -> AppResult<Vec<CommandDefinition>> {
        Ok(self.snapshot())
    }

    async fn save(&self, definitions: &[CommandDefinition]) -> AppResult<()> {
        if let Ok(mut guard) = self.definitions.lock() {
            *guard = definitions.to_vec();
        }
        Ok(())
    }
}
