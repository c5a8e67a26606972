//! Writable configuration backing the permission model.

use crate::error::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::fs;
use tracing::{debug, info};

/// Persisted permission sections: level → comma-joined members.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// `None` when nothing has been saved yet.
    async fn load_permissions(&self) -> AppResult<Option<BTreeMap<String, String>>>;

    async fn save_permissions(&self, sections: &BTreeMap<String, String>) -> AppResult<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PermissionFile {
    #[serde(default)]
    permissions: BTreeMap<String, String>,
}

/// JSON file store, `{"permissions": {"moderator": "alice,bob"}}`.
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ConfigStore for JsonConfigStore {
    async fn load_permissions(&self) -> AppResult<Option<BTreeMap<String, String>>> {
        if !self.path.exists() {
            info!("No permission file at {:?}", self.path);
            return Ok(None);
        }

        let raw = fs::read(&self.path).await?;
        let file: PermissionFile = serde_json::from_slice(&raw)?;
        debug!("Loaded {} permission levels", file.permissions.len());
        Ok(Some(file.permissions))
    }

    async fn save_permissions(&self, sections: &BTreeMap<String, String>) -> AppResult<()> {
        let data = serde_json::to_vec_pretty(&PermissionFile {
            permissions: sections.clone(),
        })?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        // Atomic write
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, &data).await?;
        fs::rename(&temp_path, &self.path).await?;

        debug!("Saved {} permission levels to {:?}", sections.len(), self.path);
        Ok(())
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryConfigStore {
    sections: Mutex<Option<BTreeMap<String, String>>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<BTreeMap<String, String>> {
        self.sections.lock().ok().and_then(|s| s.clone())
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn load_permissions(&self) -> AppResult<Option<BTreeMap<String, String>>> {
        Ok(self.snapshot())
    }

    async fn save_permissions(&self, sections: &BTreeMap<String, String>) -> AppResult<()> {
        if let Ok(mut guard) = self.sections.lock() {
            *guard = Some(sections.clone());
        }
        Ok(())
    }
}
