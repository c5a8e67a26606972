//! Loyalty point ledger with JSON snapshot persistence.

use crate::error::LedgerError;
use crate::types::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info};

/// Per-viewer point balances.
///
/// The ledger is owned by a single consumer (the bot's dispatch loop), so it
/// carries no internal locking. The whole map is written to disk after each
/// distribution rather than once per viewer.
#[derive(Debug, Default)]
pub struct LoyaltyLedger {
    accounts: HashMap<String, LoyaltyAccount>,
    storage_path: Option<PathBuf>,
    /// Last tick an accrual check was made for.
    last_tick: u64,
}

impl LoyaltyLedger {
    /// Create a ledger that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the ledger at `path`, loading existing balances.
    ///
    /// A missing file starts an empty ledger. A file that cannot be parsed is
    /// renamed to `<stem>_backup.json` and an empty ledger is started, even
    /// when the rename itself fails.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let storage_path = path.into();
        let mut ledger = Self {
            storage_path: Some(storage_path.clone()),
            ..Self::default()
        };

        if !storage_path.exists() {
            info!("Loyalty ledger not found at {:?}, starting fresh", storage_path);
            return Ok(ledger);
        }

        let raw = fs::read(&storage_path).await?;
        match serde_json::from_slice::<HashMap<String, LoyaltyAccount>>(&raw) {
            Ok(mut accounts) => {
                for (user_id, account) in accounts.iter_mut() {
                    account.user_id = user_id.clone();
                }
                info!("Loaded loyalty ledger: {} accounts", accounts.len());
                ledger.accounts = accounts;
            }
            Err(e) => {
                let backup = backup_path(&storage_path);
                match fs::rename(&storage_path, &backup).await {
                    Ok(()) => error!(
                        "Loyalty ledger at {:?} is corrupt ({}); moved to {:?} and started an empty ledger",
                        storage_path, e, backup
                    ),
                    Err(rename_err) => error!(
                        "Loyalty ledger at {:?} is corrupt ({}) and could not be moved to {:?} ({}); started an empty ledger",
                        storage_path, e, backup, rename_err
                    ),
                }
            }
        }

        Ok(ledger)
    }

    /// Whether `tick` reaches a new distribution boundary.
    ///
    /// Compares interval buckets rather than `tick % interval == 0` so a
    /// boundary skipped by a slow tick still counts once.
    pub fn is_due(&self, policy: &AccrualPolicy, tick: u64) -> bool {
        if !policy.enabled || policy.interval_ticks == 0 || tick <= self.last_tick {
            return false;
        }
        tick / policy.interval_ticks > self.last_tick / policy.interval_ticks
    }

    /// Distribute points to `members` if `tick` is on a boundary.
    ///
    /// Returns `None` when nothing was due.
    pub fn accrue(
        &mut self,
        members: &[ActiveMember],
        policy: &AccrualPolicy,
        tick: u64,
    ) -> Option<AccrualSummary> {
        if !self.is_due(policy, tick) {
            if tick > self.last_tick {
                self.last_tick = tick;
            }
            return None;
        }
        self.last_tick = tick;

        let mut summary = AccrualSummary::default();
        for member in members {
            let earned = policy.points_for(member.is_subscriber);
            let account = self
                .accounts
                .entry(member.user_id.clone())
                .or_insert_with(|| LoyaltyAccount::new(&member.user_id, &member.display_name));

            account.display_name = member.display_name.clone();
            account.balance = account.balance.saturating_add(earned);
            summary.members += 1;
            summary.points_awarded += earned;

            debug!(
                "{} ({}) earned {} points, balance {}",
                member.display_name, member.user_id, earned, account.balance
            );
        }

        Some(summary)
    }

    /// Apply a manual adjustment, clamping at zero. Returns the new balance.
    pub fn adjust(&mut self, user_id: &str, display_name: &str, delta: i64) -> u64 {
        let account = self
            .accounts
            .entry(user_id.to_string())
            .or_insert_with(|| LoyaltyAccount::new(user_id, display_name));

        account.balance = if delta >= 0 {
            account.balance.saturating_add(delta as u64)
        } else {
            account.balance.saturating_sub(delta.unsigned_abs())
        };
        account.balance
    }

    /// Balance for a user; unknown users have zero.
    pub fn balance_of(&self, user_id: &str) -> u64 {
        self.accounts.get(user_id).map(|a| a.balance).unwrap_or(0)
    }

    pub fn account(&self, user_id: &str) -> Option<&LoyaltyAccount> {
        self.accounts.get(user_id)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Write the full snapshot to disk. No-op for in-memory ledgers.
    pub async fn persist(&self) -> Result<(), LedgerError> {
        let Some(path) = &self.storage_path else {
            return Ok(());
        };

        let data = serde_json::to_vec(&self.accounts)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        // Atomic write
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &data).await?;
        fs::rename(&temp_path, path).await?;

        debug!("Saved loyalty ledger ({} accounts) to {:?}", self.accounts.len(), path);
        Ok(())
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "loyalty".into());
    path.with_file_name(format!("{}_backup.json", stem))
}
