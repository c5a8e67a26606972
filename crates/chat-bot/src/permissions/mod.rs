//! Role-based permission model.

mod store;

pub use store::{ConfigStore, JsonConfigStore, MemoryConfigStore};

use std::collections::{BTreeMap, BTreeSet};

/// Level that every user has.
pub const EVERYONE: &str = "everyone";

/// Level that is never granted; only the broadcaster passes it.
pub const NOBODY: &str = "nobody";

/// Level name → members. Names and members are stored lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionModel {
    levels: BTreeMap<String, BTreeSet<String>>,
}

impl PermissionModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from persisted sections (`level = "alice,bob"`).
    pub fn from_sections(sections: &BTreeMap<String, String>) -> Self {
        let mut model = Self::new();
        for (level, members) in sections {
            for member in members.split(',') {
                model.grant(level, member);
            }
        }
        model
    }

    /// Persisted form: one comma-joined member list per level.
    pub fn to_sections(&self) -> BTreeMap<String, String> {
        self.levels
            .iter()
            .map(|(level, members)| {
                let joined = members.iter().cloned().collect::<Vec<_>>().join(",");
                (level.clone(), joined)
            })
            .collect()
    }

    /// Add `member` to `level`, creating the level. Returns false if the
    /// member already had it.
    pub fn grant(&mut self, level: &str, member: &str) -> bool {
        let (level, member) = (normalize(level), normalize(member));
        if level.is_empty() || member.is_empty() || level == NOBODY {
            return false;
        }
        self.levels.entry(level).or_default().insert(member)
    }

    /// Remove `member` from `level`. The level is dropped once empty.
    pub fn revoke(&mut self, level: &str, member: &str) -> bool {
        let level = normalize(level);
        let Some(members) = self.levels.get_mut(&level) else {
            return false;
        };
        let removed = members.remove(&normalize(member));
        if members.is_empty() {
            self.levels.remove(&level);
        }
        removed
    }

    /// Unknown levels grant nothing.
    pub fn check(&self, member: &str, level: &str) -> bool {
        self.levels
            .get(&normalize(level))
            .map(|members| members.contains(&normalize(member)))
            .unwrap_or(false)
    }

    pub fn levels_of(&self, member: &str) -> BTreeSet<String> {
        let member = normalize(member);
        self.levels
            .iter()
            .filter(|(_, members)| members.contains(&member))
            .map(|(level, _)| level.clone())
            .collect()
    }

    pub fn has_level(&self, level: &str) -> bool {
        self.levels.contains_key(&normalize(level))
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Who sent a message and what they may do. Built once per message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub login: String,
    pub display_name: String,
    pub levels: BTreeSet<String>,
    /// The channel owner passes every check.
    pub is_broadcaster: bool,
}

impl Caller {
    pub fn has(&self, level: &str) -> bool {
        let level = normalize(level);
        level == EVERYONE || self.is_broadcaster || (level != NOBODY && self.levels.contains(&level))
    }

    /// True if `required` is empty or any one level is held.
    pub fn has_any(&self, required: &BTreeSet<String>) -> bool {
        required.is_empty() || required.iter().any(|level| self.has(level))
    }
}
