//! Application configuration loaded from an optional file and the environment.

use anyhow::{Context, Result};
use loyalty_ledger::AccrualPolicy;
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;
use trivia::TriviaConfig;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    /// Level required per built-in command, overriding the defaults.
    #[serde(default)]
    pub command_permissions: CommandPermissions,

    /// Chat gateway connection
    pub twitch: TwitchConfig,

    /// Initial level → comma-joined members, used when no permission file exists.
    #[serde(default)]
    pub permissions: BTreeMap<String, String>,

    #[serde(default)]
    pub trivia: TriviaConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Command prefix
    #[serde(default = "default_prefix")]
    pub prefix: String,

    #[serde(default = "default_true")]
    pub loyalty_enabled: bool,

    /// Display name of loyalty points
    #[serde(default = "default_point_name")]
    pub point_name: String,

    #[serde(default = "default_earn_interval", with = "humantime_serde")]
    pub earn_interval: Duration,

    #[serde(default = "default_points_earned")]
    pub points_earned: u64,

    #[serde(default = "default_subscriber_multiplier")]
    pub subscriber_multiplier: f64,

    /// How often channel status (game, live) is refreshed
    #[serde(default = "default_channel_refresh", with = "humantime_serde")]
    pub channel_refresh: Duration,
}

impl GeneralConfig {
    pub fn accrual_policy(&self) -> AccrualPolicy {
        AccrualPolicy {
            enabled: self.loyalty_enabled,
            interval_ticks: self.earn_interval.as_secs(),
            amount: self.points_earned,
            subscriber_multiplier: self.subscriber_multiplier,
        }
    }
}

/// Built-in command → required level.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandPermissions {
    #[serde(flatten)]
    overrides: HashMap<String, String>,
}

impl CommandPermissions {
    pub fn new(overrides: HashMap<String, String>) -> Self {
        Self { overrides }
    }

    /// Level needed to run `command`, or `None` if it is public.
    pub fn required(&self, command: &str) -> Option<String> {
        let command = command.to_lowercase();
        let level = match self.overrides.get(&command) {
            Some(level) => level.trim().to_lowercase(),
            None => default_command_permission(&command)?.to_string(),
        };
        if level.is_empty() || level == crate::permissions::EVERYONE {
            None
        } else {
            Some(level)
        }
    }
}

fn default_command_permission(command: &str) -> Option<&'static str> {
    match command {
        "reload" | "newcommand" | "newtimer" | "modifycommand" | "modifytimer" | "delcommand"
        | "deltimer" => Some("moderator"),
        "addperms" | "delperms" | "shutdown" => Some(crate::permissions::NOBODY),
        _ => None,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwitchConfig {
    /// Chat gateway REST endpoint
    #[serde(default = "default_service_url")]
    pub service_url: String,

    /// Channel to join
    pub channel: String,

    /// Bot account login, used to ignore its own messages
    pub bot_username: String,

    #[serde(default)]
    pub token: Option<SecretString>,

    /// Poll interval for messages
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_loyalty_path")]
    pub loyalty_path: PathBuf,

    #[serde(default = "default_questions_dir")]
    pub questions_dir: PathBuf,

    #[serde(default = "default_commands_path")]
    pub commands_path: PathBuf,

    #[serde(default = "default_permissions_path")]
    pub permissions_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default implementations
impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            loyalty_enabled: default_true(),
            point_name: default_point_name(),
            earn_interval: default_earn_interval(),
            points_earned: default_points_earned(),
            subscriber_multiplier: default_subscriber_multiplier(),
            channel_refresh: default_channel_refresh(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            loyalty_path: default_loyalty_path(),
            questions_dir: default_questions_dir(),
            commands_path: default_commands_path(),
            permissions_path: default_permissions_path(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_prefix() -> String {
    "!".into()
}

fn default_true() -> bool {
    true
}

fn default_point_name() -> String {
    "Points".into()
}

fn default_earn_interval() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_points_earned() -> u64 {
    10
}

fn default_subscriber_multiplier() -> f64 {
    2.0
}

fn default_channel_refresh() -> Duration {
    Duration::from_secs(60)
}

fn default_service_url() -> String {
    "http://localhost:8080".into()
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_loyalty_path() -> PathBuf {
    PathBuf::from("data/loyalty.json")
}

fn default_questions_dir() -> PathBuf {
    PathBuf::from("data/trivia/questions")
}

fn default_commands_path() -> PathBuf {
    PathBuf::from("data/commands.json")
}

fn default_permissions_path() -> PathBuf {
    PathBuf::from("data/permissions.json")
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from `bot_config.*` (if present) and environment
    /// variables such as `TWITCH__CHANNEL`.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let file = std::env::var("BOT_CONFIG").unwrap_or_else(|_| "bot_config".into());

        let config = config::Config::builder()
            .add_source(config::File::with_name(&file).required(false))
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
