//! Account and accrual types.

use serde::{de, Deserialize, Deserializer, Serialize};

/// A viewer's loyalty point balance.
///
/// Serialized as `{"loyalty_points": 120, "username": "alice"}` inside a map
/// keyed by user id; the id itself is restored from the key on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltyAccount {
    #[serde(skip)]
    pub user_id: String,
    #[serde(rename = "username")]
    pub display_name: String,
    #[serde(rename = "loyalty_points", deserialize_with = "points")]
    pub balance: u64,
}

impl LoyaltyAccount {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            balance: 0,
        }
    }
}

/// Older ledger files stored balances as strings.
fn points<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Points {
        Number(u64),
        Text(String),
    }

    match Points::deserialize(deserializer)? {
        Points::Number(n) => Ok(n),
        Points::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

/// A viewer present in chat when points are distributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveMember {
    pub user_id: String,
    pub display_name: String,
    pub is_subscriber: bool,
}

/// How many points are earned, and how often.
#[derive(Debug, Clone, PartialEq)]
pub struct AccrualPolicy {
    pub enabled: bool,
    /// Ticks between distributions.
    pub interval_ticks: u64,
    /// Points per member per distribution.
    pub amount: u64,
    /// Factor applied for subscribers, rounded down.
    pub subscriber_multiplier: f64,
}

impl AccrualPolicy {
    /// Points a single member earns in one distribution.
    pub fn points_for(&self, is_subscriber: bool) -> u64 {
        if is_subscriber {
            (self.amount as f64 * self.subscriber_multiplier).floor() as u64
        } else {
            self.amount
        }
    }
}

impl Default for AccrualPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ticks: 300,
            amount: 10,
            subscriber_multiplier: 2.0,
        }
    }
}

/// Result of one distribution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccrualSummary {
    pub members: usize,
    pub points_awarded: u64,
}
