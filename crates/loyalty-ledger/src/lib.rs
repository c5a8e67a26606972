//! Loyalty point ledger.
//!
//! Viewers present in chat earn points on a fixed tick interval, with a
//! multiplier for subscribers. Balances are persisted as a single JSON
//! snapshot keyed by user id.

mod error;
mod ledger;
mod types;

pub use error::LedgerError;
pub use ledger::LoyaltyLedger;
pub use types::*;
