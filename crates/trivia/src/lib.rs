//! Trivia mini-game.
//!
//! A pool of questions grouped by game, a single active round driven by a
//! once-per-second tick, and per-game JSON persistence.

mod engine;
mod error;
mod store;
mod types;

pub use engine::{format_remaining, TriviaEngine, TriviaState};
pub use error::{TriviaError, TriviaResult};
pub use store::QuestionStore;
pub use types::*;
