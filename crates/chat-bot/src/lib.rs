//! Chat bot runtime: command dispatch, trivia, loyalty points and
//! permission checks for a single live-stream channel.

pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod permissions;
pub mod registry;
pub mod state;

pub use dispatcher::{ControlMessage, Dispatcher, DispatcherHandle};
pub use error::{AppError, AppResult};
pub use state::{BotState, Settings};
