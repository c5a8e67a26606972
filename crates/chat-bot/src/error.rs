//! Application error types.

use chat_client::ChatError;
use loyalty_ledger::LedgerError;
use thiserror::Error;
use trivia::TriviaError;

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Trivia error: {0}")]
    Trivia(#[from] TriviaError),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Malformed command arguments; the message is shown to the user.
    #[error("Invalid input: {0}")]
    UserInput(String),

    #[error("Permission denied; requires one of {required:?}")]
    PermissionDenied { required: Vec<String> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("A command already exists with the name {0}")]
    DuplicateName(String),

    #[error("{0} is a built-in command")]
    ReservedName(String),
}

impl AppError {
    /// Chat reply for errors caused by the user. `None` for internal errors.
    pub fn user_message(&self, user: &str) -> Option<String> {
        let text = match self {
            AppError::UserInput(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::PermissionDenied { required } if required.len() > 1 => {
                return Some(format!(
                    "You must have one of the following permissions to use that command, {}: {}.",
                    user,
                    required.join(", ")
                ))
            }
            AppError::PermissionDenied { .. } => {
                return Some(format!(
                    "Sorry, @{}, you do not have the required permissions to use that command.",
                    user
                ))
            }
            AppError::DuplicateName(name) => {
                format!("A command already exists with the name {}.", name)
            }
            AppError::ReservedName(name) => {
                format!("{} is a built-in command and cannot be replaced.", name)
            }
            AppError::Trivia(e) => match e {
                TriviaError::NoQuestions => "There are no questions available.".into(),
                TriviaError::NoActiveQuestion => "There is no question currently loaded.".into(),
                TriviaError::NotFound { number: 0, .. } => {
                    "The index value supplied must be a positive integer.".into()
                }
                TriviaError::NotFound { max, .. } => format!(
                    "The supplied index was too high. Please supply a question index up to {}.",
                    max
                ),
                TriviaError::InvalidInput(msg) => sentence(msg),
                _ => return None,
            },
            _ => return None,
        };
        Some(format!("@{}: {}", user, text))
    }
}

/// Capitalise and terminate a message fragment.
fn sentence(fragment: &str) -> String {
    let mut chars = fragment.chars();
    let mut out = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    if !out.ends_with('.') {
        out.push('.');
    }
    out
}

/// Result type alias for application errors.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert_eq!(
            AppError::UserInput("Command syntax: !addperms <user>,<level>".into())
                .user_message("alice")
                .as_deref(),
            Some("@alice: Command syntax: !addperms <user>,<level>")
        );
        assert_eq!(
            AppError::PermissionDenied {
                required: vec!["moderator".into()]
            }
            .user_message("bob")
            .as_deref(),
            Some("Sorry, @bob, you do not have the required permissions to use that command.")
        );
        assert_eq!(
            AppError::Trivia(TriviaError::NotFound { number: 9, max: 3 })
                .user_message("carol")
                .as_deref(),
            Some("@carol: The supplied index was too high. Please supply a question index up to 3.")
        );
        assert_eq!(
            AppError::Trivia(TriviaError::InvalidInput("the points supplied were bad".into()))
                .user_message("dan")
                .as_deref(),
            Some("@dan: The points supplied were bad.")
        );
    }

    #[test]
    fn test_internal_errors_have_no_user_message() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert!(AppError::Storage(io).user_message("alice").is_none());
    }
}
