//! Trivia errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriviaError {
    #[error("No questions are available")]
    NoQuestions,

    #[error("No question is currently active")]
    NoActiveQuestion,

    #[error("Question {number} does not exist (valid: 1 to {max})")]
    NotFound { number: usize, max: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type TriviaResult<T> = Result<T, TriviaError>;
