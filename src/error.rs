//! Error types for the Backbeat relayer

use thiserror::Error;

/// Main error type for on-chain operation handling
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Engine transport error: {0}")]
    Transport(String),

    #[error("Transaction {queue_id} errored on the engine side and exhausted recovery attempts")]
    EngineErrored { queue_id: String },

    #[error("Transaction {queue_id} was cancelled by the engine")]
    Cancelled { queue_id: String },

    #[error("Foreground retry budget exhausted for transaction {queue_id}")]
    RetryBudgetExhausted { queue_id: String },

    #[error("Purchase failed after {attempts} retry attempts")]
    PurchaseFailed { attempts: u32 },

    #[error("Operation {operation} failed after {attempts} attempts: {message}")]
    SubmissionFailed {
        operation: String,
        attempts: u32,
        message: String,
    },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("User {username} not found")]
    UserNotFound { username: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unexpected engine response: {0}")]
    EngineResponse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Check if error is eligible for retry under the active budget
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RelayError::Transport(_) | RelayError::EngineResponse(_)
        )
    }

    /// Check if error is a terminal transaction outcome (never retried)
    pub fn is_fatal_tx(&self) -> bool {
        matches!(
            self,
            RelayError::Cancelled { .. } | RelayError::EngineErrored { .. }
        )
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::Transport(err.to_string())
    }
}

/// Result type for relayer operations
pub type RelayResult<T> = Result<T, RelayError>;
